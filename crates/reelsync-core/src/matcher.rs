use crate::normalize::normalize;

/// Extra characters a query may have over a candidate it starts with before
/// the candidate is considered a truncated, different title.
const PREFIX_SLACK: usize = 5;

/// Decide whether a catalog candidate plausibly is what the query names.
///
/// With a year hint the title is not compared at all: the candidate passes
/// iff its year is within one of the hint. Without one, equal normalized
/// titles pass, and a candidate is only rejected when it is a prefix of a
/// query more than five characters longer.
pub fn validate_match(
    query: &str,
    candidate_title: &str,
    candidate_year: Option<u32>,
    year_hint: Option<u16>,
) -> bool {
    if let Some(hint) = year_hint {
        let accepted = candidate_year
            .is_some_and(|year| (i64::from(year) - i64::from(hint)).abs() <= 1);
        tracing::trace!(
            candidate = candidate_title,
            ?candidate_year,
            hint,
            accepted,
            "Year check"
        );
        return accepted;
    }

    let q = normalize(query);
    let c = normalize(candidate_title);
    if q == c {
        return true;
    }

    let (q_len, c_len) = (q.chars().count(), c.chars().count());
    if q_len > c_len + PREFIX_SLACK && q.starts_with(&c) {
        tracing::trace!(candidate = candidate_title, query, "Candidate too short for query");
        return false;
    }

    true
}
