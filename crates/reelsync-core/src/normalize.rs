//! Title normalization for catalog matching.
//!
//! Two forms are used: [`normalize`] for comparing a query against a
//! candidate, and [`clean_query`] for the second search attempt, which keeps
//! case but drops punctuation the catalog's search tends to trip over.

use unicode_normalization::UnicodeNormalization;

/// Comparison form: NFKC, case folded, punctuation stripped, whitespace
/// collapsed.
pub fn normalize(s: &str) -> String {
    let s = unicode_normalize(s);
    let s = transliterate(&s);
    let s = erase_punctuation(&s);
    collapse_whitespace(&s)
}

/// Search form: every non-word character becomes a space, whitespace
/// collapsed. Case is kept.
pub fn clean_query(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| if is_word_char(c) || c.is_whitespace() { c } else { ' ' })
        .collect();
    collapse_whitespace(&replaced)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// ── Unicode NFKC + case folding ───────────────────────────────────────

fn unicode_normalize(s: &str) -> String {
    s.nfkc().collect::<String>().to_lowercase()
}

// ── Character transliteration ─────────────────────────────────────────

/// Fold typographic variants so they erase the same way as their ASCII forms.
fn transliterate(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\u{2019}' | '\u{2018}' | '\u{02BC}' => result.push('\''),
            '\u{201C}' | '\u{201D}' => result.push('"'),
            '\u{2013}' | '\u{2014}' => result.push('-'),
            '\u{00E6}' => result.push_str("ae"),
            '\u{0153}' => result.push_str("oe"),
            '\u{00DF}' => result.push_str("ss"),
            c => result.push(c),
        }
    }
    result
}

// ── Punctuation erasure ───────────────────────────────────────────────

/// Keep word characters and whitespace only.
fn erase_punctuation(s: &str) -> String {
    s.chars()
        .filter(|&c| is_word_char(c) || c.is_whitespace())
        .collect()
}

// ── Whitespace collapse ───────────────────────────────────────────────

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
