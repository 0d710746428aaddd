mod episode;

use thiserror::Error;

use crate::elements::ParsedTitle;

/// Why a page title could not produce a guess.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty title")]
    Empty,
}

/// Parse a page title into a movie or episode guess.
///
/// Episode matchers are tried in list order and the first hit wins. A title
/// no matcher recognizes is returned whole (trimmed) as a movie.
pub fn parse(raw: &str) -> Result<ParsedTitle, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(parsed) = episode::match_episode(trimmed) {
        tracing::trace!(raw = %trimmed, parsed = %parsed, "Parsed episode title");
        return Ok(parsed);
    }

    Ok(ParsedTitle::movie(trimmed))
}
