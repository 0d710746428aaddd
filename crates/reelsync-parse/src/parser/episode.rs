use std::sync::OnceLock;

use regex::Regex;

use crate::elements::ParsedTitle;

/// Episode matchers in priority order.
///
/// Each is `title + separator + optional season marker + episode marker`.
/// Worded forms come before the terse `E8` form so "E" only counts right
/// after a separator.
const EPISODE_PATTERNS: &[&str] = &[
    // "Show - Episode 8", "Show: Season 2 Episode 8"
    r"(?i)^(.+?)\s*[-:]\s*(?:Season\s*(\d+)\s+)?Episode\s+(\d+)",
    // "Show - Ep. 8", "Show - Season 2 Ep 8"
    r"(?i)^(.+?)\s*[-:]\s*(?:Season\s*(\d+)\s+)?Ep\.?\s*(\d+)",
    // "Show - E8", "Show - S2:E8", "Show - S2E8"
    r"(?i)^(.+?)\s*[-:]\s*(?:S(\d+):?)?E\s*(\d+)",
];

fn matchers() -> &'static [Regex] {
    static MATCHERS: OnceLock<Vec<Regex>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        EPISODE_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("episode pattern should compile"))
            .collect()
    })
}

/// Try every matcher in order; the first that yields a usable title wins.
pub(super) fn match_episode(title: &str) -> Option<ParsedTitle> {
    matchers().iter().find_map(|re| {
        let caps = re.captures(title)?;
        let show = caps.get(1)?.as_str().trim();
        if show.is_empty() {
            return None;
        }
        let season = match caps.get(2) {
            Some(m) => m.as_str().parse::<u32>().ok()?,
            None => 1,
        };
        let episode = caps.get(3)?.as_str().parse::<u32>().ok()?;
        Some(ParsedTitle::episode(show, season, episode))
    })
}
