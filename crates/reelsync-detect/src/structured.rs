//! Title derivation from a snapshot of page structure.
//!
//! Page probes capture the handful of DOM signals streaming players expose
//! (JSON-LD blocks, player title evidence, hover overlay, headings, meta
//! tags) into a [`PageSnapshot`]; [`derive_title`] turns that into a title
//! guess the parser understands.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::page::PageTitle;

/// Structural signals captured from a page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub document_title: Option<String>,
    /// Raw text of every `application/ld+json` script.
    #[serde(default)]
    pub json_ld: Vec<String>,
    /// `og:title` meta content.
    #[serde(default)]
    pub og_title: Option<String>,
    /// Player title evidence element (always present in some players).
    #[serde(default)]
    pub title_evidence: Option<TitleEvidence>,
    /// Hover overlay shown while paused.
    #[serde(default)]
    pub overlay: Option<Overlay>,
    /// Series heading (usually a link to the series page).
    #[serde(default)]
    pub series_heading: Option<String>,
    /// Main episode heading.
    #[serde(default)]
    pub episode_heading: Option<String>,
    /// Visible body text, used for release year hints.
    #[serde(default)]
    pub body_text: Option<String>,
}

/// Player title evidence: aria label like `S2:E8 "Divergence"` plus its text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TitleEvidence {
    pub aria_label: String,
    #[serde(default)]
    pub text: String,
}

/// Player hover overlay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Overlay {
    pub show: String,
    #[serde(default)]
    pub season_heading: Option<String>,
    pub episode_text: String,
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("structured pattern should compile"))
}

fn season_episode_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?i)S(\d+):E(\d+)")
}

fn overlay_episode_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?i)(?:Ep\.?\s*|E)(\d+)")
}

fn heading_episode_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"E(\d+)|(?i:Episode\s+(\d+))")
}

fn leading_year() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^(\d{4})")
}

fn released_on() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"Released on\s+\w+\s+\d+,\s+(\d{4})")
}

fn first_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(\d+)")
}

/// Derive the best title from a page snapshot.
///
/// Order: JSON-LD episode data, player title evidence, hover overlay,
/// heading pair, `og:title`, document title.
pub fn derive_title(snapshot: &PageSnapshot) -> Option<PageTitle> {
    let json_ld = json_ld_signals(&snapshot.json_ld);
    let year = json_ld
        .year
        .or_else(|| snapshot.body_text.as_deref().and_then(release_year));

    if let Some(title) = json_ld.title {
        return Some(PageTitle::new(title).with_year(year));
    }

    let derived = snapshot
        .title_evidence
        .as_ref()
        .and_then(title_from_evidence)
        .or_else(|| snapshot.overlay.as_ref().and_then(title_from_overlay))
        .or_else(|| {
            title_from_headings(
                snapshot.series_heading.as_deref()?,
                snapshot.episode_heading.as_deref()?,
            )
        })
        .or_else(|| snapshot.og_title.as_deref().and_then(clean_og_title))
        .or_else(|| {
            snapshot
                .document_title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })?;

    Some(PageTitle::new(derived).with_year(year))
}

#[derive(Debug, Default)]
struct JsonLdSignals {
    title: Option<String>,
    year: Option<u16>,
}

/// Scan JSON-LD blocks for a `TVEpisode` and a publication year.
fn json_ld_signals(blocks: &[String]) -> JsonLdSignals {
    let mut signals = JsonLdSignals::default();

    let nodes = blocks
        .iter()
        .filter_map(|raw| serde_json::from_str::<Value>(raw).ok())
        .flat_map(|v| match v {
            Value::Array(items) => items,
            other => vec![other],
        });

    for node in nodes {
        if signals.year.is_none() {
            signals.year = node
                .get("datePublished")
                .or_else(|| node.get("uploadDate"))
                .and_then(Value::as_str)
                .and_then(year_of);
        }

        let is_episode = node.get("@type").and_then(Value::as_str) == Some("TVEpisode")
            || node.get("partOfSeries").is_some();
        if !is_episode {
            continue;
        }

        let series = node
            .get("partOfSeries")
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str);
        let episode = node.get("episodeNumber").and_then(|n| match n {
            Value::Number(n) => n.as_u64().map(|n| n.to_string()),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        });

        if signals.year.is_none() {
            signals.year = node
                .get("partOfSeries")
                .and_then(|s| s.get("startDate"))
                .and_then(Value::as_str)
                .and_then(year_of);
        }

        if let (Some(series), Some(episode)) = (series, episode) {
            signals.title = Some(format!("{} - Episode {episode}", series.trim()));
            break;
        }
    }

    signals
}

fn year_of(date: &str) -> Option<u16> {
    leading_year()
        .captures(date.trim())
        .and_then(|c| c.get(1)?.as_str().parse().ok())
}

/// Release year from a "Released on Mar 1, 2024" line.
pub fn release_year(text: &str) -> Option<u16> {
    released_on()
        .captures(text)
        .and_then(|c| c.get(1)?.as_str().parse().ok())
}

/// `S2:E8` aria label + first text line as the show name.
pub fn title_from_evidence(evidence: &TitleEvidence) -> Option<String> {
    let caps = season_episode_marker().captures(&evidence.aria_label)?;
    let show = evidence
        .text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())?;
    Some(format!(
        "{show} - Season {} Episode {}",
        caps.get(1)?.as_str(),
        caps.get(2)?.as_str()
    ))
}

/// Show heading + season heading + episode text from the hover overlay.
pub fn title_from_overlay(overlay: &Overlay) -> Option<String> {
    let show = overlay.show.trim();
    let episode_text = overlay.episode_text.trim();
    if show.is_empty() || episode_text.is_empty() {
        return None;
    }

    let season = overlay
        .season_heading
        .as_deref()
        .filter(|h| h.to_lowercase().contains("season"))
        .and_then(|h| first_number().captures(h))
        .and_then(|c| c.get(1)?.as_str().parse::<u32>().ok())
        .unwrap_or(1);

    match overlay_episode_marker().captures(episode_text) {
        Some(caps) => Some(format!(
            "{show} - Season {season} Episode {}",
            caps.get(1)?.as_str()
        )),
        None => Some(format!("{show} - {episode_text}")),
    }
}

/// Series heading + episode heading (`E11 - Title` or a bare episode name).
pub fn title_from_headings(series: &str, episode: &str) -> Option<String> {
    let series = series.trim();
    let episode = episode.trim();
    if series.is_empty() || episode.is_empty() {
        return None;
    }
    let number = heading_episode_marker()
        .captures(episode)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string());
    match number {
        Some(n) => Some(format!("{series} - Episode {n}")),
        None => Some(format!("{series} - {episode}")),
    }
}

/// `og:title` with the leading "Watch " call to action removed.
pub fn clean_og_title(og_title: &str) -> Option<String> {
    let trimmed = og_title.trim();
    let cleaned = match trimmed.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("watch ") => trimmed[6..].trim_start(),
        _ => trimmed,
    };
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}
