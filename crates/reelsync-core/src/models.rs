use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reelsync_api::{CatalogIds, CatalogItem, MediaKind, ScrobbleAction};
use reelsync_detect::{FrameId, FrameKind};
use reelsync_parse::ParsedTitle;

/// Player state reported by a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

/// What made the page report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackTrigger {
    /// A play/pause/ended event from the player.
    #[default]
    Player,
    /// Periodic progress report while playing.
    Heartbeat,
    /// A video was found already playing when the page was attached.
    Attach,
    /// The page is going away.
    Unload,
}

/// Where an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRef {
    pub owner: FrameId,
    #[serde(default)]
    pub kind: FrameKind,
}

/// A playback report from a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEvent {
    pub status: PlaybackStatus,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
    /// Percent watched, 0-100.
    #[serde(default)]
    pub progress: f64,
    pub frame: FrameRef,
    #[serde(default)]
    pub trigger: PlaybackTrigger,
    /// 0 for fresh events, 1 for the deferred re-extraction.
    #[serde(default)]
    pub attempt: u8,
}

impl PlaybackEvent {
    pub fn new(status: PlaybackStatus, owner: FrameId) -> Self {
        Self {
            status,
            title: None,
            year: None,
            progress: 0.0,
            frame: FrameRef {
                owner,
                kind: FrameKind::Top,
            },
            trigger: PlaybackTrigger::Player,
            attempt: 0,
        }
    }

    /// The single retry of this event: same frame and status, no title, so
    /// the page is read again.
    pub fn retry(&self) -> Self {
        Self {
            title: None,
            attempt: 1,
            ..self.clone()
        }
    }

    /// Titles reported by embedded player frames are never trusted.
    pub fn trusted_title(&self) -> Option<&str> {
        match self.frame.kind {
            FrameKind::Top => self.title.as_deref(),
            FrameKind::Embedded => None,
        }
    }
}

/// The catalog item a guess resolved to, with display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogMatch {
    pub kind: MediaKind,
    pub title: String,
    pub ids: CatalogIds,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub certification: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
}

/// Genres kept for display.
pub const MAX_GENRES: usize = 3;

impl CatalogMatch {
    /// Display fields from a catalog item. Poster and synopsis are filled in
    /// by enrichment.
    pub fn from_item(item: &CatalogItem) -> Self {
        Self {
            kind: item.kind,
            title: item.title.clone(),
            ids: item.ids.clone(),
            year: item.year,
            poster_url: None,
            synopsis: None,
            rating: item.rating.map(|r| (r * 10.0).round() / 10.0),
            genres: item.genres.iter().take(MAX_GENRES).cloned().collect(),
            runtime: item.runtime,
            certification: item.certification.clone(),
            network: item.network.clone(),
        }
    }
}

/// Dispatcher status shown to UI consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NowPlayingStatus {
    Playing,
    Paused,
    Stopped,
    /// No usable title, or the title could not be parsed.
    ParseError,
    /// The title did not resolve to a catalog item.
    NotFound,
}

impl From<PlaybackStatus> for NowPlayingStatus {
    fn from(s: PlaybackStatus) -> Self {
        match s {
            PlaybackStatus::Playing => Self::Playing,
            PlaybackStatus::Paused => Self::Paused,
            PlaybackStatus::Stopped => Self::Stopped,
        }
    }
}

/// Latest dispatcher snapshot, overwritten on every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlayingRecord {
    pub status: NowPlayingStatus,
    /// Parsed title, or the raw title when parsing failed.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub guess: Option<ParsedTitle>,
    #[serde(default)]
    pub catalog: Option<CatalogMatch>,
    #[serde(default)]
    pub action: Option<ScrobbleAction>,
    #[serde(default)]
    pub progress: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl NowPlayingRecord {
    pub fn parse_error(title: Option<String>) -> Self {
        Self {
            status: NowPlayingStatus::ParseError,
            title,
            guess: None,
            catalog: None,
            action: None,
            progress: None,
            updated_at: Utc::now(),
        }
    }

    pub fn not_found(guess: ParsedTitle) -> Self {
        Self {
            status: NowPlayingStatus::NotFound,
            title: Some(guess.title.clone()),
            guess: Some(guess),
            catalog: None,
            action: None,
            progress: None,
            updated_at: Utc::now(),
        }
    }
}

/// The scrobble verb for a playback state. Anything at or past 99% stops.
pub fn scrobble_action(status: PlaybackStatus, progress: f64) -> ScrobbleAction {
    if progress >= 99.0 {
        return ScrobbleAction::Stop;
    }
    match status {
        PlaybackStatus::Playing => ScrobbleAction::Start,
        PlaybackStatus::Paused => ScrobbleAction::Pause,
        PlaybackStatus::Stopped => ScrobbleAction::Stop,
    }
}

/// Catalog kind searched for a parsed guess.
pub fn catalog_kind(guess: &ParsedTitle) -> MediaKind {
    if guess.is_episode() {
        MediaKind::Show
    } else {
        MediaKind::Movie
    }
}
