use serde::{Deserialize, Serialize};

/// Whether a parsed title refers to a single film or an episode of a show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Episode,
}

/// Structured guess extracted from a page title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTitle {
    pub kind: MediaKind,
    /// Show or movie title, trimmed.
    pub title: String,
    /// Season number, at least 1. Movies always carry 1.
    pub season: u32,
    /// Episode number (episodes only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
}

impl ParsedTitle {
    pub fn movie(title: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Movie,
            title: title.into(),
            season: 1,
            episode: None,
        }
    }

    pub fn episode(title: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            kind: MediaKind::Episode,
            title: title.into(),
            season: season.max(1),
            episode: Some(episode),
        }
    }

    pub fn is_episode(&self) -> bool {
        self.kind == MediaKind::Episode
    }
}

impl std::fmt::Display for ParsedTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.episode {
            Some(ep) => write!(f, "{} S{:02}E{:02}", self.title, self.season, ep),
            None => write!(f, "{}", self.title),
        }
    }
}
