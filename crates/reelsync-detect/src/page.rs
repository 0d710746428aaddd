//! The page capability the extractor talks to.
//!
//! A host (browser bridge, test fake, CLI feed) implements [`PageProbe`] for
//! each frame owner it knows about and exposes them through a
//! [`PageDirectory`].

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of the frame owner (the browser tab) a playback event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub u64);

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame:{}", self.0)
    }
}

/// Which frame inside the owner produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    #[default]
    Top,
    /// An embedded player frame; its own title is never trusted.
    Embedded,
}

/// A best-effort title guess with an optional release year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTitle {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
}

impl PageTitle {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year: None,
        }
    }

    pub fn with_year(mut self, year: Option<u16>) -> Self {
        self.year = year;
        self
    }
}

/// A probe into the page failed (responder missing, injection refused).
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("page responder unavailable: {0}")]
    Unavailable(String),
    #[error("page probe failed: {0}")]
    Failed(String),
}

/// Read-only access to one frame owner's page state.
///
/// Every method may suspend. None of them may mutate the page, apart from
/// the advisory toast.
pub trait PageProbe: Send + Sync {
    /// Ask the page's in-context responder for its DOM-derived title.
    fn responder_title(&self) -> BoxFuture<'_, Result<Option<PageTitle>, ProbeError>>;

    /// Re-derive the DOM title with a one-shot injected probe.
    fn inject_probe(&self) -> BoxFuture<'_, Result<Option<PageTitle>, ProbeError>>;

    /// The raw tab title.
    fn tab_title(&self) -> BoxFuture<'_, Option<String>>;

    /// The current tab URL.
    fn tab_url(&self) -> BoxFuture<'_, Option<String>>;

    /// Episode id read from the page's in-memory application state.
    fn app_state_episode_id(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async { None })
    }

    /// Resolves once the player UI has rendered its metadata.
    fn player_ready(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }

    /// Show a short notice in the page. Best-effort, never fails.
    fn show_toast(&self, _message: &str) {}
}

/// Lookup of live pages by frame owner.
pub trait PageDirectory: Send + Sync {
    fn page(&self, owner: FrameId) -> Option<Arc<dyn PageProbe>>;
}
