use std::collections::HashMap;
use std::sync::Mutex;

use crate::page::FrameId;

/// Titles resolved from site metadata, keyed by frame owner and episode id.
///
/// An entry is only returned for the episode id it was stored under, so a
/// frame that moved on to another episode always misses.
#[derive(Debug, Default)]
pub struct ResolvedTitleCache {
    entries: Mutex<HashMap<(FrameId, String), String>>,
}

impl ResolvedTitleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner: FrameId, episode_id: &str) -> Option<String> {
        self.lock().get(&(owner, episode_id.to_string())).cloned()
    }

    pub fn insert(&self, owner: FrameId, episode_id: impl Into<String>, title: impl Into<String>) {
        self.lock()
            .insert((owner, episode_id.into()), title.into());
    }

    /// Drop every entry for a frame owner (navigation or closure).
    pub fn purge_owner(&self, owner: FrameId) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(o, _), _| *o != owner);
        let purged = before - entries.len();
        if purged > 0 {
            tracing::debug!(%owner, purged, "Purged resolved titles");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(FrameId, String), String>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
