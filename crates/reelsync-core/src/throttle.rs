use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use reelsync_api::ScrobbleAction;

#[derive(Debug, Clone)]
struct LastEmission {
    title: String,
    action: ScrobbleAction,
    at: Instant,
}

/// Suppresses repeats of the same scrobble inside a time window.
///
/// One record per dispatcher. Any change of title or action lets the
/// emission through immediately.
#[derive(Debug)]
pub struct Throttle {
    window: Duration,
    last: Mutex<Option<LastEmission>>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    /// Whether an emission for `(title, action)` should go out now. When it
    /// should, the emission is recorded as of now.
    pub fn admit(&self, title: &str, action: ScrobbleAction) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(prev) = last.as_ref() {
            let elapsed = now.duration_since(prev.at);
            if prev.title == title && prev.action == action && elapsed < self.window {
                tracing::debug!(title, %action, ?elapsed, "Throttled");
                return false;
            }
        }
        *last = Some(LastEmission {
            title: title.to_string(),
            action,
            at: now,
        });
        true
    }
}
