use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use reelsync_api::ScrobbleAction;
use reelsync_detect::FrameId;

use crate::resolver::ResolveTier;

/// Maximum number of events retained in the ring buffer.
const EVENT_LOG_CAPACITY: usize = 200;

/// A typed event from the scrobble pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DebugEvent {
    Extracted {
        owner: FrameId,
        title: String,
        source: String,
    },
    NoSignal {
        owner: FrameId,
        attempt: u8,
    },
    Parsed {
        raw_title: String,
        title: String,
        season: u32,
        episode: Option<u32>,
    },
    Resolved {
        query: String,
        tier: ResolveTier,
        catalog_title: String,
    },
    Unresolved {
        query: String,
    },
    Throttled {
        title: String,
        action: ScrobbleAction,
    },
    Emitted {
        title: String,
        action: ScrobbleAction,
        progress: f64,
    },
    Error {
        source: String,
        message: String,
    },
}

/// A timestamped event entry.
pub type EventEntry = (DateTime<Utc>, DebugEvent);

/// Bounded ring buffer of debug events.
#[derive(Debug)]
pub struct EventLog {
    entries: VecDeque<EventEntry>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
        }
    }

    /// Push a new event, evicting the oldest if at capacity.
    pub fn push(&mut self, event: DebugEvent) {
        if self.entries.len() >= EVENT_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back((Utc::now(), event));
    }

    /// Return a snapshot of all entries (newest last).
    pub fn snapshot(&self) -> Vec<EventEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Thread-safe handle to the event log.
pub type SharedEventLog = Arc<Mutex<EventLog>>;

/// Create a new shared event log.
pub fn shared_event_log() -> SharedEventLog {
    Arc::new(Mutex::new(EventLog::new()))
}

/// Record an event on a shared log.
pub fn record(log: &SharedEventLog, event: DebugEvent) {
    log.lock().unwrap_or_else(|e| e.into_inner()).push(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let mut log = EventLog::new();
        for attempt in 0..(EVENT_LOG_CAPACITY + 5) {
            log.push(DebugEvent::NoSignal {
                owner: FrameId(attempt as u64),
                attempt: 0,
            });
        }
        assert_eq!(log.len(), EVENT_LOG_CAPACITY);
        let snapshot = log.snapshot();
        assert!(matches!(
            snapshot[0].1,
            DebugEvent::NoSignal { owner: FrameId(5), .. }
        ));
    }

    #[test]
    fn test_serializes_tagged() {
        let json = serde_json::to_value(DebugEvent::Throttled {
            title: "Foo".into(),
            action: ScrobbleAction::Start,
        })
        .unwrap();
        assert_eq!(json["event"], "throttled");
        assert_eq!(json["action"], "start");
    }
}
