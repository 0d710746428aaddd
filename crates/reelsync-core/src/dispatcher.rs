//! Turns playback events into scrobbles.
//!
//! Per event: find a title (event, else page extraction), parse it, resolve
//! it, publish the now-playing record, then emit unless throttled.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use reelsync_api::{
    ArtworkService, CatalogItem, CatalogService, MediaKind, ScrobbleAction, ScrobbleService,
    ScrobbleTarget, ServiceError,
};
use reelsync_detect::{DeferredRetry, PageDirectory, SignalExtractor};
use reelsync_parse::ParsedTitle;

use crate::config::AppConfig;
use crate::corrections;
use crate::debug_log::{self, DebugEvent, SharedEventLog};
use crate::error::CoreError;
use crate::models::{scrobble_action, NowPlayingRecord, PlaybackEvent, PlaybackTrigger};
use crate::resolver::Resolver;
use crate::store::{keys, set_json, StateStore};
use crate::throttle::Throttle;

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Emitted { action: ScrobbleAction, title: String },
    Throttled { action: ScrobbleAction },
    /// No usable title anywhere.
    NoSignal { retry_scheduled: bool },
    ParseFailed,
    NotFound,
    /// A movie guess pinned to a show, or similar; nothing to scrobble.
    KindMismatch,
    /// Credentials are missing. Reported, never retried.
    Misconfigured { message: String },
}

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub throttle_window: Duration,
    /// Progress reported when the player gives none.
    pub default_progress: f64,
}

impl DispatcherSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            throttle_window: config.general.throttle_window(),
            default_progress: config.general.default_progress,
        }
    }
}

pub struct Dispatcher<C, A, P, S> {
    extractor: Arc<SignalExtractor>,
    resolver: Resolver<C, A>,
    scrobbler: Arc<P>,
    store: Arc<S>,
    pages: Arc<dyn PageDirectory>,
    throttle: Throttle,
    retry: Option<DeferredRetry<PlaybackEvent>>,
    default_progress: f64,
    events: SharedEventLog,
}

impl<C, A, P, S> Dispatcher<C, A, P, S>
where
    C: CatalogService,
    A: ArtworkService,
    P: ScrobbleService,
    S: StateStore,
{
    pub fn new(
        extractor: Arc<SignalExtractor>,
        resolver: Resolver<C, A>,
        scrobbler: Arc<P>,
        store: Arc<S>,
        pages: Arc<dyn PageDirectory>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            extractor,
            resolver,
            scrobbler,
            store,
            pages,
            throttle: Throttle::new(settings.throttle_window),
            retry: None,
            default_progress: settings.default_progress,
            events: debug_log::shared_event_log(),
        }
    }

    /// Re-deliver title-less events once through `retry`.
    pub fn with_retry(mut self, retry: DeferredRetry<PlaybackEvent>) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_event_log(mut self, events: SharedEventLog) -> Self {
        self.events = events;
        self
    }

    pub fn event_log(&self) -> &SharedEventLog {
        &self.events
    }

    pub fn extractor(&self) -> &Arc<SignalExtractor> {
        &self.extractor
    }

    pub fn resolver(&self) -> &Resolver<C, A> {
        &self.resolver
    }

    #[tracing::instrument(
        skip(self, event),
        fields(owner = %event.frame.owner, status = ?event.status, attempt = event.attempt)
    )]
    pub async fn handle(&self, event: PlaybackEvent) -> DispatchOutcome {
        let owner = event.frame.owner;
        let page = self.pages.page(owner);
        let url = match &page {
            Some(page) => page.tab_url().await,
            None => None,
        };

        let mut year = event.year;
        let event_title = event
            .trusted_title()
            .filter(|t| !self.extractor.is_generic(url.as_deref(), t))
            .map(|t| t.trim().to_string());

        let raw_title = match (event_title, page.as_deref()) {
            (Some(title), _) => Some(title),
            (None, Some(page)) => {
                if event.trigger == PlaybackTrigger::Attach
                    && event.attempt == 0
                    && self.extractor.waits_for_player(url.as_deref())
                {
                    self.extractor.wait_for_player(page).await;
                }
                self.extractor.extract(owner, page).await.map(|guess| {
                    year = year.or(guess.year);
                    self.log(DebugEvent::Extracted {
                        owner,
                        title: guess.title.clone(),
                        source: guess.source.to_string(),
                    });
                    guess.title
                })
            }
            (None, None) => None,
        };

        let Some(raw_title) = raw_title else {
            self.publish(NowPlayingRecord::parse_error(None)).await;
            let retry_scheduled = self.schedule_retry(&event, page.is_some());
            self.log(DebugEvent::NoSignal {
                owner,
                attempt: event.attempt,
            });
            return DispatchOutcome::NoSignal { retry_scheduled };
        };

        let guess = match reelsync_parse::parse(&raw_title) {
            Ok(guess) => guess,
            Err(e) => {
                tracing::debug!(raw = %raw_title, error = %e, "Unparseable title");
                self.publish(NowPlayingRecord::parse_error(Some(raw_title))).await;
                return DispatchOutcome::ParseFailed;
            }
        };
        self.log(DebugEvent::Parsed {
            raw_title: raw_title.clone(),
            title: guess.title.clone(),
            season: guess.season,
            episode: guess.episode,
        });

        let correction = corrections::lookup(&*self.store, &guess.title, &raw_title)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Could not read corrections");
                None
            });

        let resolution = match self.resolver.resolve(&guess, correction, year).await {
            Ok(Some(resolution)) => resolution,
            Ok(None) => {
                self.log(DebugEvent::Unresolved {
                    query: guess.title.clone(),
                });
                self.publish(NowPlayingRecord::not_found(guess)).await;
                return DispatchOutcome::NotFound;
            }
            Err(CoreError::Configuration(message)) => return self.misconfigured(message),
            Err(e) => {
                tracing::warn!(error = %e, "Resolution failed");
                self.publish(NowPlayingRecord::not_found(guess)).await;
                return DispatchOutcome::NotFound;
            }
        };
        self.log(DebugEvent::Resolved {
            query: guess.title.clone(),
            tier: resolution.tier,
            catalog_title: resolution.item.title.clone(),
        });

        let matched = self.resolver.enrich(&resolution.item, &guess).await;
        let progress = if event.progress > 0.0 {
            event.progress
        } else {
            self.default_progress
        };
        let action = scrobble_action(event.status, progress);

        self.publish(NowPlayingRecord {
            status: event.status.into(),
            title: Some(guess.title.clone()),
            guess: Some(guess.clone()),
            catalog: Some(matched),
            action: Some(action),
            progress: Some(progress),
            updated_at: chrono::Utc::now(),
        })
        .await;

        let Some(target) = scrobble_target(&resolution.item, &guess) else {
            tracing::warn!(
                catalog_kind = %resolution.item.kind,
                guess = %guess,
                "Resolved item cannot be scrobbled for this guess"
            );
            return DispatchOutcome::KindMismatch;
        };

        if !self.throttle.admit(&guess.title, action) {
            self.log(DebugEvent::Throttled {
                title: guess.title.clone(),
                action,
            });
            return DispatchOutcome::Throttled { action };
        }

        match self.scrobbler.scrobble(action, target, progress).await {
            Ok(response) => {
                tracing::info!(%action, title = %guess, progress, %response, "Scrobble sent");
            }
            Err(e) if e.is_missing_credentials() => return self.misconfigured(e.to_string()),
            Err(e) => {
                tracing::warn!(%action, title = %guess, error = %e, "Scrobble failed");
                self.log(DebugEvent::Error {
                    source: "scrobble".into(),
                    message: e.to_string(),
                });
            }
        }
        self.log(DebugEvent::Emitted {
            title: guess.title.clone(),
            action,
            progress,
        });

        if let Some(page) = &page {
            page.show_toast(&format!("Identified: {}", resolution.item.title));
        }

        DispatchOutcome::Emitted {
            action,
            title: resolution.item.title,
        }
    }

    fn schedule_retry(&self, event: &PlaybackEvent, has_page: bool) -> bool {
        match &self.retry {
            Some(retry) if event.attempt == 0 && has_page => {
                tracing::debug!(delay = ?retry.delay(), "Title still generic, scheduling retry");
                retry.schedule(event.retry());
                true
            }
            _ => false,
        }
    }

    fn misconfigured(&self, message: String) -> DispatchOutcome {
        tracing::error!(%message, "Scrobbling is not configured");
        self.log(DebugEvent::Error {
            source: "configuration".into(),
            message: message.clone(),
        });
        DispatchOutcome::Misconfigured { message }
    }

    async fn publish(&self, record: NowPlayingRecord) {
        if let Err(e) = set_json(&*self.store, keys::NOW_PLAYING, &record).await {
            tracing::warn!(error = %e, "Could not write now-playing record");
        }
    }

    fn log(&self, event: DebugEvent) {
        debug_log::record(&self.events, event);
    }
}

/// The scrobble target for a resolved item, or `None` when a show was
/// resolved for a guess without an episode number.
pub fn scrobble_target(item: &CatalogItem, guess: &ParsedTitle) -> Option<ScrobbleTarget> {
    match item.kind {
        MediaKind::Show => Some(ScrobbleTarget::Episode {
            show: item.ids.trakt,
            season: guess.season,
            number: guess.episode?,
        }),
        MediaKind::Movie => Some(ScrobbleTarget::Movie {
            movie: item.ids.trakt,
        }),
    }
}
