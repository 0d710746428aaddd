use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use reelsync_detect::structured::{self, PageSnapshot};
use reelsync_detect::{FrameId, PageDirectory, PageProbe, PageTitle, ProbeError};

/// How long an injected probe waits for the host's reply.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Live pages by frame owner.
#[derive(Default)]
pub struct PageRegistry {
    pages: RwLock<HashMap<FrameId, Arc<dyn PageProbe>>>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the page for `owner`.
    pub fn register(&self, owner: FrameId, page: Arc<dyn PageProbe>) {
        self.pages
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(owner, page);
    }

    pub fn unregister(&self, owner: FrameId) -> bool {
        self.pages
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&owner)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.pages.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PageDirectory for PageRegistry {
    fn page(&self, owner: FrameId) -> Option<Arc<dyn PageProbe>> {
        self.pages
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&owner)
            .cloned()
    }
}

/// What a host last reported about a page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageReport {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tab_title: Option<String>,
    /// DOM signals captured by the in-page responder.
    #[serde(default)]
    pub snapshot: Option<PageSnapshot>,
    /// DOM signals captured by a one-shot injected script, when the host
    /// already ran one.
    #[serde(default)]
    pub probe: Option<PageSnapshot>,
    /// Episode id read from the page's application state.
    #[serde(default)]
    pub episode_id: Option<String>,
    #[serde(default)]
    pub player_ready: bool,
}

/// A notice for the host to show in a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub owner: FrameId,
    pub message: String,
}

/// A page whose state is pushed by the host as [`PageReport`]s.
///
/// Injected probes are requested from the host over `probe_requests` and
/// answered through [`ReportedPage::probe_reply`].
pub struct ReportedPage {
    owner: FrameId,
    report: RwLock<PageReport>,
    ready: watch::Sender<bool>,
    probe: watch::Sender<Option<PageSnapshot>>,
    probe_requests: Option<mpsc::UnboundedSender<FrameId>>,
    toasts: Option<mpsc::UnboundedSender<Toast>>,
}

impl ReportedPage {
    pub fn new(owner: FrameId, report: PageReport) -> Self {
        let (ready, _) = watch::channel(report.player_ready);
        let (probe, _) = watch::channel(report.probe.clone());
        Self {
            owner,
            report: RwLock::new(report),
            ready,
            probe,
            probe_requests: None,
            toasts: None,
        }
    }

    pub fn with_toasts(mut self, toasts: mpsc::UnboundedSender<Toast>) -> Self {
        self.toasts = Some(toasts);
        self
    }

    pub fn with_probe_requests(mut self, requests: mpsc::UnboundedSender<FrameId>) -> Self {
        self.probe_requests = Some(requests);
        self
    }

    /// Replace the stored report. A report with `player_ready` wakes any
    /// pending player wait. The probe snapshot is replaced too, so a
    /// navigated page never answers with the previous page's probe.
    pub fn update(&self, report: PageReport) {
        let ready = report.player_ready;
        let probe = report.probe.clone();
        *self.report.write().unwrap_or_else(|e| e.into_inner()) = report;
        self.ready.send_replace(ready);
        self.probe.send_replace(probe);
    }

    /// The host's answer to a probe request.
    pub fn probe_reply(&self, snapshot: PageSnapshot) {
        self.probe.send_replace(Some(snapshot));
    }

    fn read<T>(&self, f: impl FnOnce(&PageReport) -> T) -> T {
        let report = self.report.read().unwrap_or_else(|e| e.into_inner());
        f(&*report)
    }
}

impl PageProbe for ReportedPage {
    fn responder_title(&self) -> BoxFuture<'_, Result<Option<PageTitle>, ProbeError>> {
        let result = self.read(|r| match &r.snapshot {
            Some(snapshot) => Ok(structured::derive_title(snapshot)),
            None => Err(ProbeError::Unavailable("no page snapshot reported".into())),
        });
        async move { result }.boxed()
    }

    fn inject_probe(&self) -> BoxFuture<'_, Result<Option<PageTitle>, ProbeError>> {
        let mut rx = self.probe.subscribe();
        async move {
            let reported = rx.borrow_and_update().clone();
            if let Some(snapshot) = reported {
                return Ok(structured::derive_title(&snapshot));
            }
            let Some(requests) = &self.probe_requests else {
                return Err(ProbeError::Unavailable("host cannot inject probes".into()));
            };
            if requests.send(self.owner).is_err() {
                return Err(ProbeError::Unavailable("host is gone".into()));
            }

            match tokio::time::timeout(PROBE_TIMEOUT, rx.wait_for(Option::is_some)).await {
                Ok(Ok(snapshot)) => Ok((*snapshot).as_ref().and_then(structured::derive_title)),
                Ok(Err(_)) => Err(ProbeError::Failed("page closed".into())),
                Err(_) => Err(ProbeError::Failed("no probe reply".into())),
            }
        }
        .boxed()
    }

    fn tab_title(&self) -> BoxFuture<'_, Option<String>> {
        let title = self.read(|r| r.tab_title.clone());
        async move { title }.boxed()
    }

    fn tab_url(&self) -> BoxFuture<'_, Option<String>> {
        let url = self.read(|r| r.url.clone());
        async move { url }.boxed()
    }

    fn app_state_episode_id(&self) -> BoxFuture<'_, Option<String>> {
        let id = self.read(|r| r.episode_id.clone());
        async move { id }.boxed()
    }

    fn player_ready(&self) -> BoxFuture<'_, ()> {
        let mut rx = self.ready.subscribe();
        async move {
            // A dropped sender means the page is gone; stop waiting.
            let _ = rx.wait_for(|ready| *ready).await;
        }
        .boxed()
    }

    fn show_toast(&self, message: &str) {
        if let Some(tx) = &self.toasts {
            let _ = tx.send(Toast {
                owner: self.owner,
                message: message.to_string(),
            });
        }
    }
}
