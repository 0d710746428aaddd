//! JSON-lines host protocol for `reelsync run`.
//!
//! One message per stdin line:
//!
//! ```text
//! {"type":"page","owner":7,"url":"https://...","tab_title":"...","snapshot":{...}}
//! {"type":"navigated","owner":7,"url":"https://..."}
//! {"type":"closed","owner":7}
//! {"type":"playback","status":"playing","progress":12.5,"frame":{"owner":7}}
//! {"type":"probe","owner":7,"snapshot":{...}}
//! ```
//!
//! Outcomes, toasts, probe requests and now-playing changes are written to
//! stdout, one JSON object per line. A `probe_request` asks the host to run
//! its one-shot page script and answer with a `probe` message.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, oneshot};

use reelsync_core::dispatcher::DispatchOutcome;
use reelsync_core::models::PlaybackEvent;
use reelsync_core::store::{keys, StoreChange};
use reelsync_detect::structured::PageSnapshot;
use reelsync_detect::FrameId;
use reelsync_runtime::{PageReport, ReportedPage, Runtime, RuntimeError, Toast};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// A page appeared or reported fresh state.
    Page {
        owner: FrameId,
        #[serde(flatten)]
        report: PageReport,
    },
    /// The page moved to another URL in the same tab.
    Navigated {
        owner: FrameId,
        #[serde(flatten)]
        report: PageReport,
    },
    Closed {
        owner: FrameId,
    },
    Playback(PlaybackEvent),
    /// Reply to a `probe_request`.
    Probe {
        owner: FrameId,
        snapshot: PageSnapshot,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostOutput {
    Outcome(DispatchOutcome),
    Toast(Toast),
    ProbeRequest { owner: FrameId },
    NowPlaying { record: Option<Value> },
}

/// Applies host messages to the runtime.
pub struct Host<'a> {
    runtime: &'a Runtime,
    pages: HashMap<FrameId, Arc<ReportedPage>>,
    toasts: mpsc::UnboundedSender<Toast>,
    probes: mpsc::UnboundedSender<FrameId>,
}

impl<'a> Host<'a> {
    pub fn new(
        runtime: &'a Runtime,
        toasts: mpsc::UnboundedSender<Toast>,
        probes: mpsc::UnboundedSender<FrameId>,
    ) -> Self {
        Self {
            runtime,
            pages: HashMap::new(),
            toasts,
            probes,
        }
    }

    pub fn handle_line(&mut self, line: &str) -> Result<(), serde_json::Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        self.handle(serde_json::from_str(line)?);
        Ok(())
    }

    pub fn handle(&mut self, message: HostMessage) {
        match message {
            HostMessage::Page { owner, report } => self.report(owner, report),
            HostMessage::Navigated { owner, report } => {
                self.runtime.page_navigated(owner);
                self.report(owner, report);
            }
            HostMessage::Closed { owner } => {
                self.pages.remove(&owner);
                self.runtime.page_closed(owner);
            }
            HostMessage::Playback(event) => self.runtime.submit(event),
            HostMessage::Probe { owner, snapshot } => match self.pages.get(&owner) {
                Some(page) => page.probe_reply(snapshot),
                None => tracing::debug!(%owner, "Probe reply for unknown page"),
            },
        }
    }

    fn report(&mut self, owner: FrameId, report: PageReport) {
        if let Some(page) = self.pages.get(&owner) {
            page.update(report);
            return;
        }
        let page = Arc::new(
            ReportedPage::new(owner, report)
                .with_toasts(self.toasts.clone())
                .with_probe_requests(self.probes.clone()),
        );
        self.runtime.register_page(owner, page.clone());
        self.pages.insert(owner, page);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Serve the host protocol on stdin/stdout until stdin closes.
pub async fn serve(runtime: &Runtime) -> Result<(), RuntimeError> {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (toast_tx, toast_rx) = mpsc::unbounded_channel();
    let (probe_tx, probe_rx) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = oneshot::channel::<()>();
    let writer = tokio::spawn(write_outputs(
        out_rx,
        toast_rx,
        probe_rx,
        runtime.subscribe(),
    ));

    let reader = async move {
        let mut host = Host::new(runtime, toast_tx, probe_tx);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Err(e) = host.handle_line(&line) {
                        tracing::warn!(error = %e, "Ignoring malformed host message");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read from stdin");
                    break;
                }
            }
        }
        tracing::debug!(pages = host.page_count(), "Host input closed");
        let _ = done_tx.send(());
    };

    let shutdown = async {
        let _ = done_rx.await;
    };
    let (_, result) = tokio::join!(
        reader,
        runtime.run(shutdown, move |outcome| {
            let _ = out_tx.send(HostOutput::Outcome(outcome));
        })
    );

    if let Err(e) = writer.await {
        tracing::error!(error = %e, "Output writer failed");
    }
    result
}

async fn write_outputs(
    mut outcomes: mpsc::UnboundedReceiver<HostOutput>,
    mut toasts: mpsc::UnboundedReceiver<Toast>,
    mut probes: mpsc::UnboundedReceiver<FrameId>,
    mut changes: broadcast::Receiver<StoreChange>,
) {
    let mut changes_open = true;
    loop {
        tokio::select! {
            output = outcomes.recv() => match output {
                Some(output) => emit(&output),
                None => break,
            },
            Some(toast) = toasts.recv() => emit(&HostOutput::Toast(toast)),
            Some(owner) = probes.recv() => emit(&HostOutput::ProbeRequest { owner }),
            change = changes.recv(), if changes_open => match change {
                Ok(change) if change.key == keys::NOW_PLAYING => {
                    emit(&HostOutput::NowPlaying { record: change.value });
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Dropped store changes");
                }
                Err(broadcast::error::RecvError::Closed) => changes_open = false,
            },
        }
    }
    while let Ok(toast) = toasts.try_recv() {
        emit(&HostOutput::Toast(toast));
    }
}

fn emit(output: &HostOutput) {
    match serde_json::to_string(output) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "Failed to encode host output"),
    }
}

#[cfg(test)]
mod tests {
    use reelsync_core::config::AppConfig;
    use reelsync_core::models::{PlaybackStatus, PlaybackTrigger};
    use reelsync_detect::{FrameKind, PageProbe};
    use reelsync_runtime::DbHandle;

    use super::*;

    #[test]
    fn test_parse_messages() {
        let msg: HostMessage = serde_json::from_str(
            r#"{"type":"page","owner":7,"url":"https://www.netflix.com/watch/1","tab_title":"Netflix"}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            HostMessage::Page { owner: FrameId(7), ref report }
                if report.tab_title.as_deref() == Some("Netflix")
        ));

        let msg: HostMessage = serde_json::from_str(
            r#"{"type":"playback","status":"paused","progress":40,"frame":{"owner":7,"kind":"embedded"},"trigger":"attach"}"#,
        )
        .unwrap();
        let HostMessage::Playback(event) = msg else {
            panic!("expected playback");
        };
        assert_eq!(event.status, PlaybackStatus::Paused);
        assert_eq!(event.frame.kind, FrameKind::Embedded);
        assert_eq!(event.trigger, PlaybackTrigger::Attach);
        assert_eq!(event.attempt, 0);
    }

    #[test]
    fn test_output_shape() {
        let json = serde_json::to_value(HostOutput::Outcome(DispatchOutcome::NoSignal {
            retry_scheduled: true,
        }))
        .unwrap();
        assert_eq!(json["type"], "outcome");
        assert_eq!(json["outcome"], "no_signal");
        assert_eq!(json["retry_scheduled"], true);

        let json = serde_json::to_value(HostOutput::ProbeRequest { owner: FrameId(7) }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "probe_request", "owner": 7 }));
    }

    #[tokio::test]
    async fn test_injection_reply_reaches_page() {
        let runtime =
            Runtime::with_store(AppConfig::default(), DbHandle::open_memory().unwrap()).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let (probe_tx, mut probe_rx) = mpsc::unbounded_channel();
        let mut host = Host::new(&runtime, tx, probe_tx);
        host.handle_line(r#"{"type":"page","owner":2,"url":"https://www.max.com/video/x","tab_title":"Max"}"#)
            .unwrap();
        let page = host.pages[&FrameId(2)].clone();

        let probe = tokio::spawn(async move { page.inject_probe().await });
        assert_eq!(probe_rx.recv().await, Some(FrameId(2)));
        host.handle_line(
            r#"{"type":"probe","owner":2,"snapshot":{"og_title":"Watch The Last of Us"}}"#,
        )
        .unwrap();

        let title = probe.await.unwrap().unwrap().unwrap();
        assert_eq!(title.title, "The Last of Us");
    }

    #[tokio::test]
    async fn test_page_lifecycle() {
        let runtime =
            Runtime::with_store(AppConfig::default(), DbHandle::open_memory().unwrap()).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let (probe_tx, _probe_rx) = mpsc::unbounded_channel();
        let mut host = Host::new(&runtime, tx, probe_tx);

        host.handle_line(r#"{"type":"page","owner":1,"url":"https://www.crunchyroll.com/watch/a"}"#)
            .unwrap();
        host.handle_line(r#"{"type":"navigated","owner":1,"url":"https://www.crunchyroll.com/watch/b"}"#)
            .unwrap();
        assert_eq!(host.page_count(), 1);

        host.handle_line("   ").unwrap();
        assert!(host.handle_line("{not json").is_err());

        host.handle_line(r#"{"type":"closed","owner":1}"#).unwrap();
        assert_eq!(host.page_count(), 0);
    }
}
