mod db;
pub mod pages;

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};

use reelsync_api::tmdb::TmdbClient;
use reelsync_api::trakt::auth::open_verification_url;
use reelsync_api::trakt::{DeviceAuth, DeviceCode, TokenResponse, TraktClient, TraktError};
use reelsync_api::{CatalogItem, Credentials, SharedCredentials};
use reelsync_core::config::AppConfig;
use reelsync_core::corrections;
use reelsync_core::debug_log::{EventEntry, SharedEventLog};
use reelsync_core::dispatcher::{DispatchOutcome, Dispatcher, DispatcherSettings};
use reelsync_core::error::CoreError;
use reelsync_core::models::{CatalogMatch, NowPlayingRecord, PlaybackEvent};
use reelsync_core::resolver::{ResolveTier, Resolver};
use reelsync_core::store::{self, keys, ApiKeys, StateStore};
use reelsync_detect::{
    DeferredRetry, FrameId, PageProbe, SignalExtractor, SiteDatabase, SiteMetadataClient,
};
use reelsync_parse::ParsedTitle;

pub use db::DbHandle;
pub use pages::{PageRegistry, PageReport, ReportedPage, Toast};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("authorization expired")]
    AuthExpired,
    #[error("{0}")]
    Parse(String),
}

impl From<CoreError> for RuntimeError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Configuration(msg) => Self::NotConfigured(msg),
            CoreError::AuthExpired => Self::AuthExpired,
            CoreError::Parse(msg) => Self::Parse(msg),
            CoreError::Config(msg) => Self::Config(msg),
            CoreError::TransientLookup(msg) | CoreError::Correction(msg) => Self::Api(msg),
            e @ (CoreError::Storage(_) | CoreError::Serde(_) | CoreError::Io(_)) => {
                Self::Database(e.to_string())
            }
        }
    }
}

impl From<TraktError> for RuntimeError {
    fn from(e: TraktError) -> Self {
        match e {
            TraktError::AuthExpired => Self::AuthExpired,
            TraktError::MissingCredential(name) => Self::NotConfigured(name.to_string()),
            e => Self::Api(e.to_string()),
        }
    }
}

pub type AppDispatcher = Dispatcher<TraktClient, TmdbClient, TraktClient, DbHandle>;

/// A title resolved outside the event pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTitle {
    pub guess: ParsedTitle,
    pub tier: ResolveTier,
    pub catalog: CatalogMatch,
}

/// Owns the store, clients and dispatcher and routes host input to them.
pub struct Runtime {
    config: AppConfig,
    db: DbHandle,
    credentials: SharedCredentials,
    trakt: Arc<TraktClient>,
    pages: Arc<PageRegistry>,
    dispatcher: Arc<AppDispatcher>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    inbox: Mutex<Option<mpsc::UnboundedReceiver<PlaybackEvent>>>,
}

impl Runtime {
    /// Load config from the user's config dir and open the on-disk store.
    pub fn new() -> Result<Self, RuntimeError> {
        let config = AppConfig::load().map_err(|e| RuntimeError::Config(e.to_string()))?;
        let db_path = config
            .ensure_db_path()
            .map_err(|e| RuntimeError::Config(e.to_string()))?;
        let db = DbHandle::open(&db_path).map_err(|e| RuntimeError::Database(e.to_string()))?;
        Self::with_store(config, db)
    }

    pub fn with_store(config: AppConfig, db: DbHandle) -> Result<Self, RuntimeError> {
        let credentials: SharedCredentials = Default::default();
        let trakt = Arc::new(TraktClient::new(
            config.services.trakt_base_url.clone(),
            credentials.clone(),
        ));
        let tmdb = Arc::new(TmdbClient::new(
            config.services.tmdb_base_url.clone(),
            credentials.clone(),
        ));

        let extractor = Arc::new(SignalExtractor::with_default_strategies(
            Arc::new(load_sites(config.extraction.sites_file.as_deref())?),
            config.extraction.generic_titles.clone(),
            config.general.player_wait(),
            SiteMetadataClient::new(config.services.site_session_cookie.clone()),
        ));
        let resolver = Resolver::new(trakt.clone(), tmdb, config.resolver.accept_unvalidated);

        let (events, inbox) = mpsc::unbounded_channel();
        let pages = Arc::new(PageRegistry::new());
        let dispatcher = Dispatcher::new(
            extractor,
            resolver,
            trakt.clone(),
            Arc::new(db.clone()),
            pages.clone(),
            DispatcherSettings::from_config(&config),
        )
        .with_retry(DeferredRetry::new(
            config.general.retry_delay(),
            events.clone(),
        ));

        Ok(Self {
            config,
            db,
            credentials,
            trakt,
            pages,
            dispatcher: Arc::new(dispatcher),
            events,
            inbox: Mutex::new(Some(inbox)),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn credentials(&self) -> Credentials {
        reelsync_api::traits::read_credentials(&self.credentials)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<store::StoreChange> {
        self.db.subscribe()
    }

    pub fn event_log(&self) -> &SharedEventLog {
        self.dispatcher.event_log()
    }

    pub fn event_snapshot(&self) -> Vec<EventEntry> {
        self.event_log()
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot()
    }

    // --- Credentials ---

    /// Reload client credentials from the store.
    pub async fn sync_credentials(&self) -> Result<(), RuntimeError> {
        let fresh = store::load_credentials(&self.db).await?;
        store_credentials(&self.credentials, fresh);
        Ok(())
    }

    /// Load credentials now and reload them whenever the keys or the token
    /// change in the store.
    pub async fn spawn_credential_sync(&self) -> Result<JoinHandle<()>, RuntimeError> {
        let mut changes = self.db.subscribe();
        self.sync_credentials().await?;

        let db = self.db.clone();
        let shared = self.credentials.clone();
        Ok(tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change)
                        if change.key == keys::API_KEYS || change.key == keys::ACCESS_TOKEN => {}
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Store change feed lagged, reloading credentials");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                match store::load_credentials(&db).await {
                    Ok(fresh) => {
                        store_credentials(&shared, fresh);
                        tracing::debug!("Credentials reloaded");
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to reload credentials"),
                }
            }
        }))
    }

    /// Merge the given keys over the stored ones. Unset fields keep their
    /// stored value.
    pub async fn update_api_keys(&self, update: ApiKeys) -> Result<ApiKeys, RuntimeError> {
        let mut current = store::api_keys(&self.db).await?;
        if update.client_id.is_some() {
            current.client_id = update.client_id;
        }
        if update.client_secret.is_some() {
            current.client_secret = update.client_secret;
        }
        if update.tmdb_api_key.is_some() {
            current.tmdb_api_key = update.tmdb_api_key;
        }
        store::set_json(&self.db, keys::API_KEYS, &current).await?;
        Ok(current)
    }

    // --- Device authorization ---

    /// Run the device flow: request a code, hand it to `on_code`, open the
    /// verification page and poll until approved. The token is stored
    /// before this returns.
    pub async fn authorize<F>(&self, on_code: F) -> Result<TokenResponse, RuntimeError>
    where
        F: FnOnce(&DeviceCode),
    {
        let keys = store::api_keys(&self.db).await?;
        let client_id = keys
            .client_id
            .ok_or_else(|| RuntimeError::NotConfigured("Trakt client_id required".into()))?;
        let client_secret = keys
            .client_secret
            .ok_or_else(|| RuntimeError::NotConfigured("Trakt client_secret required".into()))?;

        let auth = DeviceAuth::new(
            self.config.services.trakt_base_url.clone(),
            client_id,
            client_secret,
        );
        let code = auth.request_code().await?;
        on_code(&code);
        if let Err(e) = open_verification_url(&code.verification_url) {
            tracing::warn!(error = %e, "Could not open the verification page");
        }

        let token = auth.wait_for_token(&code).await?;
        store::set_json(&self.db, keys::ACCESS_TOKEN, &token).await?;
        self.sync_credentials().await?;
        tracing::info!("Trakt authorization complete");
        Ok(token)
    }

    /// Forget the access token and the last now-playing record.
    pub async fn logout(&self) -> Result<(), RuntimeError> {
        self.db.remove(keys::ACCESS_TOKEN).await?;
        self.db.remove(keys::NOW_PLAYING).await?;
        self.sync_credentials().await
    }

    // --- Corrections ---

    pub async fn set_correction(
        &self,
        original_title: &str,
        input: &str,
    ) -> Result<CatalogItem, RuntimeError> {
        Ok(corrections::set_correction(&self.db, &*self.trakt, original_title, input).await?)
    }

    pub async fn remove_correction(&self, title: &str) -> Result<bool, RuntimeError> {
        Ok(corrections::remove_correction(&self.db, title).await?)
    }

    pub async fn now_playing(&self) -> Result<Option<NowPlayingRecord>, RuntimeError> {
        Ok(store::now_playing(&self.db).await?)
    }

    /// Parse and resolve a raw title the way the pipeline would, without
    /// scrobbling or touching now-playing.
    pub async fn resolve_title(
        &self,
        raw_title: &str,
        year: Option<u16>,
    ) -> Result<Option<ResolvedTitle>, RuntimeError> {
        let guess = reelsync_parse::parse(raw_title).map_err(|e| RuntimeError::Parse(e.to_string()))?;
        let correction = corrections::lookup(&self.db, &guess.title, raw_title.trim()).await?;
        let resolver = self.dispatcher.resolver();
        let Some(resolution) = resolver.resolve(&guess, correction, year).await? else {
            return Ok(None);
        };
        let catalog = resolver.enrich(&resolution.item, &guess).await;
        Ok(Some(ResolvedTitle {
            guess,
            tier: resolution.tier,
            catalog,
        }))
    }

    // --- Pages ---

    pub fn register_page(&self, owner: FrameId, page: Arc<dyn PageProbe>) {
        self.pages.register(owner, page);
    }

    /// The page navigated: cached titles for it are stale.
    pub fn page_navigated(&self, owner: FrameId) {
        let purged = self.dispatcher.extractor().cache().purge_owner(owner);
        tracing::debug!(%owner, purged, "Page navigated");
    }

    pub fn page_closed(&self, owner: FrameId) {
        self.pages.unregister(owner);
        let purged = self.dispatcher.extractor().cache().purge_owner(owner);
        tracing::debug!(%owner, purged, "Page closed");
    }

    // --- Events ---

    /// Queue a playback event for the event loop.
    pub fn submit(&self, event: PlaybackEvent) {
        if self.events.send(event).is_err() {
            tracing::warn!("Event loop is gone, dropping playback event");
        }
    }

    /// Handle one event inline.
    pub async fn dispatch(&self, event: PlaybackEvent) -> DispatchOutcome {
        self.dispatcher.handle(event).await
    }

    /// Drain submitted events until `shutdown` resolves, one task per event.
    /// Events already queued at shutdown are still handled, and in-flight
    /// handlers are awaited before returning. Each outcome is passed to
    /// `on_outcome`.
    pub async fn run<F>(
        &self,
        shutdown: impl Future<Output = ()>,
        on_outcome: F,
    ) -> Result<(), RuntimeError>
    where
        F: Fn(DispatchOutcome) + Send + Sync + 'static,
    {
        let mut inbox = self
            .inbox
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| RuntimeError::Config("event loop already running".into()))?;
        let on_outcome = Arc::new(on_outcome);
        let mut in_flight = JoinSet::new();

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                event = inbox.recv() => {
                    let Some(event) = event else { break };
                    self.spawn_handler(&mut in_flight, event, &on_outcome);
                }
                _ = &mut shutdown => break,
                Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = done {
                        tracing::error!(error = %e, "Event handler panicked");
                    }
                }
            }
        }

        // Retries scheduled from here on are dropped.
        inbox.close();
        let mut drained = 0usize;
        while let Some(event) = inbox.recv().await {
            self.spawn_handler(&mut in_flight, event, &on_outcome);
            drained += 1;
        }
        if drained > 0 {
            tracing::debug!(drained, "Handling events queued before shutdown");
        }

        while let Some(done) = in_flight.join_next().await {
            if let Err(e) = done {
                tracing::error!(error = %e, "Event handler panicked");
            }
        }
        tracing::info!("Event loop stopped");
        Ok(())
    }

    fn spawn_handler<F>(
        &self,
        in_flight: &mut JoinSet<()>,
        event: PlaybackEvent,
        on_outcome: &Arc<F>,
    ) where
        F: Fn(DispatchOutcome) + Send + Sync + 'static,
    {
        let dispatcher = self.dispatcher.clone();
        let on_outcome = on_outcome.clone();
        in_flight.spawn(async move {
            on_outcome(dispatcher.handle(event).await);
        });
    }
}

fn store_credentials(shared: &SharedCredentials, fresh: Credentials) {
    *shared.write().unwrap_or_else(|e| e.into_inner()) = fresh;
}

/// The embedded site database, with the user's site file merged over it.
fn load_sites(user_file: Option<&Path>) -> Result<SiteDatabase, RuntimeError> {
    let mut sites = SiteDatabase::embedded();
    if let Some(path) = user_file {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::Config(format!("{}: {e}", path.display())))?;
        let user = SiteDatabase::from_toml(&text)
            .map_err(|e| RuntimeError::Config(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), sites = user.len(), "Merged user site database");
        sites.merge_user(&user);
    }
    Ok(sites)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use reelsync_core::models::{NowPlayingStatus, PlaybackStatus};
    use reelsync_detect::structured::PageSnapshot;

    fn runtime() -> Runtime {
        Runtime::with_store(AppConfig::default(), DbHandle::open_memory().unwrap()).unwrap()
    }

    fn page(url: &str, tab_title: &str) -> Arc<ReportedPage> {
        Arc::new(ReportedPage::new(
            FrameId(1),
            PageReport {
                url: Some(url.into()),
                tab_title: Some(tab_title.into()),
                ..Default::default()
            },
        ))
    }

    #[tokio::test]
    async fn test_credential_sync_follows_store() {
        let rt = runtime();
        let _sync = rt.spawn_credential_sync().await.unwrap();
        assert_eq!(rt.credentials(), Credentials::default());

        rt.update_api_keys(ApiKeys {
            client_id: Some("cid".into()),
            ..Default::default()
        })
        .await
        .unwrap();
        rt.db
            .set(keys::ACCESS_TOKEN, json!({ "access_token": "tok" }))
            .await
            .unwrap();

        // The sync task runs on the same runtime; give it a turn.
        for _ in 0..50 {
            if rt.credentials().access_token.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let creds = rt.credentials();
        assert_eq!(creds.client_id.as_deref(), Some("cid"));
        assert_eq!(creds.access_token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_update_api_keys_merges() {
        let rt = runtime();
        rt.update_api_keys(ApiKeys {
            client_id: Some("cid".into()),
            client_secret: Some("secret".into()),
            ..Default::default()
        })
        .await
        .unwrap();
        let merged = rt
            .update_api_keys(ApiKeys {
                tmdb_api_key: Some("tmdb".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(merged.client_id.as_deref(), Some("cid"));
        assert_eq!(merged.client_secret.as_deref(), Some("secret"));
        assert_eq!(merged.tmdb_api_key.as_deref(), Some("tmdb"));
    }

    #[tokio::test]
    async fn test_authorize_requires_keys() {
        let rt = runtime();
        let err = rt.authorize(|_| {}).await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_logout_clears_token_and_now_playing() {
        let rt = runtime();
        rt.db
            .set(keys::ACCESS_TOKEN, json!({ "access_token": "tok" }))
            .await
            .unwrap();
        store::set_json(&rt.db, keys::NOW_PLAYING, &NowPlayingRecord::parse_error(None))
            .await
            .unwrap();
        rt.sync_credentials().await.unwrap();
        assert!(rt.credentials().access_token.is_some());

        rt.logout().await.unwrap();
        assert_eq!(rt.db.get(keys::ACCESS_TOKEN).await.unwrap(), None);
        assert!(rt.now_playing().await.unwrap().is_none());
        assert!(rt.credentials().access_token.is_none());
    }

    #[tokio::test]
    async fn test_missing_client_id_is_misconfigured() {
        let rt = runtime();
        let mut event = PlaybackEvent::new(PlaybackStatus::Playing, FrameId(1));
        event.title = Some("Foo - Episode 8".into());
        let outcome = rt.dispatch(event).await;
        assert!(matches!(outcome, DispatchOutcome::Misconfigured { .. }));
    }

    #[tokio::test]
    async fn test_event_loop_retries_once_then_stops() {
        let mut config = AppConfig::default();
        config.general.retry_delay_secs = 0;
        let rt = Runtime::with_store(config, DbHandle::open_memory().unwrap()).unwrap();
        rt.register_page(
            FrameId(1),
            page("https://www.crunchyroll.com/watch/G1/x", "Crunchyroll"),
        );
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let recorded = outcomes.clone();
        let seen = outcomes.clone();

        rt.submit(PlaybackEvent::new(PlaybackStatus::Playing, FrameId(1)));
        let shutdown = async move {
            while seen.lock().unwrap().len() < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(
            Duration::from_secs(5),
            rt.run(shutdown, move |outcome| {
                recorded.lock().unwrap().push(outcome);
            }),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(
            *outcomes.lock().unwrap(),
            vec![
                DispatchOutcome::NoSignal {
                    retry_scheduled: true
                },
                DispatchOutcome::NoSignal {
                    retry_scheduled: false
                },
            ]
        );
        let record = rt.now_playing().await.unwrap().unwrap();
        assert_eq!(record.status, NowPlayingStatus::ParseError);
    }

    #[tokio::test]
    async fn test_injected_script_supplies_title() {
        let rt = runtime();
        let (tx, mut requests) = mpsc::unbounded_channel();
        let page = Arc::new(
            ReportedPage::new(
                FrameId(1),
                PageReport {
                    url: Some("https://www.crunchyroll.com/watch/G1/x".into()),
                    tab_title: Some("Crunchyroll".into()),
                    ..Default::default()
                },
            )
            .with_probe_requests(tx),
        );
        rt.register_page(FrameId(1), page.clone());

        let host = {
            let page = page.clone();
            tokio::spawn(async move {
                let owner = requests.recv().await.unwrap();
                assert_eq!(owner, FrameId(1));
                page.probe_reply(PageSnapshot {
                    document_title: Some("Arcane - Episode 3".into()),
                    ..Default::default()
                });
            })
        };

        let guess = rt
            .dispatcher
            .extractor()
            .extract(FrameId(1), &*page)
            .await
            .unwrap();
        assert_eq!(guess.title, "Arcane - Episode 3");
        assert_eq!(guess.source, "injected_probe");
        host.await.unwrap();
    }

    /// Serves `body` as JSON to every request and counts the requests.
    async fn metadata_server(body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let counter = counter.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let mut read = 0;
                    while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf[read..]).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => read += n,
                        }
                    }
                    counter.fetch_add(1, Ordering::SeqCst);
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        (format!("http://{addr}"), hits)
    }

    #[tokio::test]
    async fn test_navigation_forgets_site_titles() {
        let (base, hits) = metadata_server(
            r#"{"video":{"type":"show","title":"Arcane","seasons":[{"seq":2,"episodes":[{"id":208,"seq":8}]}]}}"#,
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let sites = dir.path().join("sites.toml");
        std::fs::write(
            &sites,
            format!(
                r#"
[[site]]
name = "Local Stream"
url_patterns = ['^https://stream\.test/']
generic_titles = ["Local Stream"]
episode_id_pattern = '/watch/(\d+)'
metadata_url = "{base}/metadata/{{id}}"
"#
            ),
        )
        .unwrap();
        let mut config = AppConfig::default();
        config.extraction.sites_file = Some(sites);
        let rt = Runtime::with_store(config, DbHandle::open_memory().unwrap()).unwrap();

        let page = page("https://stream.test/watch/208", "Local Stream");
        rt.register_page(FrameId(1), page.clone());
        let extractor = rt.dispatcher.extractor();

        for _ in 0..2 {
            let guess = extractor.extract(FrameId(1), &*page).await.unwrap();
            assert_eq!(guess.title, "Arcane - Season 2 Episode 8");
            assert_eq!(guess.source, "site_metadata");
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        rt.page_navigated(FrameId(1));
        extractor.extract(FrameId(1), &*page).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        rt.page_closed(FrameId(1));
        extractor.extract(FrameId(1), &*page).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_queued_events_survive_shutdown() {
        for _ in 0..20 {
            let rt = runtime();
            for _ in 0..2 {
                let mut event = PlaybackEvent::new(PlaybackStatus::Playing, FrameId(1));
                event.title = Some("Foo - Episode 8".into());
                rt.submit(event);
            }
            let outcomes = Arc::new(Mutex::new(Vec::new()));
            let recorded = outcomes.clone();
            rt.run(async {}, move |outcome| recorded.lock().unwrap().push(outcome))
                .await
                .unwrap();
            assert_eq!(outcomes.lock().unwrap().len(), 2);
        }
    }

    #[tokio::test]
    async fn test_run_only_once() {
        let rt = runtime();
        rt.run(async {}, |_| {}).await.unwrap();
        assert!(rt.run(async {}, |_| {}).await.is_err());
    }

    #[test]
    fn test_user_sites_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sites.toml");
        std::fs::write(
            &path,
            r#"
[[site]]
name = "Example Stream"
url_patterns = ['^https://stream\.example/']
"#,
        )
        .unwrap();
        let sites = load_sites(Some(&path)).unwrap();
        assert_eq!(sites.len(), SiteDatabase::embedded().len() + 1);
        assert!(sites.match_url("https://stream.example/watch/1").is_some());
    }
}
