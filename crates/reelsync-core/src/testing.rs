//! In-memory service fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;

use reelsync_api::{
    ArtworkItem, ArtworkService, CatalogIds, CatalogItem, CatalogService, EpisodeDetails,
    MediaKind, ScrobbleAction, ScrobbleService, ScrobbleTarget, ServiceError,
};
use reelsync_detect::{FrameId, PageDirectory, PageProbe, PageTitle, ProbeError};

#[derive(Debug, thiserror::Error)]
pub enum FakeError {
    #[error("missing credential")]
    MissingCredential,
    #[error("service unavailable")]
    Down,
}

impl ServiceError for FakeError {
    fn is_missing_credentials(&self) -> bool {
        matches!(self, Self::MissingCredential)
    }
}

pub fn item(kind: MediaKind, title: &str, trakt: u64, year: Option<u32>) -> CatalogItem {
    CatalogItem {
        kind,
        title: title.into(),
        year,
        ids: CatalogIds {
            trakt,
            slug: Some(title.to_lowercase().replace(' ', "-")),
            ..Default::default()
        },
        overview: Some(format!("{title} overview")),
        rating: Some(8.04),
        genres: vec!["drama".into(), "action".into(), "fantasy".into(), "anime".into()],
        runtime: Some(40),
        certification: None,
        network: None,
        poster_url: None,
    }
}

#[derive(Clone, Default)]
pub struct FakeCatalog {
    searches: HashMap<String, Vec<CatalogItem>>,
    details: HashMap<(MediaKind, String), CatalogItem>,
    episodes: HashMap<(u64, u32, u32), EpisodeDetails>,
    tmdb: HashMap<u64, Vec<CatalogItem>>,
    missing_credentials: bool,
    down: bool,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeCatalog {
    pub fn with_search(mut self, query: &str, items: Vec<CatalogItem>) -> Self {
        self.searches.insert(query.into(), items);
        self
    }

    pub fn with_details(mut self, id_or_slug: &str, item: CatalogItem) -> Self {
        self.details.insert((item.kind, id_or_slug.into()), item);
        self
    }

    pub fn with_episode(mut self, show: u64, season: u32, number: u32, overview: &str) -> Self {
        self.episodes.insert(
            (show, season, number),
            EpisodeDetails {
                season,
                number,
                title: None,
                overview: Some(overview.into()),
            },
        );
        self
    }

    pub fn with_tmdb(mut self, tmdb_id: u64, items: Vec<CatalogItem>) -> Self {
        self.tmdb.insert(tmdb_id, items);
        self
    }

    pub fn missing_credentials(mut self) -> Self {
        self.missing_credentials = true;
        self
    }

    pub fn down(mut self) -> Self {
        self.down = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, call: String) -> Result<(), FakeError> {
        self.calls.lock().unwrap().push(call);
        if self.missing_credentials {
            return Err(FakeError::MissingCredential);
        }
        if self.down {
            return Err(FakeError::Down);
        }
        Ok(())
    }
}

impl CatalogService for FakeCatalog {
    type Error = FakeError;

    async fn search(
        &self,
        kind: MediaKind,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<CatalogItem>, FakeError> {
        self.check(format!("search:{kind}:{query}:{year:?}"))?;
        Ok(self
            .searches
            .get(query)
            .map(|items| items.iter().filter(|i| i.kind == kind).cloned().collect())
            .unwrap_or_default())
    }

    async fn item_details(
        &self,
        kind: MediaKind,
        id_or_slug: &str,
    ) -> Result<Option<CatalogItem>, FakeError> {
        self.check(format!("details:{kind}:{id_or_slug}"))?;
        Ok(self
            .details
            .get(&(kind, id_or_slug.to_string()))
            .cloned())
    }

    async fn episode_details(
        &self,
        show_id: u64,
        season: u32,
        episode: u32,
    ) -> Result<Option<EpisodeDetails>, FakeError> {
        self.check(format!("episode:{show_id}:{season}:{episode}"))?;
        Ok(self.episodes.get(&(show_id, season, episode)).cloned())
    }

    async fn lookup_tmdb(
        &self,
        tmdb_id: u64,
        kind: MediaKind,
    ) -> Result<Vec<CatalogItem>, FakeError> {
        self.check(format!("tmdb:{kind}:{tmdb_id}"))?;
        Ok(self.tmdb.get(&tmdb_id).cloned().unwrap_or_default())
    }
}

#[derive(Clone, Default)]
pub struct FakeArtwork {
    searches: HashMap<String, Vec<ArtworkItem>>,
    details: HashMap<u64, ArtworkItem>,
    missing_key: bool,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeArtwork {
    pub fn with_search(mut self, query: &str, items: Vec<ArtworkItem>) -> Self {
        self.searches.insert(query.into(), items);
        self
    }

    pub fn with_details(mut self, item: ArtworkItem) -> Self {
        self.details.insert(item.id, item);
        self
    }

    pub fn missing_key(mut self) -> Self {
        self.missing_key = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn artwork(id: u64, title: &str, poster: Option<&str>) -> ArtworkItem {
    ArtworkItem {
        id,
        title: title.into(),
        poster_url: poster.map(String::from),
    }
}

impl ArtworkService for FakeArtwork {
    type Error = FakeError;

    async fn search(&self, kind: MediaKind, query: &str) -> Result<Vec<ArtworkItem>, FakeError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("search:{}:{query}", kind.tmdb_str()));
        if self.missing_key {
            return Err(FakeError::MissingCredential);
        }
        Ok(self.searches.get(query).cloned().unwrap_or_default())
    }

    async fn details(&self, kind: MediaKind, id: u64) -> Result<Option<ArtworkItem>, FakeError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("details:{}:{id}", kind.tmdb_str()));
        if self.missing_key {
            return Err(FakeError::MissingCredential);
        }
        Ok(self.details.get(&id).cloned())
    }
}

/// A recorded scrobble call.
pub type Emission = (ScrobbleAction, ScrobbleTarget, f64);

#[derive(Clone, Default)]
pub struct FakeScrobbler {
    pub emissions: Arc<Mutex<Vec<Emission>>>,
}

impl FakeScrobbler {
    pub fn emissions(&self) -> Vec<Emission> {
        self.emissions.lock().unwrap().clone()
    }
}

impl ScrobbleService for FakeScrobbler {
    type Error = FakeError;

    async fn scrobble(
        &self,
        action: ScrobbleAction,
        target: ScrobbleTarget,
        progress: f64,
    ) -> Result<serde_json::Value, FakeError> {
        self.emissions.lock().unwrap().push((action, target, progress));
        Ok(serde_json::json!({ "action": action.as_str(), "progress": progress }))
    }
}

/// A page with a fixed tab title and URL and no responder.
#[derive(Default)]
pub struct FakePage {
    pub tab_title: Option<String>,
    pub url: Option<String>,
    pub toasts: Mutex<Vec<String>>,
}

impl FakePage {
    pub fn new(tab_title: &str, url: &str) -> Self {
        Self {
            tab_title: Some(tab_title.into()),
            url: Some(url.into()),
            toasts: Mutex::new(Vec::new()),
        }
    }

    pub fn toasts(&self) -> Vec<String> {
        self.toasts.lock().unwrap().clone()
    }
}

impl PageProbe for FakePage {
    fn responder_title(&self) -> BoxFuture<'_, Result<Option<PageTitle>, ProbeError>> {
        async { Err(ProbeError::Unavailable("no responder".into())) }.boxed()
    }

    fn inject_probe(&self) -> BoxFuture<'_, Result<Option<PageTitle>, ProbeError>> {
        async { Ok(None) }.boxed()
    }

    fn tab_title(&self) -> BoxFuture<'_, Option<String>> {
        let title = self.tab_title.clone();
        async move { title }.boxed()
    }

    fn tab_url(&self) -> BoxFuture<'_, Option<String>> {
        let url = self.url.clone();
        async move { url }.boxed()
    }

    fn show_toast(&self, message: &str) {
        self.toasts.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub struct FakePages {
    pages: Mutex<HashMap<FrameId, Arc<FakePage>>>,
}

impl FakePages {
    pub fn insert(&self, owner: FrameId, page: Arc<FakePage>) {
        self.pages.lock().unwrap().insert(owner, page);
    }
}

impl PageDirectory for FakePages {
    fn page(&self, owner: FrameId) -> Option<Arc<dyn PageProbe>> {
        self.pages
            .lock()
            .unwrap()
            .get(&owner)
            .map(|p| p.clone() as Arc<dyn PageProbe>)
    }
}
