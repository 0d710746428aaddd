//! Trait definitions for the catalog, artwork and scrobble services.
//!
//! The resolver and dispatcher only talk to these traits, so tests can swap
//! in in-memory fakes for Trakt and TMDB.

use std::future::Future;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Whether a catalog item is a series or a film.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Show,
    Movie,
}

impl MediaKind {
    /// Singular form used by catalog search and cross-reference endpoints.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Show => "show",
            Self::Movie => "movie",
        }
    }

    /// Plural path segment (`/shows/{id}`, `/movies/{id}`).
    pub fn plural(self) -> &'static str {
        match self {
            Self::Show => "shows",
            Self::Movie => "movies",
        }
    }

    /// TMDB's name for the kind.
    pub fn tmdb_str(self) -> &'static str {
        match self {
            Self::Show => "tv",
            Self::Movie => "movie",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers of a catalog item. `trakt` is the primary id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogIds {
    pub trakt: u64,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub tmdb: Option<u64>,
    #[serde(default)]
    pub imdb: Option<String>,
    #[serde(default)]
    pub tvdb: Option<u64>,
}

/// A show or movie as the catalog describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub kind: MediaKind,
    pub title: String,
    #[serde(default)]
    pub year: Option<u32>,
    pub ids: CatalogIds,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub certification: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    /// Poster URL provided by the catalog itself, if any.
    #[serde(default)]
    pub poster_url: Option<String>,
}

/// One episode of a show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeDetails {
    pub season: u32,
    pub number: u32,
    pub title: Option<String>,
    pub overview: Option<String>,
}

/// A secondary-catalog (artwork) record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkItem {
    pub id: u64,
    pub title: String,
    pub poster_url: Option<String>,
}

/// Scrobble verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrobbleAction {
    Start,
    Pause,
    Stop,
}

impl ScrobbleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Stop => "stop",
        }
    }
}

impl std::fmt::Display for ScrobbleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is being scrobbled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrobbleTarget {
    Episode { show: u64, season: u32, number: u32 },
    Movie { movie: u64 },
}

/// Credentials shared by every client, kept in sync with the state store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tmdb_api_key: Option<String>,
}

pub type SharedCredentials = Arc<RwLock<Credentials>>;

/// Snapshot the shared credentials.
pub fn read_credentials(shared: &SharedCredentials) -> Credentials {
    match shared.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Common behaviour of service errors the pipeline needs to branch on.
pub trait ServiceError: std::error::Error + Send + Sync + 'static {
    /// The call could not be made because a credential is not configured.
    fn is_missing_credentials(&self) -> bool;
}

/// The primary catalog (Trakt).
pub trait CatalogService: Send + Sync {
    type Error: ServiceError;

    /// Free-text search, optionally restricted to a release year.
    fn search(
        &self,
        kind: MediaKind,
        query: &str,
        year: Option<u16>,
    ) -> impl Future<Output = Result<Vec<CatalogItem>, Self::Error>> + Send;

    /// Full details by catalog id or slug. `None` when the item does not exist.
    fn item_details(
        &self,
        kind: MediaKind,
        id_or_slug: &str,
    ) -> impl Future<Output = Result<Option<CatalogItem>, Self::Error>> + Send;

    /// Details of one episode of a show.
    fn episode_details(
        &self,
        show_id: u64,
        season: u32,
        episode: u32,
    ) -> impl Future<Output = Result<Option<EpisodeDetails>, Self::Error>> + Send;

    /// Resolve a TMDB id to catalog items.
    fn lookup_tmdb(
        &self,
        tmdb_id: u64,
        kind: MediaKind,
    ) -> impl Future<Output = Result<Vec<CatalogItem>, Self::Error>> + Send;
}

/// The secondary catalog used for fallback search and posters (TMDB).
pub trait ArtworkService: Send + Sync {
    type Error: ServiceError;

    fn search(
        &self,
        kind: MediaKind,
        query: &str,
    ) -> impl Future<Output = Result<Vec<ArtworkItem>, Self::Error>> + Send;

    fn details(
        &self,
        kind: MediaKind,
        id: u64,
    ) -> impl Future<Output = Result<Option<ArtworkItem>, Self::Error>> + Send;
}

/// The remote tracking service.
pub trait ScrobbleService: Send + Sync {
    type Error: ServiceError;

    /// Report playback. Returns the raw response body.
    fn scrobble(
        &self,
        action: ScrobbleAction,
        target: ScrobbleTarget,
        progress: f64,
    ) -> impl Future<Output = Result<serde_json::Value, Self::Error>> + Send;
}
