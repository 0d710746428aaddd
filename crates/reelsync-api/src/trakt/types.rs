use serde::Deserialize;

use crate::traits::{CatalogIds, CatalogItem, EpisodeDetails, MediaKind};

// ── Search / details ─────────────────────────────────────────────

/// One entry of `GET /search/{type}`.
#[derive(Debug, Deserialize)]
pub struct TraktSearchResult {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub score: Option<f64>,
    pub show: Option<TraktItem>,
    pub movie: Option<TraktItem>,
}

impl TraktSearchResult {
    /// The embedded show or movie, whichever is present.
    pub fn into_item(self) -> Option<CatalogItem> {
        match (self.show, self.movie) {
            (Some(show), _) => Some(show.into_catalog_item(MediaKind::Show)),
            (None, Some(movie)) => Some(movie.into_catalog_item(MediaKind::Movie)),
            (None, None) => None,
        }
    }
}

/// A show or movie with `extended=full` fields.
#[derive(Debug, Deserialize)]
pub struct TraktItem {
    pub title: Option<String>,
    pub year: Option<u32>,
    pub ids: TraktIds,
    pub overview: Option<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub runtime: Option<u32>,
    pub certification: Option<String>,
    pub network: Option<String>,
    pub images: Option<TraktImages>,
}

#[derive(Debug, Deserialize)]
pub struct TraktIds {
    pub trakt: u64,
    pub slug: Option<String>,
    pub tmdb: Option<u64>,
    pub imdb: Option<String>,
    pub tvdb: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TraktImages {
    pub poster: Option<TraktImageSet>,
}

#[derive(Debug, Deserialize)]
pub struct TraktImageSet {
    pub full: Option<String>,
    pub medium: Option<String>,
    pub thumb: Option<String>,
}

impl TraktItem {
    pub fn into_catalog_item(self, kind: MediaKind) -> CatalogItem {
        let poster_url = self
            .images
            .and_then(|i| i.poster)
            .and_then(|p| p.medium.or(p.thumb).or(p.full));
        CatalogItem {
            kind,
            title: self.title.unwrap_or_default(),
            year: self.year,
            ids: CatalogIds {
                trakt: self.ids.trakt,
                slug: self.ids.slug,
                tmdb: self.ids.tmdb,
                imdb: self.ids.imdb,
                tvdb: self.ids.tvdb,
            },
            overview: self.overview,
            rating: self.rating,
            genres: self.genres,
            runtime: self.runtime,
            certification: self.certification,
            network: self.network,
            poster_url,
        }
    }
}

// ── Episodes ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TraktEpisode {
    pub season: u32,
    pub number: u32,
    pub title: Option<String>,
    pub overview: Option<String>,
}

impl From<TraktEpisode> for EpisodeDetails {
    fn from(ep: TraktEpisode) -> Self {
        Self {
            season: ep.season,
            number: ep.number,
            title: ep.title,
            overview: ep.overview,
        }
    }
}
