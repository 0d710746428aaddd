//! Tiered search-and-validate resolution of a parsed guess to a catalog item.

use std::sync::Arc;

use serde::Serialize;

use reelsync_api::{ArtworkService, CatalogItem, CatalogService, MediaKind, ServiceError};
use reelsync_parse::ParsedTitle;

use crate::error::CoreError;
use crate::matcher::validate_match;
use crate::models::{catalog_kind, CatalogMatch};
use crate::normalize::clean_query;

/// Which tier produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveTier {
    Correction,
    Search,
    CleanedSearch,
    CrossCatalog,
    Unvalidated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub item: CatalogItem,
    pub tier: ResolveTier,
}

/// Resolves guesses against the primary catalog, with the artwork catalog as
/// a search fallback. Never writes anything.
pub struct Resolver<C, A> {
    catalog: Arc<C>,
    artwork: Arc<A>,
    accept_unvalidated: bool,
}

impl<C: CatalogService, A: ArtworkService> Resolver<C, A> {
    pub fn new(catalog: Arc<C>, artwork: Arc<A>, accept_unvalidated: bool) -> Self {
        Self {
            catalog,
            artwork,
            accept_unvalidated,
        }
    }

    /// Resolve a guess. `Ok(None)` means no match; `Err` is only returned for
    /// missing catalog credentials.
    #[tracing::instrument(skip(self, guess, correction), fields(title = %guess.title))]
    pub async fn resolve(
        &self,
        guess: &ParsedTitle,
        correction: Option<CatalogItem>,
        year: Option<u16>,
    ) -> Result<Option<Resolution>, CoreError> {
        if let Some(item) = correction {
            tracing::debug!(pinned = %item.title, "Using correction");
            return Ok(Some(Resolution {
                item,
                tier: ResolveTier::Correction,
            }));
        }

        let kind = catalog_kind(guess);
        let query = guess.title.as_str();
        let mut best: Option<CatalogItem> = None;

        let results = self.search(kind, query, year).await?;
        if let Some(hit) = first_valid(query, &results, year) {
            return Ok(Some(Resolution {
                item: hit,
                tier: ResolveTier::Search,
            }));
        }
        best = best.or_else(|| results.into_iter().next());

        let cleaned = clean_query(query);
        if cleaned != query {
            tracing::debug!(cleaned = %cleaned, "Retrying with cleaned title");
            let results = self.search(kind, &cleaned, year).await?;
            if let Some(hit) = first_valid(query, &results, year) {
                return Ok(Some(Resolution {
                    item: hit,
                    tier: ResolveTier::CleanedSearch,
                }));
            }
            best = best.or_else(|| results.into_iter().next());
        }

        if let Some(item) = self.cross_catalog(kind, query).await? {
            return Ok(Some(Resolution {
                item,
                tier: ResolveTier::CrossCatalog,
            }));
        }

        if self.accept_unvalidated {
            if let Some(item) = best {
                tracing::debug!(candidate = %item.title, "Falling back to unvalidated result");
                return Ok(Some(Resolution {
                    item,
                    tier: ResolveTier::Unvalidated,
                }));
            }
        }

        tracing::info!("No catalog match");
        Ok(None)
    }

    /// One catalog search. Transient failures read as no results.
    async fn search(
        &self,
        kind: MediaKind,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<CatalogItem>, CoreError> {
        match self.catalog.search(kind, query, year).await {
            Ok(items) => Ok(items),
            Err(e) if e.is_missing_credentials() => Err(CoreError::Configuration(e.to_string())),
            Err(e) => {
                tracing::warn!(query, error = %e, "Catalog search failed");
                Ok(Vec::new())
            }
        }
    }

    /// Free-text search in the artwork catalog, mapped back through the
    /// primary catalog's cross reference. The top result is taken as is.
    async fn cross_catalog(
        &self,
        kind: MediaKind,
        query: &str,
    ) -> Result<Option<CatalogItem>, CoreError> {
        let top = match self.artwork.search(kind, query).await {
            Ok(results) => results.into_iter().next(),
            Err(e) if e.is_missing_credentials() => {
                tracing::debug!("No artwork key, skipping cross-catalog search");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "Artwork search failed");
                return Ok(None);
            }
        };
        let Some(top) = top else {
            return Ok(None);
        };

        tracing::debug!(tmdb_id = top.id, found = %top.title, "Resolving via cross reference");
        match self.catalog.lookup_tmdb(top.id, kind).await {
            Ok(items) => Ok(items.into_iter().next()),
            Err(e) if e.is_missing_credentials() => Err(CoreError::Configuration(e.to_string())),
            Err(e) => {
                tracing::warn!(tmdb_id = top.id, error = %e, "Cross reference lookup failed");
                Ok(None)
            }
        }
    }

    /// Add display metadata to a resolved item. Every lookup is best-effort.
    pub async fn enrich(&self, item: &CatalogItem, guess: &ParsedTitle) -> CatalogMatch {
        let mut matched = CatalogMatch::from_item(item);
        matched.poster_url = self.poster(item, guess).await;
        matched.synopsis = match (item.kind, guess.episode) {
            (MediaKind::Show, Some(episode)) => {
                match self
                    .catalog
                    .episode_details(item.ids.trakt, guess.season, episode)
                    .await
                {
                    Ok(details) => details.and_then(|d| d.overview),
                    Err(e) => {
                        tracing::debug!(error = %e, "Episode details unavailable");
                        None
                    }
                }
            }
            (MediaKind::Movie, _) => item.overview.clone(),
            (MediaKind::Show, None) => None,
        };
        matched
    }

    /// Poster by artwork id, else the catalog's own, else an artwork search.
    async fn poster(&self, item: &CatalogItem, guess: &ParsedTitle) -> Option<String> {
        if let Some(tmdb_id) = item.ids.tmdb {
            match self.artwork.details(item.kind, tmdb_id).await {
                Ok(Some(found)) if found.poster_url.is_some() => return found.poster_url,
                Ok(_) => {}
                Err(e) => tracing::debug!(tmdb_id, error = %e, "Artwork details unavailable"),
            }
        }
        if item.poster_url.is_some() {
            return item.poster_url.clone();
        }
        match self.artwork.search(item.kind, &guess.title).await {
            Ok(results) => results.into_iter().next().and_then(|r| r.poster_url),
            Err(e) => {
                tracing::debug!(error = %e, "Artwork search unavailable");
                None
            }
        }
    }
}

fn first_valid(query: &str, results: &[CatalogItem], year: Option<u16>) -> Option<CatalogItem> {
    results
        .iter()
        .find(|c| validate_match(query, &c.title, c.year, year))
        .cloned()
}
