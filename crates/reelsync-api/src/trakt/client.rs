use reqwest::{Client, Method, RequestBuilder};
use serde_json::json;

use super::error::TraktError;
use super::types::{TraktEpisode, TraktItem, TraktSearchResult};
use crate::traits::{
    read_credentials, CatalogItem, CatalogService, EpisodeDetails, MediaKind, ScrobbleAction,
    ScrobbleService, ScrobbleTarget, SharedCredentials,
};

pub const BASE_URL: &str = "https://api.trakt.tv";

/// Trakt API v2 client.
///
/// Credentials are read from the shared handle on every request, so a key
/// entered after startup takes effect without rebuilding the client.
#[derive(Clone)]
pub struct TraktClient {
    base_url: String,
    credentials: SharedCredentials,
    http: Client,
}

impl TraktClient {
    pub fn new(base_url: impl Into<String>, credentials: SharedCredentials) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            http: Client::new(),
        }
    }

    /// Build a request with the Trakt headers. Requires a client id; the
    /// bearer token is attached when present, or required with `needs_token`.
    fn request(
        &self,
        method: Method,
        path: &str,
        needs_token: bool,
    ) -> Result<RequestBuilder, TraktError> {
        let creds = read_credentials(&self.credentials);
        let client_id = creds
            .client_id
            .filter(|id| !id.is_empty())
            .ok_or(TraktError::MissingCredential("client_id"))?;
        let token = creds.access_token.filter(|t| !t.is_empty());
        if needs_token && token.is_none() {
            return Err(TraktError::MissingCredential("access_token"));
        }

        let mut req = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .header("Content-Type", "application/json")
            .header("trakt-api-version", "2")
            .header("trakt-api-key", client_id);
        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req)
    }

    /// Check the HTTP response for errors and return the body text on failure.
    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, TraktError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        if status == 401 {
            return Err(TraktError::AuthExpired);
        }
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(status, "Trakt API error");
        Err(TraktError::Api {
            status,
            message: body,
        })
    }

    async fn search_results(
        &self,
        req: RequestBuilder,
    ) -> Result<Vec<CatalogItem>, TraktError> {
        let resp = Self::check_response(req.send().await?).await?;
        let results: Vec<TraktSearchResult> = resp
            .json()
            .await
            .map_err(|e| TraktError::Parse(e.to_string()))?;
        Ok(results
            .into_iter()
            .filter_map(TraktSearchResult::into_item)
            .collect())
    }
}

/// Request body for `POST /scrobble/{action}`.
pub fn scrobble_body(target: ScrobbleTarget, progress: f64) -> serde_json::Value {
    match target {
        ScrobbleTarget::Episode {
            show,
            season,
            number,
        } => json!({
            "show": { "ids": { "trakt": show } },
            "episode": { "season": season, "number": number },
            "progress": progress,
        }),
        ScrobbleTarget::Movie { movie } => json!({
            "movie": { "ids": { "trakt": movie } },
            "progress": progress,
        }),
    }
}

impl CatalogService for TraktClient {
    type Error = TraktError;

    async fn search(
        &self,
        kind: MediaKind,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<CatalogItem>, TraktError> {
        let mut req = self
            .request(Method::GET, &format!("/search/{}", kind.as_str()), false)?
            .query(&[("query", query), ("extended", "full")]);
        if let Some(year) = year {
            req = req.query(&[("years", year.to_string())]);
        }
        let items = self.search_results(req).await?;
        tracing::debug!(query, ?year, results = items.len(), "Trakt search");
        Ok(items)
    }

    async fn item_details(
        &self,
        kind: MediaKind,
        id_or_slug: &str,
    ) -> Result<Option<CatalogItem>, TraktError> {
        let resp = self
            .request(
                Method::GET,
                &format!("/{}/{id_or_slug}", kind.plural()),
                false,
            )?
            .query(&[("extended", "full")])
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = Self::check_response(resp).await?;
        let item: TraktItem = resp
            .json()
            .await
            .map_err(|e| TraktError::Parse(e.to_string()))?;
        Ok(Some(item.into_catalog_item(kind)))
    }

    async fn episode_details(
        &self,
        show_id: u64,
        season: u32,
        episode: u32,
    ) -> Result<Option<EpisodeDetails>, TraktError> {
        let resp = self
            .request(
                Method::GET,
                &format!("/shows/{show_id}/seasons/{season}/episodes/{episode}"),
                false,
            )?
            .query(&[("extended", "full")])
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = Self::check_response(resp).await?;
        let ep: TraktEpisode = resp
            .json()
            .await
            .map_err(|e| TraktError::Parse(e.to_string()))?;
        Ok(Some(ep.into()))
    }

    async fn lookup_tmdb(
        &self,
        tmdb_id: u64,
        kind: MediaKind,
    ) -> Result<Vec<CatalogItem>, TraktError> {
        let req = self
            .request(Method::GET, &format!("/search/tmdb/{tmdb_id}"), false)?
            .query(&[("type", kind.as_str())]);
        self.search_results(req).await
    }
}

impl ScrobbleService for TraktClient {
    type Error = TraktError;

    async fn scrobble(
        &self,
        action: ScrobbleAction,
        target: ScrobbleTarget,
        progress: f64,
    ) -> Result<serde_json::Value, TraktError> {
        let resp = self
            .request(
                Method::POST,
                &format!("/scrobble/{}", action.as_str()),
                true,
            )?
            .json(&scrobble_body(target, progress))
            .send()
            .await?;
        let resp = Self::check_response(resp).await?;
        resp.json()
            .await
            .map_err(|e| TraktError::Parse(e.to_string()))
    }
}
