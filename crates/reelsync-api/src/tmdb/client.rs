use reqwest::Client;

use super::error::TmdbError;
use super::types::{TmdbRecord, TmdbSearchResponse};
use crate::traits::{read_credentials, ArtworkItem, ArtworkService, MediaKind, SharedCredentials};

pub const BASE_URL: &str = "https://api.themoviedb.org/3";

/// TMDB v3 client, keyed by the user's API key.
#[derive(Clone)]
pub struct TmdbClient {
    base_url: String,
    credentials: SharedCredentials,
    http: Client,
}

impl TmdbClient {
    pub fn new(base_url: impl Into<String>, credentials: SharedCredentials) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            http: Client::new(),
        }
    }

    fn api_key(&self) -> Result<String, TmdbError> {
        read_credentials(&self.credentials)
            .tmdb_api_key
            .filter(|k| !k.is_empty())
            .ok_or(TmdbError::MissingCredential("tmdb_api_key"))
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, TmdbError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status, "TMDB API error");
            Err(TmdbError::Api {
                status,
                message: body,
            })
        }
    }
}

impl ArtworkService for TmdbClient {
    type Error = TmdbError;

    async fn search(&self, kind: MediaKind, query: &str) -> Result<Vec<ArtworkItem>, TmdbError> {
        let key = self.api_key()?;
        let resp = self
            .http
            .get(format!("{}/search/{}", self.base_url, kind.tmdb_str()))
            .query(&[("api_key", key.as_str()), ("query", query)])
            .send()
            .await?;

        let resp = Self::check_response(resp).await?;
        let body: TmdbSearchResponse = resp
            .json()
            .await
            .map_err(|e| TmdbError::Parse(e.to_string()))?;
        Ok(body.results.into_iter().map(Into::into).collect())
    }

    async fn details(&self, kind: MediaKind, id: u64) -> Result<Option<ArtworkItem>, TmdbError> {
        let key = self.api_key()?;
        let resp = self
            .http
            .get(format!("{}/{}/{id}", self.base_url, kind.tmdb_str()))
            .query(&[("api_key", key.as_str())])
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resp = Self::check_response(resp).await?;
        let record: TmdbRecord = resp
            .json()
            .await
            .map_err(|e| TmdbError::Parse(e.to_string()))?;
        Ok(Some(record.into()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, RwLock};

    use super::*;
    use crate::traits::{Credentials, ServiceError};

    #[tokio::test]
    async fn test_missing_key_is_credential_error() {
        let client = TmdbClient::new(BASE_URL, Arc::new(RwLock::new(Credentials::default())));
        let err = client.search(MediaKind::Show, "Arcane").await.unwrap_err();
        assert!(err.is_missing_credentials());
    }
}
