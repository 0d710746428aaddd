use std::future::Future;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// Errors from a site's internal metadata endpoint.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// Response of a site metadata endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteMetadata {
    pub video: Option<VideoMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub seasons: Vec<SeasonMetadata>,
    /// Collections without meaningful episode numbering.
    #[serde(default)]
    pub hidden_episode_numbers: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonMetadata {
    pub seq: u32,
    #[serde(default)]
    pub episodes: Vec<EpisodeMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeMetadata {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub episode_id: Option<u64>,
    pub seq: u32,
    #[serde(default)]
    pub title: Option<String>,
}

impl SiteMetadata {
    /// Build a parser-friendly title for the given episode id.
    ///
    /// Movies yield their title. Shows yield `"Show - Season S Episode E"`, or
    /// `"Show - <episode title>"` when the site hides episode numbers.
    pub fn title_for_episode(&self, episode_id: &str) -> Option<String> {
        let video = self.video.as_ref()?;
        if video.kind == "movie" {
            return Some(video.title.clone());
        }

        let wanted: u64 = episode_id.trim().parse().ok()?;
        video.seasons.iter().find_map(|season| {
            let ep = season
                .episodes
                .iter()
                .find(|ep| ep.id == Some(wanted) || ep.episode_id == Some(wanted))?;
            if video.hidden_episode_numbers {
                Some(format!(
                    "{} - {}",
                    video.title,
                    ep.title.as_deref().unwrap_or_default()
                ))
            } else {
                Some(format!(
                    "{} - Season {} Episode {}",
                    video.title, season.seq, ep.seq
                ))
            }
        })
    }
}

/// Source of site metadata records.
pub trait MetadataSource: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<SiteMetadata, SiteError>> + Send;
}

/// Read-only client for site metadata endpoints, authenticated with the
/// viewer's existing session cookie.
#[derive(Clone)]
pub struct SiteMetadataClient {
    http: Client,
    session_cookie: Option<String>,
}

impl SiteMetadataClient {
    pub fn new(session_cookie: Option<String>) -> Self {
        Self {
            http: Client::new(),
            session_cookie,
        }
    }
}

impl MetadataSource for SiteMetadataClient {
    async fn fetch(&self, url: &str) -> Result<SiteMetadata, SiteError> {
        let mut req = self.http.get(url).header("Accept", "application/json");
        if let Some(cookie) = &self.session_cookie {
            req = req.header("Cookie", cookie);
        }
        let resp = req.send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SiteError::Api {
                status,
                message: body,
            });
        }

        resp.json::<SiteMetadata>()
            .await
            .map_err(|e| SiteError::Parse(e.to_string()))
    }
}
