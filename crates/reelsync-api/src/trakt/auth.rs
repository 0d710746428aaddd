use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::TraktError;

/// Response of `POST /oauth/device/code`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    /// Seconds until the device code expires.
    pub expires_in: u64,
    /// Seconds between token polls.
    pub interval: u64,
}

/// Access token issued once the user approves the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub created_at: Option<u64>,
}

/// Outcome of a single token poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Authorized(TokenResponse),
    /// 400: the user has not approved yet.
    Pending,
    /// 404, 409 or 410: the code is invalid, already used, or expired.
    Expired,
    /// Any other status or a network error. Keep polling.
    Retry,
}

impl PollStatus {
    /// Classify a non-200 token poll status.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::Pending,
            404 | 409 | 410 => Self::Expired,
            _ => Self::Retry,
        }
    }
}

/// Device authorization client for Trakt.
pub struct DeviceAuth {
    base_url: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

impl DeviceAuth {
    pub fn new(base_url: impl Into<String>, client_id: String, client_secret: String) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            http: reqwest::Client::new(),
        }
    }

    /// Start the flow: ask Trakt for a user code.
    pub async fn request_code(&self) -> Result<DeviceCode, TraktError> {
        let resp = self
            .http
            .post(format!("{}/oauth/device/code", self.base_url))
            .json(&serde_json::json!({ "client_id": self.client_id }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TraktError::Api {
                status,
                message: body,
            });
        }

        resp.json::<DeviceCode>()
            .await
            .map_err(|e| TraktError::Parse(e.to_string()))
    }

    /// Poll the token endpoint once.
    pub async fn poll_once(&self, code: &DeviceCode) -> PollStatus {
        let resp = match self
            .http
            .post(format!("{}/oauth/device/token", self.base_url))
            .json(&serde_json::json!({
                "code": code.device_code,
                "client_id": self.client_id,
                "client_secret": self.client_secret,
            }))
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(error = %e, "Token poll failed, retrying");
                return PollStatus::Retry;
            }
        };

        let status = resp.status().as_u16();
        if status != 200 {
            return PollStatus::from_status(status);
        }
        match resp.json::<TokenResponse>().await {
            Ok(token) => PollStatus::Authorized(token),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable token response, retrying");
                PollStatus::Retry
            }
        }
    }

    /// Poll every `code.interval` seconds until authorized or expired.
    pub async fn wait_for_token(&self, code: &DeviceCode) -> Result<TokenResponse, TraktError> {
        poll_until_resolved(
            Duration::from_secs(code.interval.max(1)),
            Duration::from_secs(code.expires_in),
            || self.poll_once(code),
        )
        .await
    }
}

/// Drive `poll` on a fixed interval until it authorizes or expires, or until
/// `expires_in` has elapsed.
pub async fn poll_until_resolved<F, Fut>(
    interval: Duration,
    expires_in: Duration,
    mut poll: F,
) -> Result<TokenResponse, TraktError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PollStatus>,
{
    let deadline = tokio::time::Instant::now() + expires_in;
    loop {
        tokio::time::sleep(interval).await;
        if tokio::time::Instant::now() > deadline {
            tracing::info!("Device code expired before approval");
            return Err(TraktError::AuthExpired);
        }
        match poll().await {
            PollStatus::Authorized(token) => return Ok(token),
            PollStatus::Expired => return Err(TraktError::AuthExpired),
            PollStatus::Pending | PollStatus::Retry => {}
        }
    }
}

/// Open the verification page in the user's browser.
pub fn open_verification_url(url: &str) -> Result<(), TraktError> {
    open::that(url).map_err(|e| TraktError::Auth(format!("failed to open browser: {e}")))
}
