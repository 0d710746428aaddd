use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A required credential or key is not configured. Not retried.
    #[error("not configured: {0}")]
    Configuration(String),

    /// A remote lookup failed; the caller degrades and carries on.
    #[error("lookup failed: {0}")]
    TransientLookup(String),

    #[error("parse failed: {0}")]
    Parse(String),

    #[error("authorization expired")]
    AuthExpired,

    #[error("correction failed: {0}")]
    Correction(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Map a service error onto the pipeline taxonomy.
    pub fn from_service<E: reelsync_api::ServiceError>(err: E) -> Self {
        if err.is_missing_credentials() {
            Self::Configuration(err.to_string())
        } else {
            Self::TransientLookup(err.to_string())
        }
    }
}

impl From<reelsync_parse::ParseError> for CoreError {
    fn from(e: reelsync_parse::ParseError) -> Self {
        Self::Parse(e.to_string())
    }
}
