use thiserror::Error;

use crate::traits::ServiceError;

/// Errors from the TMDB API client.
#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl ServiceError for TmdbError {
    fn is_missing_credentials(&self) -> bool {
        matches!(self, Self::MissingCredential(_))
    }
}
