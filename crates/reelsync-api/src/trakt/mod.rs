pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::{DeviceAuth, DeviceCode, PollStatus, TokenResponse};
pub use client::TraktClient;
pub use error::TraktError;
