//! Clients for the remote catalog and tracking services.

pub mod tmdb;
pub mod traits;
pub mod trakt;

pub use traits::{
    ArtworkItem, ArtworkService, CatalogIds, CatalogItem, CatalogService, Credentials,
    EpisodeDetails, MediaKind, ScrobbleAction, ScrobbleService, ScrobbleTarget, ServiceError,
    SharedCredentials,
};
