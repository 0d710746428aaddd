//! Playback title detection: which show or movie is a streaming page playing?

pub mod cache;
pub mod extractor;
pub mod metadata;
pub mod page;
pub mod retry;
pub mod site;
pub mod strategy;
pub mod structured;

pub use cache::ResolvedTitleCache;
pub use extractor::{SignalExtractor, TitleGuess};
pub use metadata::{MetadataSource, SiteError, SiteMetadata, SiteMetadataClient};
pub use page::{FrameId, FrameKind, PageDirectory, PageProbe, PageTitle, ProbeError};
pub use retry::DeferredRetry;
pub use site::{SiteDatabase, SiteDef};
pub use strategy::{ExtractionContext, TitleStrategy};
