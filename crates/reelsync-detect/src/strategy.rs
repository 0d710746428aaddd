//! Title strategies, tried in order by the extractor.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::cache::ResolvedTitleCache;
use crate::metadata::MetadataSource;
use crate::page::{FrameId, PageProbe, PageTitle};
use crate::site::SiteDatabase;

/// Everything a strategy may look at for one extraction attempt.
pub struct ExtractionContext<'a> {
    pub owner: FrameId,
    pub page: &'a dyn PageProbe,
    pub url: Option<&'a str>,
    /// Index into `sites` of the site matching `url`.
    pub site: Option<usize>,
    pub sites: &'a SiteDatabase,
}

/// One way of pulling a title out of a page.
pub trait TitleStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract<'a>(&'a self, cx: &'a ExtractionContext<'a>) -> BoxFuture<'a, Option<PageTitle>>;
}

/// Ask the page's in-context responder.
pub struct ResponderStrategy;

impl TitleStrategy for ResponderStrategy {
    fn name(&self) -> &'static str {
        "responder"
    }

    fn extract<'a>(&'a self, cx: &'a ExtractionContext<'a>) -> BoxFuture<'a, Option<PageTitle>> {
        async move {
            match cx.page.responder_title().await {
                Ok(title) => title,
                Err(e) => {
                    tracing::debug!(owner = %cx.owner, error = %e, "Responder unavailable");
                    None
                }
            }
        }
        .boxed()
    }
}

/// Inject a one-shot probe into the page.
pub struct InjectedProbeStrategy;

impl TitleStrategy for InjectedProbeStrategy {
    fn name(&self) -> &'static str {
        "injected_probe"
    }

    fn extract<'a>(&'a self, cx: &'a ExtractionContext<'a>) -> BoxFuture<'a, Option<PageTitle>> {
        async move {
            match cx.page.inject_probe().await {
                Ok(title) => title,
                Err(e) => {
                    tracing::debug!(owner = %cx.owner, error = %e, "Injected probe failed");
                    None
                }
            }
        }
        .boxed()
    }
}

/// Read the tab title, stripped of site decoration.
pub struct TabTitleStrategy;

impl TitleStrategy for TabTitleStrategy {
    fn name(&self) -> &'static str {
        "tab_title"
    }

    fn extract<'a>(&'a self, cx: &'a ExtractionContext<'a>) -> BoxFuture<'a, Option<PageTitle>> {
        async move {
            let raw = cx.page.tab_title().await?;
            let title = match cx.site {
                Some(idx) => cx.sites.clean_tab_title(idx, &raw),
                None => raw.trim().to_string(),
            };
            Some(PageTitle::new(title))
        }
        .boxed()
    }
}

/// Look the episode up through the site's own metadata endpoint.
pub struct SiteMetadataStrategy<M> {
    source: M,
    cache: std::sync::Arc<ResolvedTitleCache>,
}

impl<M: MetadataSource> SiteMetadataStrategy<M> {
    pub fn new(source: M, cache: std::sync::Arc<ResolvedTitleCache>) -> Self {
        Self { source, cache }
    }

    async fn lookup(&self, cx: &ExtractionContext<'_>) -> Option<PageTitle> {
        let idx = cx.site?;
        let from_url = cx.url.and_then(|url| cx.sites.episode_id(idx, url));
        let episode_id = match from_url {
            Some(id) => id,
            None => cx.page.app_state_episode_id().await?,
        };

        if let Some(title) = self.cache.get(cx.owner, &episode_id) {
            tracing::debug!(owner = %cx.owner, episode_id = %episode_id, "Resolved title cache hit");
            return Some(PageTitle::new(title));
        }

        let endpoint = cx.sites.metadata_url(idx, &episode_id)?;
        let metadata = match self.source.fetch(&endpoint).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(owner = %cx.owner, episode_id = %episode_id, error = %e, "Site metadata lookup failed");
                return None;
            }
        };

        let title = metadata.title_for_episode(&episode_id)?;
        self.cache.insert(cx.owner, episode_id, title.clone());
        Some(PageTitle::new(title))
    }
}

impl<M: MetadataSource + 'static> TitleStrategy for SiteMetadataStrategy<M> {
    fn name(&self) -> &'static str {
        "site_metadata"
    }

    fn extract<'a>(&'a self, cx: &'a ExtractionContext<'a>) -> BoxFuture<'a, Option<PageTitle>> {
        self.lookup(cx).boxed()
    }
}
