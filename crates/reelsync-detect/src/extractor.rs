use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::cache::ResolvedTitleCache;
use crate::metadata::MetadataSource;
use crate::page::{FrameId, PageProbe};
use crate::site::SiteDatabase;
use crate::strategy::{
    ExtractionContext, InjectedProbeStrategy, ResponderStrategy, SiteMetadataStrategy,
    TabTitleStrategy, TitleStrategy,
};

/// A usable title pulled from a page, and which strategy found it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleGuess {
    pub title: String,
    pub year: Option<u16>,
    pub source: &'static str,
}

/// Site-aware, multi-strategy title extraction.
pub struct SignalExtractor {
    sites: Arc<SiteDatabase>,
    generic_titles: Vec<String>,
    strategies: Vec<Box<dyn TitleStrategy>>,
    cache: Arc<ResolvedTitleCache>,
    player_wait: Duration,
}

impl SignalExtractor {
    /// An extractor with no strategies. See [`SignalExtractor::with_default_strategies`].
    pub fn new(sites: Arc<SiteDatabase>, generic_titles: Vec<String>, player_wait: Duration) -> Self {
        Self {
            sites,
            generic_titles,
            strategies: Vec::new(),
            cache: Arc::new(ResolvedTitleCache::new()),
            player_wait,
        }
    }

    /// Responder, injected probe, tab title, then site metadata.
    pub fn with_default_strategies<M: MetadataSource + 'static>(
        sites: Arc<SiteDatabase>,
        generic_titles: Vec<String>,
        player_wait: Duration,
        metadata: M,
    ) -> Self {
        let mut extractor = Self::new(sites, generic_titles, player_wait);
        let cache = extractor.cache.clone();
        extractor.push_strategy(Box::new(ResponderStrategy));
        extractor.push_strategy(Box::new(InjectedProbeStrategy));
        extractor.push_strategy(Box::new(TabTitleStrategy));
        extractor.push_strategy(Box::new(SiteMetadataStrategy::new(metadata, cache)));
        extractor
    }

    pub fn push_strategy(&mut self, strategy: Box<dyn TitleStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn cache(&self) -> &Arc<ResolvedTitleCache> {
        &self.cache
    }

    /// Whether a title carries no signal: empty, a global placeholder, or a
    /// placeholder of the site `url` belongs to.
    pub fn is_generic(&self, url: Option<&str>, title: &str) -> bool {
        let trimmed = title.trim();
        if trimmed.is_empty() || self.generic_titles.iter().any(|g| g == trimmed) {
            return true;
        }
        url.and_then(|u| self.sites.match_url(u))
            .is_some_and(|idx| self.sites.is_generic(idx, trimmed))
    }

    /// Whether the site at `url` renders its player metadata late.
    pub fn waits_for_player(&self, url: Option<&str>) -> bool {
        url.and_then(|u| self.sites.match_url(u))
            .and_then(|idx| self.sites.site(idx))
            .is_some_and(|site| site.waits_for_player)
    }

    /// Run the strategies in order and return the first usable title.
    #[tracing::instrument(skip(self, page), fields(owner = %owner))]
    pub async fn extract(&self, owner: FrameId, page: &dyn PageProbe) -> Option<TitleGuess> {
        let url = page.tab_url().await;
        let site = url.as_deref().and_then(|u| self.sites.match_url(u));
        let cx = ExtractionContext {
            owner,
            page,
            url: url.as_deref(),
            site,
            sites: &self.sites,
        };

        for strategy in &self.strategies {
            let Some(found) = strategy.extract(&cx).await else {
                continue;
            };
            if self.is_generic(cx.url, &found.title) {
                tracing::debug!(strategy = strategy.name(), title = %found.title, "Generic title rejected");
                continue;
            }
            tracing::debug!(strategy = strategy.name(), title = %found.title, "Title extracted");
            return Some(TitleGuess {
                title: found.title.trim().to_string(),
                year: found.year,
                source: strategy.name(),
            });
        }

        tracing::debug!("No usable title from any strategy");
        None
    }

    /// Wait for the player UI to report ready, bounded by the player wait
    /// ceiling. Returns `false` when the ceiling was hit.
    pub async fn wait_for_player(&self, page: &dyn PageProbe) -> bool {
        match tokio::time::timeout(self.player_wait, page.player_ready()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(wait = ?self.player_wait, "Player not ready, proceeding anyway");
                false
            }
        }
    }
}
