//! Aggregation Coordinator
//!
//! Queries every configured adapter for a symbol, picks the primary result
//! by fixed priority, enriches price-only primaries with a market cap and
//! records the remaining sources as backups.
//!
//! Adapters run concurrently. Selection always walks results in
//! registration order, so a slow high-priority source still wins over a
//! fast low-priority one.

use crate::cache::CacheStore;
use crate::clients::provider::QuoteProvider;
use crate::enrichment::{estimate_rank, EnrichmentResolver};
use crate::models::{ProviderId, Quote, QuoteFragment, SourceFailure, NO_SOURCES_AVAILABLE};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AggregationCoordinator {
    /// Highest priority first
    providers: Vec<Arc<dyn QuoteProvider>>,
    cache: Arc<CacheStore<QuoteFragment>>,
    enrichment: Option<EnrichmentResolver>,
}

impl AggregationCoordinator {
    pub fn new(
        providers: Vec<Arc<dyn QuoteProvider>>,
        cache: Arc<CacheStore<QuoteFragment>>,
        enrichment: Option<EnrichmentResolver>,
    ) -> Self {
        let names: Vec<&str> = providers.iter().map(|p| p.id().as_str()).collect();
        info!("Aggregation chain: {}", names.join(" → "));

        Self {
            providers,
            cache,
            enrichment,
        }
    }

    pub fn providers(&self) -> &[Arc<dyn QuoteProvider>] {
        &self.providers
    }

    /// Every configured source in priority order
    pub fn attempted_sources(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Best available quote for `symbol`. Never fails: total failure is a
    /// `success=false` quote listing what was tried.
    pub async fn aggregate(&self, symbol: &str) -> Quote {
        let results = join_all(
            self.providers
                .iter()
                .map(|provider| provider.fetch(symbol, &self.cache)),
        )
        .await;

        let mut primary: Option<QuoteFragment> = None;
        let mut backup_sources = Vec::new();
        let mut failures = Vec::new();

        for (provider, result) in self.providers.iter().zip(results) {
            match result {
                Ok(fragment) if primary.is_none() => primary = Some(fragment),
                Ok(_) => backup_sources.push(provider.id()),
                Err(e) => {
                    warn!("{} failed for {}: {}", provider.id(), symbol, e);
                    failures.push(SourceFailure::new(provider.id(), &e));
                }
            }
        }

        let Some(fragment) = primary else {
            warn!("All {} sources failed for {}", self.providers.len(), symbol);
            let mut quote = Quote::failure(symbol, NO_SOURCES_AVAILABLE);
            quote.attempted_sources = self.attempted_sources();
            quote.failures = failures;
            return quote;
        };

        let needs_enrichment = fragment.needs_enrichment;
        let mut quote = Quote::from_fragment(fragment);

        // Native rank stays authoritative; otherwise keep rank in step with cap
        if quote.market_cap_rank.is_none() {
            quote.market_cap_rank = quote.market_cap.map(estimate_rank);
        }

        if needs_enrichment && quote.market_cap.is_none() {
            self.enrich(&mut quote).await;
        }

        if let Some(source) = quote.source_name {
            info!("Using {} as primary source for {}", source, quote.symbol);
        }

        quote.sources_available = backup_sources.len() + 1;
        quote.backup_sources = backup_sources;
        quote.attempted_sources = self.attempted_sources();
        quote.failures = failures;
        quote
    }

    async fn enrich(&self, quote: &mut Quote) {
        let Some(resolver) = &self.enrichment else {
            debug!("Enrichment disabled, {} keeps no market cap", quote.symbol);
            return;
        };

        if let Some(estimate) = resolver.enrich(&quote.symbol).await {
            quote.market_cap = Some(estimate.market_cap);
            quote.market_cap_rank = Some(estimate.rank);
            quote.market_cap_source = Some(estimate.source);
        }
    }
}
