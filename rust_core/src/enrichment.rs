//! Market cap enrichment for price-only quotes.
//!
//! Best effort: unmapped symbols and upstream failures both come back as
//! `None` and never turn a successful price into a failed one.

use crate::cache::CacheStore;
use crate::clients::provider::AdapterError;
use crate::models::ProviderId;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Descending (exclusive lower bound, rank) buckets. A cap exactly on a
/// boundary falls into the bucket below it.
///
/// These are a coarse heuristic, only monotonicity is guaranteed.
const RANK_BUCKETS: [(f64, u32); 8] = [
    (1_000_000_000_000.0, 1),
    (500_000_000_000.0, 2),
    (100_000_000_000.0, 3),
    (50_000_000_000.0, 4),
    (20_000_000_000.0, 5),
    (10_000_000_000.0, 10),
    (5_000_000_000.0, 20),
    (1_000_000_000.0, 50),
];
const TAIL_RANK: u32 = 100;

/// Estimated rank for a market cap in USD. Larger caps never get a
/// numerically larger rank.
pub fn estimate_rank(market_cap: f64) -> u32 {
    RANK_BUCKETS
        .iter()
        .find(|(threshold, _)| market_cap > *threshold)
        .map(|(_, rank)| *rank)
        .unwrap_or(TAIL_RANK)
}

/// Map a ticker to the enrichment provider's coin id
pub fn coin_id_for(symbol: &str) -> Option<&'static str> {
    let id = match symbol.to_uppercase().as_str() {
        "BTC" => "bitcoin",
        "ETH" => "ethereum",
        "BNB" => "binancecoin",
        "ADA" => "cardano",
        "SOL" => "solana",
        "DOT" => "polkadot",
        "LINK" => "chainlink",
        "MATIC" => "matic-network",
        "UNI" => "uniswap",
        "LTC" => "litecoin",
        "XRP" => "ripple",
        "DOGE" => "dogecoin",
        "AVAX" => "avalanche-2",
        _ => return None,
    };
    Some(id)
}

/// Upstream able to report a market cap by its own coin id
#[async_trait]
pub trait MarketCapSource: Send + Sync {
    fn id(&self) -> ProviderId;

    async fn market_cap(&self, coin_id: &str) -> Result<f64, AdapterError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketCapEstimate {
    pub market_cap: f64,
    pub rank: u32,
    pub source: ProviderId,
}

pub struct EnrichmentResolver {
    source: Arc<dyn MarketCapSource>,
    cache: CacheStore<MarketCapEstimate>,
}

impl EnrichmentResolver {
    pub fn new(source: Arc<dyn MarketCapSource>, ttl: Duration) -> Self {
        Self {
            source,
            cache: CacheStore::new(ttl),
        }
    }

    /// Market cap and estimated rank for `symbol`, if obtainable.
    pub async fn enrich(&self, symbol: &str) -> Option<MarketCapEstimate> {
        let Some(coin_id) = coin_id_for(symbol) else {
            debug!("No enrichment mapping for {}", symbol);
            return None;
        };

        let now = Utc::now();
        if let Some(hit) = self.cache.get_valid(coin_id, now) {
            debug!("Enrichment cache hit for {}", symbol);
            return Some(hit);
        }

        match self.source.market_cap(coin_id).await {
            Ok(market_cap) => {
                let estimate = MarketCapEstimate {
                    market_cap,
                    rank: estimate_rank(market_cap),
                    source: self.source.id(),
                };
                self.cache.put(coin_id, estimate, now);
                info!(
                    "Market cap enriched for {}: ${:.0} (est. rank {})",
                    symbol, market_cap, estimate.rank
                );
                Some(estimate)
            }
            Err(e) => {
                warn!("Could not enrich market cap for {}: {}", symbol, e);
                None
            }
        }
    }
}
