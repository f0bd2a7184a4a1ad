//! Public query façade consumed by the signal server and bridge.
//!
//! Never returns an error for a price query: misses come back as
//! `success=false` quotes so callers handle every symbol the same way.

use crate::aggregator::AggregationCoordinator;
use crate::cache::CacheStore;
use crate::clients::alpha_vantage::AlphaVantageClient;
use crate::clients::binance::BinanceClient;
use crate::clients::coindesk::CoinDeskClient;
use crate::clients::coingecko::CoinGeckoClient;
use crate::clients::coinmarketcap::CoinMarketCapClient;
use crate::clients::provider::{AdapterError, QuoteProvider};
use crate::config::MarketDataConfig;
use crate::enrichment::EnrichmentResolver;
use crate::models::{DailyCandle, MarketOverview, ProviderId, Quote};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Whether a configured source has the credentials it needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAvailability {
    pub source: ProviderId,
    pub configured: bool,
}

pub struct MarketDataService {
    coordinator: AggregationCoordinator,
    history: Option<Arc<AlphaVantageClient>>,
    overview_spacing: Duration,
    default_symbols: Vec<String>,
}

impl MarketDataService {
    pub fn new(coordinator: AggregationCoordinator, overview_spacing: Duration) -> Self {
        Self {
            coordinator,
            history: None,
            overview_spacing,
            default_symbols: Vec::new(),
        }
    }

    /// Wire the production chain: CoinMarketCap → Binance → CoinDesk →
    /// Alpha Vantage, with CoinGecko enrichment.
    pub fn from_config(config: &MarketDataConfig) -> Result<Self> {
        let alpha_vantage = Arc::new(AlphaVantageClient::new(config.alpha_vantage_api_key.clone())?);

        let providers: Vec<Arc<dyn QuoteProvider>> = vec![
            Arc::new(CoinMarketCapClient::new(config.coinmarketcap_api_key.clone())?),
            Arc::new(BinanceClient::new(config.binance_api_key.clone())?),
            Arc::new(CoinDeskClient::new()?),
            alpha_vantage.clone() as Arc<dyn QuoteProvider>,
        ];

        let enrichment = if config.enrichment_enabled {
            Some(EnrichmentResolver::new(
                Arc::new(CoinGeckoClient::new()?),
                config.cache_ttl,
            ))
        } else {
            None
        };

        let cache = Arc::new(CacheStore::new(config.cache_ttl));
        let coordinator = AggregationCoordinator::new(providers, cache, enrichment);

        Ok(Self::new(coordinator, config.overview_spacing)
            .with_history(alpha_vantage)
            .with_default_symbols(config.overview_symbols.clone()))
    }

    pub fn with_history(mut self, client: Arc<AlphaVantageClient>) -> Self {
        self.history = Some(client);
        self
    }

    pub fn with_default_symbols(mut self, symbols: Vec<String>) -> Self {
        self.default_symbols = symbols
            .iter()
            .map(|s| Self::normalize(s))
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    fn normalize(symbol: &str) -> String {
        symbol.trim().to_uppercase()
    }

    /// Best available quote for one symbol
    pub async fn get_price(&self, symbol: &str) -> Quote {
        let symbol = Self::normalize(symbol);
        if symbol.is_empty() {
            return Quote::failure(&symbol, "invalid symbol");
        }
        self.coordinator.aggregate(&symbol).await
    }

    /// Quotes for several symbols, queried one after another with
    /// `overview_spacing` between consecutive symbols. An empty list falls
    /// back to the configured default universe.
    pub async fn get_market_overview(&self, symbols: &[&str]) -> MarketOverview {
        let requested: Vec<String> = if symbols.is_empty() {
            self.default_symbols.clone()
        } else {
            symbols.iter().map(|s| Self::normalize(s)).collect()
        };

        let mut unique: Vec<String> = Vec::with_capacity(requested.len());
        for symbol in requested {
            if !unique.contains(&symbol) {
                unique.push(symbol);
            }
        }

        let mut quotes = Vec::with_capacity(unique.len());
        for (i, symbol) in unique.iter().enumerate() {
            if i > 0 && !self.overview_spacing.is_zero() {
                debug!("Spacing overview requests by {:?}", self.overview_spacing);
                tokio::time::sleep(self.overview_spacing).await;
            }
            quotes.push(self.get_price(symbol).await);
        }

        let overview = MarketOverview::from_quotes(quotes);
        info!(
            "Market overview: {}/{} symbols fetched ({:.1}%)",
            overview.successful_fetches, overview.total_symbols, overview.success_rate_percent
        );
        overview
    }

    /// Up to `days` daily candles, oldest first
    pub async fn get_price_history(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<Vec<DailyCandle>, AdapterError> {
        let client = self
            .history
            .as_ref()
            .ok_or_else(|| AdapterError::unconfigured("No history source configured"))?;
        client.get_daily_history(&Self::normalize(symbol), days).await
    }

    /// Credential status of every source, in priority order
    pub fn source_availability(&self) -> Vec<SourceAvailability> {
        self.coordinator
            .providers()
            .iter()
            .map(|p| SourceAvailability {
                source: p.id(),
                configured: p.is_configured(),
            })
            .collect()
    }
}
