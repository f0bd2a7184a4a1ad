// Shared models for the market data engine
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::clients::provider::{AdapterError, ErrorKind};

/// Reason attached to a quote when every configured source failed.
pub const NO_SOURCES_AVAILABLE: &str = "no data sources available";

// ============================================================================
// Provider Identifiers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    CoinMarketCap,
    Binance,
    CoinDesk,
    AlphaVantage,
    CoinGecko,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::CoinMarketCap => "coinmarketcap",
            ProviderId::Binance => "binance",
            ProviderId::CoinDesk => "coindesk",
            ProviderId::AlphaVantage => "alpha_vantage",
            ProviderId::CoinGecko => "coingecko",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::CoinMarketCap => "CoinMarketCap",
            ProviderId::Binance => "Binance",
            ProviderId::CoinDesk => "CoinDesk",
            ProviderId::AlphaVantage => "Alpha Vantage",
            ProviderId::CoinGecko => "CoinGecko",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Adapter Output
// ============================================================================

/// Normalized partial quote produced by a single adapter.
///
/// Carries only canonical field names; whatever the upstream called these
/// values stays inside the adapter that parsed them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteFragment {
    pub symbol: String,
    pub source: ProviderId,
    pub current_price: f64,
    pub name: Option<String>,
    pub price_change_24h_percent: Option<f64>,
    pub price_change_7d_percent: Option<f64>,
    pub volume_24h: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub market_cap: Option<f64>,
    /// Rank reported by the upstream itself. Authoritative when present.
    pub market_cap_rank: Option<u32>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    /// Upstream's own update time
    pub last_updated: DateTime<Utc>,
    /// When this process requested the data. Survives cache hits.
    pub captured_at: DateTime<Utc>,
    /// Set by adapters that cannot supply market capitalization.
    pub needs_enrichment: bool,
}

impl QuoteFragment {
    /// Price-only fragment; adapters fill in whatever else they know.
    pub fn new(symbol: &str, source: ProviderId, current_price: f64) -> Self {
        let now = Utc::now();
        Self {
            symbol: symbol.to_uppercase(),
            source,
            current_price,
            name: None,
            price_change_24h_percent: None,
            price_change_7d_percent: None,
            volume_24h: None,
            high_24h: None,
            low_24h: None,
            market_cap: None,
            market_cap_rank: None,
            circulating_supply: None,
            total_supply: None,
            max_supply: None,
            last_updated: now,
            captured_at: now,
            needs_enrichment: false,
        }
    }
}

// ============================================================================
// Canonical Quote
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataQuality {
    /// Primary source reports market cap natively
    Excellent,
    /// Primary source reports full 24h trading stats
    High,
    /// Price only
    Medium,
}

/// One adapter's failure, kept as diagnostics on the aggregated quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: ProviderId,
    pub kind: ErrorKind,
    pub message: String,
}

impl SourceFailure {
    pub fn new(source: ProviderId, err: &AdapterError) -> Self {
        Self {
            source,
            kind: err.kind,
            message: err.message.clone(),
        }
    }
}

/// Best available market snapshot for one symbol.
///
/// Either `success` is true and `current_price` is set, or `success` is false
/// and `error_reason` is set. Use [`Quote::from_fragment`] and
/// [`Quote::failure`] to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub current_price: Option<f64>,
    pub name: Option<String>,
    pub price_change_24h_percent: Option<f64>,
    pub price_change_7d_percent: Option<f64>,
    pub volume_24h: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub market_cap_source: Option<ProviderId>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub source_name: Option<ProviderId>,
    pub backup_sources: Vec<ProviderId>,
    pub sources_available: usize,
    pub data_quality: Option<DataQuality>,
    pub attempted_sources: Vec<ProviderId>,
    pub failures: Vec<SourceFailure>,
    /// Capture instant of the primary data; time of the attempt on failure
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub error_reason: Option<String>,
}

impl Quote {
    /// Successful quote seeded from the primary fragment.
    pub fn from_fragment(fragment: QuoteFragment) -> Self {
        let data_quality = if fragment.market_cap.is_some() {
            DataQuality::Excellent
        } else if fragment.volume_24h.is_some() {
            DataQuality::High
        } else {
            DataQuality::Medium
        };
        let market_cap_source = fragment.market_cap.map(|_| fragment.source);

        Self {
            symbol: fragment.symbol,
            current_price: Some(fragment.current_price),
            name: fragment.name,
            price_change_24h_percent: fragment.price_change_24h_percent,
            price_change_7d_percent: fragment.price_change_7d_percent,
            volume_24h: fragment.volume_24h,
            high_24h: fragment.high_24h,
            low_24h: fragment.low_24h,
            market_cap: fragment.market_cap,
            market_cap_rank: fragment.market_cap_rank,
            market_cap_source,
            circulating_supply: fragment.circulating_supply,
            total_supply: fragment.total_supply,
            max_supply: fragment.max_supply,
            source_name: Some(fragment.source),
            backup_sources: Vec::new(),
            sources_available: 1,
            data_quality: Some(data_quality),
            attempted_sources: Vec::new(),
            failures: Vec::new(),
            timestamp: fragment.captured_at,
            success: true,
            error_reason: None,
        }
    }

    pub fn failure(symbol: &str, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            current_price: None,
            name: None,
            price_change_24h_percent: None,
            price_change_7d_percent: None,
            volume_24h: None,
            high_24h: None,
            low_24h: None,
            market_cap: None,
            market_cap_rank: None,
            market_cap_source: None,
            circulating_supply: None,
            total_supply: None,
            max_supply: None,
            source_name: None,
            backup_sources: Vec::new(),
            sources_available: 0,
            data_quality: None,
            attempted_sources: Vec::new(),
            failures: Vec::new(),
            timestamp: Utc::now(),
            success: false,
            error_reason: Some(reason.into()),
        }
    }
}

// ============================================================================
// Overview & History
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOverview {
    pub quotes: BTreeMap<String, Quote>,
    pub total_symbols: usize,
    pub successful_fetches: usize,
    pub success_rate_percent: f64,
    pub timestamp: DateTime<Utc>,
}

impl MarketOverview {
    pub fn from_quotes(quotes: Vec<Quote>) -> Self {
        let quotes: BTreeMap<String, Quote> =
            quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect();
        let total_symbols = quotes.len();
        let successful_fetches = quotes.values().filter(|q| q.success).count();
        let success_rate_percent = if total_symbols == 0 {
            0.0
        } else {
            successful_fetches as f64 / total_symbols as f64 * 100.0
        };

        Self {
            quotes,
            total_symbols,
            successful_fetches,
            success_rate_percent,
            timestamp: Utc::now(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(&symbol.to_uppercase())
    }
}

/// One day of OHLCV data in USD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCandle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}
