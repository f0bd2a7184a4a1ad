//! Cryptsist Core - Multi-source crypto market data aggregation.
//!
//! This crate provides:
//! - Adapters for CoinMarketCap, Binance, CoinDesk and Alpha Vantage
//! - A TTL cache shared by all adapters, safe for concurrent use
//! - Priority-ordered aggregation with backup source tracking
//! - Market cap enrichment (CoinGecko) with heuristic rank estimation
//! - A query façade for single quotes, overviews and daily history

pub mod aggregator;
pub mod cache;
pub mod clients;
pub mod config;
pub mod enrichment;
pub mod models;
pub mod service;

pub use aggregator::AggregationCoordinator;
pub use cache::CacheStore;
pub use config::MarketDataConfig;
pub use models::{DailyCandle, DataQuality, MarketOverview, ProviderId, Quote, QuoteFragment};
pub use service::{MarketDataService, SourceAvailability};
