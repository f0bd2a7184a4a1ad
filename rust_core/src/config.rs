//! Configuration for the market data engine

use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;

/// Overview universe used when the caller does not name symbols
pub const DEFAULT_OVERVIEW_SYMBOLS: [&str; 5] = ["BTC", "ETH", "ADA", "DOT", "LTC"];

#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    // Credentials
    pub coinmarketcap_api_key: Option<String>,
    pub binance_api_key: Option<String>,
    pub alpha_vantage_api_key: Option<String>,

    // Caching
    pub cache_ttl: Duration,

    // Overview mode
    /// Pause between symbols, sized for the slowest provider's quota
    pub overview_spacing: Duration,
    pub overview_symbols: Vec<String>,

    pub enrichment_enabled: bool,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            coinmarketcap_api_key: None,
            binance_api_key: None,
            alpha_vantage_api_key: None,
            cache_ttl: Duration::from_secs(300),
            // Alpha Vantage free tier: 5 calls/minute
            overview_spacing: Duration::from_millis(12_000),
            overview_symbols: DEFAULT_OVERVIEW_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            enrichment_enabled: true,
        }
    }
}

impl MarketDataConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let cache_ttl_secs = parse_u64("MARKET_CACHE_TTL_SECS", defaults.cache_ttl.as_secs())?;
        if cache_ttl_secs == 0 {
            return Err(anyhow!("MARKET_CACHE_TTL_SECS must be > 0"));
        }

        let overview_symbols = match env::var("MARKET_OVERVIEW_SYMBOLS") {
            Ok(raw) => parse_symbol_list(&raw),
            Err(_) => defaults.overview_symbols,
        };

        Ok(Self {
            coinmarketcap_api_key: optional_var("COINMARKETCAP_API_KEY"),
            binance_api_key: optional_var("BINANCE_API_KEY"),
            alpha_vantage_api_key: optional_var("ALPHA_VANTAGE_API_KEY"),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            overview_spacing: Duration::from_millis(parse_u64(
                "MARKET_OVERVIEW_SPACING_MS",
                defaults.overview_spacing.as_millis() as u64,
            )?),
            overview_symbols,
            enrichment_enabled: parse_bool("MARKET_ENRICHMENT_ENABLED", defaults.enrichment_enabled)?,
        })
    }
}

/// Comma separated list, trimmed and uppercased, blanks dropped
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Environment variable that counts as unset when blank
fn optional_var(var_name: &str) -> Option<String> {
    env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse environment variable as u64 with default fallback
fn parse_u64(var_name: &str, default: u64) -> Result<u64> {
    match env::var(var_name) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|_| anyhow!("{} must be a valid u64", var_name)),
        Err(_) => Ok(default),
    }
}

/// Parse environment variable as bool with default fallback
fn parse_bool(var_name: &str, default: bool) -> Result<bool> {
    match env::var(var_name) {
        Ok(val) => val
            .trim()
            .to_lowercase()
            .parse()
            .map_err(|_| anyhow!("{} must be true or false", var_name)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Only unset variables are read here; tests run in parallel and share
    // the process environment.

    #[test]
    fn test_parse_u64_with_default() {
        assert_eq!(parse_u64("NON_EXISTENT_VAR_CRYPTSIST_TTL", 300).unwrap(), 300);
    }

    #[test]
    fn test_parse_bool_with_default() {
        assert!(parse_bool("NON_EXISTENT_VAR_CRYPTSIST_FLAG", true).unwrap());
    }

    #[test]
    fn test_parse_symbol_list() {
        assert_eq!(parse_symbol_list(" btc, eth ,,sol "), vec!["BTC", "ETH", "SOL"]);
        assert!(parse_symbol_list("").is_empty());
    }

    #[test]
    fn test_defaults() {
        let config = MarketDataConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.overview_spacing, Duration::from_secs(12));
        assert_eq!(config.overview_symbols.len(), 5);
        assert!(config.enrichment_enabled);
        assert!(config.coinmarketcap_api_key.is_none());
    }
}
