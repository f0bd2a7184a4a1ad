//! Binance API Client
//!
//! High-frequency trade price from the Binance 24hr ticker. Binance does
//! not publish market capitalization, so fragments from here are flagged
//! for enrichment.
//!
//! Rate limits: 1200 requests/minute (IP-based)

use super::budget::RequestBudget;
use super::provider::{
    ensure_success, parse_decimal, read_json, AdapterResult, QuoteProvider,
};
use crate::models::{ProviderId, QuoteFragment};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://api.binance.com/api/v3";
const TIMEOUT: Duration = Duration::from_secs(10);
const RATE_LIMIT_PER_MINUTE: usize = 1200;

pub struct BinanceClient {
    client: Client,
    base_url: String,
    /// Optional: the ticker endpoint is public
    api_key: Option<String>,
    budget: RequestBudget,
}

impl BinanceClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(TIMEOUT)
            .user_agent("Cryptsist/1.0")
            .build()
            .context("Failed to create Binance HTTP client")?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            budget: RequestBudget::per_minute(RATE_LIMIT_PER_MINUTE),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Convert symbol to Binance trading pair (e.g., BTC -> BTCUSDT)
    fn to_trading_pair(symbol: &str) -> String {
        let sym = symbol.to_uppercase();
        if sym.ends_with("USDT") {
            sym
        } else {
            format!("{}USDT", sym)
        }
    }

    fn to_fragment(symbol: &str, ticker: Binance24hrTicker) -> AdapterResult {
        let current_price = parse_decimal("lastPrice", &ticker.last_price)?;

        let mut fragment = QuoteFragment::new(symbol, ProviderId::Binance, current_price);
        fragment.price_change_24h_percent =
            Some(parse_decimal("priceChangePercent", &ticker.price_change_percent)?);
        fragment.volume_24h = Some(parse_decimal("quoteVolume", &ticker.quote_volume)?);
        fragment.high_24h = Some(parse_decimal("highPrice", &ticker.high_price)?);
        fragment.low_24h = Some(parse_decimal("lowPrice", &ticker.low_price)?);
        fragment.needs_enrichment = true;
        Ok(fragment)
    }
}

#[async_trait]
impl QuoteProvider for BinanceClient {
    fn id(&self) -> ProviderId {
        ProviderId::Binance
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn request(&self, symbol: &str) -> AdapterResult {
        self.budget.try_acquire()?;

        let trading_pair = Self::to_trading_pair(symbol);
        let url = format!("{}/ticker/24hr", self.base_url);

        debug!("Fetching {} from Binance", trading_pair);

        let mut request = self
            .client
            .get(&url)
            .query(&[("symbol", trading_pair.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.header("X-MBX-APIKEY", key);
        }

        let response = ensure_success(self.id(), request.send().await?).await?;
        let ticker: Binance24hrTicker = read_json(self.id(), response).await?;

        Self::to_fragment(symbol, ticker)
    }
}

/// Binance 24hr ticker response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Binance24hrTicker {
    price_change_percent: String,
    last_price: String,
    high_price: String,
    low_price: String,
    quote_volume: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::provider::ErrorKind;

    #[test]
    fn test_trading_pair_conversion() {
        assert_eq!(BinanceClient::to_trading_pair("BTC"), "BTCUSDT");
        assert_eq!(BinanceClient::to_trading_pair("eth"), "ETHUSDT");
        assert_eq!(BinanceClient::to_trading_pair("SOLUSDT"), "SOLUSDT");
    }

    #[test]
    fn test_to_fragment_flags_enrichment() {
        let ticker: Binance24hrTicker = serde_json::from_str(
            r#"{
                "symbol": "BTCUSDT",
                "priceChange": "812.00",
                "priceChangePercent": "1.265",
                "weightedAvgPrice": "64700.1",
                "lastPrice": "65010.00",
                "highPrice": "65500.00",
                "lowPrice": "63900.00",
                "volume": "20123.5",
                "quoteVolume": "1301234567.89"
            }"#,
        )
        .unwrap();

        let fragment = BinanceClient::to_fragment("btc", ticker).unwrap();
        assert_eq!(fragment.symbol, "BTC");
        assert_eq!(fragment.current_price, 65010.0);
        assert_eq!(fragment.price_change_24h_percent, Some(1.265));
        assert_eq!(fragment.high_24h, Some(65500.0));
        assert!(fragment.market_cap.is_none());
        assert!(fragment.needs_enrichment);
    }

    #[test]
    fn test_unparsable_price_is_malformed() {
        let ticker = Binance24hrTicker {
            price_change_percent: "0".to_string(),
            last_price: "n/a".to_string(),
            high_price: "0".to_string(),
            low_price: "0".to_string(),
            quote_volume: "0".to_string(),
        };
        let err = BinanceClient::to_fragment("BTC", ticker).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = BinanceClient::new(None).unwrap();
        assert_eq!(client.id(), ProviderId::Binance);
        assert!(client.is_configured());
        assert_eq!(client.cache_key("btc"), "binance:BTC");
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_live_ticker() {
        let client = BinanceClient::new(None).unwrap();
        let fragment = client.request("BTC").await.unwrap();
        assert!(fragment.current_price > 0.0);
    }
}
