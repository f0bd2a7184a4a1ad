//! CoinMarketCap API Client
//!
//! Primary source: price, 24h change and volume, market cap and the
//! provider's own market cap rank in one request.
//!
//! Rate limits: 333 calls/day on the free tier, budgeted locally at 30/minute.

use super::budget::RequestBudget;
use super::provider::{
    classify_status, read_json, AdapterError, AdapterResult, QuoteProvider,
};
use crate::models::{ProviderId, QuoteFragment};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://pro-api.coinmarketcap.com/v1";
const TIMEOUT: Duration = Duration::from_secs(15);
const RATE_LIMIT_PER_MINUTE: usize = 30;

pub struct CoinMarketCapClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    budget: RequestBudget,
}

impl CoinMarketCapClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(TIMEOUT)
            .user_agent("Cryptsist/1.0")
            .build()
            .context("Failed to create CoinMarketCap HTTP client")?;

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

    fn to_fragment(symbol: &str, response: CmcQuotesResponse) -> AdapterResult {
        let asset = response
            .data
            .get(symbol)
            .ok_or_else(|| {
                AdapterError::not_found(format!("Symbol {} not found in CoinMarketCap response", symbol))
            })?;

        let usd = asset
            .quote
            .get("USD")
            .ok_or_else(|| AdapterError::malformed("CoinMarketCap quote has no USD entry"))?;

        let price = usd
            .price
            .ok_or_else(|| AdapterError::malformed("CoinMarketCap quote is missing price"))?;

        let mut fragment = QuoteFragment::new(symbol, ProviderId::CoinMarketCap, price);
        fragment.name = Some(asset.name.clone());
        fragment.price_change_24h_percent = usd.percent_change_24h;
        fragment.price_change_7d_percent = usd.percent_change_7d;
        fragment.volume_24h = usd.volume_24h;
        fragment.market_cap = usd.market_cap.filter(|m| *m > 0.0);
        fragment.market_cap_rank = asset.cmc_rank.filter(|r| *r > 0);
        fragment.circulating_supply = asset.circulating_supply;
        fragment.total_supply = asset.total_supply;
        fragment.max_supply = asset.max_supply;
        if let Some(updated) = usd.last_updated {
            fragment.last_updated = updated;
        }
        Ok(fragment)
    }
}

#[async_trait]
impl QuoteProvider for CoinMarketCapClient {
    fn id(&self) -> ProviderId {
        ProviderId::CoinMarketCap
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn request(&self, symbol: &str) -> AdapterResult {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AdapterError::unconfigured("CoinMarketCap API key not available"))?;

        self.budget.try_acquire()?;

        let symbol = symbol.to_uppercase();
        let url = format!("{}/cryptocurrency/quotes/latest", self.base_url);

        debug!("Fetching {} from CoinMarketCap", symbol);

        let response = self
            .client
            .get(&url)
            .header("Accepts", "application/json")
            .header("X-CMC_PRO_API_KEY", api_key)
            .query(&[("symbol", symbol.as_str()), ("convert", "USD")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Unknown symbols come back as a 400 validation error
            if status == StatusCode::BAD_REQUEST && body.contains("\"symbol\"") {
                return Err(AdapterError::not_found(format!(
                    "Symbol {} not found on CoinMarketCap",
                    symbol
                )));
            }
            return Err(classify_status(self.id(), status, &body));
        }

        let parsed: CmcQuotesResponse = read_json(self.id(), response).await?;
        Self::to_fragment(&symbol, parsed)
    }
}

/// `/cryptocurrency/quotes/latest` response, keyed by symbol
#[derive(Debug, Deserialize)]
struct CmcQuotesResponse {
    #[serde(default)]
    data: HashMap<String, CmcAsset>,
}

#[derive(Debug, Deserialize)]
struct CmcAsset {
    name: String,
    cmc_rank: Option<u32>,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
    /// Null for uncapped assets
    max_supply: Option<f64>,
    quote: HashMap<String, CmcUsdQuote>,
}

#[derive(Debug, Deserialize)]
struct CmcUsdQuote {
    price: Option<f64>,
    volume_24h: Option<f64>,
    percent_change_24h: Option<f64>,
    percent_change_7d: Option<f64>,
    market_cap: Option<f64>,
    last_updated: Option<DateTime<Utc>>,
}
