//! CoinGecko API Client
//!
//! Free, keyless market cap lookup used to enrich price-only quotes.
//! Keyed by CoinGecko coin ids ("bitcoin"), not ticker symbols.

use super::provider::{ensure_success, read_json, AdapterError};
use crate::enrichment::MarketCapSource;
use crate::models::ProviderId;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const TIMEOUT: Duration = Duration::from_secs(10);

pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(TIMEOUT)
            .user_agent("Cryptsist/1.0")
            .build()
            .context("Failed to create CoinGecko HTTP client")?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn extract_market_cap(coin_id: &str, response: SimplePriceResponse) -> Result<f64, AdapterError> {
        let data = response
            .prices
            .get(coin_id)
            .ok_or_else(|| AdapterError::not_found(format!("No data found for {} on CoinGecko", coin_id)))?;

        data.usd_market_cap
            .filter(|m| m.is_finite() && *m > 0.0)
            .ok_or_else(|| AdapterError::not_found(format!("CoinGecko has no market cap for {}", coin_id)))
    }
}

#[async_trait]
impl MarketCapSource for CoinGeckoClient {
    fn id(&self) -> ProviderId {
        ProviderId::CoinGecko
    }

    async fn market_cap(&self, coin_id: &str) -> Result<f64, AdapterError> {
        let url = format!("{}/simple/price", self.base_url);
        debug!("Fetching market cap for {} from CoinGecko", coin_id);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", coin_id),
                ("vs_currencies", "usd"),
                ("include_market_cap", "true"),
            ])
            .send()
            .await?;
        let response = ensure_success(ProviderId::CoinGecko, response).await?;
        let parsed: SimplePriceResponse = read_json(ProviderId::CoinGecko, response).await?;

        Self::extract_market_cap(coin_id, parsed)
    }
}

/// Simplified price response from CoinGecko /simple/price endpoint
#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    #[serde(flatten)]
    prices: HashMap<String, SimplePriceData>,
}

#[derive(Debug, Deserialize)]
struct SimplePriceData {
    #[serde(default)]
    usd_market_cap: Option<f64>,
}
