//! CoinDesk Bitcoin Price Index Client
//!
//! Keyless backup source. Only publishes BTC; every other symbol is
//! answered with NotFound without touching the network.

use super::provider::{ensure_success, read_json, AdapterError, AdapterResult, QuoteProvider};
use crate::models::{ProviderId, QuoteFragment};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://api.coindesk.com/v1";
const TIMEOUT: Duration = Duration::from_secs(10);
const SUPPORTED_SYMBOL: &str = "BTC";

pub struct CoinDeskClient {
    client: Client,
    base_url: String,
}

impl CoinDeskClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(TIMEOUT)
            .user_agent("Mozilla/5.0 (compatible; Cryptsist/1.0)")
            .build()
            .context("Failed to create CoinDesk HTTP client")?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Parse a display rate such as "65,010.1234" or "$65,010.12"
    fn parse_rate(raw: &str) -> Result<f64, AdapterError> {
        let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '$').collect();
        cleaned
            .trim()
            .parse()
            .map_err(|_| AdapterError::malformed(format!("CoinDesk rate is not a number: {:?}", raw)))
    }

    fn to_fragment(index: CoinDeskIndex) -> AdapterResult {
        let usd = index
            .bpi
            .get("USD")
            .ok_or_else(|| AdapterError::malformed("CoinDesk response has no USD rate"))?;

        let price = Self::parse_rate(&usd.rate)?;
        let mut fragment = QuoteFragment::new(SUPPORTED_SYMBOL, ProviderId::CoinDesk, price);
        if let Some(updated) = index.time.and_then(|t| t.updated_iso) {
            fragment.last_updated = updated;
        }
        fragment.needs_enrichment = true;
        Ok(fragment)
    }
}

#[async_trait]
impl QuoteProvider for CoinDeskClient {
    fn id(&self) -> ProviderId {
        ProviderId::CoinDesk
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn request(&self, symbol: &str) -> AdapterResult {
        if !symbol.eq_ignore_ascii_case(SUPPORTED_SYMBOL) {
            return Err(AdapterError::not_found(format!(
                "CoinDesk only publishes BTC, not {}",
                symbol
            )));
        }

        let url = format!("{}/bpi/currentprice.json", self.base_url);
        debug!("Fetching BTC from CoinDesk");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;
        let response = ensure_success(self.id(), response).await?;
        let index: CoinDeskIndex = read_json(self.id(), response).await?;

        Self::to_fragment(index)
    }
}

#[derive(Debug, Deserialize)]
struct CoinDeskIndex {
    time: Option<CoinDeskTime>,
    bpi: HashMap<String, CoinDeskRate>,
}

#[derive(Debug, Deserialize)]
struct CoinDeskTime {
    #[serde(rename = "updatedISO")]
    updated_iso: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CoinDeskRate {
    rate: String,
}
