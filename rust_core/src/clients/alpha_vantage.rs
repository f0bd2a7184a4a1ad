//! Alpha Vantage API Client
//!
//! Last-resort price source (realtime exchange rate) and the only provider
//! used for daily history.
//!
//! Rate limits: 5 calls/minute, 500 calls/day on the free tier. Quota
//! exhaustion is reported inside a 200 response as a "Note" or
//! "Information" field.

use super::budget::RequestBudget;
use super::provider::{
    ensure_success, parse_decimal, read_json, AdapterError, AdapterResult, QuoteProvider,
};
use crate::models::{DailyCandle, ProviderId, QuoteFragment};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const TIMEOUT: Duration = Duration::from_secs(15);
const RATE_LIMIT_PER_MINUTE: usize = 5;

pub struct AlphaVantageClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    budget: RequestBudget,
}

impl AlphaVantageClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(TIMEOUT)
            .user_agent("Cryptsist/1.0")
            .build()
            .context("Failed to create Alpha Vantage HTTP client")?;

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

    fn api_key(&self) -> Result<&str, AdapterError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AdapterError::unconfigured("Alpha Vantage API key not available"))
    }

    /// Issue one budgeted query and decode the envelope.
    async fn query<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<Envelope<T>, AdapterError> {
        let api_key = self.api_key()?;
        self.budget.try_acquire()?;

        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", api_key)])
            .send()
            .await?;
        let response = ensure_success(self.id(), response).await?;
        read_json(self.id(), response).await
    }

    /// Daily candles for `symbol` in USD, oldest first, at most `days` of them.
    pub async fn get_daily_history(&self, symbol: &str, days: usize) -> Result<Vec<DailyCandle>, AdapterError> {
        if days == 0 {
            return Ok(Vec::new());
        }
        let symbol = symbol.to_uppercase();
        debug!("Fetching {} day history for {} from Alpha Vantage", days, symbol);

        let envelope: Envelope<DailySeries> = self
            .query(&[
                ("function", "DIGITAL_CURRENCY_DAILY"),
                ("symbol", symbol.as_str()),
                ("market", "USD"),
            ])
            .await?;

        let series = envelope.into_payload("No historical data found")?;
        Self::to_candles(series, days)
    }

    fn to_candles(series: DailySeries, days: usize) -> Result<Vec<DailyCandle>, AdapterError> {
        let skip = series.rows.len().saturating_sub(days);
        series
            .rows
            .into_iter()
            .skip(skip)
            .map(|(date, row)| {
                let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
                    AdapterError::malformed(format!("Alpha Vantage date is invalid: {}", date))
                })?;
                Ok(DailyCandle {
                    date,
                    open: parse_decimal("open", &row.open)?,
                    high: parse_decimal("high", &row.high)?,
                    low: parse_decimal("low", &row.low)?,
                    close: parse_decimal("close", &row.close)?,
                    volume: parse_decimal("volume", &row.volume)?,
                })
            })
            .collect()
    }

    fn to_fragment(symbol: &str, rate: ExchangeRate) -> AdapterResult {
        let price = parse_decimal("exchange rate", &rate.exchange_rate)?;
        let mut fragment = QuoteFragment::new(symbol, ProviderId::AlphaVantage, price);
        if let Some(refreshed) = rate
            .last_refreshed
            .as_deref()
            .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
        {
            fragment.last_updated = refreshed.and_utc();
        }
        fragment.needs_enrichment = true;
        Ok(fragment)
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageClient {
    fn id(&self) -> ProviderId {
        ProviderId::AlphaVantage
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn request(&self, symbol: &str) -> AdapterResult {
        let symbol = symbol.to_uppercase();
        debug!("Fetching {} from Alpha Vantage", symbol);

        let envelope: Envelope<ExchangeRate> = self
            .query(&[
                ("function", "CURRENCY_EXCHANGE_RATE"),
                ("from_currency", symbol.as_str()),
                ("to_currency", "USD"),
            ])
            .await?;

        let rate = envelope.into_payload("No exchange rate data found")?;
        Self::to_fragment(&symbol, rate)
    }
}

/// Every Alpha Vantage answer: either the payload or one of the in-band
/// status messages.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(
        alias = "Realtime Currency Exchange Rate",
        alias = "Time Series (Digital Currency Daily)"
    )]
    payload: Option<T>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

impl<T> Envelope<T> {
    fn into_payload(self, missing: &str) -> Result<T, AdapterError> {
        if let Some(msg) = self.note.or(self.information) {
            return Err(AdapterError::rate_limited(msg));
        }
        if let Some(msg) = self.error_message {
            return Err(AdapterError::not_found(msg));
        }
        self.payload.ok_or_else(|| AdapterError::malformed(missing))
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeRate {
    #[serde(rename = "5. Exchange Rate")]
    exchange_rate: String,
    #[serde(rename = "6. Last Refreshed")]
    last_refreshed: Option<String>,
}

/// Date-keyed rows; BTreeMap keeps ISO dates in chronological order
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct DailySeries {
    rows: BTreeMap<String, DailyRow>,
}

#[derive(Debug, Deserialize)]
struct DailyRow {
    #[serde(rename = "1. open", alias = "1a. open (USD)")]
    open: String,
    #[serde(rename = "2. high", alias = "2a. high (USD)")]
    high: String,
    #[serde(rename = "3. low", alias = "3a. low (USD)")]
    low: String,
    #[serde(rename = "4. close", alias = "4a. close (USD)")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}
