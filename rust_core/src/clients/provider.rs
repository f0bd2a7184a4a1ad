//! Quote Provider Trait
//!
//! Defines the common contract for upstream market data adapters and the
//! typed failures they report. Implementations include CoinMarketCap,
//! Binance, CoinDesk and Alpha Vantage.

use crate::cache::CacheStore;
use crate::models::{ProviderId, QuoteFragment};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Upper bound on how much of an error body ends up in a message
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Timeout, DNS failure, refused connection, unexpected HTTP status
    Network,
    /// Upstream (or local budget) reports quota exhaustion
    RateLimited,
    /// Symbol unknown to this provider
    NotFound,
    /// Body does not match the expected schema
    MalformedResponse,
    /// Missing or rejected credential
    Unconfigured,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Network => "network",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::NotFound => "not_found",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::Unconfigured => "unconfigured",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct AdapterError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AdapterError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn timeout() -> Self {
        Self::network("timeout")
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, message)
    }

    pub fn unconfigured(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unconfigured, message)
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout()
        } else if err.is_decode() {
            Self::malformed(err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

pub type AdapterResult = Result<QuoteFragment, AdapterError>;

/// Common trait for upstream quote adapters.
///
/// Implementations only know how to perform one request and normalize its
/// response. Caching, the per-adapter timeout and basic sanity checks are
/// applied uniformly by [`QuoteProvider::fetch`].
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Hard limit for a single upstream request
    fn timeout(&self) -> Duration;

    /// Whether the credentials this provider needs are present
    fn is_configured(&self) -> bool {
        true
    }

    /// Key of this provider's partition in the shared cache
    fn cache_key(&self, symbol: &str) -> String {
        format!("{}:{}", self.id().as_str(), symbol.to_uppercase())
    }

    /// Perform exactly one upstream request and normalize the answer.
    async fn request(&self, symbol: &str) -> AdapterResult;

    /// Cached fetch.
    ///
    /// Returns the cached fragment while it is fresh, otherwise issues one
    /// request bounded by [`QuoteProvider::timeout`] and stores the result.
    /// Failures are not cached.
    async fn fetch(&self, symbol: &str, cache: &CacheStore<QuoteFragment>) -> AdapterResult {
        let key = self.cache_key(symbol);
        let started = Utc::now();

        if let Some(hit) = cache.get_valid(&key, started) {
            debug!("{} cache hit for {}", self.id(), symbol);
            return Ok(hit);
        }

        let mut fragment = match tokio::time::timeout(self.timeout(), self.request(symbol)).await {
            Ok(result) => result?,
            Err(_) => return Err(AdapterError::timeout()),
        };

        if !fragment.current_price.is_finite() || fragment.current_price <= 0.0 {
            return Err(AdapterError::malformed(format!(
                "non-positive price {} for {}",
                fragment.current_price, symbol
            )));
        }

        fragment.captured_at = started;
        cache.put(&key, fragment.clone(), started);
        Ok(fragment)
    }
}

/// Map a non-success HTTP status and body onto an adapter error.
pub fn classify_status(provider: ProviderId, status: StatusCode, body: &str) -> AdapterError {
    let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    let message = format!("{} API error: {} - {}", provider.display_name(), status, snippet);

    match status.as_u16() {
        429 => AdapterError::rate_limited(message),
        404 => AdapterError::not_found(message),
        401 | 403 => AdapterError::unconfigured(message),
        400 if body.to_lowercase().contains("invalid symbol") => AdapterError::not_found(message),
        _ => AdapterError::network(message),
    }
}

/// Pass successful responses through; turn everything else into an error.
pub async fn ensure_success(provider: ProviderId, response: Response) -> Result<Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(provider, status, &body))
}

/// Read the body and decode it, reporting schema mismatches as malformed.
pub async fn read_json<T: DeserializeOwned>(
    provider: ProviderId,
    response: Response,
) -> Result<T, AdapterError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        AdapterError::malformed(format!(
            "Failed to parse {} response: {}",
            provider.display_name(),
            e
        ))
    })
}

/// Parse a numeric field that the upstream encodes as a string.
pub fn parse_decimal(field: &str, raw: &str) -> Result<f64, AdapterError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| AdapterError::malformed(format!("field {} is not a number: {:?}", field, raw)))
}
