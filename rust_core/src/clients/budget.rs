//! Local request budget per upstream
//!
//! Sliding window limiter that keeps an adapter under its provider's quota
//! before the provider has to tell us. Cache hits never reach it.

use super::provider::AdapterError;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

/// Returned when the window is full
#[derive(Debug, Clone)]
pub struct BudgetExhausted {
    pub limit: usize,
    pub window_secs: i64,
    pub retry_after_secs: i64,
}

impl fmt::Display for BudgetExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "local budget of {} requests per {}s exhausted. Retry after {}s",
            self.limit, self.window_secs, self.retry_after_secs
        )
    }
}

impl std::error::Error for BudgetExhausted {}

impl From<BudgetExhausted> for AdapterError {
    fn from(err: BudgetExhausted) -> Self {
        AdapterError::rate_limited(err.to_string())
    }
}

pub struct RequestBudget {
    sent: Mutex<VecDeque<DateTime<Utc>>>,
    max_requests: usize,
    window: Duration,
}

impl RequestBudget {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            sent: Mutex::new(VecDeque::with_capacity(max_requests + 1)),
            max_requests,
            window,
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::minutes(1))
    }

    /// Record one request if the window has room.
    pub fn try_acquire(&self) -> Result<(), BudgetExhausted> {
        self.try_acquire_at(Utc::now())
    }

    pub fn try_acquire_at(&self, now: DateTime<Utc>) -> Result<(), BudgetExhausted> {
        let window_start = now - self.window;
        let mut sent = self.sent.lock();

        while sent.front().map_or(false, |ts| *ts <= window_start) {
            sent.pop_front();
        }

        if sent.len() >= self.max_requests {
            let oldest = sent.front().copied().unwrap_or(now);
            let retry_after = (oldest + self.window - now).num_seconds().max(1);
            return Err(BudgetExhausted {
                limit: self.max_requests,
                window_secs: self.window.num_seconds(),
                retry_after_secs: retry_after,
            });
        }

        sent.push_back(now);
        Ok(())
    }
}
