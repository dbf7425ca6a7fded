//! Per-client request budgets.
use crate::error::Result;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

/// Requests allowed per client and hour.
pub const RATE_LIMIT: u32 = 50;

const WINDOW_SECONDS: i64 = 3600;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RateLimit {
    pub exceeded: bool,
    pub limit: u32,
    pub current: u32,
    pub retry_after: DateTime<Utc>,
}

/// Who is asking: the client address and an optional consumer token
/// lifting the limit.
#[derive(Clone, Debug)]
pub struct ClientIdentity {
    pub ip_address: String,
    pub consumer_token: Option<String>,
}

impl ClientIdentity {
    pub fn new(ip_address: &str) -> Self {
        Self {
            ip_address: ip_address.to_string(),
            consumer_token: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.consumer_token = Some(token.to_string());
        self
    }
}

pub trait RateLimiter {
    /// Counts a request from `client` and reports its budget.
    fn check_limit(&self, client: &ClientIdentity) -> Result<RateLimit>;
}

/// Hourly fixed-window counters kept in memory.
pub struct MemoryRateLimiter {
    limit: u32,
    counters: Mutex<HashMap<(i64, String), u32>>,
    tokens: Mutex<HashSet<String>>,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self::with_limit(RATE_LIMIT)
    }

    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            counters: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashSet::new()),
        }
    }

    /// Registers a consumer token exempt from the limit.
    pub fn register_token(&self, token: &str) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.to_string());
    }

    fn has_token(&self, token: &str) -> bool {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(token)
    }

    /// `check_limit` as seen at `now`.
    pub fn check_limit_at(&self, client: &ClientIdentity, now: DateTime<Utc>) -> RateLimit {
        let seconds = now.timestamp();
        let window = seconds - seconds.rem_euclid(WINDOW_SECONDS);
        let retry_after = Utc
            .timestamp_opt(window + WINDOW_SECONDS, 0)
            .single()
            .unwrap_or(now);

        let current = {
            let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
            counters.retain(|(w, _), _| *w == window);
            let counter = counters
                .entry((window, client.ip_address.clone()))
                .or_insert(0);
            *counter += 1;
            *counter
        };
        log::debug!(
            "[ratelimit] client '{}' has made {} requests this hour",
            client.ip_address,
            current
        );

        let exceeded = current >= self.limit
            && match &client.consumer_token {
                None => {
                    log::info!("[ratelimit] ip address '{}' exceeded the limit!", client.ip_address);
                    true
                }
                Some(token) if !self.has_token(token) => {
                    log::info!(
                        "[ratelimit] consumer token '{}' for ip address '{}' is not valid!",
                        token,
                        client.ip_address
                    );
                    true
                }
                Some(_) => false,
            };

        RateLimit {
            exceeded,
            limit: self.limit,
            current,
            retry_after,
        }
    }
}

impl RateLimiter for MemoryRateLimiter {
    fn check_limit(&self, client: &ClientIdentity) -> Result<RateLimit> {
        Ok(self.check_limit_at(client, Utc::now()))
    }
}
