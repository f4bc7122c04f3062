// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limit classification and retrying with jittered backoff.
//!
//! Detection runs a pattern ladder over the error text: HTTP 429,
//! provider-specific quota errors (three providers recognised), token
//! limits, and context-window limits. `retry-after` (seconds or
//! HTTP-date) and `x-ratelimit-reset` (unix s or ms, or delta seconds)
//! headers are honored when present.

use rand::Rng;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Provider recognised from an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Google,
    Unknown,
}

/// What kind of limit was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitKind {
    Http429,
    ProviderQuota,
    TokenLimit,
    ContextWindow,
}

/// Classification of one error.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitInfo {
    pub is_rate_limit: bool,
    pub retry_after_ms: Option<u64>,
    pub provider: Provider,
    pub kind: Option<RateLimitKind>,
}

/// Detection ladder: first matching row wins.
///
/// Patterns are matched case-insensitively against the error text.
const DETECTION_RULES: &[(&str, Provider, RateLimitKind)] = &[
    ("429", Provider::Unknown, RateLimitKind::Http429),
    ("too many requests", Provider::Unknown, RateLimitKind::Http429),
    ("overloaded_error", Provider::Anthropic, RateLimitKind::ProviderQuota),
    ("anthropic", Provider::Anthropic, RateLimitKind::ProviderQuota),
    ("insufficient_quota", Provider::OpenAi, RateLimitKind::ProviderQuota),
    ("openai", Provider::OpenAi, RateLimitKind::ProviderQuota),
    ("resource_exhausted", Provider::Google, RateLimitKind::ProviderQuota),
    ("gemini", Provider::Google, RateLimitKind::ProviderQuota),
    ("tokens per min", Provider::Unknown, RateLimitKind::TokenLimit),
    ("token limit", Provider::Unknown, RateLimitKind::TokenLimit),
    ("rate limit", Provider::Unknown, RateLimitKind::ProviderQuota),
    ("context window", Provider::Unknown, RateLimitKind::ContextWindow),
    ("context length", Provider::Unknown, RateLimitKind::ContextWindow),
];

/// Quick substring check used by the router's fallback classification.
pub fn looks_rate_limited(error: &str) -> bool {
    detect(error, &HashMap::new()).is_rate_limit
}

/// Classify an error string plus optional response headers.
pub fn detect(error: &str, headers: &HashMap<String, String>) -> RateLimitInfo {
    let lowered = error.to_lowercase();
    let hit = DETECTION_RULES
        .iter()
        .find(|(pattern, _, _)| lowered.contains(pattern));

    let Some((_, provider, kind)) = hit else {
        return RateLimitInfo {
            is_rate_limit: false,
            retry_after_ms: None,
            provider: Provider::Unknown,
            kind: None,
        };
    };

    // Context-window errors are not retryable rate limits; a retry with
    // the same payload fails identically
    let is_rate_limit = *kind != RateLimitKind::ContextWindow;

    RateLimitInfo {
        is_rate_limit,
        retry_after_ms: retry_after_from_headers(headers),
        provider: *provider,
        kind: Some(*kind),
    }
}

/// Extract a retry delay from `retry-after` / `x-ratelimit-reset`.
fn retry_after_from_headers(headers: &HashMap<String, String>) -> Option<u64> {
    let lookup = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.trim())
    };

    if let Some(value) = lookup("retry-after") {
        // Plain seconds, or an HTTP-date
        if let Ok(secs) = value.parse::<u64>() {
            return Some(secs * 1_000);
        }
        if let Ok(when) = chrono::DateTime::parse_from_rfc2822(value) {
            let delta = when.timestamp_millis() - chrono::Utc::now().timestamp_millis();
            return Some(delta.max(0) as u64);
        }
    }

    if let Some(value) = lookup("x-ratelimit-reset") {
        if let Ok(raw) = value.parse::<u64>() {
            let now_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64;
            // Epoch ms, epoch s, or delta seconds
            let reset_ms = if raw >= 100_000_000_000 {
                raw
            } else if raw >= 1_000_000_000 {
                raw * 1_000
            } else {
                return Some(raw * 1_000);
            };
            return Some(reset_ms.saturating_sub(now_ms));
        }
    }

    None
}

/// Backoff parameters.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    /// Jitter fraction applied symmetrically around the computed delay
    pub jitter: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            multiplier: 2.0,
            jitter: 0.1,
            max_delay_ms: 32_000,
        }
    }
}

impl RetryConfig {
    /// Delay before retry `attempt` (0-based), jittered and capped.
    ///
    /// A server-provided `retry_after_ms` replaces the computed base but
    /// is still ±10% jittered and capped.
    pub fn delay_for(&self, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
        let mut rng = rand::rng();
        let ms = match retry_after_ms {
            Some(server_ms) => {
                let jittered = server_ms as f64 * rng.random_range(0.9..=1.1);
                jittered.min(self.max_delay_ms as f64)
            }
            None => {
                let base = self.base_delay_ms as f64 * self.multiplier.powi(attempt as i32);
                let jittered = base + rng.random_range(-self.jitter..=self.jitter) * base;
                jittered.clamp(0.0, self.max_delay_ms as f64)
            }
        };
        Duration::from_millis(ms.max(0.0) as u64)
    }
}

/// Outcome of a retried operation.
#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    pub success: bool,
    pub result: Option<T>,
    pub error: Option<String>,
    /// Attempts made, including the first
    pub attempts: u32,
    pub total_delay_ms: u64,
}

/// Run an operation, retrying rate-limited failures with backoff.
///
/// Non-rate-limit errors short-circuit immediately. Exhaustion returns a
/// non-throwing `{success: false, error}` outcome.
pub async fn execute_with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    mut op: F,
    mut on_retry: Option<&mut dyn FnMut(u32, Duration)>,
) -> RetryOutcome<T>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut total_delay_ms = 0u64;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match op(attempts - 1).await {
            Ok(result) => {
                return RetryOutcome {
                    success: true,
                    result: Some(result),
                    error: None,
                    attempts,
                    total_delay_ms,
                };
            }
            Err(e) => {
                let message = e.to_string();
                let info = detect(&message, &HashMap::new());

                if !info.is_rate_limit {
                    debug!(error = %message, "non-rate-limit error, not retrying");
                    return RetryOutcome {
                        success: false,
                        result: None,
                        error: Some(message),
                        attempts,
                        total_delay_ms,
                    };
                }
                if attempts > config.max_retries {
                    warn!(attempts, error = %message, "retries exhausted");
                    return RetryOutcome {
                        success: false,
                        result: None,
                        error: Some(message),
                        attempts,
                        total_delay_ms,
                    };
                }

                let delay = config.delay_for(attempts - 1, info.retry_after_ms);
                debug!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    provider = ?info.provider,
                    "rate limited, backing off",
                );
                if let Some(cb) = on_retry.as_mut() {
                    cb(attempts, delay);
                }
                total_delay_ms += delay.as_millis() as u64;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
