pub mod backoff;
pub mod rate_limit;

#[cfg(test)]
pub(crate) mod testing;


use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::config::{GatewayConfig, OnLimit, ProviderLimits};

pub use backoff::Backoff;
pub use rate_limit::{QuotaExhausted, RateLimitSnapshot, RateLimitState, RateLimiter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Generation,
    Search,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Generation => f.write_str("generation"),
            ProviderKind::Search => f.write_str("search"),
        }
    }
}

/// Provider-specific body of a request. `None` fields fall back to the
/// client's configured defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderPayload {
    Generation {
        prompt: String,
        max_tokens: Option<u32>,
        temperature: Option<f64>,
    },
    Search {
        query: String,
        result_count: Option<u32>,
        extra: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRequest {
    pub payload: ProviderPayload,
    pub priority: Option<u8>, // 0 = highest priority
}

impl ProviderRequest {
    pub fn generation(prompt: impl Into<String>) -> Self {
        Self {
            payload: ProviderPayload::Generation {
                prompt: prompt.into(),
                max_tokens: None,
                temperature: None,
            },
            priority: None,
        }
    }

    pub fn search(query: impl Into<String>, result_count: Option<u32>) -> Self {
        Self {
            payload: ProviderPayload::Search {
                query: query.into(),
                result_count,
                extra: BTreeMap::new(),
            },
            priority: None,
        }
    }

    /// Adds a provider-specific query parameter. No effect on generation requests.
    pub fn with_search_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let ProviderPayload::Search { ref mut extra, .. } = self.payload {
            extra.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_priority(mut self, priority: Option<u8>) -> Self {
        self.priority = priority;
        self
    }

    pub fn provider(&self) -> ProviderKind {
        match self.payload {
            ProviderPayload::Generation { .. } => ProviderKind::Generation,
            ProviderPayload::Search { .. } => ProviderKind::Search,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Success,
    RateLimited,
    ProviderError,
    Timeout,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    pub provider: ProviderKind,
    pub status: ProviderStatus,
    pub raw_payload: Value,
    pub message: Option<String>,
    pub latency_ms: u64,
    pub attempts: u32,
}

impl ProviderResponse {
    pub fn is_success(&self) -> bool {
        self.status == ProviderStatus::Success
    }
}

/// A single failed exchange as reported by a provider client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderFault {
    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("provider server error: {0}")]
    Server(String),

    #[error("provider rejected request: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Request could not be derived from the invocation parameters.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("malformed request: {0}")]
pub struct RequestError(pub String);

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn kind(&self) -> ProviderKind;
    async fn send(&self, request: &ProviderRequest) -> std::result::Result<Value, ProviderFault>;
}

/// Retry policy shared by every provider behind a gateway.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub per_call_timeout: Duration,
    pub on_limit: OnLimit,
    pub max_wait: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            per_call_timeout: config.per_call_timeout(),
            on_limit: config.on_limit,
            max_wait: config.max_wait(),
            backoff: Backoff::from_config(config),
        }
    }
}

enum AttemptFailure {
    Malformed(String),
    Quota(QuotaExhausted),
    Fault(ProviderFault),
    TimedOut(Duration),
}

impl AttemptFailure {
    fn status(&self) -> ProviderStatus {
        match self {
            AttemptFailure::Malformed(_) => ProviderStatus::ProviderError,
            AttemptFailure::Quota(_) => ProviderStatus::RateLimited,
            AttemptFailure::Fault(ProviderFault::RateLimited(_)) => ProviderStatus::RateLimited,
            AttemptFailure::Fault(_) => ProviderStatus::ProviderError,
            AttemptFailure::TimedOut(_) => ProviderStatus::Timeout,
        }
    }

    fn is_transient(&self, on_limit: OnLimit) -> bool {
        match self {
            AttemptFailure::Malformed(_) => false,
            AttemptFailure::Quota(_) | AttemptFailure::Fault(ProviderFault::RateLimited(_)) => {
                on_limit == OnLimit::Wait
            }
            AttemptFailure::Fault(ProviderFault::Server(_)) => true,
            AttemptFailure::Fault(ProviderFault::Transport(_)) => true,
            AttemptFailure::Fault(ProviderFault::Rejected(_)) => false,
            AttemptFailure::TimedOut(_) => true,
        }
    }

    fn message(&self) -> String {
        match self {
            AttemptFailure::Malformed(message) => format!("malformed request: {}", message),
            AttemptFailure::Quota(exhausted) => exhausted.to_string(),
            AttemptFailure::Fault(fault) => fault.to_string(),
            AttemptFailure::TimedOut(after) => format!("no response within {:?}", after),
        }
    }
}

/// Uniform entry point to the external providers. Every call is rate
/// limited, timed out and retried here; callers only ever see a
/// `ProviderResponse`.
pub struct Gateway {
    clients: HashMap<ProviderKind, Arc<dyn ProviderClient>>,
    limiters: HashMap<ProviderKind, Arc<RateLimiter>>,
    policy: RetryPolicy,
}

impl Gateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self::with_policy(RetryPolicy::from_config(config))
    }

    pub fn with_policy(policy: RetryPolicy) -> Self {
        Self {
            clients: HashMap::new(),
            limiters: HashMap::new(),
            policy,
        }
    }

    /// Registers a client together with its quota, replacing any previous
    /// client of the same kind.
    pub fn with_provider(mut self, client: Arc<dyn ProviderClient>, limits: &ProviderLimits) -> Self {
        let kind = client.kind();
        self.limiters.insert(
            kind,
            Arc::new(RateLimiter::new(kind, limits.rate_limit, limits.window)),
        );
        self.clients.insert(kind, client);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn limiter(&self, kind: ProviderKind) -> Option<&Arc<RateLimiter>> {
        self.limiters.get(&kind)
    }

    pub fn providers(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.clients.keys().copied().collect();
        kinds.sort_by_key(|kind| *kind as u8);
        kinds
    }

    pub async fn call(&self, request: ProviderRequest) -> ProviderResponse {
        let provider = request.provider();
        self.call_with(provider, move || Ok(request.clone())).await
    }

    /// Runs the retry loop, rebuilding the request from `build` before every attempt.
    pub async fn call_with<F>(&self, provider: ProviderKind, build: F) -> ProviderResponse
    where
        F: Fn() -> std::result::Result<ProviderRequest, RequestError>,
    {
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("{} call attempt {}/{}", provider, attempt, self.policy.max_attempts);

            let failure = match self.attempt(provider, &build).await {
                Ok(payload) => {
                    return ProviderResponse {
                        provider,
                        status: ProviderStatus::Success,
                        raw_payload: payload,
                        message: None,
                        latency_ms: started.elapsed().as_millis() as u64,
                        attempts: attempt,
                    };
                }
                Err(failure) => failure,
            };

            let retryable = failure.is_transient(self.policy.on_limit);
            if !retryable || attempt >= self.policy.max_attempts {
                if retryable {
                    warn!(
                        "{} call gave up after {} attempts: {}",
                        provider,
                        attempt,
                        failure.message()
                    );
                } else {
                    debug!("{} call failed without retry: {}", provider, failure.message());
                }
                return ProviderResponse {
                    provider,
                    status: failure.status(),
                    raw_payload: Value::Null,
                    message: Some(failure.message()),
                    latency_ms: started.elapsed().as_millis() as u64,
                    attempts: attempt,
                };
            }

            let delay = self.policy.backoff.delay(attempt);
            warn!(
                "{} call attempt {} failed ({}), retrying in {:?}",
                provider,
                attempt,
                failure.message(),
                delay
            );
            sleep(delay).await;
        }
    }

    async fn attempt<F>(&self, provider: ProviderKind, build: &F) -> std::result::Result<Value, AttemptFailure>
    where
        F: Fn() -> std::result::Result<ProviderRequest, RequestError>,
    {
        let request = build().map_err(|e| AttemptFailure::Malformed(e.0))?;
        if request.provider() != provider {
            return Err(AttemptFailure::Malformed(format!(
                "{} request routed to the {} provider",
                request.provider(),
                provider
            )));
        }

        let (client, limiter) = match (self.clients.get(&provider), self.limiters.get(&provider)) {
            (Some(client), Some(limiter)) => (client, limiter),
            _ => {
                return Err(AttemptFailure::Fault(ProviderFault::Rejected(format!(
                    "no {} provider configured",
                    provider
                ))))
            }
        };

        let waited = limiter
            .acquire(self.policy.on_limit, self.policy.max_wait)
            .await
            .map_err(AttemptFailure::Quota)?;
        if !waited.is_zero() {
            debug!("{} call admitted after waiting {:?}", provider, waited);
        }

        match timeout(self.policy.per_call_timeout, client.send(&request)).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(fault)) => Err(AttemptFailure::Fault(fault)),
            Err(_) => Err(AttemptFailure::TimedOut(self.policy.per_call_timeout)),
        }
    }
}
