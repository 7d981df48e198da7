use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::OnLimit;
use crate::gateway::ProviderKind;

/// Fixed-window quota for one provider.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    pub window_start: Instant,
    pub calls_in_window: u32,
    pub configured_limit: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitSnapshot {
    pub provider: ProviderKind,
    pub calls_in_window: u32,
    pub configured_limit: u32,
    pub granted_total: u64,
    pub rejected_total: u64,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{provider} quota of {limit} calls per {window:?} exhausted (next window in {retry_after:?})")]
pub struct QuotaExhausted {
    pub provider: ProviderKind,
    pub limit: u32,
    pub window: Duration,
    pub retry_after: Duration,
}

pub struct RateLimiter {
    provider: ProviderKind,
    window: Duration,
    state: Mutex<RateLimitState>,
    granted: AtomicU64,
    rejected: AtomicU64,
}

impl RateLimiter {
    pub fn new(provider: ProviderKind, configured_limit: u32, window: Duration) -> Self {
        Self {
            provider,
            window,
            state: Mutex::new(RateLimitState {
                window_start: Instant::now(),
                calls_in_window: 0,
                configured_limit,
            }),
            granted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Take one slot in the current window, or report how long until the next one.
    pub async fn try_acquire(&self) -> std::result::Result<(), Duration> {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        // rolling over to a fresh window
        if now.duration_since(state.window_start) >= self.window {
            state.window_start = now;
            state.calls_in_window = 0;
        }

        if state.calls_in_window < state.configured_limit {
            state.calls_in_window += 1;
            self.granted.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let window_end = state.window_start + self.window;
        Err(window_end.saturating_duration_since(now))
    }

    /// Admit one call under the given policy. `Wait` sleeps across window
    /// boundaries until the total wait would exceed `max_wait`.
    pub async fn acquire(
        &self,
        on_limit: OnLimit,
        max_wait: Duration,
    ) -> std::result::Result<Duration, QuotaExhausted> {
        let mut waited = Duration::ZERO;

        loop {
            let retry_after = match self.try_acquire().await {
                Ok(()) => return Ok(waited),
                Err(retry_after) => retry_after,
            };

            let exhausted = QuotaExhausted {
                provider: self.provider,
                limit: self.configured_limit().await,
                window: self.window,
                retry_after,
            };

            match on_limit {
                OnLimit::FailFast => {
                    self.rejected.fetch_add(1, Ordering::Relaxed);
                    return Err(exhausted);
                }
                OnLimit::Wait => {
                    if waited + retry_after > max_wait {
                        self.rejected.fetch_add(1, Ordering::Relaxed);
                        return Err(exhausted);
                    }
                    debug!(
                        "{} quota exhausted, waiting {:?} for the next window",
                        self.provider, retry_after
                    );
                    // never spin on a zero-length wait
                    let pause = retry_after.max(Duration::from_millis(1));
                    sleep(pause).await;
                    waited += pause;
                }
            }
        }
    }

    async fn configured_limit(&self) -> u32 {
        self.state.lock().await.configured_limit
    }

    pub async fn snapshot(&self) -> RateLimitSnapshot {
        let state = self.state.lock().await;
        RateLimitSnapshot {
            provider: self.provider,
            calls_in_window: state.calls_in_window,
            configured_limit: state.configured_limit,
            granted_total: self.granted.load(Ordering::Relaxed),
            rejected_total: self.rejected.load(Ordering::Relaxed),
        }
    }
}
