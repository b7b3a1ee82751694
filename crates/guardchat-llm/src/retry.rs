//! Opt-in bounded retry around a proxy.
//!
//! Only 5xx upstream errors are repeated. Policy rejections, timeouts and
//! every other failure are returned after the first attempt.

use std::time::Duration;

use async_trait::async_trait;
use guardchat_config::{EffectiveConfig, ProxySettings};

use crate::proxy::GuardrailProxy;
use crate::types::{ChatMessage, ChatResult};

/// How many extra attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first (0 disables retrying).
    pub max_retries: u32,
    /// Wait before the first retry; doubled after each retry.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// A single attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Read `retry_max` / `retry_backoff_ms` from proxy settings.
    pub fn from_settings(settings: &ProxySettings) -> Self {
        Self {
            max_retries: settings.retry_max,
            initial_backoff: settings.retry_backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Wraps a proxy and repeats 5xx failures with exponential backoff.
pub struct RetryingProxy<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: GuardrailProxy> RetryingProxy<P> {
    /// Wrap `inner` with `policy`.
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<P: GuardrailProxy> GuardrailProxy for RetryingProxy<P> {
    async fn complete(
        &self,
        config: &EffectiveConfig,
        history: &[ChatMessage],
        message: &str,
    ) -> ChatResult {
        let mut backoff = self.policy.initial_backoff;
        let mut attempt = 0;

        loop {
            let result = self.inner.complete(config, history, message).await;
            if !result.is_retryable() || attempt >= self.policy.max_retries {
                return result;
            }

            attempt += 1;
            tracing::warn!(
                proxy = self.inner.name(),
                attempt = attempt,
                max_retries = self.policy.max_retries,
                backoff_ms = backoff.as_millis() as u64,
                "Upstream server error, retrying"
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
