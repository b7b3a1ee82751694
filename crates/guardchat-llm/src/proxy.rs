//! Guardrail proxy trait and a scripted mock for tests.
//!
//! The proxy is the single integration point with the completion API: it
//! evaluates the named policy, forwards to the provider only when the input
//! passes, and evaluates the output before returning it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use guardchat_config::EffectiveConfig;
use parking_lot::Mutex;

use crate::types::{ChatMessage, ChatResult};

// ─────────────────────────────────────────────────────────────────────────────
// Proxy Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A client that runs one chat completion through a guardrail proxy.
///
/// Callers must only invoke [`complete`](Self::complete) with a complete
/// config; implementations translate every fault into a [`ChatResult`]
/// instead of returning an error, and make exactly one attempt.
#[async_trait]
pub trait GuardrailProxy: Send + Sync {
    /// Send `history` followed by `message` under `config`'s policy.
    ///
    /// `config` is a snapshot owned by the caller for the duration of the call.
    async fn complete(
        &self,
        config: &EffectiveConfig,
        history: &[ChatMessage],
        message: &str,
    ) -> ChatResult;

    /// Name of this proxy for logs.
    fn name(&self) -> &str;
}

/// Shared proxy handle.
pub type SharedProxy = Arc<dyn GuardrailProxy>;

#[async_trait]
impl<P: GuardrailProxy + ?Sized> GuardrailProxy for Arc<P> {
    async fn complete(
        &self,
        config: &EffectiveConfig,
        history: &[ChatMessage],
        message: &str,
    ) -> ChatResult {
        (**self).complete(config, history, message).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Proxy
// ─────────────────────────────────────────────────────────────────────────────

/// One call observed by [`MockProxy`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// The config snapshot the call was made with.
    pub config: EffectiveConfig,
    /// Prior conversation forwarded with the call.
    pub history: Vec<ChatMessage>,
    /// The new user message.
    pub message: String,
}

/// A mock proxy that returns scripted results.
///
/// Results are returned in order. In echo mode, each call answers
/// `Ok("echo: <message>")` once the script is exhausted; otherwise an
/// exhausted script yields an `UpstreamError`.
pub struct MockProxy {
    name: String,
    responses: Mutex<VecDeque<ChatResult>>,
    echo: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockProxy {
    /// Create a mock returning the given results in order.
    pub fn new(responses: Vec<ChatResult>) -> Self {
        Self {
            name: "mock".to_string(),
            responses: Mutex::new(responses.into()),
            echo: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Create a mock with a single successful reply.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![ChatResult::ok(text)])
    }

    /// Create a mock that echoes every message back.
    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::new(Vec::new())
        }
    }

    /// Sleep for `delay` inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Highest number of calls that were ever in progress at once.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GuardrailProxy for MockProxy {
    async fn complete(
        &self,
        config: &EffectiveConfig,
        history: &[ChatMessage],
        message: &str,
    ) -> ChatResult {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.calls.lock().push(RecordedCall {
            config: config.clone(),
            history: history.to_vec(),
            message: message.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.responses.lock().pop_front();
        let result = match scripted {
            Some(result) => result,
            None if self.echo => ChatResult::ok(format!("echo: {}", message)),
            None => ChatResult::upstream(None, "MockProxy: no more responses available"),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
