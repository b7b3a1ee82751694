//! Turn orchestration over a shared session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use guardchat_config::{ConfigurationSource, EffectiveConfig, FieldName};
use guardchat_llm::{ChatResult, SharedProxy};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::session::{Session, SessionStatus};
use crate::turn::Turn;

/// Whether a turn is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Pending,
}

/// Drives submitted messages through the guardrail proxy.
///
/// At most one submit runs at a time per manager; others queue on the turn
/// lock in arrival order. Each call works against a snapshot of the
/// effective configuration taken when it starts, so overrides edited
/// mid-flight apply to the next turn. The user turn and its response are
/// appended together once the outcome is known.
pub struct ChatSessionManager {
    state: RwLock<Session>,
    turn_lock: Mutex<()>,
    proxy: SharedProxy,
    turn_timeout: Option<Duration>,
}

impl ChatSessionManager {
    /// Create a manager for `session`.
    pub fn new(session: Session, proxy: SharedProxy) -> Self {
        Self {
            state: RwLock::new(session),
            turn_lock: Mutex::new(()),
            proxy,
            turn_timeout: None,
        }
    }

    /// Start a fresh session from `defaults`.
    pub fn start(defaults: &dyn ConfigurationSource, proxy: SharedProxy) -> Self {
        Self::new(Session::new(defaults), proxy)
    }

    /// Bound each proxy call; expiry is recorded as a timeout notice.
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    /// Wrap in an `Arc` for sharing across tasks.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn session_id(&self) -> Uuid {
        self.state.read().id()
    }

    /// Name of the proxy turns are sent through.
    pub fn proxy_name(&self) -> String {
        self.proxy.name().to_string()
    }

    /// Copy of the current effective configuration.
    pub fn config(&self) -> EffectiveConfig {
        self.state.read().config().clone()
    }

    /// Copy of the transcript, oldest first.
    pub fn transcript(&self) -> Vec<Turn> {
        self.state.read().transcript().to_vec()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.read().status()
    }

    pub fn turn_state(&self) -> TurnState {
        match self.turn_lock.try_lock() {
            Ok(_) => TurnState::Idle,
            Err(_) => TurnState::Pending,
        }
    }

    /// Set a user override. Takes effect for the next submit.
    pub fn set_override(&self, field: FieldName, value: impl Into<String>) -> EffectiveConfig {
        let mut session = self.state.write();
        let config = session.set_override(field, value).clone();
        tracing::info!(
            field = %field,
            provenance = %config.field(field).provenance(),
            "Override set"
        );
        config
    }

    /// Clear a user override. Takes effect for the next submit.
    pub fn clear_override(&self, field: FieldName) -> EffectiveConfig {
        let mut session = self.state.write();
        let config = session.clear_override(field).clone();
        tracing::info!(
            field = %field,
            provenance = %config.field(field).provenance(),
            "Override cleared"
        );
        config
    }

    /// Re-query the defaults source, keeping overrides.
    pub fn refresh_defaults(&self, defaults: &dyn ConfigurationSource) -> EffectiveConfig {
        let config = self.state.write().refresh_defaults(defaults).clone();
        tracing::info!(
            source = defaults.name(),
            complete = config.is_complete(),
            "Defaults refreshed"
        );
        config
    }

    /// Drop the transcript once any in-flight turn has finished.
    pub async fn clear_transcript(&self) {
        let _turn = self.turn_lock.lock().await;
        self.state.write().clear_transcript();
        tracing::debug!("Transcript cleared");
    }

    /// Submit a user message and return the response turn.
    ///
    /// Never fails: every outcome becomes a turn. Exactly two turns are
    /// appended per completed call. If the returned future is dropped
    /// before completion nothing is appended.
    pub async fn submit(&self, text: impl Into<String>) -> Turn {
        let _turn = self.turn_lock.lock().await;

        let user = Turn::user(text);
        let (session_id, config, history) = {
            let session = self.state.read();
            (session.id(), session.config().clone(), session.history())
        };

        let response = if config.is_complete() {
            let start = Instant::now();
            let result = self.call_proxy(&config, &history, &user.text).await;
            tracing::debug!(
                session_id = %session_id,
                proxy = self.proxy.name(),
                outcome = result.label(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Proxy call finished"
            );
            Turn::from_result(result)
        } else {
            let missing = config.missing_fields();
            tracing::warn!(
                session_id = %session_id,
                missing = ?missing,
                "Configuration incomplete, skipping proxy call"
            );
            Turn::configuration_incomplete(&missing)
        };

        self.state.write().append_exchange(user, response.clone());

        tracing::info!(
            session_id = %session_id,
            outcome = response.outcome.map(|o| o.as_str()).unwrap_or("none"),
            "Turn completed"
        );
        response
    }

    async fn call_proxy(
        &self,
        config: &EffectiveConfig,
        history: &[guardchat_llm::ChatMessage],
        message: &str,
    ) -> ChatResult {
        let call = self.proxy.complete(config, history, message);
        match self.turn_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(timeout_ms = limit.as_millis() as u64, "Turn timed out");
                    ChatResult::Timeout
                }
            },
            None => call.await,
        }
    }
}
