//! Per-conversation state: default snapshot, user overrides and transcript.

use chrono::{DateTime, Utc};
use guardchat_config::{
    ConfigurationSource, CredentialOverrides, EffectiveConfig, FieldName, StaticSource, resolve,
};
use guardchat_llm::ChatMessage;
use uuid::Uuid;

use crate::turn::{Turn, TurnRole};

/// One chat session.
///
/// Defaults are captured once when the session is created (or refreshed);
/// the effective configuration is re-resolved on every override change.
/// `Session` itself is plain data. Concurrent access goes through
/// [`ChatSessionManager`](crate::ChatSessionManager).
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    defaults: StaticSource,
    overrides: CredentialOverrides,
    config: EffectiveConfig,
    transcript: Vec<Turn>,
}

/// Summary of a session for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub complete: bool,
    pub missing: Vec<FieldName>,
    /// Policy identifier as shown to the user, or "(not set)".
    pub policy: String,
    pub turn_count: usize,
}

impl Session {
    /// Start a session, querying `defaults` once for every field.
    pub fn new(defaults: &dyn ConfigurationSource) -> Self {
        let defaults = snapshot(defaults);
        let overrides = CredentialOverrides::new();
        let config = resolve(&defaults, &overrides);

        tracing::debug!(
            source = defaults.name(),
            complete = config.is_complete(),
            "Session defaults loaded"
        );

        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            defaults,
            overrides,
            config,
            transcript: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The current effective configuration.
    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    pub fn overrides(&self) -> &CredentialOverrides {
        &self.overrides
    }

    /// All turns, oldest first.
    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    /// Set a user override and re-resolve. A blank value behaves like
    /// [`clear_override`](Self::clear_override).
    pub fn set_override(&mut self, field: FieldName, value: impl Into<String>) -> &EffectiveConfig {
        self.overrides.set(field, value);
        self.re_resolve()
    }

    /// Drop a user override and fall back to the default.
    pub fn clear_override(&mut self, field: FieldName) -> &EffectiveConfig {
        self.overrides.clear(field);
        self.re_resolve()
    }

    /// Re-query a defaults source. Overrides are kept.
    pub fn refresh_defaults(&mut self, defaults: &dyn ConfigurationSource) -> &EffectiveConfig {
        self.defaults = snapshot(defaults);
        self.re_resolve()
    }

    /// Drop all turns.
    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    /// Completed exchanges to forward as conversation context.
    ///
    /// Only a user turn immediately followed by an ok assistant reply is
    /// included. Blocked and failed exchanges are left out.
    pub fn history(&self) -> Vec<ChatMessage> {
        let mut history = Vec::new();
        for pair in self.transcript.windows(2) {
            if pair[0].role == TurnRole::User && pair[1].is_ok_reply() {
                history.push(ChatMessage::user(pair[0].text.clone()));
                history.push(ChatMessage::assistant(pair[1].text.clone()));
            }
        }
        history
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            id: self.id,
            created_at: self.created_at,
            complete: self.config.is_complete(),
            missing: self.config.missing_fields(),
            policy: self.config.describe(FieldName::PolicyId),
            turn_count: self.transcript.len(),
        }
    }

    /// Append a user turn and its response together.
    pub(crate) fn append_exchange(&mut self, user: Turn, response: Turn) {
        self.transcript.reserve(2);
        self.transcript.push(user);
        self.transcript.push(response);
    }

    fn re_resolve(&mut self) -> &EffectiveConfig {
        self.config = resolve(&self.defaults, &self.overrides);
        &self.config
    }
}

fn snapshot(source: &dyn ConfigurationSource) -> StaticSource {
    FieldName::ALL
        .into_iter()
        .fold(StaticSource::new(source.name()), |acc, field| {
            match source.get(field) {
                Some(value) => acc.with(field, value),
                None => acc,
            }
        })
}
