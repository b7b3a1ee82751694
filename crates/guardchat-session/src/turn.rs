//! Transcript entries.

use chrono::{DateTime, Utc};
use guardchat_config::FieldName;
use guardchat_llm::ChatResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TurnRole {
    User,
    Assistant,
    /// A notice produced by the client itself (blocked, error, misconfiguration).
    SystemNotice,
}

/// How a response turn came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TurnOutcome {
    Ok,
    BlockedByPolicy,
    UpstreamError,
    ConfigurationIncomplete,
}

impl TurnOutcome {
    /// Tag as written in logs and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnOutcome::Ok => "ok",
            TurnOutcome::BlockedByPolicy => "blocked-by-policy",
            TurnOutcome::UpstreamError => "upstream-error",
            TurnOutcome::ConfigurationIncomplete => "configuration-incomplete",
        }
    }
}

impl std::fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the append-only transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub role: TurnRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// `None` for user turns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TurnOutcome>,
    /// Policy-block reason or upstream error detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Turn {
    fn new(
        role: TurnRole,
        text: String,
        outcome: Option<TurnOutcome>,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text,
            timestamp: Utc::now(),
            outcome,
            reason,
        }
    }

    /// A message typed by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, text.into(), None, None)
    }

    /// A successful assistant reply.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, text.into(), Some(TurnOutcome::Ok), None)
    }

    /// The notice recorded instead of a network call when fields are missing.
    pub fn configuration_incomplete(missing: &[FieldName]) -> Self {
        let names: Vec<_> = missing.iter().map(|f| f.display_name()).collect();
        let detail = names.join(", ");
        Self::new(
            TurnRole::SystemNotice,
            format!("Please configure your API credentials (missing: {}).", detail),
            Some(TurnOutcome::ConfigurationIncomplete),
            Some(detail),
        )
    }

    /// Map a proxy result to the response turn recorded for it.
    pub fn from_result(result: ChatResult) -> Self {
        match result {
            ChatResult::Ok { text } => Self::assistant(text),
            ChatResult::PolicyBlocked { ref reason } => Self::new(
                TurnRole::SystemNotice,
                result.to_string(),
                Some(TurnOutcome::BlockedByPolicy),
                Some(reason.clone()),
            ),
            ChatResult::UpstreamError { ref message, .. } => Self::new(
                TurnRole::SystemNotice,
                result.to_string(),
                Some(TurnOutcome::UpstreamError),
                Some(message.clone()),
            ),
            ChatResult::Timeout => Self::new(
                TurnRole::SystemNotice,
                result.to_string(),
                Some(TurnOutcome::UpstreamError),
                Some("timeout".to_string()),
            ),
        }
    }

    /// True for user turns.
    pub fn is_user(&self) -> bool {
        self.role == TurnRole::User
    }

    /// True for an assistant reply that passed the policy.
    pub fn is_ok_reply(&self) -> bool {
        self.role == TurnRole::Assistant && self.outcome == Some(TurnOutcome::Ok)
    }
}
