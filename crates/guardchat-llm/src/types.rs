//! Conversation and result types shared by every proxy implementation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a message sent to the completion API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message of the conversation forwarded through the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Normalized outcome of one guarded completion.
///
/// Every proxy or transport fault is folded into one of these variants;
/// [`GuardrailProxy::complete`](crate::GuardrailProxy::complete) never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ChatResult {
    /// The policy passed and the completion text came back.
    Ok { text: String },
    /// The proxy rejected the input or the output under the active policy.
    PolicyBlocked { reason: String },
    /// Transport, auth, rate-limit or server failure.
    UpstreamError { code: Option<u16>, message: String },
    /// No response within the configured deadline.
    Timeout,
}

impl ChatResult {
    /// Successful completion.
    pub fn ok(text: impl Into<String>) -> Self {
        Self::Ok { text: text.into() }
    }

    /// Policy rejection.
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self::PolicyBlocked {
            reason: reason.into(),
        }
    }

    /// Upstream failure.
    pub fn upstream(code: Option<u16>, message: impl Into<String>) -> Self {
        Self::UpstreamError {
            code,
            message: message.into(),
        }
    }

    /// True for `Ok`.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// True only for 5xx upstream errors, the one class an opt-in retry may repeat.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamError { code: Some(500..=599), .. })
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok { .. } => "ok",
            Self::PolicyBlocked { .. } => "policy-blocked",
            Self::UpstreamError { .. } => "upstream-error",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ChatResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok { text } => write!(f, "{}", text),
            Self::PolicyBlocked { reason } => write!(f, "Blocked by policy: {}", reason),
            Self::UpstreamError {
                code: Some(code),
                message,
            } => write!(f, "Upstream error ({}): {}", code, message),
            Self::UpstreamError { code: None, message } => {
                write!(f, "Upstream error: {}", message)
            }
            Self::Timeout => write!(f, "Request timed out"),
        }
    }
}
