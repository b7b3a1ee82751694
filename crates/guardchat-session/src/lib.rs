//! Chat sessions for guardchat.
//!
//! A [`Session`] holds the defaults snapshot, the user's credential
//! overrides and the transcript. [`ChatSessionManager`] wraps one session
//! and serializes submitted messages through a guardrail proxy:
//!
//! ```rust,ignore
//! use guardchat_session::ChatSessionManager;
//!
//! let manager = ChatSessionManager::start(&EnvSource::new(), proxy);
//! manager.set_override(FieldName::OpenaiApiKey, "sk-...");
//! let turn = manager.submit("hello").await;
//! ```

mod manager;
mod session;
mod turn;

pub use manager::{ChatSessionManager, TurnState};
pub use session::{Session, SessionStatus};
pub use turn::{Turn, TurnOutcome, TurnRole};
