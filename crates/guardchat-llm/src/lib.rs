//! Guardrail proxy client for guardchat.
//!
//! Every completion goes through a content-safety proxy that evaluates a
//! named policy on the way in and on the way out. The client never talks to
//! the completion API directly.
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  GuardrailProxy trait                            │
//! │  - complete(config, history, msg) -> ChatResult  │
//! └──────────────────────────────────────────────────┘
//!          │                  │                 │
//!          ▼                  ▼                 ▼
//!   ┌──────────────┐  ┌──────────────────┐  ┌───────────┐
//!   │ KentronProxy │  │ RetryingProxy<P> │  │ MockProxy │
//!   └──────────────┘  └──────────────────┘  └───────────┘
//! ```
//!
//! Outcomes are normalized into [`ChatResult`]: `Ok`, `PolicyBlocked`,
//! `UpstreamError` or `Timeout`. Streaming is not supported.

pub mod error;
pub mod kentron;
pub mod proxy;
pub mod retry;
pub mod types;

pub use error::{ProxyError, Result};
pub use kentron::{KentronConfig, KentronProxy};
pub use proxy::{GuardrailProxy, MockProxy, RecordedCall, SharedProxy};
pub use retry::{RetryPolicy, RetryingProxy};
pub use types::{ChatMessage, ChatResult, Role};
