//! Kentron guardrail proxy client (BYOK mode).
//!
//! Kentron exposes an OpenAI-compatible chat completions endpoint. The user's
//! provider key travels as the bearer token, while the Kentron key and the
//! policy identifier travel as headers:
//!
//! ```text
//! POST {base_url}/chat/completions
//! Authorization: Bearer <openai key>
//! X-API-KEY:     <kentron key>
//! X-Policy-ID:   <policy id>
//! ```
//!
//! The proxy checks the input against the policy, forwards to the provider,
//! checks the output, and returns either a normal completion or a rejection.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use guardchat_config::{EffectiveConfig, FieldName, ProxySettings, secrets};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::error::{ProxyError, Result};
use crate::proxy::GuardrailProxy;
use crate::types::{ChatMessage, ChatResult};

/// Header carrying the Kentron API key (`X-API-KEY`).
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the guardrail policy identifier (`X-Policy-ID`).
pub const POLICY_HEADER: &str = "x-policy-id";

/// Markers in an error `type`/`code` that identify a policy rejection.
const POLICY_MARKERS: [&str; 4] = ["policy", "guardrail", "content_filter", "blocked"];

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the Kentron proxy client.
#[derive(Debug, Clone)]
pub struct KentronConfig {
    /// Base URL of the proxy (e.g. `http://demo.kentron.ai/v1`).
    pub base_url: String,

    /// Model requested from the upstream provider.
    pub model: String,

    /// Per-request deadline.
    pub timeout: Duration,

    /// Optional system prompt prepended to every conversation.
    pub system_prompt: Option<String>,

    /// Name for this client instance.
    pub name: String,
}

impl KentronConfig {
    /// Build from loaded proxy settings.
    pub fn from_settings(settings: &ProxySettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            timeout: settings.timeout,
            system_prompt: settings.system_prompt.clone(),
            name: "kentron".to_string(),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

impl Default for KentronConfig {
    fn default() -> Self {
        Self::from_settings(&ProxySettings::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Kentron Proxy
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client for the Kentron guardrail proxy.
pub struct KentronProxy {
    client: Client,
    config: KentronConfig,
}

impl KentronProxy {
    /// Create a new proxy client with the given configuration.
    pub fn new(config: KentronConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProxyError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// The active configuration.
    pub fn config(&self) -> &KentronConfig {
        &self.config
    }

    /// Build the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Build the credential headers from a config snapshot.
    fn headers(config: &EffectiveConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let openai_key = required(config, FieldName::OpenaiApiKey)?;
        headers.insert(
            AUTHORIZATION,
            header_value(FieldName::OpenaiApiKey, &format!("Bearer {}", openai_key))?,
        );
        headers.insert(
            API_KEY_HEADER,
            header_value(
                FieldName::KentronApiKey,
                required(config, FieldName::KentronApiKey)?,
            )?,
        );
        headers.insert(
            POLICY_HEADER,
            header_value(FieldName::PolicyId, required(config, FieldName::PolicyId)?)?,
        );

        Ok(headers)
    }

    /// Assemble the OpenAI-compatible request body.
    fn to_request<'a>(&'a self, history: &'a [ChatMessage], message: &'a str) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 2);

        if let Some(ref system) = self.config.system_prompt {
            messages.push(WireMessage {
                role: "system",
                content: system,
            });
        }
        for m in history {
            messages.push(WireMessage {
                role: m.role.as_str(),
                content: &m.content,
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: message,
        });

        ChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
        }
    }

    /// Run the HTTP exchange, returning the completion text or a fault.
    async fn send(
        &self,
        config: &EffectiveConfig,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String> {
        let headers = Self::headers(config)?;
        let body = self.to_request(history, message);

        tracing::debug!(
            proxy = %self.config.name,
            model = %self.config.model,
            policy = %secrets::preview(config.policy_id().unwrap_or_default()),
            messages = body.messages.len(),
            "Sending guarded completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn handle_response(response: Response) -> Result<String> {
        let status = response.status().as_u16();
        let body = response.text().await?;

        if (200..300).contains(&status) {
            classify_success(status, &body)
        } else {
            Err(classify_error(status, &body))
        }
    }
}

#[async_trait]
impl GuardrailProxy for KentronProxy {
    async fn complete(
        &self,
        config: &EffectiveConfig,
        history: &[ChatMessage],
        message: &str,
    ) -> ChatResult {
        let started = Instant::now();
        let result = match self.send(config, history, message).await {
            Ok(text) => ChatResult::Ok { text },
            Err(e) => {
                tracing::warn!(proxy = %self.config.name, error = %e, "Guarded completion failed");
                e.into()
            }
        };

        tracing::info!(
            proxy = %self.config.name,
            outcome = result.label(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Guarded completion finished"
        );
        result
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

fn required(config: &EffectiveConfig, field: FieldName) -> Result<&str> {
    config
        .field(field)
        .value()
        .ok_or_else(|| ProxyError::Config(format!("{} is not set", field.display_name())))
}

fn header_value(field: FieldName, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| {
        ProxyError::Config(format!(
            "{} contains characters not allowed in an HTTP header",
            field.display_name()
        ))
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Response classification
// ─────────────────────────────────────────────────────────────────────────────

/// Interpret a 2xx body.
fn classify_success(status: u16, body: &str) -> Result<String> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| ProxyError::InvalidResponse {
            status,
            message: e.to_string(),
        })?;

    if let Some(reason) = parsed.block.reason() {
        return Err(ProxyError::PolicyBlocked(reason));
    }

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProxyError::InvalidResponse {
            status,
            message: "response contained no choices".to_string(),
        })?;

    // The filtered content is never surfaced, not even as the reason.
    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(ProxyError::PolicyBlocked("content_filter".to_string()));
    }

    choice
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| ProxyError::InvalidResponse {
            status,
            message: "response contained no completion text".to_string(),
        })
}

/// Interpret a non-2xx body.
fn classify_error(status: u16, body: &str) -> ProxyError {
    let parsed: ErrorResponse = serde_json::from_str(body).unwrap_or_default();

    if let Some(reason) = parsed.block.reason() {
        return ProxyError::PolicyBlocked(reason);
    }

    let detail = parsed.error.unwrap_or_default();
    let message = detail
        .message
        .clone()
        .or(parsed.message)
        .or(parsed.detail)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                body.trim().to_string()
            }
        });

    if detail.is_policy_rejection() {
        let reason = match detail.stage.as_deref() {
            Some(stage) if !stage.is_empty() => format!("{}: {}", stage, message),
            _ => message,
        };
        return ProxyError::PolicyBlocked(reason);
    }

    ProxyError::Http { status, message }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(flatten)]
    block: BlockMarker,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Top-level rejection markers a proxy may attach to any response.
#[derive(Debug, Default, Deserialize)]
struct BlockMarker {
    #[serde(default)]
    blocked: Option<bool>,
    #[serde(default, alias = "blockedReason")]
    blocked_reason: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

impl BlockMarker {
    /// Blank reasons do not count as a block on their own.
    fn reason(&self) -> Option<String> {
        if let Some(reason) = non_blank(&self.blocked_reason) {
            return Some(reason);
        }
        if self.blocked == Some(true) {
            return Some(
                non_blank(&self.reason).unwrap_or_else(|| "blocked by policy".to_string()),
            );
        }
        None
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(flatten)]
    block: BlockMarker,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    stage: Option<String>,
}

impl ErrorDetail {
    fn is_policy_rejection(&self) -> bool {
        let code = self.code.as_ref().and_then(|c| c.as_str());
        [self.kind.as_deref(), code]
            .into_iter()
            .flatten()
            .map(|s| s.to_ascii_lowercase())
            .any(|s| POLICY_MARKERS.iter().any(|m| s.contains(m)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use guardchat_config::{CredentialOverrides, StaticSource, resolve};

    fn complete_config() -> EffectiveConfig {
        resolve(
            &StaticSource::new("t")
                .with(FieldName::KentronApiKey, "kt-key")
                .with(FieldName::OpenaiApiKey, "sk-key")
                .with(FieldName::PolicyId, "policy-1"),
            &CredentialOverrides::new(),
        )
    }

    #[test]
    fn test_default_config() {
        let config = KentronConfig::default();
        assert_eq!(config.base_url, "http://demo.kentron.ai/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.name, "kentron");
    }

    #[test]
    fn test_config_builder() {
        let config = KentronConfig::default()
            .with_base_url("http://proxy.local/v1/")
            .with_model("gpt-4o")
            .with_timeout(Duration::from_secs(5))
            .with_system_prompt("be brief");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.system_prompt.as_deref(), Some("be brief"));
    }

    #[test]
    fn test_completions_url_trims_trailing_slash() {
        let proxy =
            KentronProxy::new(KentronConfig::default().with_base_url("http://proxy.local/v1/"))
                .unwrap();
        assert_eq!(
            proxy.completions_url(),
            "http://proxy.local/v1/chat/completions"
        );
    }

    #[test]
    fn test_headers_carry_all_credentials() {
        let headers = KentronProxy::headers(&complete_config()).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-key");
        assert_eq!(headers[API_KEY_HEADER], "kt-key");
        assert_eq!(headers[POLICY_HEADER], "policy-1");
    }

    #[test]
    fn test_headers_reject_incomplete_config() {
        let config = resolve(&StaticSource::new("t"), &CredentialOverrides::new());
        let err = KentronProxy::headers(&config).unwrap_err();
        assert!(matches!(err, ProxyError::Config(_)));
    }

    #[test]
    fn test_headers_reject_control_characters() {
        let config = resolve(
            &StaticSource::new("t")
                .with(FieldName::KentronApiKey, "kt\nkey")
                .with(FieldName::OpenaiApiKey, "sk-key")
                .with(FieldName::PolicyId, "p"),
            &CredentialOverrides::new(),
        );
        let err = KentronProxy::headers(&config).unwrap_err();
        assert!(err.to_string().contains("Kentron API Key"));
        assert!(!err.to_string().contains("kt\nkey"));
    }

    #[test]
    fn test_request_body_order() {
        let proxy =
            KentronProxy::new(KentronConfig::default().with_system_prompt("sys")).unwrap();
        let history = vec![ChatMessage::user("q1"), ChatMessage::assistant("a1")];
        let request = proxy.to_request(&history, "q2");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["stream"], false);
        let roles: Vec<_> = json["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(json["messages"][3]["content"], "q2");
    }

    #[test]
    fn test_classify_success_text() {
        let body = r#"{"id":"c1","model":"gpt-4o-mini","choices":[{"message":{"role":"assistant","content":"Hello!"},"finish_reason":"stop"}]}"#;
        assert_eq!(classify_success(200, body).unwrap(), "Hello!");
    }

    #[test]
    fn test_classify_success_content_filter() {
        let body = r#"{"choices":[{"message":{"content":null},"finish_reason":"content_filter"}]}"#;
        let err = classify_success(200, body).unwrap_err();
        assert!(matches!(err, ProxyError::PolicyBlocked(r) if r == "content_filter"));
    }

    #[test]
    fn test_classify_success_block_marker() {
        let body = r#"{"blocked":true,"reason":"pii detected","choices":[]}"#;
        let err = classify_success(200, body).unwrap_err();
        assert!(matches!(err, ProxyError::PolicyBlocked(r) if r == "pii detected"));

        let body = r#"{"blockedReason":"profanity"}"#;
        let err = classify_success(200, body).unwrap_err();
        assert!(matches!(err, ProxyError::PolicyBlocked(r) if r == "profanity"));
    }

    #[test]
    fn test_content_filter_never_echoes_filtered_output() {
        let body = r#"{"choices":[{"message":{"content":"TOXIC PARTIAL OUTPUT"},"finish_reason":"content_filter"}]}"#;
        let result: ChatResult = classify_success(200, body).unwrap_err().into();
        assert_eq!(result, ChatResult::blocked("content_filter"));
    }

    #[test]
    fn test_blank_block_reason_is_not_a_block() {
        let body = r#"{"blocked_reason":"","choices":[{"message":{"content":"fine"},"finish_reason":"stop"}]}"#;
        assert_eq!(classify_success(200, body).unwrap(), "fine");

        let body = r#"{"blockedReason":"   ","blocked":false,"choices":[{"message":{"content":"fine"}}]}"#;
        assert_eq!(classify_success(200, body).unwrap(), "fine");
    }

    #[test]
    fn test_blocked_flag_with_blank_reason_uses_generic_reason() {
        let body = r#"{"blocked":true,"reason":"","choices":[]}"#;
        let err = classify_success(200, body).unwrap_err();
        assert!(matches!(err, ProxyError::PolicyBlocked(r) if r == "blocked by policy"));
    }

    #[test]
    fn test_classify_error_top_level_block_marker() {
        let result: ChatResult = classify_error(403, r#"{"blocked":true,"reason":"pii"}"#).into();
        assert_eq!(result, ChatResult::blocked("pii"));

        let result: ChatResult =
            classify_error(400, r#"{"blocked_reason":"jailbreak attempt"}"#).into();
        assert_eq!(result, ChatResult::blocked("jailbreak attempt"));

        let err = classify_error(400, r#"{"blocked_reason":"","message":"bad request"}"#);
        assert!(matches!(err, ProxyError::Http { status: 400, ref message } if message == "bad request"));
    }

    #[test]
    fn test_classify_success_malformed() {
        let err = classify_success(200, "not json").unwrap_err();
        assert!(matches!(err, ProxyError::InvalidResponse { status: 200, .. }));

        let err = classify_success(200, r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidResponse { .. }));
    }

    #[test]
    fn test_classify_error_policy_with_stage() {
        let body = r#"{"error":{"message":"profanity","type":"policy_violation","stage":"input"}}"#;
        let err = classify_error(400, body);
        assert!(matches!(err, ProxyError::PolicyBlocked(r) if r == "input: profanity"));
    }

    #[test]
    fn test_classify_error_policy_by_code() {
        let body = r#"{"error":{"message":"toxic output","code":"guardrail_triggered"}}"#;
        let err = classify_error(403, body);
        assert!(matches!(err, ProxyError::PolicyBlocked(r) if r == "toxic output"));
    }

    #[test]
    fn test_classify_error_auth_is_upstream() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        let err = classify_error(401, body);
        assert!(matches!(
            err,
            ProxyError::Http { status: 401, ref message } if message == "Incorrect API key provided"
        ));
    }

    #[test]
    fn test_classify_error_numeric_code_and_plain_body() {
        let body = r#"{"error":{"message":"overloaded","code":503}}"#;
        assert!(matches!(classify_error(503, body), ProxyError::Http { status: 503, .. }));

        let err = classify_error(502, "Bad Gateway");
        assert!(matches!(err, ProxyError::Http { status: 502, ref message } if message == "Bad Gateway"));

        let err = classify_error(500, "");
        assert!(matches!(err, ProxyError::Http { ref message, .. } if message == "HTTP 500"));
    }

    #[test]
    fn test_classify_error_fastapi_detail() {
        let err = classify_error(422, r#"{"detail":"Missing X-Policy-ID header"}"#);
        assert!(matches!(
            err,
            ProxyError::Http { status: 422, ref message } if message == "Missing X-Policy-ID header"
        ));
    }
}
