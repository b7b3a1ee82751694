//! HTTP-level tests for the Kentron proxy client against a wiremock server.

use std::time::Duration;

use guardchat_config::{CredentialOverrides, EffectiveConfig, FieldName, StaticSource, resolve};
use guardchat_llm::{ChatMessage, ChatResult, GuardrailProxy, KentronConfig, KentronProxy};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> EffectiveConfig {
    resolve(
        &StaticSource::new("test")
            .with(FieldName::KentronApiKey, "kt-test-key")
            .with(FieldName::PolicyId, "policy-42"),
        &CredentialOverrides::new().with(FieldName::OpenaiApiKey, "sk-user-key"),
    )
}

fn proxy(server: &MockServer) -> KentronProxy {
    KentronProxy::new(
        KentronConfig::default()
            .with_base_url(format!("{}/v1", server.uri()))
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

fn completion(text: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 3, "completion_tokens": 2}
    })
}

#[tokio::test]
async fn test_ok_sends_credentials_and_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-user-key"))
        .and(header("x-api-key", "kt-test-key"))
        .and(header("x-policy-id", "policy-42"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "stream": false,
            "messages": [
                {"role": "user", "content": "earlier"},
                {"role": "assistant", "content": "answer"},
                {"role": "user", "content": "hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hello!")))
        .expect(1)
        .mount(&server)
        .await;

    let history = vec![ChatMessage::user("earlier"), ChatMessage::assistant("answer")];
    let result = proxy(&server).complete(&config(), &history, "hi").await;
    assert_eq!(result, ChatResult::ok("Hello!"));
}

#[tokio::test]
async fn test_input_policy_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "profanity",
                "type": "policy_violation",
                "stage": "input"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = proxy(&server).complete(&config(), &[], "bad words").await;
    assert_eq!(result, ChatResult::blocked("input: profanity"));
}

#[tokio::test]
async fn test_output_filtered_completion_is_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-2",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {"role": "assistant", "content": null},
                "finish_reason": "content_filter"
            }]
        })))
        .mount(&server)
        .await;

    let result = proxy(&server).complete(&config(), &[], "tell me").await;
    assert_eq!(result, ChatResult::blocked("content_filter"));
}

#[tokio::test]
async fn test_auth_failure_is_upstream_error_with_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid Kentron API key", "type": "authentication_error"}
        })))
        .mount(&server)
        .await;

    let result = proxy(&server).complete(&config(), &[], "hi").await;
    assert_eq!(
        result,
        ChatResult::upstream(Some(401), "Invalid Kentron API key")
    );
}

#[tokio::test]
async fn test_rate_limit_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached", "type": "rate_limit_error"}
        })))
        .mount(&server)
        .await;

    let result = proxy(&server).complete(&config(), &[], "hi").await;
    assert_eq!(result, ChatResult::upstream(Some(429), "Rate limit reached"));
    assert!(!result.is_retryable());
}

#[tokio::test]
async fn test_server_error_is_single_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let result = proxy(&server).complete(&config(), &[], "hi").await;
    assert_eq!(
        result,
        ChatResult::upstream(Some(503), "upstream unavailable")
    );
}

#[tokio::test]
async fn test_slow_proxy_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("too late"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let proxy = KentronProxy::new(
        KentronConfig::default()
            .with_base_url(format!("{}/v1", server.uri()))
            .with_timeout(Duration::from_millis(100)),
    )
    .unwrap();

    let result = proxy.complete(&config(), &[], "hi").await;
    assert_eq!(result, ChatResult::Timeout);
}

#[tokio::test]
async fn test_unreachable_proxy_is_upstream_error_without_code() {
    let proxy = KentronProxy::new(
        KentronConfig::default()
            .with_base_url("http://127.0.0.1:1/v1")
            .with_timeout(Duration::from_secs(2)),
    )
    .unwrap();

    let result = proxy.complete(&config(), &[], "hi").await;
    assert!(
        matches!(result, ChatResult::UpstreamError { code: None, .. }),
        "unexpected result: {:?}",
        result
    );
}

#[tokio::test]
async fn test_malformed_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = proxy(&server).complete(&config(), &[], "hi").await;
    assert!(matches!(
        result,
        ChatResult::UpstreamError { code: Some(200), ref message } if message.starts_with("invalid response")
    ));
}

#[tokio::test]
async fn test_system_prompt_is_sent_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "system", "content": "You are helpful."},
                {"role": "user", "content": "hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("hey")))
        .expect(1)
        .mount(&server)
        .await;

    let proxy = KentronProxy::new(
        KentronConfig::default()
            .with_base_url(format!("{}/v1", server.uri()))
            .with_system_prompt("You are helpful."),
    )
    .unwrap();

    assert_eq!(
        proxy.complete(&config(), &[], "hi").await,
        ChatResult::ok("hey")
    );
}

#[tokio::test]
async fn test_forbidden_with_block_marker_is_policy_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"blocked": true, "reason": "pii"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = proxy(&server).complete(&config(), &[], "my ssn is ...").await;
    assert_eq!(result, ChatResult::blocked("pii"));
}

#[tokio::test]
async fn test_filtered_completion_text_is_not_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {"role": "assistant", "content": "partial unsafe output"},
                "finish_reason": "content_filter"
            }]
        })))
        .mount(&server)
        .await;

    let result = proxy(&server).complete(&config(), &[], "tell me").await;
    assert_eq!(result, ChatResult::blocked("content_filter"));
}
