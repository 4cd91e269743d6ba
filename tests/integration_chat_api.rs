#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Chat completion client against a mock OpenAI-compatible endpoint

use law_u::LawError;
use law_u::chat::{ChatClient, GenerationError, ResponseGenerator};
use law_u::config::ChatConfig;
use serde_json::json;
use serial_test::serial;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY_VARIABLE: &str = "LAW_U_TEST_CHAT_KEY";

fn chat_config(server: &MockServer) -> ChatConfig {
    ChatConfig {
        api_base: format!("{}/openai/v1", server.uri()),
        api_key_env: KEY_VARIABLE.to_string(),
        ..ChatConfig::default()
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "llama-3.1-8b-instant",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn sends_single_user_message_with_bearer_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "llama-3.1-8b-instant",
            "max_tokens": 400,
            "messages": [{"role": "user", "content": "What is the POSH Act?"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "  The POSH Act protects women at the workplace.\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        ChatClient::with_api_key(&chat_config(&server), "test-key").expect("client builds");

    let answer = client
        .generate("What is the POSH Act?")
        .expect("should answer");

    assert_eq!(answer, "The POSH Act protects women at the workplace.");
}

#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_is_a_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "Invalid API Key"}})),
        )
        .mount(&server)
        .await;

    let client = ChatClient::with_api_key(&chat_config(&server), "bad").expect("client builds");

    let error = client.generate("hello").expect_err("must fail");

    assert!(error.is_auth_failure());
    match error {
        GenerationError::Status { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("Invalid API Key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn rate_limit_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::with_api_key(&chat_config(&server), "key").expect("client builds");

    let error = client.generate("hello").expect_err("must fail");

    assert!(error.is_rate_limited());
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_choices_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = ChatClient::with_api_key(&chat_config(&server), "key").expect("client builds");

    let error = client.generate("hello").expect_err("must fail");

    assert!(matches!(error, GenerationError::EmptyResponse));
}

#[tokio::test(flavor = "multi_thread")]
async fn blank_answer_is_an_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  \n\t ")))
        .mount(&server)
        .await;

    let client = ChatClient::with_api_key(&chat_config(&server), "key").expect("client builds");

    let error = client.generate("hello").expect_err("must fail");

    assert!(matches!(error, GenerationError::EmptyResponse));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_body_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = ChatClient::with_api_key(&chat_config(&server), "key").expect("client builds");

    let error = client.generate("hello").expect_err("must fail");

    assert!(matches!(error, GenerationError::InvalidResponse(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_server_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("late"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = ChatClient::with_api_key(&chat_config(&server), "key")
        .expect("client builds")
        .with_timeout(Duration::from_millis(200));

    let error = client.generate("hello").expect_err("must time out");

    assert!(matches!(error, GenerationError::Transport(_)));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn key_is_read_from_environment() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer from-env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    // SAFETY: serialised with the other tests that touch this variable
    unsafe { std::env::set_var(KEY_VARIABLE, "from-env") };
    let client = ChatClient::new(&chat_config(&server));
    // SAFETY: as above
    unsafe { std::env::remove_var(KEY_VARIABLE) };

    let answer = client
        .expect("key is set")
        .generate("hello")
        .expect("should answer");
    assert_eq!(answer, "ok");
}

#[test]
#[serial]
fn blank_key_counts_as_missing() {
    let config = ChatConfig {
        api_key_env: KEY_VARIABLE.to_string(),
        ..ChatConfig::default()
    };

    // SAFETY: serialised with the other tests that touch this variable
    unsafe { std::env::set_var(KEY_VARIABLE, "   ") };
    let result = ChatClient::new(&config);
    // SAFETY: as above
    unsafe { std::env::remove_var(KEY_VARIABLE) };

    assert!(matches!(
        result,
        Err(LawError::Generation(GenerationError::MissingApiKey(_)))
    ));
}
