use super::*;
use crate::config::OllamaConfig;

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        batch_size: 128,
        embedding_dimension: 768,
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(5))
        .with_retry_attempts(5)
        .with_backoff_base(Duration::from_millis(10));

    assert_eq!(client.retry_attempts, 5);
    assert_eq!(client.backoff_base_ms, 10);
}

#[test]
fn retry_attempts_never_zero() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_retry_attempts(0);

    assert_eq!(client.retry_attempts, 1);
}

#[test]
fn embed_request_uses_input_field() {
    let texts = vec!["first".to_string(), "second".to_string()];
    let request = EmbedRequest {
        model: "mistral",
        input: &texts,
    };

    let json = serde_json::to_value(&request).expect("request serializes");
    assert_eq!(json["model"], "mistral");
    assert_eq!(json["input"][1], "second");
}

#[test]
fn empty_batch_skips_the_server() {
    // Nothing listens on this port; an empty batch must not attempt a request
    let config = OllamaConfig {
        port: 9,
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    let results = client
        .generate_embeddings_batch(&[])
        .expect("empty batch succeeds");
    assert!(results.is_empty());
}
