use super::*;

fn chat_config() -> ChatConfig {
    ChatConfig {
        api_base: "https://api.example.com/openai/v1/".to_string(),
        ..ChatConfig::default()
    }
}

#[test]
fn endpoint_appends_chat_completions() {
    let client = ChatClient::with_api_key(&chat_config(), "key").expect("client builds");

    assert_eq!(
        client.endpoint().as_str(),
        "https://api.example.com/openai/v1/chat/completions"
    );
}

#[test]
fn request_body_has_single_user_message() {
    let client = ChatClient::with_api_key(&ChatConfig::default(), "key").expect("client builds");

    let body = client.request_body("Is dowry legal?").expect("encodes");
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid json");

    assert_eq!(json["model"], "llama-3.1-8b-instant");
    assert_eq!(json["max_tokens"], 400);
    assert!((json["temperature"].as_f64().expect("number") - 0.7).abs() < 1e-6);
    assert_eq!(json["messages"].as_array().expect("array").len(), 1);
    assert_eq!(json["messages"][0]["role"], "user");
    assert_eq!(json["messages"][0]["content"], "Is dowry legal?");
}

#[test]
fn invalid_api_base_is_rejected() {
    let config = ChatConfig {
        api_base: "ftp://api.example.com".to_string(),
        ..ChatConfig::default()
    };

    assert!(ChatClient::with_api_key(&config, "key").is_err());
}

#[test]
fn missing_key_variable() {
    let config = ChatConfig {
        api_key_env: "LAW_U_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
        ..ChatConfig::default()
    };

    let error = ChatClient::new(&config).expect_err("must fail without key");
    assert!(
        matches!(
            error,
            crate::LawError::Generation(GenerationError::MissingApiKey(ref name))
                if name == "LAW_U_TEST_KEY_THAT_IS_NEVER_SET"
        ),
        "unexpected error: {error}"
    );
}

#[test]
fn status_classification() {
    let unauthorized = GenerationError::Status {
        status: 401,
        body: String::new(),
    };
    let limited = GenerationError::Status {
        status: 429,
        body: String::new(),
    };

    assert!(unauthorized.is_auth_failure());
    assert!(!unauthorized.is_rate_limited());
    assert!(limited.is_rate_limited());
    assert!(!GenerationError::EmptyResponse.is_auth_failure());
}

#[test]
fn response_without_content_parses() {
    let parsed: CompletionResponse =
        serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#)
            .expect("parses");

    assert_eq!(parsed.choices.len(), 1);
    assert!(parsed.choices[0].message.content.is_none());
}
