#[cfg(test)]
mod tests;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::Result;
use crate::config::ChatConfig;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("API key not found: set the {0} environment variable")]
    MissingApiKey(String),

    #[error("Chat API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Chat API request failed: {0}")]
    Transport(String),

    #[error("Invalid chat API response: {0}")]
    InvalidResponse(String),

    #[error("Chat API returned no answer")]
    EmptyResponse,
}

impl GenerationError {
    /// True for 401/403 answers from the API
    #[inline]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }

    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { status: 429, .. })
    }
}

/// Turns a finished prompt into the assistant's answer
pub trait ResponseGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    endpoint: Url,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    agent: ureq::Agent,
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

impl ChatClient {
    /// Build a client from config, reading the key from `config.api_key_env`
    #[inline]
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GenerationError::MissingApiKey(config.api_key_env.clone()))?;

        Self::with_api_key(config, api_key)
    }

    /// Build a client with an explicit key
    #[inline]
    pub fn with_api_key(config: &ChatConfig, api_key: impl Into<String>) -> Result<Self> {
        let endpoint = config.completions_url()?;

        Ok(Self {
            endpoint,
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            agent: build_agent(Duration::from_secs(config.timeout_secs)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_body(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        serde_json::to_string(&request)
            .map_err(|e| GenerationError::InvalidResponse(format!("Failed to encode request: {}", e)))
    }
}

impl ResponseGenerator for ChatClient {
    fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        let body = self.request_body(prompt)?;

        debug!(
            "Sending {} character prompt to {} ({})",
            prompt.chars().count(),
            self.endpoint,
            self.model
        );

        let mut response = self
            .agent
            .post(self.endpoint.as_str())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&body)
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            error!("Chat API error (status {}): {}", status, text);
            return Err(GenerationError::Status { status, body: text });
        }

        let parsed: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        debug!("Received {} character answer", answer.chars().count());
        Ok(answer)
    }
}
