pub mod gemini;
pub mod openai;

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{HttpConfig, ProviderConfig, ProviderKind};
use crate::gateway::{ProviderError, TextProvider};

pub use gemini::GeminiProvider;
pub use openai::OpenAIProvider;

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self { role: role.to_string(), content: Some(content.to_string()) }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Error envelope; Gemini wraps it in a one-element array, OpenAI does not.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorBody {
    Single { error: ErrorDetails },
    List(Vec<ErrorBody>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetails {
    pub message: String,
}

impl ErrorBody {
    fn message(&self) -> Option<&str> {
        match self {
            ErrorBody::Single { error } => Some(&error.message),
            ErrorBody::List(items) => items.first().and_then(|item| item.message()),
        }
    }
}

/// Read an API key at call time so a missing credential surfaces as a provider failure.
pub(crate) fn api_key(var: &str) -> Result<String, ProviderError> {
    match env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ProviderError::Configuration(format!(
            "{} environment variable not set",
            var
        ))),
    }
}

/// Turn a non-success body into an [`ProviderError::Api`].
pub(crate) fn api_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    ProviderError::Api { status: status.as_u16(), message }
}

/// Pull the first choice's text out of a chat-completions reply.
pub(crate) fn first_content(provider: &str, body: &str) -> Result<(String, ChatResponse), ProviderError> {
    let mut response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidResponse(format!("{} reply: {}", provider, e)))?;
    let content = response
        .choices
        .first_mut()
        .and_then(|choice| choice.message.content.take())
        .filter(|text| !text.trim().is_empty())
        .ok_or(ProviderError::EmptyResponse)?;
    Ok((content, response))
}

pub(crate) fn http_client(http: &HttpConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = http.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().context("Failed to build HTTP client")
}

/// Build the provider a config slot describes.
pub fn build_provider(config: &ProviderConfig, http: &HttpConfig) -> Result<Box<dyn TextProvider>> {
    let client = http_client(http)?;
    let provider: Box<dyn TextProvider> = match config.kind {
        ProviderKind::Gemini => Box::new(GeminiProvider::from_config(config, client)),
        ProviderKind::OpenAI => Box::new(OpenAIProvider::from_config(config, client)),
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_reads_openai_envelope() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        match api_error(reqwest::StatusCode::UNAUTHORIZED, body) {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_api_error_reads_gemini_list_envelope() {
        let body = r#"[{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}]"#;
        match api_error(reqwest::StatusCode::TOO_MANY_REQUESTS, body) {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Resource has been exhausted");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_api_error_falls_back_to_raw_body() {
        match api_error(reqwest::StatusCode::BAD_GATEWAY, "  upstream down \n") {
            ProviderError::Api { message, .. } => assert_eq!(message, "upstream down"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_first_content_rejects_empty_choices() {
        let err = first_content("test", r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));

        let err = first_content("test", r#"{"choices": [{"message": {"role": "assistant", "content": "  "}}]}"#)
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));

        let err = first_content("test", "not json").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn test_first_content_returns_text() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "print(1)"}, "finish_reason": "stop"}],
                      "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}}"#;
        let (text, response) = first_content("test", body).unwrap();
        assert_eq!(text, "print(1)");
        assert_eq!(response.usage.unwrap().total_tokens, 5);
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = api_key("CODE_WRITER_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_build_provider_for_each_kind() {
        let http = HttpConfig { timeout_secs: Some(5) };
        for (kind, name) in [(ProviderKind::Gemini, "gemini"), (ProviderKind::OpenAI, "openai")] {
            let config = ProviderConfig {
                kind,
                enabled: true,
                model: "m".to_string(),
                temperature: None,
                base_url: None,
                api_key_env: None,
            };
            let provider = build_provider(&config, &http).unwrap();
            assert_eq!(provider.name(), name);
            assert_eq!(provider.model_name(), "m");
        }
    }
}
