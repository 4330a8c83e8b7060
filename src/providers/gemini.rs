use async_trait::async_trait;
use log::{info, warn};

use super::{ChatMessage, ChatRequest, api_error, api_key, first_content};
use crate::config::ProviderConfig;
use crate::gateway::{ProviderError, TextProvider};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_KEY_ENV: &str = "GEMINI_API_KEY";

/// Gemini API provider, via Google's OpenAI-compatible endpoint
pub struct GeminiProvider {
    model: String,
    base_url: String,
    key_env: String,
    temperature: f32,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn from_config(config: &ProviderConfig, client: reqwest::Client) -> Self {
        Self {
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            key_env: config
                .api_key_env
                .clone()
                .unwrap_or_else(|| DEFAULT_KEY_ENV.to_string()),
            temperature: config.temperature.unwrap_or(0.2),
            client,
        }
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = api_key(&self.key_env)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage::new("user", prompt)],
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &response_text));
        }

        let (content, parsed) = first_content("Gemini", &response_text)?;

        if let Some(finish_reason) = parsed.choices.first().and_then(|c| c.finish_reason.as_deref()) {
            if finish_reason == "length" {
                warn!("Gemini response was truncated; the code block may be incomplete.");
            }
        }

        if let Some(usage) = parsed.usage {
            info!(
                "Gemini token usage - Prompt: {}, Completion: {}, Total: {}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        Ok(content)
    }
}
