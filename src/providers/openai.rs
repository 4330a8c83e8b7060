use async_trait::async_trait;
use log::{debug, info};

use super::{ChatMessage, ChatRequest, api_error, api_key, first_content};
use crate::config::ProviderConfig;
use crate::gateway::{ProviderError, TextProvider};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_KEY_ENV: &str = "OPENAI_API_KEY";

/// OpenAI chat-completions provider. Works with any compatible endpoint via `base_url`.
pub struct OpenAIProvider {
    model: String,
    base_url: String,
    key_env: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAIProvider {
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
impl TextProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = api_key(&self.key_env)?;
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("POST {} (model {})", url, self.model);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::new("system", "You are a helpful AI assistant for coding tasks."),
                ChatMessage::new("user", prompt),
            ],
            temperature: self.temperature,
            stream: false,
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let (content, parsed) = first_content("OpenAI", &body)?;
        if let Some(usage) = parsed.usage {
            info!(
                "OpenAI token usage - Prompt: {}, Completion: {}, Total: {}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }
        Ok(content)
    }
}
