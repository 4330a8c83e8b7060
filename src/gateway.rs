use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure raised by a single text provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credential missing or rejected before any request was made.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider returned no content")]
    EmptyResponse,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

/// A remote text-generation service, consumed as prompt in, text out.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Name of the provider.
    fn name(&self) -> &str;

    /// Model name of the provider.
    fn model_name(&self) -> &str {
        "Unknown"
    }

    /// Send a prompt to the provider and return the generated text.
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Which slot of the chain produced the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderUsed {
    Primary,
    Secondary,
    None,
}

impl ProviderUsed {
    fn from_position(position: usize) -> Self {
        if position == 0 {
            ProviderUsed::Primary
        } else {
            ProviderUsed::Secondary
        }
    }
}

impl fmt::Display for ProviderUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderUsed::Primary => write!(f, "primary"),
            ProviderUsed::Secondary => write!(f, "secondary"),
            ProviderUsed::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub message: String,
}

/// Outcome of [`CompletionGateway::complete`]. `text` is never empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResult {
    pub text: String,
    pub provider_used: ProviderUsed,
    pub errors: Vec<ProviderFailure>,
}

impl CompletionResult {
    pub fn succeeded(&self) -> bool {
        self.provider_used != ProviderUsed::None
    }
}

/// Ordered provider chain. Each call walks the chain until a provider answers.
pub struct CompletionGateway {
    providers: Vec<Box<dyn TextProvider>>,
}

impl CompletionGateway {
    /// Create a gateway; the first provider is primary, the rest are fallbacks.
    pub fn new(providers: Vec<Box<dyn TextProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Send `prompt` to each provider in turn and return the first reply.
    ///
    /// Providers are called one at a time with the same prompt. Every failure is
    /// recorded; if none answers, the result carries a readable diagnostic instead.
    pub async fn complete(&self, prompt: &str) -> CompletionResult {
        let mut errors = Vec::new();

        for (position, provider) in self.providers.iter().enumerate() {
            info!(
                "Sending prompt to {} ({}), {} chars",
                provider.name(),
                provider.model_name(),
                prompt.len()
            );
            match provider.generate_text(prompt).await {
                Ok(text) if text.trim().is_empty() => {
                    warn!("Provider {} returned an empty reply", provider.name());
                    errors.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        message: ProviderError::EmptyResponse.to_string(),
                    });
                }
                Ok(text) => {
                    if !errors.is_empty() {
                        info!("Fell back to {} after {} failure(s)", provider.name(), errors.len());
                    }
                    return CompletionResult {
                        text,
                        provider_used: ProviderUsed::from_position(position),
                        errors,
                    };
                }
                Err(e) => {
                    warn!("Provider {} failed: {}", provider.name(), e);
                    errors.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        CompletionResult {
            text: diagnostic(&errors),
            provider_used: ProviderUsed::None,
            errors,
        }
    }
}

fn diagnostic(errors: &[ProviderFailure]) -> String {
    if errors.is_empty() {
        return "⚠️ No AI provider is configured. Set GEMINI_API_KEY or OPENAI_API_KEY.".to_string();
    }
    let mut text = String::from("⚠️ Error generating response. All providers failed:");
    for failure in errors {
        text.push_str(&format!("\n- {}: {}", failure.provider, failure.message));
    }
    text
}
