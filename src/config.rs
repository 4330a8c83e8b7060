use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};

/// Main configuration structure for code_writer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider chain, tried in order: primary first, secondary on failure
    pub ai_providers: AIProvidersConfig,

    /// Code generation request settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Explanation prompt settings
    #[serde(default)]
    pub explanation: ExplanationConfig,

    /// Transport settings shared by all providers
    #[serde(default)]
    pub http: HttpConfig,

    /// UI display configuration
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIProvidersConfig {
    pub primary: Option<ProviderConfig>,
    pub secondary: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which backend this slot talks to
    pub kind: ProviderKind,

    /// Whether this provider takes part in the chain
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Model to use
    pub model: String,

    /// Temperature setting
    pub temperature: Option<f32>,

    /// Override for the API base URL
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub include_comments: bool,

    #[serde(default)]
    pub include_docs: bool,

    #[serde(default)]
    pub include_examples: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationConfig {
    /// Conversational language mix used for explanations
    #[serde(default = "default_language_mix")]
    pub language_mix: String,

    /// Experience level of the reader
    #[serde(default = "default_audience_level")]
    pub audience_level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout; unset keeps the transport default
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIConfig {
    /// Enable colorful output
    #[serde(default = "default_colorful")]
    pub colorful: bool,

    /// Show spinners while waiting on a provider
    #[serde(default = "default_spinners")]
    pub spinners: bool,
}

// Default value functions
fn default_enabled() -> bool { true }
fn default_language_mix() -> String { "Hinglish (Hindi + English)".to_string() }
fn default_audience_level() -> String { "beginner".to_string() }
fn default_colorful() -> bool { true }
fn default_spinners() -> bool { true }

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            language_mix: default_language_mix(),
            audience_level: default_audience_level(),
        }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            colorful: default_colorful(),
            spinners: default_spinners(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ai_providers: AIProvidersConfig {
                primary: Some(ProviderConfig {
                    kind: ProviderKind::Gemini,
                    enabled: true,
                    model: "gemini-2.5-flash".to_string(),
                    temperature: Some(0.2),
                    base_url: None,
                    api_key_env: None,
                }),
                secondary: Some(ProviderConfig {
                    kind: ProviderKind::OpenAI,
                    enabled: true,
                    model: "gpt-4o-mini".to_string(),
                    temperature: Some(0.2),
                    base_url: None,
                    api_key_env: None,
                }),
            },
            generation: GenerationConfig::default(),
            explanation: ExplanationConfig::default(),
            http: HttpConfig::default(),
            ui: UIConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Load configuration from command line argument or default locations
    pub fn load(config_path: &Option<String>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::from_file(shellexpand::tilde(path).as_ref());
        }

        let default_paths = [
            "code_writer.toml",
            ".code_writer.toml",
            "~/.config/code_writer/config.toml",
        ];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                match Self::from_file(expanded_path.as_ref()) {
                    Ok(config) => return Ok(config),
                    Err(e) => log::warn!("Failed to load config from {}: {:#}", path, e),
                }
            }
        }

        Ok(Self::default())
    }

    /// Enabled provider slots in fallback order
    pub fn provider_chain(&self) -> Vec<&ProviderConfig> {
        [&self.ai_providers.primary, &self.ai_providers.secondary]
            .into_iter()
            .flatten()
            .filter(|p| p.enabled)
            .collect()
    }

    /// Merge with command-line arguments (CLI args take precedence)
    pub fn merge_with_args(&mut self, headless: bool) {
        if headless {
            self.ui.colorful = false;
            self.ui.spinners = false;
        }
    }
}
