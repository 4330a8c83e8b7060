use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GenerationConfig;
use crate::gateway::{CompletionGateway, ProviderUsed};
use crate::processor::{ProcessedCode, ResponseProcessor};
use crate::prompt::{CodeGenerationRequest, ExplanationStyle, TARGET_LANGUAGE, explanation_prompt};

/// Fixed front of the install hint; the module list follows it.
pub const INSTALL_PREFIX: &str = "pip install";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Generating,
    Generated,
    Explaining,
    Explained,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub source_code: String,
    pub explanation_text: String,
}

/// What one generate action produced, committed as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub request_json: String,
    pub processed: ProcessedCode,
    pub provider_used: ProviderUsed,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub result: ExplanationResult,
    pub provider_used: ProviderUsed,
    pub explained_at: DateTime<Utc>,
}

/// Per-user interaction state, changed only by [`Session::on_generate`] and
/// [`Session::on_explain`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    state: SessionState,
    generation: Option<Generation>,
    explanation: Option<Explanation>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            generation: None,
            explanation: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generation(&self) -> Option<&Generation> {
        self.generation.as_ref()
    }

    pub fn processed(&self) -> Option<&ProcessedCode> {
        self.generation.as_ref().map(|g| &g.processed)
    }

    pub fn explanation(&self) -> Option<&ExplanationResult> {
        self.explanation.as_ref().map(|e| &e.result)
    }

    /// Run the generation pipeline for `task`.
    ///
    /// Returns `false` without touching the session when the task is blank. Provider
    /// failures still land in `Generated`, with the diagnostic as the output.
    pub async fn on_generate(
        &mut self,
        gateway: &CompletionGateway,
        task: &str,
        config: &GenerationConfig,
    ) -> bool {
        let Some(request) = CodeGenerationRequest::new(task, config) else {
            return false;
        };
        let previous = self.state;
        self.state = SessionState::Generating;
        info!("Session {}: generating for task '{}'", self.id, request.task_description());

        let completion = gateway.complete(&request.to_prompt()).await;
        if !completion.succeeded() {
            warn!("Session {}: generation failed on every provider", self.id);
        }
        let processed = ResponseProcessor::process(&completion.text);

        let generation = Generation {
            request_json: request.to_json(),
            processed,
            provider_used: completion.provider_used,
            generated_at: Utc::now(),
        };
        // Replace output and drop the stale explanation in one step.
        *self = Self {
            id: self.id,
            state: SessionState::Generated,
            generation: Some(generation),
            explanation: None,
        };
        info!("Session {}: {:?} -> {:?}", self.id, previous, self.state);
        true
    }

    /// Ask for an explanation of the current cleaned code.
    ///
    /// Returns `false` when nothing has been generated yet.
    pub async fn on_explain(&mut self, gateway: &CompletionGateway, style: &ExplanationStyle) -> bool {
        let Some(generation) = &self.generation else {
            return false;
        };
        let source_code = generation.processed.cleaned_code.clone();
        let prompt = explanation_prompt(&source_code, TARGET_LANGUAGE, style);
        self.state = SessionState::Explaining;

        let completion = gateway.complete(&prompt).await;
        if !completion.succeeded() {
            warn!("Session {}: explanation failed on every provider", self.id);
        }

        self.explanation = Some(Explanation {
            result: ExplanationResult {
                source_code,
                explanation_text: completion.text,
            },
            provider_used: completion.provider_used,
            explained_at: Utc::now(),
        });
        self.state = SessionState::Explained;
        true
    }

    /// `"pip install a b c"` for the current modules, if there are any.
    pub fn install_command(&self) -> Option<String> {
        let modules = &self.processed()?.modules;
        if modules.is_empty() {
            return None;
        }
        Some(format!("{} {}", INSTALL_PREFIX, modules.join(" ")))
    }

    /// Load a persisted session, or start a fresh one when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        let mut session: Session = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))?;
        session.settle();
        Ok(session)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize session")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write session file: {}", path.display()))
    }

    /// A session saved mid-action resumes from its last settled state.
    fn settle(&mut self) {
        self.state = match (&self.generation, &self.explanation) {
            (None, _) => SessionState::Idle,
            (Some(_), None) => SessionState::Generated,
            (Some(_), Some(_)) => SessionState::Explained,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExplanationConfig;
    use crate::gateway::testing::ScriptedProvider;
    use std::sync::atomic::Ordering;

    fn style() -> ExplanationStyle {
        ExplanationStyle::from(&ExplanationConfig::default())
    }

    const ADD_REPLY: &str = "Here you go:\n```python\nimport math\n\ndef add(a, b):\n    return math.fsum([a, b])  # add them\n```";

    #[tokio::test]
    async fn test_blank_task_is_a_no_op() {
        let provider = ScriptedProvider::ok("primary", ADD_REPLY);
        let calls = provider.calls.clone();
        let gateway = CompletionGateway::new(vec![Box::new(provider)]);
        let mut session = Session::new();

        assert!(!session.on_generate(&gateway, "   ", &GenerationConfig::default()).await);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.processed().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generate_adds_two_numbers_end_to_end() {
        let primary = ScriptedProvider::ok("primary", ADD_REPLY);
        let secondary = ScriptedProvider::ok("secondary", "unused");
        let secondary_calls = secondary.calls.clone();
        let gateway = CompletionGateway::new(vec![Box::new(primary), Box::new(secondary)]);
        let mut session = Session::new();

        let ran = session
            .on_generate(&gateway, "write a function that adds two numbers", &GenerationConfig::default())
            .await;
        assert!(ran);
        assert_eq!(session.state(), SessionState::Generated);

        let processed = session.processed().unwrap();
        assert_eq!(processed.modules, vec!["math"]);
        assert!(!processed.cleaned_code.contains('#'));
        assert_eq!(session.generation().unwrap().provider_used, ProviderUsed::Primary);
        assert_eq!(session.install_command().as_deref(), Some("pip install math"));
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_total_failure_still_generates_diagnostic() {
        let gateway = CompletionGateway::new(vec![
            Box::new(ScriptedProvider::failing("gemini", "missing key")),
            Box::new(ScriptedProvider::failing("openai", "quota")),
        ]);
        let mut session = Session::new();

        assert!(session.on_generate(&gateway, "anything", &GenerationConfig::default()).await);
        assert_eq!(session.state(), SessionState::Generated);
        let generation = session.generation().unwrap();
        assert_eq!(generation.provider_used, ProviderUsed::None);
        assert!(generation.processed.cleaned_code.contains("missing key"));
        assert!(generation.processed.cleaned_code.contains("quota"));
        assert!(session.install_command().is_none());
    }

    #[tokio::test]
    async fn test_explain_before_generate_is_a_no_op() {
        let provider = ScriptedProvider::ok("primary", "explanation");
        let calls = provider.calls.clone();
        let gateway = CompletionGateway::new(vec![Box::new(provider)]);
        let mut session = Session::new();

        assert!(!session.on_explain(&gateway, &style()).await);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_explain_then_regenerate_clears_explanation() {
        let provider = ScriptedProvider::new(
            "primary",
            vec![
                Ok(ADD_REPLY.to_string()),
                Ok("Yeh function do numbers ko add karta hai.".to_string()),
                Ok("```python\nimport os\nprint(os.getcwd())\n```".to_string()),
            ],
        );
        let prompts = provider.prompts.clone();
        let gateway = CompletionGateway::new(vec![Box::new(provider)]);
        let config = GenerationConfig::default();
        let mut session = Session::new();

        session.on_generate(&gateway, "add two numbers", &config).await;
        assert!(session.on_explain(&gateway, &style()).await);
        assert_eq!(session.state(), SessionState::Explained);

        let cleaned = session.processed().unwrap().cleaned_code.clone();
        let explanation = session.explanation().unwrap();
        assert_eq!(explanation.source_code, cleaned);
        assert_eq!(explanation.explanation_text, "Yeh function do numbers ko add karta hai.");
        assert!(prompts.lock().unwrap()[1].contains(&cleaned));

        session.on_generate(&gateway, "print the working directory", &config).await;
        assert_eq!(session.state(), SessionState::Generated);
        assert!(session.explanation().is_none());
        assert_eq!(session.processed().unwrap().modules, vec!["os"]);
    }

    #[tokio::test]
    async fn test_failed_explanation_lands_in_explained() {
        let provider = ScriptedProvider::new(
            "primary",
            vec![Ok(ADD_REPLY.to_string()), Err("rate limited".to_string())],
        );
        let gateway = CompletionGateway::new(vec![Box::new(provider)]);
        let mut session = Session::new();

        session.on_generate(&gateway, "add two numbers", &GenerationConfig::default()).await;
        session.on_explain(&gateway, &style()).await;
        assert_eq!(session.state(), SessionState::Explained);
        assert!(session.explanation().unwrap().explanation_text.contains("rate limited"));
    }

    #[test]
    fn test_install_command_requires_modules() {
        let session = Session::new();
        assert!(session.install_command().is_none());
    }

    #[tokio::test]
    async fn test_save_and_reload_preserves_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let gateway = CompletionGateway::new(vec![Box::new(ScriptedProvider::ok("primary", ADD_REPLY))]);
        let mut session = Session::new();
        session.on_generate(&gateway, "add two numbers", &GenerationConfig::default()).await;
        session.save(&path).unwrap();

        let reloaded = Session::load(&path).unwrap();
        assert_eq!(reloaded.id, session.id);
        assert_eq!(reloaded.state(), SessionState::Generated);
        assert_eq!(reloaded.processed(), session.processed());
        assert!(reloaded.explanation().is_none());
    }

    #[test]
    fn test_load_missing_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.processed().is_none());
    }

    #[test]
    fn test_interrupted_session_reloads_settled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut session = Session::new();
        session.state = SessionState::Generating;
        session.save(&path).unwrap();

        let reloaded = Session::load(&path).unwrap();
        assert_eq!(reloaded.state(), SessionState::Idle);
    }

    #[test]
    fn test_corrupt_session_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Session::load(&path).is_err());
    }
}
