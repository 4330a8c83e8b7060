use serde::{Deserialize, Serialize};

use crate::config::{ExplanationConfig, GenerationConfig};

/// The only language the reply post-processing understands: `#` comments,
/// `"""` docstrings and `import`/`from` statements.
pub const TARGET_LANGUAGE: &str = "python";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleOptions {
    pub include_comments: bool,
    pub include_docs: bool,
    pub include_examples: bool,
}

/// A single generate action. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeGenerationRequest {
    task_description: String,
    target_language: &'static str,
    style: StyleOptions,
}

#[derive(Serialize)]
struct RequestBody<'a> {
    request: String,
    prompt: &'a str,
    requirements: Requirements<'a>,
}

#[derive(Serialize)]
struct Requirements<'a> {
    language: &'a str,
    code_style: &'a str,
    include_comments: bool,
    include_docs: bool,
    include_examples: bool,
}

impl CodeGenerationRequest {
    /// Returns `None` for a blank task; there is nothing to generate.
    pub fn new(task_description: &str, config: &GenerationConfig) -> Option<Self> {
        let task = task_description.trim();
        if task.is_empty() {
            return None;
        }
        Some(Self {
            task_description: task.to_string(),
            target_language: TARGET_LANGUAGE,
            style: StyleOptions {
                include_comments: config.include_comments,
                include_docs: config.include_docs,
                include_examples: config.include_examples,
            },
        })
    }

    pub fn task_description(&self) -> &str {
        &self.task_description
    }

    /// The structured JSON request embedded in the generation prompt.
    pub fn to_json(&self) -> String {
        let body = RequestBody {
            request: format!("generate_{}_code", self.target_language),
            prompt: &self.task_description,
            requirements: Requirements {
                language: self.target_language,
                code_style: "minimal",
                include_comments: self.style.include_comments,
                include_docs: self.style.include_docs,
                include_examples: self.style.include_examples,
            },
        };
        // Plain structs of strings and bools always serialize.
        serde_json::to_string_pretty(&body).unwrap_or_default()
    }

    /// Full prompt sent to the provider chain.
    pub fn to_prompt(&self) -> String {
        let language = display_language(self.target_language);
        let essentials = if self.style.include_comments || self.style.include_docs {
            "Essential code only, with the requested comments/docs"
        } else {
            "Essential code only (no comments/docs)"
        };
        format!(
            "As an expert {language} developer, analyze this JSON request and generate clean, minimal {language} code:\n\
             {json}\n\
             \n\
             Requirements:\n\
             1. {essentials}\n\
             2. Concise and functional\n\
             3. Efficient, modern {language}\n\
             4. Wrap response inside ```{tag}",
            language = language,
            json = self.to_json(),
            essentials = essentials,
            tag = self.target_language,
        )
    }
}

/// Tone and audience of an explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationStyle {
    pub language_mix: String,
    pub audience_level: String,
}

impl From<&ExplanationConfig> for ExplanationStyle {
    fn from(config: &ExplanationConfig) -> Self {
        Self {
            language_mix: config.language_mix.clone(),
            audience_level: config.audience_level.clone(),
        }
    }
}

/// Prompt asking for a conversational walkthrough of `code`.
pub fn explanation_prompt(code: &str, target_language: &str, style: &ExplanationStyle) -> String {
    format!(
        "Explain this {language} code in {mix} for a {level} level programmer:\n\
         {code}\n\
         \n\
         Guidelines:\n\
         - Easy to understand with simple analogies\n\
         - Use the {mix} mix of words naturally\n\
         - Explain main sections\n\
         - Conversational and friendly\n\
         - Length depends upon the code",
        language = display_language(target_language),
        mix = style.language_mix,
        level = style.audience_level,
        code = code,
    )
}

fn display_language(language: &str) -> String {
    let mut chars = language.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
