use std::collections::BTreeSet;
use std::sync::OnceLock;

use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Everything derived from one model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedCode {
    pub raw_response: String,
    pub extracted_code: String,
    pub cleaned_code: String,
    /// Sorted ascending, no duplicates.
    pub modules: Vec<String>,
}

/// Regex-based post-processing of model replies.
///
/// The rules are text substitutions, not a parser: a `#` inside a string literal is
/// treated as a comment like any other, and nothing checks that the result is valid code.
pub struct ResponseProcessor;

fn fenced_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Optional python tag, optionally followed by a file name on the same line.
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:(?:python3?|py)\b(?:[ \t]+[\w./-]+\.py\b)?)?\s*(.*?)\s*```").unwrap()
    })
}

fn triple_quoted() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)"""(.*?)""""#).unwrap())
}

fn line_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#[^\n]*").unwrap())
}

fn double_docstring() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)""".*?""""#).unwrap())
}

fn single_docstring() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)'''.*?'''").unwrap())
}

fn top_level_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(?:import|from)[ \t]+(\w+)").unwrap())
}

impl ResponseProcessor {
    /// Pull the code out of a reply.
    ///
    /// The first fenced block wins, even when it is empty. Without any fence the first
    /// `"""` span is used, and without that the reply comes back as-is.
    pub fn extract_code(response_text: &str) -> String {
        if let Some(caps) = fenced_block().captures(response_text) {
            return caps[1].trim().to_string();
        }
        if let Some(caps) = triple_quoted().captures(response_text) {
            return caps[1].to_string();
        }
        response_text.to_string()
    }

    /// Strip `#` comments, triple-quoted spans and blank lines.
    pub fn clean(code: &str) -> String {
        let mut text = code.to_string();
        // Removing one span can splice quotes into a new pair; run until nothing changes.
        loop {
            let stripped = line_comment().replace_all(&text, "");
            let stripped = double_docstring().replace_all(&stripped, "");
            let stripped = single_docstring().replace_all(&stripped, "").into_owned();
            if stripped == text {
                break;
            }
            text = stripped;
        }

        text.split('\n')
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Distinct top-level imported module names, sorted.
    pub fn list_modules(code: &str) -> Vec<String> {
        top_level_import()
            .captures_iter(code)
            .map(|caps| caps[1].to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Run extraction, cleanup and module discovery on a raw reply.
    pub fn process(raw_response: &str) -> ProcessedCode {
        let extracted_code = Self::extract_code(raw_response);
        let cleaned_code = Self::clean(&extracted_code);
        let modules = Self::list_modules(&cleaned_code);
        info!(
            "Processed reply: {} raw chars, {} code lines, {} module(s)",
            raw_response.len(),
            cleaned_code.lines().count(),
            modules.len()
        );
        ProcessedCode {
            raw_response: raw_response.to_string(),
            extracted_code,
            cleaned_code,
            modules,
        }
    }
}
