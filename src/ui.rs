use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::UIConfig;
use crate::gateway::ProviderUsed;
use crate::prompt::TARGET_LANGUAGE;
use crate::session::Session;

/// Terminal presentation of a session.
pub struct UIHandler {
    pub headless: bool,
    spinners: bool,
}

impl UIHandler {
    pub fn new(headless: bool, config: &UIConfig) -> Self {
        if headless || !config.colorful {
            colored::control::set_override(false);
        }
        Self {
            headless,
            spinners: config.spinners && !headless,
        }
    }

    pub fn start(&self) {
        if self.headless {
            return;
        }
        println!("{}", "=".repeat(60).bright_blue());
        println!("{}", "✨ Code Writer".bright_white().bold());
        println!("{}", "Generate clean, minimal code using AI 🚀".dimmed());
        println!("{}", "=".repeat(60).bright_blue());
    }

    /// Spinner shown while a provider call is in flight.
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.spinners {
            return None;
        }
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Some(bar)
    }

    /// Print generated output; nothing is printed before the first generation.
    pub fn render_generation(&self, session: &Session) {
        let Some(generation) = session.generation() else {
            return;
        };
        let processed = &generation.processed;

        if self.headless {
            if let Some(command) = session.install_command() {
                println!("# {}", command);
            }
            println!("{}", processed.cleaned_code);
            return;
        }

        println!();
        println!("{}", "## 🎯 Results".bright_white().bold());
        if generation.provider_used == ProviderUsed::None {
            println!("{}", processed.cleaned_code.red());
            return;
        }
        if generation.provider_used != ProviderUsed::Primary {
            println!("{}", format!("(answered by the {} provider)", generation.provider_used).dimmed());
        }

        if let Some(command) = session.install_command() {
            println!();
            println!("{}", "### 📦 Required Modules".cyan().bold());
            println!("You'll need to install the following packages:");
            println!("  {}", command.bright_yellow());
        }

        println!();
        println!("{}", format!("### 🧩 Generated Code ({})", TARGET_LANGUAGE).cyan().bold());
        println!("{}", "-".repeat(60).dimmed());
        println!("{}", processed.cleaned_code);
        println!("{}", "-".repeat(60).dimmed());
    }

    pub fn render_explanation(&self, session: &Session) {
        let Some(explanation) = session.explanation() else {
            return;
        };
        if self.headless {
            println!("{}", explanation.explanation_text);
            return;
        }
        println!();
        println!("{}", "✅ Explanation Ready!".green().bold());
        println!("{}", "### 🔍 Code Explanation".cyan().bold());
        println!("{}", explanation.explanation_text);
    }

    pub fn prompt_hint(&self) {
        if self.headless {
            return;
        }
        println!();
        println!(
            "{}",
            "Describe your task and press Enter. Commands: :explain, :show, :quit".dimmed()
        );
    }
}
