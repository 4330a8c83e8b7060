use std::path::PathBuf;

use anyhow::Result;
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::gateway::CompletionGateway;
use crate::prompt::ExplanationStyle;
use crate::session::Session;
use crate::ui::UIHandler;

/// What a line typed in interactive mode asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Generate(String),
    Explain,
    Show,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let command = match line {
            ":explain" | ":e" => Command::Explain,
            ":show" | ":s" => Command::Show,
            ":quit" | ":q" | ":exit" => Command::Quit,
            other if other.starts_with(':') => Command::Unknown(other.to_string()),
            task => Command::Generate(task.to_string()),
        };
        Some(command)
    }
}

/// Drives one session: runs actions, renders, and persists after each one.
pub struct App<'a> {
    gateway: &'a CompletionGateway,
    config: &'a Config,
    ui: &'a UIHandler,
    session: Session,
    session_path: Option<PathBuf>,
}

impl<'a> App<'a> {
    pub fn new(
        gateway: &'a CompletionGateway,
        config: &'a Config,
        ui: &'a UIHandler,
        session_path: Option<PathBuf>,
    ) -> Result<Self> {
        let session = match &session_path {
            Some(path) => Session::load(path)?,
            None => Session::new(),
        };
        info!("Session {} in state {:?}", session.id, session.state());
        Ok(Self { gateway, config, ui, session, session_path })
    }

    pub async fn generate(&mut self, task: &str) -> Result<()> {
        let spinner = self.ui.spinner("🔮 Generating clean, minimal code...");
        let ran = self
            .session
            .on_generate(self.gateway, task, &self.config.generation)
            .await;
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }
        if !ran {
            return Ok(());
        }
        self.persist()?;
        self.ui.render_generation(&self.session);
        Ok(())
    }

    pub async fn explain(&mut self) -> Result<()> {
        let style = ExplanationStyle::from(&self.config.explanation);
        let spinner = self.ui.spinner("🗣️ Generating explanation...");
        let ran = self.session.on_explain(self.gateway, &style).await;
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }
        if !ran {
            warn!("Nothing to explain yet; generate some code first");
            return Ok(());
        }
        self.persist()?;
        self.ui.render_explanation(&self.session);
        Ok(())
    }

    pub fn show(&self) {
        self.ui.render_generation(&self.session);
        self.ui.render_explanation(&self.session);
    }

    /// Read tasks and commands from stdin until EOF or `:quit`.
    pub async fn run_interactive(&mut self) -> Result<()> {
        self.show();
        self.ui.prompt_hint();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match Command::parse(&line) {
                None => continue,
                Some(Command::Generate(task)) => self.generate(&task).await?,
                Some(Command::Explain) => self.explain().await?,
                Some(Command::Show) => self.show(),
                Some(Command::Quit) => break,
                Some(Command::Unknown(cmd)) => warn!("Unknown command: {}", cmd),
            }
            self.ui.prompt_hint();
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        if let Some(path) = &self.session_path {
            self.session.save(path)?;
        }
        Ok(())
    }
}
