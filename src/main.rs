use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

mod app;
mod config;
mod gateway;
mod logger;
mod processor;
mod prompt;
mod providers;
mod session;
mod ui;

use app::App;
use config::Config;
use gateway::{CompletionGateway, TextProvider};

#[derive(Parser)]
#[command(name = "code_writer", about = "Generate clean, minimal code from a task description")]
struct Args {
    /// Plain output: no colors, spinners or headers
    #[arg(long)]
    headless: bool,
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<String>,
    /// Keep session state in this JSON file across runs
    #[arg(short, long)]
    session: Option<PathBuf>,
    /// Explain the code after generating it (or the saved code when no task is given)
    #[arg(short, long)]
    explain: bool,
    /// Task description; omit to start an interactive session
    #[arg(trailing_var_arg = true)]
    task: Vec<String>,
}

fn build_gateway(config: &Config) -> Result<CompletionGateway> {
    let mut chain: Vec<Box<dyn TextProvider>> = Vec::new();
    for slot in config.provider_chain() {
        chain.push(providers::build_provider(slot, &config.http)?);
    }
    if chain.is_empty() {
        warn!("No AI providers enabled in configuration");
    }
    Ok(CompletionGateway::new(chain))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.verbose, args.headless);
    dotenv::dotenv().ok();

    let mut config = Config::load(&args.config)?;
    config.merge_with_args(args.headless);

    let gateway = build_gateway(&config)?;
    info!("Provider chain: {}", gateway.provider_names().join(" -> "));

    let ui = ui::UIHandler::new(args.headless, &config.ui);
    ui.start();

    let mut app = App::new(&gateway, &config, &ui, args.session)?;
    let task = args.task.join(" ");

    if !task.trim().is_empty() {
        app.generate(&task).await?;
        if args.explain {
            app.explain().await?;
        }
    } else if args.explain {
        app.explain().await?;
    } else {
        app.run_interactive().await?;
    }
    Ok(())
}
