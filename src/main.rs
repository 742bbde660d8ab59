//! `geminicraft` CLI entry point.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use geminicraft::config::Config;

use cli::Command;

#[derive(Debug, Parser)]
#[command(name = "geminicraft", version, about = "Cached, rate-limited gateway to the Gemini API")]
struct Cli {
    /// Path to a config file (defaults to ~/.geminicraft/config.json).
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; ignore a missing file.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Chat {
            tool,
            prompt,
            temperature,
            max_tokens,
            model,
            conversation,
            no_cache,
            no_history,
        } => {
            cli::chat::cmd_chat(
                &config,
                &tool,
                prompt,
                temperature,
                max_tokens,
                model,
                conversation,
                no_cache,
                no_history,
            )
            .await
        }
        Command::Cache { action } => cli::cache::cmd_cache(&config, action),
        Command::History { action } => cli::history::cmd_history(&config, action),
    }
}
