use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feed_curator::config::{CONFIG_ENV, DEFAULT_CONFIG_FILE};
use feed_curator::{Pipeline, Settings, SqliteStateStore};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "feed-curator")]
#[command(about = "Filter RSS articles with an LLM and deliver the keepers as Markdown")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, env = CONFIG_ENV)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Execute one batch run over all configured feeds
    #[default]
    Run,
    /// Print processing ledger statistics
    Stats,
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets (OPENAI_API_KEY, TARGET_API_KEY) may live in .env
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let context = || format!("failed to load configuration from {}", cli.config.display());
    let mut settings = Settings::read(&cli.config).with_context(context)?;

    // Subscriber first so proxy notices and config warnings are not dropped
    init_tracing(&settings.logging.level);
    settings
        .resolve(|key| std::env::var(key).ok())
        .with_context(context)?;
    info!("Starting feed curator with {}", cli.config.display());

    match cli.command.unwrap_or_default() {
        Command::Run => run(&settings).await,
        Command::Stats => stats(&settings).await,
    }
}

async fn run(settings: &Settings) -> Result<()> {
    let pipeline = Pipeline::from_settings(settings)
        .await
        .context("failed to initialize pipeline")?;

    let summary = match pipeline.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Run aborted: {}", e);
            pipeline.state().close().await;
            return Err(e.into());
        }
    };
    pipeline.state().close().await;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn stats(settings: &Settings) -> Result<()> {
    let store = SqliteStateStore::connect(&settings.state.db_file)
        .await
        .with_context(|| format!("failed to open {}", settings.state.db_file.display()))?;

    let total = store.count().await?;
    let by_status = store.status_counts().await?;
    store.close().await;

    println!("Processed URLs: {}", total);
    for (status, count) in by_status {
        println!("  {:<24} {}", status, count);
    }
    Ok(())
}
