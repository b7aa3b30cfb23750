mod cli;
mod commands;
mod draft_file;

use anyhow::Result;
use clap::Parser;
use dispatch_config::Config;
use dispatch_storage::Storage;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let cli::Commands::Validate { draft, json } = &cli.command {
        return commands::validate::handle(draft, *json, &config);
    }

    // Initialize storage once (creates connection pool and runs migrations)
    let storage = Storage::new(config.storage.database.clone()).await?;

    match cli.command {
        cli::Commands::Validate { .. } => Ok(()),
        cli::Commands::Submit { draft, order } => {
            commands::submit::handle(&draft, order, &storage, &config).await
        }
        cli::Commands::Orders(cmd) => commands::orders::handle(cmd, &storage).await,
        cli::Commands::Retry { order, draft } => {
            commands::retry::handle(order, &draft, &storage, &config).await
        }
    }
}
