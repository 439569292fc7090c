use anyhow::Result;
use clap::Parser;

use launchkit::cli::{Cli, Commands, HistoryCommand};
use launchkit::config::Config;
use launchkit::logging::init_logging;
use launchkit::metrics;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (if available, otherwise use defaults)
    let config = Config::load().unwrap_or_default();

    // Initialize logging with configuration
    // The guard MUST be held until program exit to ensure logs are flushed
    let data_dir = Config::data_dir().unwrap_or_else(|_| std::env::temp_dir());
    let _logging_guard = init_logging(&config.logging, &data_dir)?;

    tracing::info!("launchkit starting up");

    // Register Prometheus metrics
    metrics::register_metrics();

    let cli = Cli::parse();

    match cli.command {
        Commands::Query { text, limit } => {
            launchkit::commands::query::run(&text, limit).await?;
        }
        Commands::Interactive => {
            launchkit::commands::interactive::run().await?;
        }
        Commands::Apps { limit } => {
            launchkit::commands::apps::run(limit).await?;
        }
        Commands::History { command } => match command {
            HistoryCommand::Record { name } => {
                launchkit::commands::history::record(name).await?;
            }
            HistoryCommand::Top { limit } => {
                launchkit::commands::history::top(limit).await?;
            }
            HistoryCommand::Clear { name } => {
                launchkit::commands::history::clear(name).await?;
            }
        },
        Commands::Providers => {
            launchkit::commands::providers::run().await?;
        }
        Commands::Rebuild => {
            launchkit::commands::rebuild::run().await?;
        }
        Commands::Stats { prometheus } => {
            launchkit::commands::stats::run(prometheus).await?;
        }
    }

    Ok(())
}
