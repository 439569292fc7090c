use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "launchkit")]
#[command(author, version, about = "Command-palette query engine")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a one-shot routed query
    Query {
        /// Query text, trigger syntax included (e.g. ">timer 5m")
        text: String,

        /// Maximum number of results to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Read queries from stdin and print debounced result updates
    Interactive,

    /// Show the top applications by frecency score
    Apps {
        /// Maximum number of applications to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Manage the launch history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// List registered providers and their trigger tokens
    Providers,

    /// Rescan the application index and invalidate the result cache
    Rebuild,

    /// Show engine statistics and metrics
    Stats {
        /// Output in Prometheus format
        #[arg(long)]
        prometheus: bool,
    },
}

/// Subcommands for launch-history management.
#[derive(Subcommand)]
pub enum HistoryCommand {
    /// Record a launch for an item
    Record {
        /// Item name as it appears in results
        name: String,
    },

    /// Show the highest-scoring items
    Top {
        /// Maximum number of items to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Remove one item's history, or everything
    Clear {
        /// Item to remove; omit to clear all history
        name: Option<String>,
    },
}
