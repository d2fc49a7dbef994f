use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Options-chain gamma exposure pipeline: poll a delayed-quote feed,
/// compute dealer gamma exposure per contract, and serve aggregations
/// over the persisted time series.
#[derive(Parser)]
#[command(name = "gexflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the SQLite schema and exit
    InitDb {
        /// Path to the SQLite database file
        #[arg(long, default_value = "gexflow.db")]
        db: PathBuf,
    },

    /// Run the ingestion loop (fetch, normalize, compute, load)
    Run {
        /// Path to the SQLite database file
        #[arg(long, default_value = "gexflow.db")]
        db: PathBuf,

        /// Minutes between ticks (overrides GEXFLOW_INTERVAL_MINUTES)
        #[arg(long)]
        interval: Option<u64>,

        /// Run a single tick then exit (for external cron)
        #[arg(long)]
        once: bool,
    },

    /// Serve the read-side analytics API
    Serve {
        /// Path to the SQLite database file
        #[arg(long, default_value = "gexflow.db")]
        db: PathBuf,

        /// Host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind
        #[arg(long, default_value = "8000")]
        port: u16,
    },
}
