use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use gexflow::analytics::QueryEngine;
use gexflow::api;
use gexflow::cli::{Cli, Command};
use gexflow::config::Settings;
use gexflow::ingest::Pipeline;
use gexflow::scheduler;
use gexflow::store::Store;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::InitDb { db } => init_db(&db),
        Command::Run { db, interval, once } => run_ingest(&db, interval, once),
        Command::Serve { db, host, port } => serve(&db, &host, port),
    }
}

fn init_db(db: &Path) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    let store = Store::open(db)?;
    let stats = rt.block_on(store.stats())?;
    println!("database ready at {}", db.display());
    println!("  market metric rows: {}", stats.metrics_rows);
    println!("  contract rows:      {}", stats.contract_rows);
    if let Some(ts) = stats.latest_timestamp {
        println!("  latest snapshot:    {}", ts.to_rfc3339());
    }
    Ok(())
}

fn run_ingest(db: &Path, interval: Option<u64>, once: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    let mut settings = Settings::from_env()?;
    if let Some(minutes) = interval {
        settings.interval_minutes = minutes;
    }
    let store = Store::open(db)?;
    let pipeline = Pipeline::new(&settings, store)?;

    if once {
        if !rt.block_on(scheduler::run_once(&pipeline)) {
            bail!("ingestion tick failed");
        }
        return Ok(());
    }

    let interval = std::time::Duration::from_secs(settings.interval_minutes * 60);
    rt.block_on(scheduler::run_forever(&pipeline, interval));
    Ok(())
}

fn serve(db: &Path, host: &str, port: u16) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    let settings = Settings::from_env()?;
    let store = Store::open(db)?;
    let engine = QueryEngine::new(store, &settings.symbol, settings.timezone);
    rt.block_on(api::serve(host, port, engine))
}
