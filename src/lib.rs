//! Poll-based options-chain ingestion and dealer gamma exposure analytics.
//!
//! The write path runs once per scheduler tick: fetch a chain snapshot from
//! the delayed-quote feed, normalize it into per-strike records, compute
//! gamma exposure, trim to a strike band around spot, and upsert the result
//! into SQLite. The read path is a stateless query engine over the persisted
//! time series, exposed through a small HTTP API.

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod dates;
pub mod ingest;
pub mod model;
pub mod scheduler;
pub mod store;
