//! SQLite-backed time-series store. One writer (the ingest pipeline) and
//! any number of readers; WAL mode keeps them out of each other's way.
//! Timestamps are stored as unix seconds.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Mutex;

use crate::model::{ExpiryGamma, MarketSnapshot, OptionContract, OptionType, StrikeGamma};

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub metrics_rows: u64,
    pub contract_rows: u64,
    pub latest_timestamp: Option<DateTime<Utc>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("creating database directory")?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("opening sqlite at {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        migrate(&conn)?;

        Ok(Store {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory sqlite")?;
        migrate(&conn)?;
        Ok(Store {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ── Write path ───────────────────────────────────────────────────

    /// Upsert one metrics row. On key collision only the price columns
    /// change; (timestamp, symbol) is immutable identity.
    pub async fn upsert_market_snapshot(
        &self,
        snapshot: &MarketSnapshot,
    ) -> rusqlite::Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO market_metrics
                 (timestamp, symbol, spot_price, prev_day_close, price_change, price_change_pct)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (timestamp, symbol) DO UPDATE SET
                 spot_price       = excluded.spot_price,
                 prev_day_close   = excluded.prev_day_close,
                 price_change     = excluded.price_change,
                 price_change_pct = excluded.price_change_pct",
            params![
                snapshot.timestamp.timestamp(),
                snapshot.symbol,
                snapshot.spot_price,
                snapshot.prev_day_close,
                snapshot.price_change,
                snapshot.price_change_pct,
            ],
        )?;
        Ok(())
    }

    /// Upsert a contract batch in one transaction. Quote columns take the
    /// latest write; key and identity columns never change.
    pub async fn upsert_contracts(&self, rows: &[OptionContract]) -> rusqlite::Result<usize> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO options_data
                     (timestamp, symbol, option_type, option_symbol, expiration_date,
                      strike_price, iv, delta, gamma, open_interest, volume,
                      gamma_exposure, time_till_exp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT (timestamp, option_symbol) DO UPDATE SET
                     iv             = excluded.iv,
                     delta          = excluded.delta,
                     gamma          = excluded.gamma,
                     open_interest  = excluded.open_interest,
                     volume         = excluded.volume,
                     gamma_exposure = excluded.gamma_exposure",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.timestamp.timestamp(),
                    row.symbol,
                    row.option_type.as_str(),
                    row.option_symbol,
                    row.expiration_date.timestamp(),
                    row.strike_price,
                    row.iv,
                    row.delta,
                    row.gamma,
                    row.open_interest,
                    row.volume,
                    row.gamma_exposure,
                    row.time_till_exp,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    // ── Read path ────────────────────────────────────────────────────

    /// Most recent snapshot timestamp with contract rows for the symbol.
    pub async fn latest_timestamp(&self, symbol: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().await;
        let ts: Option<i64> = conn.query_row(
            "SELECT MAX(timestamp) FROM options_data WHERE symbol = ?1",
            params![symbol],
            |row| row.get(0),
        )?;
        Ok(ts.map(from_unix))
    }

    /// Per-strike exposure sums at one snapshot, strikes ascending. Rows
    /// without a computed exposure contribute nothing to the sums.
    pub async fn gamma_by_strike(
        &self,
        symbol: &str,
        at: DateTime<Utc>,
    ) -> rusqlite::Result<Vec<StrikeGamma>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT strike_price,
                    COALESCE(SUM(CASE WHEN option_type = 'CALL' THEN gamma_exposure END), 0),
                    COALESCE(SUM(CASE WHEN option_type = 'PUT' THEN gamma_exposure END), 0),
                    COALESCE(SUM(gamma_exposure), 0),
                    MIN(expiration_date),
                    MAX(expiration_date)
             FROM options_data
             WHERE symbol = ?1 AND timestamp = ?2
             GROUP BY strike_price
             ORDER BY strike_price ASC",
        )?;
        let rows = stmt.query_map(params![symbol, at.timestamp()], strike_gamma_from_row)?;
        rows.collect()
    }

    /// Per-strike exposure sums ranked by absolute total, ties broken by
    /// ascending strike.
    pub async fn highest_gamma_strikes(
        &self,
        symbol: &str,
        at: DateTime<Utc>,
        limit: usize,
    ) -> rusqlite::Result<Vec<StrikeGamma>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT strike_price,
                    COALESCE(SUM(CASE WHEN option_type = 'CALL' THEN gamma_exposure END), 0),
                    COALESCE(SUM(CASE WHEN option_type = 'PUT' THEN gamma_exposure END), 0),
                    COALESCE(SUM(gamma_exposure), 0),
                    MIN(expiration_date),
                    MAX(expiration_date)
             FROM options_data
             WHERE symbol = ?1 AND timestamp = ?2
             GROUP BY strike_price
             ORDER BY ABS(COALESCE(SUM(gamma_exposure), 0)) DESC, strike_price ASC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(
            params![symbol, at.timestamp(), limit as i64],
            strike_gamma_from_row,
        )?;
        rows.collect()
    }

    /// Per-expiry exposure and open-interest sums at one snapshot,
    /// expirations ascending, capped at `limit`.
    pub async fn gamma_by_expiry(
        &self,
        symbol: &str,
        at: DateTime<Utc>,
        limit: usize,
    ) -> rusqlite::Result<Vec<ExpiryGamma>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT expiration_date,
                    COALESCE(SUM(CASE WHEN option_type = 'CALL' THEN gamma_exposure END), 0),
                    COALESCE(SUM(CASE WHEN option_type = 'PUT' THEN gamma_exposure END), 0),
                    COALESCE(SUM(gamma_exposure), 0),
                    COALESCE(SUM(CASE WHEN option_type = 'CALL' THEN open_interest END), 0),
                    COALESCE(SUM(CASE WHEN option_type = 'PUT' THEN open_interest END), 0)
             FROM options_data
             WHERE symbol = ?1 AND timestamp = ?2
             GROUP BY expiration_date
             ORDER BY expiration_date ASC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![symbol, at.timestamp(), limit as i64], |row| {
            Ok(ExpiryGamma {
                expiration_date: from_unix(row.get(0)?),
                call_gamma_exposure: row.get(1)?,
                put_gamma_exposure: row.get(2)?,
                total_gamma_exposure: row.get(3)?,
                call_open_interest: row.get(4)?,
                put_open_interest: row.get(5)?,
            })
        })?;
        rows.collect()
    }

    /// Earliest expiration present at one snapshot.
    pub async fn nearest_expiry(
        &self,
        symbol: &str,
        at: DateTime<Utc>,
    ) -> rusqlite::Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().await;
        let ts: Option<i64> = conn.query_row(
            "SELECT MIN(expiration_date) FROM options_data
             WHERE symbol = ?1 AND timestamp = ?2",
            params![symbol, at.timestamp()],
            |row| row.get(0),
        )?;
        Ok(ts.map(from_unix))
    }

    /// Contract rows for one snapshot and expiration, strikes ascending
    /// with calls before puts.
    pub async fn options_chain(
        &self,
        symbol: &str,
        at: DateTime<Utc>,
        expiration: DateTime<Utc>,
    ) -> rusqlite::Result<Vec<OptionContract>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT timestamp, symbol, option_type, option_symbol, expiration_date,
                    strike_price, iv, delta, gamma, open_interest, volume,
                    gamma_exposure, time_till_exp
             FROM options_data
             WHERE symbol = ?1 AND timestamp = ?2 AND expiration_date = ?3
             ORDER BY strike_price ASC, option_type ASC",
        )?;
        let rows = stmt.query_map(
            params![symbol, at.timestamp(), expiration.timestamp()],
            contract_from_row,
        )?;
        rows.collect()
    }

    /// Latest metrics row for the symbol.
    pub async fn latest_metrics(&self, symbol: &str) -> rusqlite::Result<Option<MarketSnapshot>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT timestamp, symbol, spot_price, prev_day_close, price_change, price_change_pct
             FROM market_metrics
             WHERE symbol = ?1
             ORDER BY timestamp DESC
             LIMIT 1",
            params![symbol],
            snapshot_from_row,
        )
        .optional()
    }

    /// Metrics rows at or after `since`, oldest first.
    pub async fn historical_metrics(
        &self,
        symbol: &str,
        since: DateTime<Utc>,
    ) -> rusqlite::Result<Vec<MarketSnapshot>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT timestamp, symbol, spot_price, prev_day_close, price_change, price_change_pct
             FROM market_metrics
             WHERE symbol = ?1 AND timestamp >= ?2
             ORDER BY timestamp ASC",
        )?;
        let rows = stmt.query_map(params![symbol, since.timestamp()], snapshot_from_row)?;
        rows.collect()
    }

    pub async fn stats(&self) -> rusqlite::Result<StoreStats> {
        let conn = self.conn.lock().await;
        let metrics_rows: i64 =
            conn.query_row("SELECT COUNT(*) FROM market_metrics", [], |row| row.get(0))?;
        let contract_rows: i64 =
            conn.query_row("SELECT COUNT(*) FROM options_data", [], |row| row.get(0))?;
        let latest: Option<i64> =
            conn.query_row("SELECT MAX(timestamp) FROM options_data", [], |row| {
                row.get(0)
            })?;
        Ok(StoreStats {
            metrics_rows: metrics_rows as u64,
            contract_rows: contract_rows as u64,
            latest_timestamp: latest.map(from_unix),
        })
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS market_metrics (
            timestamp         INTEGER NOT NULL,
            symbol            TEXT NOT NULL,
            spot_price        REAL NOT NULL DEFAULT 0,
            prev_day_close    REAL NOT NULL DEFAULT 0,
            price_change      REAL NOT NULL DEFAULT 0,
            price_change_pct  REAL NOT NULL DEFAULT 0,
            PRIMARY KEY (timestamp, symbol)
        );

        CREATE TABLE IF NOT EXISTS options_data (
            timestamp        INTEGER NOT NULL,
            symbol           TEXT NOT NULL,
            option_type      TEXT NOT NULL CHECK (option_type IN ('CALL', 'PUT')),
            option_symbol    TEXT NOT NULL,
            expiration_date  INTEGER NOT NULL,
            strike_price     REAL NOT NULL,
            iv               REAL NOT NULL DEFAULT 0,
            delta            REAL NOT NULL DEFAULT 0,
            gamma            REAL NOT NULL DEFAULT 0,
            open_interest    INTEGER NOT NULL DEFAULT 0,
            volume           INTEGER NOT NULL DEFAULT 0,
            gamma_exposure   REAL,
            time_till_exp    REAL NOT NULL DEFAULT 0,
            PRIMARY KEY (timestamp, option_symbol)
        );

        CREATE INDEX IF NOT EXISTS idx_metrics_symbol_ts
            ON market_metrics (symbol, timestamp DESC);
        CREATE INDEX IF NOT EXISTS idx_options_symbol_ts
            ON options_data (symbol, timestamp DESC);
        CREATE INDEX IF NOT EXISTS idx_options_expiry
            ON options_data (symbol, expiration_date, timestamp DESC);
        CREATE INDEX IF NOT EXISTS idx_options_strike
            ON options_data (strike_price);
        ",
    )?;
    Ok(())
}

// ── Row mapping ──────────────────────────────────────────────────────

fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

fn snapshot_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MarketSnapshot> {
    Ok(MarketSnapshot {
        timestamp: from_unix(row.get(0)?),
        symbol: row.get(1)?,
        spot_price: row.get(2)?,
        prev_day_close: row.get(3)?,
        price_change: row.get(4)?,
        price_change_pct: row.get(5)?,
    })
}

fn strike_gamma_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StrikeGamma> {
    Ok(StrikeGamma {
        strike_price: row.get(0)?,
        call_gamma_exposure: row.get(1)?,
        put_gamma_exposure: row.get(2)?,
        total_gamma_exposure: row.get(3)?,
        earliest_expiry: from_unix(row.get(4)?),
        latest_expiry: from_unix(row.get(5)?),
    })
}

fn contract_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OptionContract> {
    Ok(OptionContract {
        timestamp: from_unix(row.get(0)?),
        symbol: row.get(1)?,
        option_type: row.get(2)?,
        option_symbol: row.get(3)?,
        expiration_date: from_unix(row.get(4)?),
        strike_price: row.get(5)?,
        iv: row.get(6)?,
        delta: row.get(7)?,
        gamma: row.get(8)?,
        open_interest: row.get(9)?,
        volume: row.get(10)?,
        gamma_exposure: row.get(11)?,
        time_till_exp: row.get(12)?,
    })
}

impl FromSql for OptionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        OptionType::parse(s).ok_or(FromSqlError::InvalidType)
    }
}
