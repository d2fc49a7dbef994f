use chrono::{DateTime, TimeZone, Utc};

use gexflow::ingest::{LoadError, load_contracts};
use gexflow::model::{MarketSnapshot, OptionContract, OptionType};
use gexflow::store::Store;

// ── Fixtures ─────────────────────────────────────────────────────────

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 5, 1, 15, minute, 0).unwrap()
}

fn expiry() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 5, 19, 20, 0, 0).unwrap()
}

fn snapshot(ts: DateTime<Utc>, spot: f64) -> MarketSnapshot {
    MarketSnapshot {
        timestamp: ts,
        symbol: "_SPX".into(),
        spot_price: spot,
        prev_day_close: 4180.0,
        price_change: spot - 4180.0,
        price_change_pct: (spot - 4180.0) / 4180.0 * 100.0,
    }
}

fn contract(
    ts: DateTime<Utc>,
    option_type: OptionType,
    option_symbol: &str,
    strike: f64,
    exposure: Option<f64>,
) -> OptionContract {
    OptionContract {
        timestamp: ts,
        symbol: "_SPX".into(),
        option_type,
        option_symbol: option_symbol.into(),
        expiration_date: expiry(),
        strike_price: strike,
        iv: 0.2,
        delta: 0.5,
        gamma: 0.001,
        open_interest: 100,
        volume: 10,
        gamma_exposure: exposure,
        time_till_exp: 14.0 / 252.0,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_metrics_upsert_is_idempotent() {
    let store = Store::open_in_memory().unwrap();
    let ts = at(30);

    store.upsert_market_snapshot(&snapshot(ts, 4200.0)).await.unwrap();
    store.upsert_market_snapshot(&snapshot(ts, 4200.0)).await.unwrap();
    assert_eq!(store.stats().await.unwrap().metrics_rows, 1);

    // Re-running the same tick with a fresher quote overwrites in place.
    store.upsert_market_snapshot(&snapshot(ts, 4210.0)).await.unwrap();
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.metrics_rows, 1, "key collision must not add a row");

    let row = store.latest_metrics("_SPX").await.unwrap().unwrap();
    assert_eq!(row.timestamp, ts);
    assert_eq!(row.spot_price, 4210.0);
    assert!((row.price_change - 30.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_contract_upsert_updates_quote_columns_only() {
    let store = Store::open_in_memory().unwrap();
    let ts = at(30);

    let first = contract(ts, OptionType::Call, "SPX230519C04000000", 4000.0, Some(100.0));
    assert_eq!(store.upsert_contracts(&[first]).await.unwrap(), 1);

    // Same identity key, conflicting strike/expiry/tte plus new quotes.
    let mut second = contract(ts, OptionType::Call, "SPX230519C04000000", 4005.0, Some(250.0));
    second.expiration_date = Utc.with_ymd_and_hms(2023, 6, 16, 20, 0, 0).unwrap();
    second.time_till_exp = 99.0;
    second.open_interest = 250;
    second.iv = 0.33;
    store.upsert_contracts(&[second]).await.unwrap();

    assert_eq!(store.stats().await.unwrap().contract_rows, 1);

    // The row is still findable under its original expiration: key and
    // identity columns did not move, quote columns did.
    let rows = store.options_chain("_SPX", ts, expiry()).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.strike_price, 4000.0);
    assert_eq!(row.expiration_date, expiry());
    assert!((row.time_till_exp - 14.0 / 252.0).abs() < 1e-12);
    assert_eq!(row.open_interest, 250);
    assert_eq!(row.iv, 0.33);
    assert_eq!(row.gamma_exposure, Some(250.0));
}

#[tokio::test]
async fn test_empty_contract_batch_is_a_load_error() {
    let store = Store::open_in_memory().unwrap();

    let result = load_contracts(&store, &[]).await;
    assert!(matches!(result, Err(LoadError::EmptyBatch)));

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.contract_rows, 0);

    let rows = vec![
        contract(at(30), OptionType::Call, "C1", 4000.0, Some(1.0)),
        contract(at(30), OptionType::Put, "P1", 4000.0, Some(-1.0)),
    ];
    assert_eq!(load_contracts(&store, &rows).await.unwrap(), 2);
}

#[tokio::test]
async fn test_latest_timestamp_follows_contract_writes() {
    let store = Store::open_in_memory().unwrap();
    assert_eq!(store.latest_timestamp("_SPX").await.unwrap(), None);

    store
        .upsert_contracts(&[contract(at(15), OptionType::Call, "C1", 4000.0, None)])
        .await
        .unwrap();
    store
        .upsert_contracts(&[contract(at(45), OptionType::Call, "C2", 4000.0, None)])
        .await
        .unwrap();

    assert_eq!(store.latest_timestamp("_SPX").await.unwrap(), Some(at(45)));
    assert_eq!(store.latest_timestamp("_NDX").await.unwrap(), None);
}

#[tokio::test]
async fn test_partial_snapshot_stays_visible() {
    // The two upserts are independent: a metrics row with no contract
    // rows is a legal store state, not something reads may hide.
    let store = Store::open_in_memory().unwrap();
    store.upsert_market_snapshot(&snapshot(at(30), 4200.0)).await.unwrap();

    assert!(store.latest_metrics("_SPX").await.unwrap().is_some());
    assert_eq!(store.latest_timestamp("_SPX").await.unwrap(), None);
    let stats = store.stats().await.unwrap();
    assert_eq!((stats.metrics_rows, stats.contract_rows), (1, 0));
}

#[tokio::test]
async fn test_historical_metrics_window_is_inclusive_and_ascending() {
    let store = Store::open_in_memory().unwrap();
    for (minute, spot) in [(0, 4190.0), (15, 4200.0), (30, 4210.0)] {
        store.upsert_market_snapshot(&snapshot(at(minute), spot)).await.unwrap();
    }

    let rows = store.historical_metrics("_SPX", at(15)).await.unwrap();
    let spots: Vec<f64> = rows.iter().map(|r| r.spot_price).collect();
    assert_eq!(spots, vec![4200.0, 4210.0], "window starts at `since`, oldest first");
}

#[tokio::test]
async fn test_chain_rows_order_strikes_then_calls_first() {
    let store = Store::open_in_memory().unwrap();
    let ts = at(30);
    let rows = vec![
        contract(ts, OptionType::Put, "P4000", 4000.0, None),
        contract(ts, OptionType::Call, "C4000", 4000.0, None),
        contract(ts, OptionType::Call, "C3900", 3900.0, None),
    ];
    store.upsert_contracts(&rows).await.unwrap();

    let chain = store.options_chain("_SPX", ts, expiry()).await.unwrap();
    let symbols: Vec<&str> = chain.iter().map(|r| r.option_symbol.as_str()).collect();
    assert_eq!(symbols, vec!["C3900", "C4000", "P4000"]);
    assert_eq!(chain[1].option_type, OptionType::Call);
    assert_eq!(chain[2].option_type, OptionType::Put);
}
