//! Fixed-interval tick loop. The scheduler owns cadence; the pipeline
//! owns everything inside a tick. A failed tick is transient by design,
//! the loop just waits for the next interval.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::ingest::Pipeline;

/// Run ticks forever, sleeping `max(0, interval - elapsed)` between them
/// so slow ticks do not drift the cadence further than they must.
pub async fn run_forever(pipeline: &Pipeline, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "ingest scheduler started");
    loop {
        let started = Instant::now();
        run_once(pipeline).await;

        let wait = interval.saturating_sub(started.elapsed());
        debug!(wait_secs = wait.as_secs_f64(), "sleeping until next tick");
        tokio::time::sleep(wait).await;
    }
}

/// Run a single tick, logging the outcome. Returns whether it succeeded.
pub async fn run_once(pipeline: &Pipeline) -> bool {
    match pipeline.run_tick().await {
        Ok(summary) => {
            info!(
                timestamp = %summary.timestamp,
                spot = summary.spot_price,
                strikes = summary.strikes,
                retained = summary.retained,
                contracts = summary.contracts,
                "tick complete"
            );
            true
        }
        Err(err) => {
            warn!(stage = %err.stage(), error = %err, "tick failed");
            false
        }
    }
}
