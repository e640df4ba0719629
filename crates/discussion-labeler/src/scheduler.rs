//! Fixed-interval re-invocation of the labeling run.

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

/// Run `job` now and then once per `every`, forever.
///
/// Runs never overlap: the next tick is only awaited after the previous run
/// finished, and ticks missed while a run was in progress are skipped
/// rather than replayed.
pub async fn run_periodically<F, Fut>(every: Duration, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    info!("Performing initial run");
    job().await;

    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(
        interval_secs = every.as_secs(),
        "Agent started: checking for new discussions periodically"
    );

    loop {
        ticker.tick().await;
        job().await;
    }
}
