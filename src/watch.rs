use std::time::Duration;

use chrono::Local;
use sqlx::PgPool;
use tokio::time::{interval, MissedTickBehavior};
use tracing::warn;

use crate::analytics;
use crate::db;
use crate::models::{CallRecord, CALLS_COLLECTION};

/// Polls the call collection on a fixed interval and prints a one-line
/// summary per tick. Ticks run strictly one at a time; if a fetch outlives
/// the interval the next tick is delayed rather than stacked, so results
/// can never be applied out of order. A failed fetch keeps the previously
/// loaded data and retries on the next tick.
pub async fn run(pool: &PgPool, interval_secs: u64) -> anyhow::Result<()> {
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut calls: Vec<CallRecord> = Vec::new();
    println!("Polling every {interval_secs}s. Press Ctrl-C to stop.");

    loop {
        ticker.tick().await;
        match db::fetch_collection(pool, CALLS_COLLECTION).await {
            Ok(docs) => {
                calls = docs.iter().map(CallRecord::from_doc).collect();
            }
            Err(e) => {
                warn!(error = %e, "poll fetch failed, keeping previous data");
                continue;
            }
        }
        let metrics = analytics::call_metrics(&calls);
        println!(
            "[{}] {} calls, avg score {}, interested {}, not interested {}",
            Local::now().format("%H:%M:%S"),
            metrics.total_calls,
            metrics.average_score,
            metrics.interested,
            metrics.not_interested
        );
    }
}
