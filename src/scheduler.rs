use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Timelike};
use futures_util::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::aggregator::aggregate;
use crate::api::health::HealthState;
use crate::api::latency::CycleLatency;
use crate::error::Result;
use crate::fetcher::MarketSource;
use crate::publisher::Publish;
use crate::state::SnapshotStore;
use crate::types::{CycleState, Snapshot};

/// How a cycle ended when it did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Published { coins: usize },
    /// The source returned no eligible rows.
    Skipped,
}

/// Drives fetch → aggregate → publish → sleep until asked to stop.
///
/// The only writer of the snapshot store. A failed cycle leaves the previous
/// snapshot in place; write failures are logged and counted but never keep a
/// fresh snapshot from being published.
pub struct Scheduler<S, P> {
    source: S,
    publisher: P,
    store: Arc<SnapshotStore>,
    health: Arc<HealthState>,
    latency: Arc<CycleLatency>,
    interval: Duration,
    /// Local hour (0-23) of the last successful report write.
    last_report_hour: Option<u32>,
}

impl<S: MarketSource, P: Publish> Scheduler<S, P> {
    pub fn new(
        source: S,
        publisher: P,
        store: Arc<SnapshotStore>,
        health: Arc<HealthState>,
        latency: Arc<CycleLatency>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            publisher,
            store,
            health,
            latency,
            interval,
            last_report_hour: None,
        }
    }

    /// Run until `stop` turns true or its sender is dropped. The first cycle
    /// starts immediately; a cycle in flight always completes.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        loop {
            if *stop.borrow() {
                break;
            }

            let started = Instant::now();
            let cycle = AssertUnwindSafe(self.run_cycle(Local::now))
                .catch_unwind()
                .await;
            match cycle {
                Ok(Ok(CycleOutcome::Published { coins })) => debug!(coins, "Snapshot replaced"),
                Ok(Ok(CycleOutcome::Skipped)) => self.health.inc_skipped(),
                Ok(Err(e)) => {
                    error!("Market cycle failed: {e}");
                    self.health.inc_failed();
                }
                Err(_) => {
                    error!("Market cycle panicked, continuing with the next one");
                    self.health.inc_failed();
                }
            }
            self.latency.record(started.elapsed());

            self.transition(CycleState::Sleeping);
            let stopped = tokio::select! {
                _ = tokio::time::sleep(self.interval) => false,
                changed = stop.changed() => changed.is_err() || *stop.borrow(),
            };
            if stopped {
                break;
            }
        }

        self.transition(CycleState::Stopped);
        info!("Scheduler stopped");
    }

    /// One fetch → aggregate → publish pass stamped with a fixed `now`.
    pub async fn run_cycle_at(&mut self, now: DateTime<Local>) -> Result<CycleOutcome> {
        self.run_cycle(move || now).await
    }

    /// One fetch → aggregate → publish pass. `clock` is read once the fetch
    /// has returned, so the stamp and the hourly gate reflect when the data
    /// arrived.
    pub async fn run_cycle<C>(&mut self, clock: C) -> Result<CycleOutcome>
    where
        C: Fn() -> DateTime<Local>,
    {
        self.transition(CycleState::Fetching);
        let tickers = self.source.fetch().await?;
        if tickers.is_empty() {
            warn!("No eligible tickers fetched, skipping cycle");
            return Ok(CycleOutcome::Skipped);
        }
        let now = clock();

        self.transition(CycleState::Aggregating);
        let (rows, stats) = aggregate(&tickers, now);

        self.transition(CycleState::Publishing);
        if let Err(e) = self.publisher.write_spreadsheet(&rows, &stats) {
            error!("Spreadsheet write failed: {e}");
            self.health.inc_write_failures();
        }

        let hour = now.hour();
        if self.last_report_hour != Some(hour) {
            match self.publisher.write_report(&rows, &stats) {
                Ok(()) => {
                    self.last_report_hour = Some(hour);
                    self.health.inc_reports_written();
                }
                Err(e) => {
                    error!("Report write failed, retrying next cycle: {e}");
                    self.health.inc_write_failures();
                }
            }
        }

        let coins = rows.len();
        let total_market_cap = stats.overview.total_market_cap;
        self.store.publish(Snapshot::new(rows, stats));
        self.health.record_success(now.timestamp());

        info!(
            coins,
            total_market_cap,
            "Cycle complete: {coins} coins, total market cap ${total_market_cap:.2}"
        );
        Ok(CycleOutcome::Published { coins })
    }

    fn transition(&self, next: CycleState) {
        debug!(state = %next, "Scheduler state");
        self.health.set_state(next);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
