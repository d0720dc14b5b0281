//! Shared health state for the /health endpoint.
//! Updated by the scheduler loop, read by the API.

use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, Ordering};

use serde::Serialize;

use crate::types::CycleState;

#[derive(Default)]
pub struct HealthState {
    state: AtomicU8,
    cycles_completed: AtomicU64,
    cycles_skipped: AtomicU64,
    cycles_failed: AtomicU64,
    reports_written: AtomicU64,
    write_failures: AtomicU64,
    /// Unix seconds of the last published snapshot (0 = none).
    last_success_at: AtomicI64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthReport {
    pub state: CycleState,
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub cycles_failed: u64,
    pub reports_written: u64,
    pub write_failures: u64,
    pub last_success_at: Option<i64>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&self, s: CycleState) {
        self.state.store(s.as_u8(), Ordering::Relaxed);
    }

    pub fn state(&self) -> CycleState {
        CycleState::from_u8(self.state.load(Ordering::Relaxed))
    }

    pub fn record_success(&self, at_unix_secs: i64) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.last_success_at.store(at_unix_secs, Ordering::Relaxed);
    }

    /// Fetch produced nothing to publish.
    pub fn inc_skipped(&self) {
        self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reports_written(&self) {
        self.reports_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_write_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) -> HealthReport {
        let last = self.last_success_at.load(Ordering::Relaxed);
        HealthReport {
            state: self.state(),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            reports_written: self.reports_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            last_success_at: (last != 0).then_some(last),
        }
    }
}
