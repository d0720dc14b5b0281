//! In-memory histogram of scheduler cycle durations.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

/// Cycle wall time, stored in milliseconds. Scheduler records, API reads.
pub struct CycleLatency {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LatencySummary {
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
    pub samples: u64,
}

impl CycleLatency {
    /// Tracks 1 ms to 1 h, 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 3_600_000, 3)
            .expect("valid histogram bounds");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    pub fn record(&self, d: Duration) {
        let ms = (d.as_millis().min(u128::from(u64::MAX)) as u64).max(1);
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.saturating_record(ms);
        }
    }

    pub fn summary(&self) -> LatencySummary {
        let Ok(h) = self.inner.lock() else {
            return LatencySummary { p50_ms: None, p95_ms: None, p99_ms: None, samples: 0 };
        };
        if h.len() == 0 {
            return LatencySummary { p50_ms: None, p95_ms: None, p99_ms: None, samples: 0 };
        }
        LatencySummary {
            p50_ms: Some(h.value_at_quantile(0.5)),
            p95_ms: Some(h.value_at_quantile(0.95)),
            p99_ms: Some(h.value_at_quantile(0.99)),
            samples: h.len(),
        }
    }
}

impl Default for CycleLatency {
    fn default() -> Self {
        Self::new()
    }
}
