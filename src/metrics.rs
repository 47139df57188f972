// ═══════════════════════════════════════════════════════════════
// METRICS COLLECTOR - If a truck is matched and nobody counts it, did it haul?
// ═══════════════════════════════════════════════════════════════
//
// Atomic counters for everything. Lock-free because we're THAT paranoid
// about contention on a service whose entire job is sampling imaginary
// trucks. The snapshot gets served on /metrics so anyone curious can
// watch the unprofitable-order counter climb in real time.
//
// Yes, there is an atomic *float* in here, accumulating matched profit
// to the penny. Fictional dollars deserve real memory-ordering
// guarantees.

use portable_atomic::{AtomicF64, AtomicU64, Ordering};
use serde::Serialize;
use std::time::Instant;

/// What /metrics serializes: every counter plus a couple of derived rates.
#[derive(Debug, Serialize, Clone)]
pub struct MetricsSnapshot {
    pub requests_received: u64,
    pub request_failures: u64,
    pub orders_sampled: u64,
    pub orders_matched: u64,
    pub orders_rejected_unprofitable: u64,
    pub matched_profit_total: f64,
    pub uptime_seconds: u64,
    pub matches_per_minute: f64,
    pub status: String,
}

/// The collector every request handler and pipeline pass reports into.
/// Every counter is atomic because mutexes are for the weak.
#[derive(Debug)]
pub struct MetricsCollector {
    requests_received: AtomicU64,
    request_failures: AtomicU64,
    orders_sampled: AtomicU64,
    orders_matched: AtomicU64,
    orders_rejected_unprofitable: AtomicU64,
    matched_profit_total: AtomicF64,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            requests_received: AtomicU64::new(0),
            request_failures: AtomicU64::new(0),
            orders_sampled: AtomicU64::new(0),
            orders_matched: AtomicU64::new(0),
            orders_rejected_unprofitable: AtomicU64::new(0),
            matched_profit_total: AtomicF64::new(0.0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_requests(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_request_failures(&self) {
        self.request_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_orders_sampled(&self, count: u64) {
        self.orders_sampled.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_orders_matched(&self, count: u64) {
        self.orders_matched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_orders_rejected(&self, count: u64) {
        self.orders_rejected_unprofitable
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_matched_profit(&self, dollars: f64) {
        self.matched_profit_total.fetch_add(dollars, Ordering::Relaxed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Relaxed loads across the board: the snapshot is a dashboard read,
    /// not a ledger audit.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime = self.uptime_seconds();
        let orders_matched = self.orders_matched.load(Ordering::Relaxed);
        let matches_per_minute = if uptime > 0 {
            (orders_matched as f64 / uptime as f64) * 60.0
        } else {
            0.0
        };

        MetricsSnapshot {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            request_failures: self.request_failures.load(Ordering::Relaxed),
            orders_sampled: self.orders_sampled.load(Ordering::Relaxed),
            orders_matched,
            orders_rejected_unprofitable: self
                .orders_rejected_unprofitable
                .load(Ordering::Relaxed),
            matched_profit_total: self.matched_profit_total.load(Ordering::Relaxed),
            uptime_seconds: uptime,
            matches_per_minute,
            status: "operational".to_string(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
