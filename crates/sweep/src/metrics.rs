use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::task::SweepReport;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "metrics lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SweepMetricsSnapshot {
    pub passes: u64,
    pub objects_scanned: u64,
    pub objects_removed: u64,
    pub unoccupied_boats: u64,
    pub runaway_carts: u64,
    pub derailed_carts: u64,
    pub unclaimed: u64,
    pub claims_visited: u64,
    pub claims_capped: u64,
    pub objects_evicted: u64,
    pub next_progress: f64,
}

impl SweepMetricsSnapshot {
    fn absorb(&mut self, report: &SweepReport) {
        let removals = &report.removals;
        self.passes = self.passes.saturating_add(1);
        self.objects_scanned = add(self.objects_scanned, report.objects_scanned);
        self.objects_removed = add(self.objects_removed, removals.total());
        self.unoccupied_boats = add(self.unoccupied_boats, removals.unoccupied_boats);
        self.runaway_carts = add(self.runaway_carts, removals.runaway_carts);
        self.derailed_carts = add(self.derailed_carts, removals.derailed_carts);
        self.unclaimed = add(self.unclaimed, removals.unclaimed);
        self.claims_visited = add(self.claims_visited, report.capacity.visited);
        self.claims_capped = add(self.claims_capped, report.capacity.capped);
        self.objects_evicted = add(self.objects_evicted, report.capacity.evicted);
        self.next_progress = report.next_progress.value();
    }
}

fn add(total: u64, delta: usize) -> u64 {
    total.saturating_add(delta as u64)
}

#[derive(Clone, Debug)]
pub struct SweepMetricsHandle {
    snapshot: Arc<RwLock<SweepMetricsSnapshot>>,
}

impl Default for SweepMetricsHandle {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(SweepMetricsSnapshot::default())),
        }
    }
}

impl SweepMetricsHandle {
    pub fn snapshot(&self) -> SweepMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn record_pass(&self, report: &SweepReport) {
        match self.snapshot.write() {
            Ok(mut guard) => guard.absorb(report),
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                guard.absorb(report);
            }
        }
    }
}
