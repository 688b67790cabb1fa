use tracing::{debug, info};

use crate::config::{restrictive_worlds, SweepConfig, WorldModes};
use crate::host::{ClaimStore, WorldHost};
use crate::metrics::SweepMetricsHandle;
use crate::model::WorldInfo;
use crate::retention::{evaluate, ClaimHint, RemovalTally, Verdict};
use crate::scheduler::TaskScheduler;
use crate::window::{ScanProgress, ScanWindow};

pub struct SweepContext<'a> {
    pub worlds: &'a mut dyn WorldHost,
    pub claims: &'a mut dyn ClaimStore,
    pub config: &'a SweepConfig,
    pub metrics: Option<&'a SweepMetricsHandle>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapacityPass {
    pub window: ScanWindow,
    pub visited: usize,
    pub capped: usize,
    pub evicted: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub progress: ScanProgress,
    pub next_progress: ScanProgress,
    pub worlds_swept: usize,
    pub objects_scanned: usize,
    pub removals: RemovalTally,
    pub capacity: CapacityPass,
    pub rearmed: bool,
}

/// Carries the scan progress; running it schedules the next task rather than
/// mutating this one.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CleanupTask {
    progress: ScanProgress,
}

impl CleanupTask {
    pub fn kickoff() -> Self {
        Self {
            progress: ScanProgress::START,
        }
    }

    pub fn resume(progress: f64) -> Self {
        Self {
            progress: ScanProgress::new(progress),
        }
    }

    pub fn progress(&self) -> ScanProgress {
        self.progress
    }

    pub fn run(
        self,
        ctx: &mut SweepContext<'_>,
        scheduler: &mut dyn TaskScheduler,
    ) -> SweepReport {
        let mut report = self.sweep(ctx);

        if scheduler.is_shutting_down() {
            info!(
                next_progress = report.next_progress.value(),
                "cleanup_not_rearmed_host_shutting_down"
            );
        } else {
            let next = CleanupTask {
                progress: report.next_progress,
            };
            scheduler.schedule_after(ctx.config.delay_ticks, next);
            report.rearmed = true;
        }

        if let Some(metrics) = ctx.metrics {
            metrics.record_pass(&report);
        }
        report
    }

    pub fn sweep(&self, ctx: &mut SweepContext<'_>) -> SweepReport {
        let config = ctx.config;
        let all_worlds = ctx.worlds.worlds();
        let modes = WorldModes::resolve(&all_worlds, config);

        let mut report = SweepReport {
            progress: self.progress,
            ..SweepReport::default()
        };

        for world in restrictive_worlds(&all_worlds, &modes) {
            let (scanned, removals) = self.sweep_world(ctx, &world);
            report.worlds_swept += 1;
            report.objects_scanned += scanned;
            report.removals.merge(removals);
        }

        report.capacity = self.enforce_claim_window(ctx, &modes);
        report.next_progress = self
            .progress
            .advance(config.claim_step, config.wrap_threshold);

        info!(
            progress = report.progress.value(),
            next_progress = report.next_progress.value(),
            worlds = report.worlds_swept,
            scanned = report.objects_scanned,
            removed = report.removals.total(),
            claims_visited = report.capacity.visited,
            claims_capped = report.capacity.capped,
            evicted = report.capacity.evicted,
            "cleanup_pass"
        );
        report
    }

    fn sweep_world(
        &self,
        ctx: &mut SweepContext<'_>,
        world: &WorldInfo,
    ) -> (usize, RemovalTally) {
        let objects = ctx.worlds.live_objects(world.id);
        let window = self.progress.window(
            objects.len(),
            ctx.config.object_step,
            ctx.config.wrap_threshold,
        );

        let mut hint = ClaimHint::default();
        let mut removals = RemovalTally::default();
        for object in &objects[window.range()] {
            let verdict = evaluate(object, world.id, &*ctx.worlds, &*ctx.claims, &mut hint);
            if let Verdict::Remove(reason) = verdict {
                ctx.worlds.remove_object(world.id, object.id);
                removals.record(reason);
                debug!(
                    world = world.id.0,
                    object = object.id.0,
                    reason = ?reason,
                    "object_removed"
                );
            }
        }

        debug!(
            world = %world.name,
            objects = objects.len(),
            window_start = window.start,
            window_end = window.end,
            removed = removals.total(),
            "object_window_swept"
        );
        (window.len(), removals)
    }

    fn enforce_claim_window(
        &self,
        ctx: &mut SweepContext<'_>,
        modes: &WorldModes,
    ) -> CapacityPass {
        let claims = ctx.claims.claims();
        let window = self.progress.window(
            claims.len(),
            ctx.config.claim_step,
            ctx.config.wrap_threshold,
        );

        let mut pass = CapacityPass {
            window,
            ..CapacityPass::default()
        };
        for claim in &claims[window.range()] {
            pass.visited += 1;
            if !modes.is_restrictive(claim.world) {
                continue;
            }
            pass.capped += 1;
            pass.evicted += ctx.claims.enforce_capacity(claim.id, &mut *ctx.worlds);
        }
        pass
    }
}
