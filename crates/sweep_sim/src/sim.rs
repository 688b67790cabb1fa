use std::env;

use serde::Serialize;
use sweep::{
    BlockKind, BlockPos, ClaimBounds, ClaimDatabase, ClaimDatabaseError, ClaimsMode,
    CleanupTask, ConfigError, ObjectKind, Occupant, ServerWorlds, SweepConfig, SweepContext,
    SweepMetricsHandle, TaskScheduler, TickScheduler, Vec3, WorldId,
};
use thiserror::Error;
use tracing::{info, warn};

pub const TICKS_ENV_VAR: &str = "SWEEP_SIM_TICKS";
pub const TICKS_PER_SECOND: u64 = 20;

const CREATIVE_WORLD: &str = "plots";
const SURVIVAL_WORLD: &str = "world";
const PLOT_SIZE: i32 = 32;
const PLOT_SPACING: i32 = 64;
const PLOT_GRID: i32 = 2;
const PLOT_MAX_ENTITIES: usize = 12;
const RAIL_ROW_Z: i32 = 10;
const GROUND_Y: f64 = 64.0;
const SPAWN_SPREAD: u64 = 160;

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub total_ticks: u64,
    pub spawn_interval_ticks: u64,
    pub summary_interval_ticks: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            total_ticks: TICKS_PER_SECOND * 60 * 60,
            spawn_interval_ticks: TICKS_PER_SECOND / 2,
            summary_interval_ticks: TICKS_PER_SECOND * 60 * 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to lay out claims: {0}")]
    Claims(#[from] ClaimDatabaseError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimSummary {
    pub ticks: u64,
    pub passes: u64,
    pub objects_spawned: u64,
    pub objects_removed: u64,
    pub objects_evicted: u64,
    pub creative_objects_remaining: usize,
    pub survival_objects_remaining: usize,
    pub claims: usize,
    pub tasks_dropped_at_shutdown: usize,
}

pub struct Simulation {
    sweep_config: SweepConfig,
    sim_config: SimConfig,
    worlds: ServerWorlds,
    claims: ClaimDatabase,
    scheduler: TickScheduler,
    metrics: SweepMetricsHandle,
    creative: WorldId,
    survival: WorldId,
    waves: u64,
    spawned: u64,
}

impl Simulation {
    pub fn new(mut sweep_config: SweepConfig, sim_config: SimConfig) -> Result<Self, SimError> {
        sweep_config
            .world_modes
            .entry(CREATIVE_WORLD.to_string())
            .or_insert(ClaimsMode::Creative);
        sweep_config.validate()?;

        let mut worlds = ServerWorlds::default();
        let creative = worlds.add_world(CREATIVE_WORLD);
        let survival = worlds.add_world(SURVIVAL_WORLD);

        let mut claims = ClaimDatabase::new();
        for gx in 0..PLOT_GRID {
            for gz in 0..PLOT_GRID {
                let min = (gx * PLOT_SPACING, gz * PLOT_SPACING);
                let max = (min.0 + PLOT_SIZE - 1, min.1 + PLOT_SIZE - 1);
                claims.add_claim(creative, ClaimBounds::new(min, max), PLOT_MAX_ENTITIES)?;
            }
        }
        claims.add_claim(
            survival,
            ClaimBounds::new((0, 0), (PLOT_SIZE - 1, PLOT_SIZE - 1)),
            PLOT_MAX_ENTITIES,
        )?;

        for x in 0..PLOT_SIZE {
            let kind = if x % 8 == 0 {
                BlockKind::PoweredRail
            } else {
                BlockKind::Rail
            };
            worlds.set_block(creative, BlockPos::new(x, GROUND_Y as i32, RAIL_ROW_Z), kind);
        }

        let mut scheduler = TickScheduler::new();
        scheduler.schedule_after(1, CleanupTask::kickoff());

        info!(
            creative = CREATIVE_WORLD,
            survival = SURVIVAL_WORLD,
            claims = claims.len(),
            delay_ticks = sweep_config.delay_ticks,
            total_ticks = sim_config.total_ticks,
            "simulation_ready"
        );

        Ok(Self {
            sweep_config,
            sim_config: normalize_sim_config(sim_config),
            worlds,
            claims,
            scheduler,
            metrics: SweepMetricsHandle::default(),
            creative,
            survival,
            waves: 0,
            spawned: 0,
        })
    }

    pub fn step(&mut self) {
        let tick = self.scheduler.current_tick().saturating_add(1);
        if tick % self.sim_config.spawn_interval_ticks == 0 {
            self.spawn_wave();
        }

        let due = self.scheduler.advance();
        for task in due {
            let mut ctx = SweepContext {
                worlds: &mut self.worlds,
                claims: &mut self.claims,
                config: &self.sweep_config,
                metrics: Some(&self.metrics),
            };
            task.run(&mut ctx, &mut self.scheduler);
        }

        if tick % self.sim_config.summary_interval_ticks == 0 {
            let snapshot = self.metrics.snapshot();
            info!(
                tick,
                minutes = tick / (TICKS_PER_SECOND * 60),
                objects = self.worlds.object_count(),
                passes = snapshot.passes,
                removed = snapshot.objects_removed,
                evicted = snapshot.objects_evicted,
                progress = snapshot.next_progress,
                "sim_progress"
            );
        }
    }

    pub fn run(mut self) -> SimSummary {
        for _ in 0..self.sim_config.total_ticks {
            self.step();
        }
        self.shutdown()
    }

    pub fn shutdown(mut self) -> SimSummary {
        let dropped = self.scheduler.shutdown();
        let snapshot = self.metrics.snapshot();
        let object_count = |world: WorldId| {
            self.worlds
                .world(world)
                .map(|state| state.object_count())
                .unwrap_or(0)
        };
        let summary = SimSummary {
            ticks: self.scheduler.current_tick(),
            passes: snapshot.passes,
            objects_spawned: self.spawned,
            objects_removed: snapshot.objects_removed,
            objects_evicted: snapshot.objects_evicted,
            creative_objects_remaining: object_count(self.creative),
            survival_objects_remaining: object_count(self.survival),
            claims: self.claims.len(),
            tasks_dropped_at_shutdown: dropped,
        };
        info!(dropped, "scheduler_shutdown");
        summary
    }

    fn spawn_wave(&mut self) {
        let n = self.waves;
        self.waves = self.waves.saturating_add(1);
        let position = Vec3::new(
            ((n * 37) % SPAWN_SPREAD) as f64 - 16.0 + 0.5,
            GROUND_Y,
            ((n * 53) % SPAWN_SPREAD) as f64 - 16.0 + 0.5,
        );
        let on_rail = Vec3::new(
            ((n * 7) % PLOT_SIZE as u64) as f64 + 0.5,
            GROUND_Y,
            f64::from(RAIL_ROW_Z) + 0.5,
        );
        let (kind, position, velocity) = match n % 8 {
            0 | 1 => (ObjectKind::Generic, position, Vec3::ZERO),
            2 => (ObjectKind::Boat { occupant: None }, position, Vec3::ZERO),
            3 => (
                ObjectKind::Boat {
                    occupant: Some(Occupant::Actor),
                },
                position,
                Vec3::new(0.1, 0.0, 0.0),
            ),
            4 => (ObjectKind::TrackVehicle { occupant: None }, on_rail, Vec3::ZERO),
            5 => (ObjectKind::TrackVehicle { occupant: None }, position, Vec3::ZERO),
            6 => (
                ObjectKind::TrackVehicle {
                    occupant: Some(Occupant::Actor),
                },
                on_rail,
                Vec3::new(0.4, 0.0, 0.0),
            ),
            _ => (ObjectKind::Actor, position, Vec3::ZERO),
        };

        let spawned_creative = self
            .worlds
            .spawn_moving(self.creative, kind, position, velocity)
            .is_some();
        let spawned_survival = self
            .worlds
            .spawn(self.survival, ObjectKind::Generic, position)
            .is_some();
        self.spawned = self
            .spawned
            .saturating_add(u64::from(spawned_creative) + u64::from(spawned_survival));
    }
}

fn normalize_sim_config(config: SimConfig) -> SimConfig {
    SimConfig {
        total_ticks: config.total_ticks,
        spawn_interval_ticks: config.spawn_interval_ticks.max(1),
        summary_interval_ticks: config.summary_interval_ticks.max(1),
    }
}

pub fn parse_tick_count(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|ticks| *ticks > 0)
}

pub fn resolve_total_ticks(default_ticks: u64) -> u64 {
    match env::var(TICKS_ENV_VAR) {
        Ok(value) => match parse_tick_count(&value) {
            Some(ticks) => ticks,
            None => {
                warn!(
                    env_var = TICKS_ENV_VAR,
                    value = value.as_str(),
                    "invalid tick count env var value; falling back to default"
                );
                default_ticks
            }
        },
        Err(env::VarError::NotPresent) => default_ticks,
        Err(err) => {
            warn!(
                env_var = TICKS_ENV_VAR,
                error = %err,
                "unable to read tick count env var; falling back to default"
            );
            default_ticks
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_run(total_ticks: u64) -> SimConfig {
        SimConfig {
            total_ticks,
            spawn_interval_ticks: 2,
            summary_interval_ticks: 1000,
        }
    }

    fn fast_sweep() -> SweepConfig {
        SweepConfig {
            delay_ticks: 10,
            ..SweepConfig::default()
        }
    }

    #[test]
    fn parse_tick_count_rejects_zero_and_garbage() {
        assert_eq!(parse_tick_count(" 1200 "), Some(1200));
        assert_eq!(parse_tick_count("0"), None);
        assert_eq!(parse_tick_count("-5"), None);
        assert_eq!(parse_tick_count("soon"), None);
    }

    #[test]
    fn creative_world_is_restrictive_even_without_config_entry() {
        let sim = Simulation::new(SweepConfig::default(), short_run(0)).expect("sim");
        assert_eq!(
            sim.sweep_config.mode_for(CREATIVE_WORLD),
            ClaimsMode::Creative
        );
        assert_eq!(sim.sweep_config.mode_for(SURVIVAL_WORLD), ClaimsMode::Survival);
    }

    #[test]
    fn explicit_config_entry_is_respected() {
        let mut config = SweepConfig::default();
        config
            .world_modes
            .insert(CREATIVE_WORLD.to_string(), ClaimsMode::Survival);
        let summary = Simulation::new(config, short_run(400))
            .expect("sim")
            .run();
        assert_eq!(summary.objects_removed, 0);
        assert!(summary.passes > 0);
    }

    #[test]
    fn invalid_sweep_config_is_rejected() {
        let config = SweepConfig {
            delay_ticks: 0,
            ..SweepConfig::default()
        };
        assert!(matches!(
            Simulation::new(config, short_run(10)),
            Err(SimError::Config(ConfigError::ZeroDelay))
        ));
    }

    #[test]
    fn sweeping_keeps_creative_world_in_check() {
        let summary = Simulation::new(fast_sweep(), short_run(4000))
            .expect("sim")
            .run();

        assert_eq!(summary.ticks, 4000);
        assert_eq!(summary.passes, 400);
        assert_eq!(summary.survival_objects_remaining, 2000);
        assert!(summary.objects_removed > 0);
        assert!(summary.creative_objects_remaining < summary.survival_objects_remaining);
        assert_eq!(
            summary.objects_spawned,
            4000 / 2 * 2,
            "every wave spawns in both worlds"
        );
        assert_eq!(summary.tasks_dropped_at_shutdown, 1);
    }

    #[test]
    fn every_removal_category_shows_up_except_ridden_carts() {
        let sim = Simulation::new(fast_sweep(), short_run(4000)).expect("sim");
        let metrics = sim.metrics.clone();
        let summary = sim.run();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.passes, summary.passes);
        assert!(snapshot.unoccupied_boats > 0);
        assert!(snapshot.derailed_carts > 0);
        assert!(snapshot.unclaimed > 0);
        assert_eq!(snapshot.runaway_carts, 0, "moving carts always carry an actor");
    }

    #[test]
    fn shutdown_leaves_nothing_armed() {
        let mut sim = Simulation::new(fast_sweep(), short_run(0)).expect("sim");
        for _ in 0..25 {
            sim.step();
        }
        assert_eq!(sim.scheduler.pending_count(), 1);
        let summary = sim.shutdown();
        assert_eq!(summary.tasks_dropped_at_shutdown, 1);
        assert_eq!(summary.passes, 3);
        assert!(summary.objects_spawned > 0);
    }
}
