use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{WorldId, WorldInfo};
use crate::window::{CLAIM_STEP, OBJECT_STEP, WRAP_THRESHOLD};

pub const CONFIG_ENV_VAR: &str = "SWEEP_CONFIG";

pub const DEFAULT_DELAY_TICKS: u64 = 20 * 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimsMode {
    #[default]
    Survival,
    Creative,
    SurvivalRequiringClaims,
    Disabled,
}

impl ClaimsMode {
    pub fn is_restrictive(self) -> bool {
        matches!(self, ClaimsMode::Creative)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub object_step: f64,
    pub claim_step: f64,
    pub wrap_threshold: f64,
    pub delay_ticks: u64,
    pub default_mode: ClaimsMode,
    pub world_modes: BTreeMap<String, ClaimsMode>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            object_step: OBJECT_STEP,
            claim_step: CLAIM_STEP,
            wrap_threshold: WRAP_THRESHOLD,
            delay_ticks: DEFAULT_DELAY_TICKS,
            default_mode: ClaimsMode::Survival,
            world_modes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {location}: {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{field} must be in (0, 1], got {value}")]
    InvalidStep { field: &'static str, value: f64 },
    #[error("wrap_threshold must be in (0, 1), got {value}")]
    InvalidWrapThreshold { value: f64 },
    #[error("wrap_threshold must be at least 1 - claim_step ({minimum}), got {value}")]
    WrapThresholdBelowLap { value: f64, minimum: f64 },
    #[error("delay_ticks must be greater than zero")]
    ZeroDelay,
}

impl SweepConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config: SweepConfig = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|error| {
                let path = error.path().to_string();
                let location = if path.is_empty() || path == "." {
                    "<root>".to_string()
                } else {
                    path
                };
                ConfigError::Parse {
                    location,
                    source: error.into_inner(),
                }
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn load_from_env() -> Result<Self, ConfigError> {
        match env::var(CONFIG_ENV_VAR) {
            Ok(value) => Self::load(Path::new(value.trim())),
            Err(env::VarError::NotPresent) => Ok(Self::default()),
            Err(source) => Err(ConfigError::EnvVar {
                var: CONFIG_ENV_VAR,
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_step("object_step", self.object_step)?;
        validate_step("claim_step", self.claim_step)?;
        if !(self.wrap_threshold > 0.0 && self.wrap_threshold < 1.0) {
            return Err(ConfigError::InvalidWrapThreshold {
                value: self.wrap_threshold,
            });
        }
        let minimum = 1.0 - self.claim_step;
        if self.wrap_threshold < minimum {
            return Err(ConfigError::WrapThresholdBelowLap {
                value: self.wrap_threshold,
                minimum,
            });
        }
        if self.delay_ticks == 0 {
            return Err(ConfigError::ZeroDelay);
        }
        Ok(())
    }

    pub fn mode_for(&self, world_name: &str) -> ClaimsMode {
        self.world_modes
            .get(world_name)
            .copied()
            .unwrap_or(self.default_mode)
    }
}

fn validate_step(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidStep { field, value })
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorldModes {
    modes: HashMap<WorldId, ClaimsMode>,
}

impl WorldModes {
    pub fn resolve(worlds: &[WorldInfo], config: &SweepConfig) -> Self {
        let modes = worlds
            .iter()
            .map(|world| (world.id, config.mode_for(&world.name)))
            .collect();
        Self { modes }
    }

    pub fn mode(&self, world: WorldId) -> Option<ClaimsMode> {
        self.modes.get(&world).copied()
    }

    pub fn is_restrictive(&self, world: WorldId) -> bool {
        self.mode(world).is_some_and(ClaimsMode::is_restrictive)
    }
}

pub fn restrictive_worlds(worlds: &[WorldInfo], modes: &WorldModes) -> Vec<WorldInfo> {
    worlds
        .iter()
        .filter(|world| modes.is_restrictive(world.id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn world(id: u32, name: &str) -> WorldInfo {
        WorldInfo {
            id: WorldId(id),
            name: name.to_string(),
        }
    }

    #[test]
    fn defaults_match_reference_schedule() {
        let config = SweepConfig::default();
        assert_eq!(config.object_step, 0.10);
        assert_eq!(config.claim_step, 0.05);
        assert_eq!(config.wrap_threshold, 0.99);
        assert_eq!(config.delay_ticks, 1200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config = SweepConfig::from_json_str(
            r#"{ "world_modes": { "build": "creative", "wild": "survival" } }"#,
        )
        .expect("config");
        assert_eq!(config.mode_for("build"), ClaimsMode::Creative);
        assert_eq!(config.mode_for("wild"), ClaimsMode::Survival);
        assert_eq!(config.mode_for("unlisted"), ClaimsMode::Survival);
        assert_eq!(config.delay_ticks, DEFAULT_DELAY_TICKS);
    }

    #[test]
    fn parse_error_reports_json_path() {
        let error = SweepConfig::from_json_str(r#"{ "world_modes": { "build": "peaceful" } }"#)
            .expect_err("unknown mode should fail");
        match error {
            ConfigError::Parse { location, .. } => assert_eq!(location, "world_modes.build"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validation_rejects_degenerate_values() {
        assert!(matches!(
            SweepConfig::from_json_str(r#"{ "claim_step": 0.0 }"#),
            Err(ConfigError::InvalidStep {
                field: "claim_step",
                ..
            })
        ));
        assert!(matches!(
            SweepConfig::from_json_str(r#"{ "wrap_threshold": 1.5 }"#),
            Err(ConfigError::InvalidWrapThreshold { .. })
        ));
        assert!(matches!(
            SweepConfig::from_json_str(r#"{ "delay_ticks": 0 }"#),
            Err(ConfigError::ZeroDelay)
        ));
    }

    #[test]
    fn wrap_threshold_must_leave_room_for_final_window() {
        match SweepConfig::from_json_str(r#"{ "wrap_threshold": 0.1 }"#) {
            Err(ConfigError::WrapThresholdBelowLap { value, minimum }) => {
                assert_eq!(value, 0.1);
                assert!((minimum - 0.95).abs() < 1e-12);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let edge = SweepConfig::from_json_str(r#"{ "wrap_threshold": 0.95 }"#).expect("edge");
        assert_eq!(edge.wrap_threshold, 0.95);
        let wide = SweepConfig::from_json_str(r#"{ "claim_step": 0.5, "wrap_threshold": 0.6 }"#)
            .expect("wide step");
        assert_eq!(wide.claim_step, 0.5);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "delay_ticks": 600, "default_mode": "creative" }}"#).expect("write");

        let config = SweepConfig::load(file.path()).expect("load");
        assert_eq!(config.delay_ticks, 600);
        assert_eq!(config.mode_for("anything"), ClaimsMode::Creative);
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = SweepConfig::load(&dir.path().join("missing.json")).expect_err("missing");
        assert!(matches!(error, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn restrictive_filter_returns_only_creative_worlds() {
        let config = SweepConfig::from_json_str(
            r#"{ "world_modes": { "plots": "creative", "nether": "disabled", "arena": "creative" } }"#,
        )
        .expect("config");
        let worlds = vec![
            world(1, "overworld"),
            world(2, "plots"),
            world(3, "nether"),
            world(4, "arena"),
        ];
        let modes = WorldModes::resolve(&worlds, &config);

        let restrictive = restrictive_worlds(&worlds, &modes);
        let ids: Vec<u32> = restrictive.iter().map(|world| world.id.0).collect();
        assert_eq!(ids, vec![2, 4]);
        assert!(!modes.is_restrictive(WorldId(99)));
        assert_eq!(modes.mode(WorldId(3)), Some(ClaimsMode::Disabled));
    }
}
