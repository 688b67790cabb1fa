pub mod claims;
pub mod config;
pub mod host;
pub mod metrics;
pub mod model;
pub mod retention;
pub mod scheduler;
pub mod task;
pub mod window;
pub mod world;

pub use claims::{
    Claim, ClaimBounds, ClaimDatabase, ClaimDatabaseError, CHUNK_SIZE, MAX_INDEXED_CHUNKS,
};
pub use config::{
    restrictive_worlds, ClaimsMode, ConfigError, SweepConfig, WorldModes, CONFIG_ENV_VAR,
    DEFAULT_DELAY_TICKS,
};
pub use host::{ClaimLookupError, ClaimStore, WorldHost};
pub use metrics::{SweepMetricsHandle, SweepMetricsSnapshot};
pub use model::{
    BlockKind, BlockPos, ClaimId, ClaimRef, LiveObject, ObjectId, ObjectKind, Occupant, Vec3,
    WorldId, WorldInfo,
};
pub use retention::{evaluate, ClaimHint, KeepReason, RemovalReason, RemovalTally, Verdict};
pub use scheduler::{TaskScheduler, TickScheduler};
pub use task::{CapacityPass, CleanupTask, SweepContext, SweepReport};
pub use window::{ScanProgress, ScanWindow, CLAIM_STEP, OBJECT_STEP, WRAP_THRESHOLD};
pub use world::{ObjectIdAllocator, ServerWorlds, WorldState};
