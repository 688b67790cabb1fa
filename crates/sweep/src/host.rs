use thiserror::Error;

use crate::model::{
    BlockKind, BlockPos, ClaimId, ClaimRef, LiveObject, ObjectId, Vec3, WorldId, WorldInfo,
};

pub trait WorldHost {
    fn worlds(&self) -> Vec<WorldInfo>;

    /// Stable order for the duration of one pass; unknown worlds yield nothing.
    fn live_objects(&self, world: WorldId) -> Vec<LiveObject>;

    fn block_at(&self, world: WorldId, position: BlockPos) -> BlockKind;

    fn remove_object(&mut self, world: WorldId, object: ObjectId) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimLookupError {
    #[error("world {world:?} is not indexed by the claim store")]
    UnknownWorld { world: WorldId },
    #[error("claim store unavailable: {reason}")]
    Unavailable { reason: String },
}

pub trait ClaimStore {
    /// Resolves the claim containing `position`. `hint` is the previously
    /// resolved claim; stores should check it before a full lookup.
    fn claim_at(
        &self,
        world: WorldId,
        position: Vec3,
        hint: Option<ClaimId>,
    ) -> Result<Option<ClaimRef>, ClaimLookupError>;

    fn claims(&self) -> Vec<ClaimRef>;

    /// The store picks which objects go. Returns how many were evicted.
    fn enforce_capacity(&mut self, claim: ClaimId, worlds: &mut dyn WorldHost) -> usize;
}
