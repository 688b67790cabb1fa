use tracing::warn;

use crate::host::{ClaimStore, WorldHost};
use crate::model::{BlockPos, ClaimId, LiveObject, ObjectKind, Occupant, WorldId};

/// Last claim resolved in the current world's object loop, tried first on the
/// next lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaimHint(Option<ClaimId>);

impl ClaimHint {
    pub fn get(&self) -> Option<ClaimId> {
        self.0
    }

    pub fn remember(&mut self, claim: ClaimId) {
        self.0 = Some(claim);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeepReason {
    Actor,
    OccupiedBoat,
    RiddenCart,
    CartOnTrack,
    InsideClaim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalReason {
    UnoccupiedBoat,
    RunawayCart,
    DerailedCart,
    Unclaimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep(KeepReason),
    Remove(RemovalReason),
}

impl Verdict {
    pub fn is_remove(self) -> bool {
        matches!(self, Verdict::Remove(_))
    }
}

/// First matching rule wins. A claim hit replaces `hint`; a miss leaves it.
pub fn evaluate(
    object: &LiveObject,
    world: WorldId,
    worlds: &dyn WorldHost,
    claims: &dyn ClaimStore,
    hint: &mut ClaimHint,
) -> Verdict {
    match object.kind {
        ObjectKind::Actor => Verdict::Keep(KeepReason::Actor),
        ObjectKind::Boat { occupant: None } => Verdict::Remove(RemovalReason::UnoccupiedBoat),
        ObjectKind::Boat { occupant: Some(_) } => Verdict::Keep(KeepReason::OccupiedBoat),
        ObjectKind::TrackVehicle { occupant } if object.is_moving() => match occupant {
            Some(Occupant::Actor) => Verdict::Keep(KeepReason::RiddenCart),
            Some(Occupant::Creature) | None => Verdict::Remove(RemovalReason::RunawayCart),
        },
        ObjectKind::TrackVehicle { .. } => {
            let surface = worlds.block_at(world, BlockPos::containing(object.position));
            if surface.is_track_surface() {
                Verdict::Keep(KeepReason::CartOnTrack)
            } else {
                Verdict::Remove(RemovalReason::DerailedCart)
            }
        }
        ObjectKind::Generic => match claims.claim_at(world, object.position, hint.get()) {
            Ok(Some(claim)) => {
                hint.remember(claim.id);
                Verdict::Keep(KeepReason::InsideClaim)
            }
            Ok(None) => Verdict::Remove(RemovalReason::Unclaimed),
            Err(error) => {
                warn!(
                    world = world.0,
                    object = object.id.0,
                    error = %error,
                    "claim_lookup_failed_treating_as_unclaimed"
                );
                Verdict::Remove(RemovalReason::Unclaimed)
            }
        },
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalTally {
    pub unoccupied_boats: usize,
    pub runaway_carts: usize,
    pub derailed_carts: usize,
    pub unclaimed: usize,
}

impl RemovalTally {
    pub fn record(&mut self, reason: RemovalReason) {
        let slot = match reason {
            RemovalReason::UnoccupiedBoat => &mut self.unoccupied_boats,
            RemovalReason::RunawayCart => &mut self.runaway_carts,
            RemovalReason::DerailedCart => &mut self.derailed_carts,
            RemovalReason::Unclaimed => &mut self.unclaimed,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn merge(&mut self, other: RemovalTally) {
        self.unoccupied_boats = self.unoccupied_boats.saturating_add(other.unoccupied_boats);
        self.runaway_carts = self.runaway_carts.saturating_add(other.runaway_carts);
        self.derailed_carts = self.derailed_carts.saturating_add(other.derailed_carts);
        self.unclaimed = self.unclaimed.saturating_add(other.unclaimed);
    }

    pub fn total(&self) -> usize {
        self.unoccupied_boats
            .saturating_add(self.runaway_carts)
            .saturating_add(self.derailed_carts)
            .saturating_add(self.unclaimed)
    }
}
