use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, info};

use crate::host::{ClaimLookupError, ClaimStore, WorldHost};
use crate::model::{ClaimId, ClaimRef, LiveObject, ObjectId, Vec3, WorldId};

pub const CHUNK_SIZE: i32 = 16;

/// Claims covering more chunks than this stay out of the chunk index and are
/// matched by a linear scan instead.
pub const MAX_INDEXED_CHUNKS: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimBounds {
    min_x: i32,
    min_z: i32,
    max_x: i32,
    max_z: i32,
}

impl ClaimBounds {
    pub fn new(corner_a: (i32, i32), corner_b: (i32, i32)) -> Self {
        Self {
            min_x: corner_a.0.min(corner_b.0),
            min_z: corner_a.1.min(corner_b.1),
            max_x: corner_a.0.max(corner_b.0),
            max_z: corner_a.1.max(corner_b.1),
        }
    }

    pub fn contains(&self, position: Vec3) -> bool {
        let x = position.x.floor();
        let z = position.z.floor();
        x >= f64::from(self.min_x)
            && x <= f64::from(self.max_x)
            && z >= f64::from(self.min_z)
            && z <= f64::from(self.max_z)
    }

    pub fn overlaps(&self, other: &ClaimBounds) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_z <= other.max_z
            && other.min_z <= self.max_z
    }

    pub fn area(&self) -> u64 {
        let width = (i64::from(self.max_x) - i64::from(self.min_x) + 1) as u64;
        let depth = (i64::from(self.max_z) - i64::from(self.min_z) + 1) as u64;
        width.saturating_mul(depth)
    }

    fn chunk_count(&self) -> u64 {
        let span = |min: i32, max: i32| {
            (i64::from(chunk_coord(max)) - i64::from(chunk_coord(min)) + 1) as u64
        };
        span(self.min_x, self.max_x).saturating_mul(span(self.min_z, self.max_z))
    }

    fn is_indexed(&self) -> bool {
        self.chunk_count() <= MAX_INDEXED_CHUNKS
    }

    fn chunks(&self) -> impl Iterator<Item = (i32, i32)> {
        let (min_cx, max_cx) = (chunk_coord(self.min_x), chunk_coord(self.max_x));
        let (min_cz, max_cz) = (chunk_coord(self.min_z), chunk_coord(self.max_z));
        (min_cx..=max_cx).flat_map(move |cx| (min_cz..=max_cz).map(move |cz| (cx, cz)))
    }
}

fn chunk_coord(block: i32) -> i32 {
    block.div_euclid(CHUNK_SIZE)
}

fn chunk_of(position: Vec3) -> (i32, i32) {
    (
        chunk_coord(position.x.floor() as i32),
        chunk_coord(position.z.floor() as i32),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub id: ClaimId,
    pub world: WorldId,
    pub bounds: ClaimBounds,
    pub max_entities: usize,
}

impl Claim {
    pub fn claim_ref(&self) -> ClaimRef {
        ClaimRef {
            id: self.id,
            world: self.world,
        }
    }

    pub fn tracked_objects(&self, worlds: &dyn WorldHost) -> Vec<LiveObject> {
        worlds
            .live_objects(self.world)
            .into_iter()
            .filter(|object| !object.kind.is_actor() && self.bounds.contains(object.position))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimDatabaseError {
    #[error("claim would overlap existing claim {existing:?} in world {world:?}")]
    Overlap { existing: ClaimId, world: WorldId },
    #[error("claim {0:?} does not exist")]
    UnknownClaim(ClaimId),
}

/// Capacity policy: a claim over its `max_entities` loses its newest objects
/// (highest ids) until it is back at the limit.
#[derive(Debug, Default)]
pub struct ClaimDatabase {
    next_id: u64,
    claims: BTreeMap<ClaimId, Claim>,
    chunk_index: HashMap<(WorldId, i32, i32), Vec<ClaimId>>,
    wide_claims: Vec<ClaimId>,
}

impl ClaimDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_claim(
        &mut self,
        world: WorldId,
        bounds: ClaimBounds,
        max_entities: usize,
    ) -> Result<ClaimId, ClaimDatabaseError> {
        if let Some(existing) = self
            .claims
            .values()
            .find(|claim| claim.world == world && claim.bounds.overlaps(&bounds))
        {
            return Err(ClaimDatabaseError::Overlap {
                existing: existing.id,
                world,
            });
        }

        let id = ClaimId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        if bounds.is_indexed() {
            for (cx, cz) in bounds.chunks() {
                self.chunk_index.entry((world, cx, cz)).or_default().push(id);
            }
        } else {
            self.wide_claims.push(id);
        }
        self.claims.insert(
            id,
            Claim {
                id,
                world,
                bounds,
                max_entities,
            },
        );
        debug!(claim = id.0, world = world.0, area = bounds.area(), "claim_added");
        Ok(id)
    }

    pub fn remove_claim(&mut self, id: ClaimId) -> Result<Claim, ClaimDatabaseError> {
        let claim = self
            .claims
            .remove(&id)
            .ok_or(ClaimDatabaseError::UnknownClaim(id))?;
        if !claim.bounds.is_indexed() {
            self.wide_claims.retain(|candidate| *candidate != id);
            return Ok(claim);
        }
        for (cx, cz) in claim.bounds.chunks() {
            let key = (claim.world, cx, cz);
            if let Some(bucket) = self.chunk_index.get_mut(&key) {
                bucket.retain(|candidate| *candidate != id);
                if bucket.is_empty() {
                    self.chunk_index.remove(&key);
                }
            }
        }
        Ok(claim)
    }

    pub fn claim(&self, id: ClaimId) -> Option<&Claim> {
        self.claims.get(&id)
    }

    pub fn set_max_entities(
        &mut self,
        id: ClaimId,
        max_entities: usize,
    ) -> Result<(), ClaimDatabaseError> {
        let claim = self
            .claims
            .get_mut(&id)
            .ok_or(ClaimDatabaseError::UnknownClaim(id))?;
        claim.max_entities = max_entities;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    fn hinted(&self, world: WorldId, position: Vec3, hint: Option<ClaimId>) -> Option<&Claim> {
        let claim = self.claims.get(&hint?)?;
        (claim.world == world && claim.bounds.contains(position)).then_some(claim)
    }
}

impl ClaimStore for ClaimDatabase {
    fn claim_at(
        &self,
        world: WorldId,
        position: Vec3,
        hint: Option<ClaimId>,
    ) -> Result<Option<ClaimRef>, ClaimLookupError> {
        if let Some(claim) = self.hinted(world, position, hint) {
            return Ok(Some(claim.claim_ref()));
        }

        let (cx, cz) = chunk_of(position);
        let found = self
            .chunk_index
            .get(&(world, cx, cz))
            .into_iter()
            .flatten()
            .chain(&self.wide_claims)
            .filter_map(|id| self.claims.get(id))
            .find(|claim| claim.world == world && claim.bounds.contains(position))
            .map(Claim::claim_ref);
        Ok(found)
    }

    fn claims(&self) -> Vec<ClaimRef> {
        self.claims.values().map(Claim::claim_ref).collect()
    }

    fn enforce_capacity(&mut self, claim: ClaimId, worlds: &mut dyn WorldHost) -> usize {
        let Some(claim) = self.claims.get(&claim) else {
            return 0;
        };

        let mut tracked: Vec<ObjectId> = claim
            .tracked_objects(&*worlds)
            .into_iter()
            .map(|object| object.id)
            .collect();
        if tracked.len() <= claim.max_entities {
            return 0;
        }

        let excess = tracked.len() - claim.max_entities;
        tracked.sort_unstable_by(|a, b| b.cmp(a));
        let evicted = tracked
            .into_iter()
            .take(excess)
            .filter(|object| worlds.remove_object(claim.world, *object))
            .count();
        info!(
            claim = claim.id.0,
            world = claim.world.0,
            max_entities = claim.max_entities,
            evicted,
            "claim_capacity_enforced"
        );
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectKind;
    use crate::world::ServerWorlds;

    fn at(x: f64, z: f64) -> Vec3 {
        Vec3::new(x, 64.0, z)
    }

    #[test]
    fn bounds_contain_inclusive_edges() {
        let bounds = ClaimBounds::new((10, 10), (-5, 0));
        assert!(bounds.contains(at(-5.0, 0.0)));
        assert!(bounds.contains(at(10.9, 10.9)));
        assert!(!bounds.contains(at(11.0, 5.0)));
        assert!(!bounds.contains(at(-5.1, 5.0)));
        assert_eq!(bounds.area(), 16 * 11);
    }

    #[test]
    fn overlapping_claims_are_rejected_per_world() {
        let mut db = ClaimDatabase::new();
        let first = db
            .add_claim(WorldId(0), ClaimBounds::new((0, 0), (20, 20)), 10)
            .expect("first claim");

        let error = db
            .add_claim(WorldId(0), ClaimBounds::new((20, 20), (30, 30)), 10)
            .expect_err("overlap");
        assert_eq!(
            error,
            ClaimDatabaseError::Overlap {
                existing: first,
                world: WorldId(0)
            }
        );

        db.add_claim(WorldId(1), ClaimBounds::new((0, 0), (20, 20)), 10)
            .expect("same area in another world");
        assert_eq!(db.len(), 2);
    }

    #[test]
    fn lookup_spans_chunk_boundaries_and_negative_coordinates() {
        let mut db = ClaimDatabase::new();
        let id = db
            .add_claim(WorldId(0), ClaimBounds::new((-40, -40), (40, 40)), 10)
            .expect("claim");

        for position in [at(-40.0, -40.0), at(0.0, 0.0), at(39.5, -17.2), at(-16.0, 16.0)] {
            let found = db.claim_at(WorldId(0), position, None).expect("lookup");
            assert_eq!(found.map(|claim| claim.id), Some(id), "{position:?}");
        }
        assert_eq!(db.claim_at(WorldId(0), at(41.0, 0.0), None), Ok(None));
        assert_eq!(db.claim_at(WorldId(1), at(0.0, 0.0), None), Ok(None));
    }

    #[test]
    fn stale_or_foreign_hint_falls_back_to_index() {
        let mut db = ClaimDatabase::new();
        let west = db
            .add_claim(WorldId(0), ClaimBounds::new((-20, 0), (-1, 20)), 10)
            .expect("west");
        let east = db
            .add_claim(WorldId(0), ClaimBounds::new((0, 0), (20, 20)), 10)
            .expect("east");

        let found = db
            .claim_at(WorldId(0), at(5.0, 5.0), Some(west))
            .expect("lookup");
        assert_eq!(found.map(|claim| claim.id), Some(east));

        db.remove_claim(east).expect("remove");
        assert_eq!(
            db.claim_at(WorldId(0), at(5.0, 5.0), Some(east)),
            Ok(None)
        );
        assert_eq!(
            db.remove_claim(east),
            Err(ClaimDatabaseError::UnknownClaim(east))
        );
    }

    #[test]
    fn claims_snapshot_is_ordered_by_id() {
        let mut db = ClaimDatabase::new();
        let ids: Vec<ClaimId> = (0..5)
            .map(|i| {
                db.add_claim(
                    WorldId(0),
                    ClaimBounds::new((i * 100, 0), (i * 100 + 10, 10)),
                    1,
                )
                .expect("claim")
            })
            .collect();
        let listed: Vec<ClaimId> = db.claims().into_iter().map(|claim| claim.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn capacity_evicts_newest_non_actor_objects() {
        let mut worlds = ServerWorlds::default();
        let world = worlds.add_world("plots");
        let mut db = ClaimDatabase::new();
        let claim = db
            .add_claim(world, ClaimBounds::new((0, 0), (15, 15)), 2)
            .expect("claim");

        let oldest = worlds
            .spawn(world, ObjectKind::Generic, at(1.0, 1.0))
            .expect("spawn");
        let player = worlds
            .spawn(world, ObjectKind::Actor, at(2.0, 2.0))
            .expect("spawn");
        let middle = worlds
            .spawn(world, ObjectKind::Boat { occupant: None }, at(3.0, 3.0))
            .expect("spawn");
        let outside = worlds
            .spawn(world, ObjectKind::Generic, at(50.0, 50.0))
            .expect("spawn");
        let newer = worlds
            .spawn(world, ObjectKind::Generic, at(4.0, 4.0))
            .expect("spawn");
        let newest = worlds
            .spawn(world, ObjectKind::Generic, at(5.0, 5.0))
            .expect("spawn");

        assert_eq!(db.enforce_capacity(claim, &mut worlds), 2);

        let remaining: Vec<ObjectId> = worlds
            .live_objects(world)
            .iter()
            .map(|object| object.id)
            .collect();
        assert_eq!(remaining, vec![oldest, player, middle, outside]);
        assert!(!remaining.contains(&newer));
        assert!(!remaining.contains(&newest));

        assert_eq!(db.enforce_capacity(claim, &mut worlds), 0);
    }

    #[test]
    fn world_sized_claim_is_matched_without_indexing_its_chunks() {
        let mut db = ClaimDatabase::new();
        let admin = db
            .add_claim(
                WorldId(0),
                ClaimBounds::new((-30_000_000, -30_000_000), (30_000_000, 30_000_000)),
                10,
            )
            .expect("admin claim");
        assert!(db.chunk_index.is_empty());
        assert_eq!(db.wide_claims, vec![admin]);

        let found = db
            .claim_at(WorldId(0), at(-29_999_999.5, 12_345.0), None)
            .expect("lookup");
        assert_eq!(found.map(|claim| claim.id), Some(admin));
        assert_eq!(db.claim_at(WorldId(1), at(0.0, 0.0), None), Ok(None));

        let plot = db
            .add_claim(WorldId(1), ClaimBounds::new((0, 0), (31, 31)), 10)
            .expect("plot in another world");
        assert_eq!(
            db.claim_at(WorldId(1), at(5.0, 5.0), None)
                .expect("lookup")
                .map(|claim| claim.id),
            Some(plot)
        );

        db.remove_claim(admin).expect("remove");
        assert!(db.wide_claims.is_empty());
        assert_eq!(db.claim_at(WorldId(0), at(0.0, 0.0), None), Ok(None));
    }

    #[test]
    fn capacity_on_unknown_claim_is_noop() {
        let mut worlds = ServerWorlds::default();
        let mut db = ClaimDatabase::new();
        assert_eq!(db.enforce_capacity(ClaimId(3), &mut worlds), 0);
    }

    #[test]
    fn raised_limit_stops_eviction() {
        let mut worlds = ServerWorlds::default();
        let world = worlds.add_world("plots");
        let mut db = ClaimDatabase::new();
        let claim = db
            .add_claim(world, ClaimBounds::new((0, 0), (15, 15)), 0)
            .expect("claim");
        worlds
            .spawn(world, ObjectKind::Generic, at(1.0, 1.0))
            .expect("spawn");

        db.set_max_entities(claim, 5).expect("set limit");
        assert_eq!(db.enforce_capacity(claim, &mut worlds), 0);
        assert_eq!(worlds.object_count(), 1);
    }
}
