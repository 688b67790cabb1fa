#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClaimId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn containing(position: Vec3) -> Self {
        Self {
            x: position.x.floor() as i32,
            y: position.y.floor() as i32,
            z: position.z.floor() as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlockKind {
    #[default]
    Air,
    Solid,
    Water,
    Rail,
    PoweredRail,
    DetectorRail,
    ActivatorRail,
}

impl BlockKind {
    pub fn is_track_surface(self) -> bool {
        matches!(
            self,
            BlockKind::Rail | BlockKind::PoweredRail | BlockKind::DetectorRail
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occupant {
    Actor,
    Creature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Actor,
    Boat { occupant: Option<Occupant> },
    TrackVehicle { occupant: Option<Occupant> },
    Generic,
}

impl ObjectKind {
    pub fn occupant(self) -> Option<Occupant> {
        match self {
            ObjectKind::Boat { occupant } | ObjectKind::TrackVehicle { occupant } => occupant,
            ObjectKind::Actor | ObjectKind::Generic => None,
        }
    }

    pub fn is_actor(self) -> bool {
        matches!(self, ObjectKind::Actor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub position: Vec3,
    pub velocity: Vec3,
}

impl LiveObject {
    pub fn is_occupied(&self) -> bool {
        self.kind.occupant().is_some()
    }

    pub fn is_moving(&self) -> bool {
        self.velocity.length_squared() != 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldInfo {
    pub id: WorldId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClaimRef {
    pub id: ClaimId,
    pub world: WorldId,
}
