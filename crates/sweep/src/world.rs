use std::collections::HashMap;

use tracing::debug;

use crate::host::WorldHost;
use crate::model::{
    BlockKind, BlockPos, LiveObject, ObjectId, ObjectKind, Vec3, WorldId, WorldInfo,
};

#[derive(Debug, Default)]
pub struct ObjectIdAllocator {
    next: u64,
}

impl ObjectIdAllocator {
    pub fn allocate(&mut self) -> ObjectId {
        let id = ObjectId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone)]
pub struct WorldState {
    id: WorldId,
    name: String,
    objects: Vec<LiveObject>,
    blocks: HashMap<BlockPos, BlockKind>,
}

impl WorldState {
    fn new(id: WorldId, name: String) -> Self {
        Self {
            id,
            name,
            objects: Vec::new(),
            blocks: HashMap::new(),
        }
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn objects(&self) -> &[LiveObject] {
        &self.objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn find_object(&self, id: ObjectId) -> Option<&LiveObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    pub fn find_object_mut(&mut self, id: ObjectId) -> Option<&mut LiveObject> {
        self.objects.iter_mut().find(|object| object.id == id)
    }

    pub fn block_at(&self, position: BlockPos) -> BlockKind {
        self.blocks.get(&position).copied().unwrap_or_default()
    }

    pub fn set_block(&mut self, position: BlockPos, kind: BlockKind) {
        if kind == BlockKind::Air {
            self.blocks.remove(&position);
        } else {
            self.blocks.insert(position, kind);
        }
    }

    fn remove(&mut self, id: ObjectId) -> bool {
        match self.objects.iter().position(|object| object.id == id) {
            Some(index) => {
                self.objects.remove(index);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct ServerWorlds {
    allocator: ObjectIdAllocator,
    worlds: Vec<WorldState>,
}

impl ServerWorlds {
    pub fn add_world(&mut self, name: impl Into<String>) -> WorldId {
        let id = WorldId(self.worlds.len() as u32);
        self.worlds.push(WorldState::new(id, name.into()));
        id
    }

    pub fn world(&self, id: WorldId) -> Option<&WorldState> {
        self.worlds.iter().find(|world| world.id == id)
    }

    pub fn world_mut(&mut self, id: WorldId) -> Option<&mut WorldState> {
        self.worlds.iter_mut().find(|world| world.id == id)
    }

    pub fn world_by_name(&self, name: &str) -> Option<&WorldState> {
        self.worlds.iter().find(|world| world.name == name)
    }

    pub fn spawn(
        &mut self,
        world: WorldId,
        kind: ObjectKind,
        position: Vec3,
    ) -> Option<ObjectId> {
        self.spawn_moving(world, kind, position, Vec3::ZERO)
    }

    pub fn spawn_moving(
        &mut self,
        world: WorldId,
        kind: ObjectKind,
        position: Vec3,
        velocity: Vec3,
    ) -> Option<ObjectId> {
        let index = self.worlds.iter().position(|state| state.id == world)?;
        let id = self.allocator.allocate();
        self.worlds[index].objects.push(LiveObject {
            id,
            kind,
            position,
            velocity,
        });
        Some(id)
    }

    pub fn set_block(&mut self, world: WorldId, position: BlockPos, kind: BlockKind) -> bool {
        match self.world_mut(world) {
            Some(state) => {
                state.set_block(position, kind);
                true
            }
            None => false,
        }
    }

    pub fn object_count(&self) -> usize {
        self.worlds.iter().map(WorldState::object_count).sum()
    }
}

impl WorldHost for ServerWorlds {
    fn worlds(&self) -> Vec<WorldInfo> {
        self.worlds
            .iter()
            .map(|world| WorldInfo {
                id: world.id,
                name: world.name.clone(),
            })
            .collect()
    }

    fn live_objects(&self, world: WorldId) -> Vec<LiveObject> {
        self.world(world)
            .map(|state| state.objects.clone())
            .unwrap_or_default()
    }

    fn block_at(&self, world: WorldId, position: BlockPos) -> BlockKind {
        self.world(world)
            .map(|state| state.block_at(position))
            .unwrap_or_default()
    }

    fn remove_object(&mut self, world: WorldId, object: ObjectId) -> bool {
        let removed = self
            .world_mut(world)
            .map(|state| state.remove(object))
            .unwrap_or(false);
        if !removed {
            debug!(world = world.0, object = object.0, "remove_object_already_gone");
        }
        removed
    }
}
