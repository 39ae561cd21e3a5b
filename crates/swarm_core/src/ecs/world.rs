// world.rs - Entity store: identities, archetype storage and typed access

use crate::ecs::{
    ArchetypeId, ArchetypeRegistry, ArchetypeStorage, Component, ComponentId, Entity,
    EntityAllocator, EntityLoc, WorldError,
};
use tracing::debug;

/// The entity store. Owns every entity id and all component data.
///
/// A `World` is an explicit context object: create one, pass it where it is
/// needed, drop (or `clear`) it when done.
pub struct World {
    entities: EntityAllocator,
    archetypes: ArchetypeRegistry,
}

impl World {
    /// Create a new empty world.
    pub fn new() -> Self {
        Self {
            entities: EntityAllocator::new(),
            archetypes: ArchetypeRegistry::new(),
        }
    }

    /// Register a component type with this world.
    pub fn register<T: Component>(&mut self) -> Result<ComponentId, WorldError> {
        self.archetypes.register::<T>()
    }

    pub fn archetypes(&self) -> &ArchetypeRegistry {
        &self.archetypes
    }

    pub fn archetypes_mut(&mut self) -> &mut ArchetypeRegistry {
        &mut self.archetypes
    }

    /// Create an entity with no components.
    pub fn create(&mut self) -> Entity {
        let storage = self.archetypes.empty_mut();
        let entity = self.entities.alloc(EntityLoc {
            archetype: ArchetypeId::EMPTY,
            row: storage.len(),
        });
        storage.push_default_rows(&[entity]);
        entity
    }

    /// Allocate `count` default-valued entities of `archetype` at once.
    pub fn allocate_batch(
        &mut self,
        archetype: ArchetypeId,
        count: usize,
    ) -> Result<Vec<Entity>, WorldError> {
        self.archetypes
            .allocate_batch(&mut self.entities, archetype, count)
    }

    /// Destroy an entity. Its handle becomes stale immediately.
    pub fn destroy(&mut self, entity: Entity) -> Result<(), WorldError> {
        let loc = self.entities.resolve(entity)?;
        let moved = self.archetypes.storage_mut(loc.archetype)?.swap_remove(loc.row)?;
        self.entities.free(entity)?;
        if let Some(moved) = moved {
            self.entities.relocate(moved, loc);
        }
        Ok(())
    }

    /// Whether `entity` refers to a live entity.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(entity)
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn location(&self, entity: Entity) -> Result<EntityLoc, WorldError> {
        self.entities.resolve(entity)
    }

    pub fn archetype_of(&self, entity: Entity) -> Result<ArchetypeId, WorldError> {
        Ok(self.entities.resolve(entity)?.archetype)
    }

    /// Sorted component ids carried by `entity`.
    pub fn component_ids(&self, entity: Entity) -> Result<&[ComponentId], WorldError> {
        let loc = self.entities.resolve(entity)?;
        Ok(self.archetypes.storage(loc.archetype)?.components())
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.storage_of(entity)
            .map(|(storage, _)| storage.contains(T::ID))
            .unwrap_or(false)
    }

    /// Borrow a component.
    ///
    /// Fails with `StaleHandle` for destroyed entities and `ComponentNotFound`
    /// when the entity lacks `T`.
    pub fn get_ref<T: Component>(&self, entity: Entity) -> Result<&T, WorldError> {
        let (storage, row) = self.storage_of(entity)?;
        storage
            .column::<T>()
            .and_then(|col| col.get(row))
            .ok_or(WorldError::ComponentNotFound {
                entity,
                component: T::NAME,
            })
    }

    /// Copy of a component value.
    pub fn get<T: Component>(&self, entity: Entity) -> Result<T, WorldError> {
        self.get_ref::<T>(entity).cloned()
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, WorldError> {
        let loc = self.entities.resolve(entity)?;
        self.archetypes
            .storage_mut(loc.archetype)?
            .column_mut::<T>()
            .and_then(|col| col.get_mut(loc.row))
            .ok_or(WorldError::ComponentNotFound {
                entity,
                component: T::NAME,
            })
    }

    /// Overwrite an existing component. Never changes the archetype.
    pub fn set<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        *self.get_mut::<T>(entity)? = value;
        Ok(())
    }

    /// Add or overwrite a component.
    ///
    /// Adding a new component type moves the entity to another archetype; its
    /// handle stays valid.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        self.archetypes.register::<T>()?;
        let loc = self.entities.resolve(entity)?;
        if !self.archetypes.storage(loc.archetype)?.contains(T::ID) {
            let dst = self.archetypes.with_component(loc.archetype, T::ID)?;
            self.relocate(entity, loc, dst)?;
        }
        self.set(entity, value)
    }

    /// Remove a component, returning its value. Moves the entity to another archetype.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Result<T, WorldError> {
        let value = self.get::<T>(entity)?;
        let loc = self.entities.resolve(entity)?;
        let dst = self.archetypes.without_component(loc.archetype, T::ID)?;
        self.relocate(entity, loc, dst)?;
        Ok(value)
    }

    /// Clone a live prototype into a new entity of the same archetype.
    pub fn instantiate(&mut self, prototype: Entity) -> Result<Entity, WorldError> {
        let mut batch = self.instantiate_batch(prototype, 1)?;
        batch.pop().ok_or(WorldError::DanglingPrototype { prototype })
    }

    /// Clone a live prototype `count` times.
    ///
    /// All clones land in the prototype's archetype in one contiguous run of
    /// rows; the prototype itself is left untouched.
    pub fn instantiate_batch(
        &mut self,
        prototype: Entity,
        count: usize,
    ) -> Result<Vec<Entity>, WorldError> {
        let loc = self
            .entities
            .resolve(prototype)
            .map_err(|_| WorldError::DanglingPrototype { prototype })?;
        if count == 0 {
            return Ok(Vec::new());
        }
        let storage = self.archetypes.storage_mut(loc.archetype)?;
        let start = storage.len();
        let batch: Vec<Entity> = (0..count)
            .map(|i| {
                self.entities.alloc(EntityLoc {
                    archetype: loc.archetype,
                    row: start + i,
                })
            })
            .collect();
        storage.push_cloned_rows(loc.row, &batch)?;
        Ok(batch)
    }

    /// Destroy every entity. Archetypes and component registrations survive.
    pub fn clear(&mut self) {
        debug!(live = self.entities.len(), "clearing world");
        self.entities.clear();
        self.archetypes.clear_rows();
    }

    fn storage_of(&self, entity: Entity) -> Result<(&ArchetypeStorage, usize), WorldError> {
        let loc = self.entities.resolve(entity)?;
        Ok((self.archetypes.storage(loc.archetype)?, loc.row))
    }

    fn relocate(
        &mut self,
        entity: Entity,
        loc: EntityLoc,
        dst: ArchetypeId,
    ) -> Result<(), WorldError> {
        let (src, dst_storage) = self.archetypes.pair_mut(loc.archetype, dst)?;
        let (row, moved) = src.move_row_to(loc.row, dst_storage)?;
        self.entities.relocate(entity, EntityLoc { archetype: dst, row });
        if let Some(moved) = moved {
            self.entities.relocate(moved, loc);
        }
        Ok(())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }
    define_component!(Position, 100, "Position");

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Velocity {
        x: i16,
        y: i16,
    }
    define_component!(Velocity, 101, "Velocity");

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Health {
        value: i32,
    }
    define_component!(Health, 102, "Health");

    fn spawn_pv(world: &mut World, x: i32) -> Entity {
        let e = world.create();
        world.insert(e, Position { x, y: 0 }).unwrap();
        world.insert(e, Velocity { x: 1, y: 2 }).unwrap();
        e
    }

    #[test]
    fn create_get_set() {
        let mut world = World::new();
        let e = spawn_pv(&mut world, 5);

        assert_eq!(world.get::<Position>(e), Ok(Position { x: 5, y: 0 }));
        world.set(e, Position { x: 9, y: 9 }).unwrap();
        assert_eq!(world.get::<Position>(e), Ok(Position { x: 9, y: 9 }));
        assert_eq!(world.component_ids(e).unwrap(), &[100, 101]);
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn missing_component_is_not_found() {
        let mut world = World::new();
        let e = spawn_pv(&mut world, 0);
        let err = world.get::<Health>(e).unwrap_err();
        assert_eq!(
            err,
            WorldError::ComponentNotFound {
                entity: e,
                component: "Health"
            }
        );
        assert!(err.is_not_found());
        assert!(world.set(e, Health { value: 1 }).unwrap_err().is_not_found());
    }

    #[test]
    fn destroyed_entity_is_stale() {
        let mut world = World::new();
        let e = spawn_pv(&mut world, 0);
        world.destroy(e).unwrap();

        assert!(!world.contains(e));
        assert_eq!(
            world.get::<Position>(e),
            Err(WorldError::StaleHandle { entity: e })
        );
        assert_eq!(world.destroy(e), Err(WorldError::StaleHandle { entity: e }));
        assert!(world.is_empty());
    }

    #[test]
    fn destroy_keeps_swapped_entity_addressable() {
        let mut world = World::new();
        let a = spawn_pv(&mut world, 1);
        let b = spawn_pv(&mut world, 2);
        let c = spawn_pv(&mut world, 3);

        world.destroy(a).unwrap();
        assert_eq!(world.get::<Position>(b).unwrap().x, 2);
        assert_eq!(world.get::<Position>(c).unwrap().x, 3);
        assert_eq!(world.location(c).unwrap().row, 0);
    }

    #[test]
    fn structural_change_preserves_identity() {
        let mut world = World::new();
        let a = spawn_pv(&mut world, 1);
        let b = spawn_pv(&mut world, 2);
        let before = world.archetype_of(a).unwrap();

        world.insert(a, Health { value: 50 }).unwrap();
        let after = world.archetype_of(a).unwrap();
        assert_ne!(before, after);
        assert_eq!(world.get::<Position>(a), Ok(Position { x: 1, y: 0 }));
        assert_eq!(world.get::<Health>(a), Ok(Health { value: 50 }));
        assert_eq!(world.get::<Position>(b), Ok(Position { x: 2, y: 0 }));

        assert_eq!(world.remove::<Health>(a), Ok(Health { value: 50 }));
        assert_eq!(world.archetype_of(a).unwrap(), before);
        assert!(!world.has::<Health>(a));
        assert_eq!(world.get::<Velocity>(a), Ok(Velocity { x: 1, y: 2 }));
    }

    #[test]
    fn insert_overwrites_existing_component_in_place() {
        let mut world = World::new();
        let a = spawn_pv(&mut world, 1);
        let arch = world.archetype_of(a).unwrap();
        world.insert(a, Position { x: 7, y: 7 }).unwrap();
        assert_eq!(world.archetype_of(a).unwrap(), arch);
        assert_eq!(world.get::<Position>(a).unwrap().x, 7);
    }

    #[test]
    fn instantiate_batch_clones_prototype() {
        let mut world = World::new();
        let proto = spawn_pv(&mut world, 42);
        let clones = world.instantiate_batch(proto, 3).unwrap();

        assert_eq!(clones.len(), 3);
        assert_eq!(world.len(), 4);
        for &c in &clones {
            assert_eq!(world.archetype_of(c), world.archetype_of(proto));
            assert_eq!(world.get::<Position>(c), Ok(Position { x: 42, y: 0 }));
        }
    }

    #[test]
    fn instantiate_dead_prototype_fails() {
        let mut world = World::new();
        let proto = spawn_pv(&mut world, 0);
        world.destroy(proto).unwrap();
        assert_eq!(
            world.instantiate(proto),
            Err(WorldError::DanglingPrototype { prototype: proto })
        );
    }

    #[test]
    fn allocate_batch_through_world() {
        let mut world = World::new();
        world.register::<Position>().unwrap();
        world.register::<Health>().unwrap();
        let arch = world
            .archetypes_mut()
            .get_or_create(&[Health::ID, Position::ID])
            .unwrap();
        let batch = world.allocate_batch(arch, 10).unwrap();
        assert_eq!(world.len(), 10);
        for (i, &e) in batch.iter().enumerate() {
            world.set(e, Health { value: i as i32 }).unwrap();
        }
        assert_eq!(world.get::<Health>(batch[9]), Ok(Health { value: 9 }));
        assert_eq!(world.get::<Position>(batch[0]), Ok(Position::default()));
    }

    #[test]
    fn clear_is_teardown() {
        let mut world = World::new();
        let a = spawn_pv(&mut world, 0);
        world.clear();
        assert!(world.is_empty());
        assert!(!world.contains(a));
        let b = spawn_pv(&mut world, 1);
        assert_eq!(world.get::<Position>(b).unwrap().x, 1);
    }
}
