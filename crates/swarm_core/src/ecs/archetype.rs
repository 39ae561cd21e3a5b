// archetype.rs - Archetype identification and storage
//
// An archetype is a unique set of component types. Entities with the same
// component types share one structure-of-arrays storage.

use crate::ecs::column::{Column, ColumnError, TypedColumn};
use crate::ecs::{
    Component, ComponentId, ComponentRegistry, ComponentSet, Entity, EntityAllocator, EntityLoc,
    WorldError,
};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Dense archetype index. Id 0 is the built-in empty archetype.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// Archetype of entities with no components at all.
    pub const EMPTY: Self = Self(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Storage for all entities of a single archetype.
///
/// Uses Structure-of-Arrays (SoA) layout: one column per component, the
/// component ids kept sorted so lookups are a binary search.
pub struct ArchetypeStorage {
    id: ArchetypeId,
    components: Vec<ComponentId>,
    columns: Vec<Box<dyn Column>>, // parallel to `components`
    entities: Vec<Entity>,         // row -> entity
}

impl ArchetypeStorage {
    fn new(id: ArchetypeId, components: Vec<ComponentId>, registry: &ComponentRegistry) -> Self {
        let columns = components
            .iter()
            .filter_map(|&cid| registry.meta(cid))
            .map(|meta| meta.new_column())
            .collect::<Vec<_>>();
        debug_assert_eq!(columns.len(), components.len());
        Self {
            id,
            components,
            columns,
            entities: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// Sorted component ids of this archetype.
    #[inline]
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    #[inline]
    pub fn contains(&self, cid: ComponentId) -> bool {
        self.column_index(cid).is_some()
    }

    /// Number of entities stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in row order.
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[inline]
    fn column_index(&self, cid: ComponentId) -> Option<usize> {
        self.components.binary_search(&cid).ok()
    }

    /// Typed slice of all values of `T`, indexed by row.
    pub fn column<T: Component>(&self) -> Option<&[T]> {
        let idx = self.column_index(T::ID)?;
        self.columns[idx]
            .as_any()
            .downcast_ref::<TypedColumn<T>>()
            .map(TypedColumn::as_slice)
    }

    /// Mutable typed slice of all values of `T`, indexed by row.
    pub fn column_mut<T: Component>(&mut self) -> Option<&mut [T]> {
        let idx = self.column_index(T::ID)?;
        self.columns[idx]
            .as_any_mut()
            .downcast_mut::<TypedColumn<T>>()
            .map(TypedColumn::as_mut_slice)
    }

    /// Append default-valued rows for freshly allocated entities.
    pub(crate) fn push_default_rows(&mut self, entities: &[Entity]) {
        for col in &mut self.columns {
            col.push_default(entities.len());
        }
        self.entities.extend_from_slice(entities);
    }

    /// Append rows cloned from `src_row` for freshly allocated entities.
    pub(crate) fn push_cloned_rows(
        &mut self,
        src_row: usize,
        entities: &[Entity],
    ) -> Result<(), ColumnError> {
        if src_row >= self.entities.len() {
            return Err(ColumnError::RowOutOfBounds {
                row: src_row,
                len: self.entities.len(),
            });
        }
        for col in &mut self.columns {
            col.repeat_row(src_row, entities.len())?;
        }
        self.entities.extend_from_slice(entities);
        Ok(())
    }

    /// Swap-remove a row. Returns the entity that moved into `row`, if any.
    pub(crate) fn swap_remove(&mut self, row: usize) -> Result<Option<Entity>, ColumnError> {
        if row >= self.entities.len() {
            return Err(ColumnError::RowOutOfBounds {
                row,
                len: self.entities.len(),
            });
        }
        for col in &mut self.columns {
            col.swap_remove(row)?;
        }
        self.entities.swap_remove(row);
        Ok(self.entities.get(row).copied())
    }

    /// Move a row into `dst`, dropping components `dst` lacks and
    /// default-filling components only `dst` has.
    ///
    /// Returns the new row in `dst` and the entity that moved into `row` here.
    pub(crate) fn move_row_to(
        &mut self,
        row: usize,
        dst: &mut ArchetypeStorage,
    ) -> Result<(usize, Option<Entity>), ColumnError> {
        if row >= self.entities.len() {
            return Err(ColumnError::RowOutOfBounds {
                row,
                len: self.entities.len(),
            });
        }
        for (cid, col) in self.components.iter().zip(self.columns.iter_mut()) {
            match dst.column_index(*cid) {
                Some(idx) => col.move_row(row, dst.columns[idx].as_mut())?,
                None => col.swap_remove(row)?,
            }
        }
        let entity = self.entities.swap_remove(row);
        dst.entities.push(entity);
        let dst_len = dst.entities.len();
        for col in &mut dst.columns {
            if col.len() < dst_len {
                col.push_default(dst_len - col.len());
            }
        }
        Ok((dst_len - 1, self.entities.get(row).copied()))
    }

    fn clear(&mut self) {
        for col in &mut self.columns {
            col.clear();
        }
        self.entities.clear();
    }
}

/// Maps component type sets to archetype storages.
pub struct ArchetypeRegistry {
    components: ComponentRegistry,
    storages: Vec<ArchetypeStorage>,
    lookup: HashMap<Vec<ComponentId>, ArchetypeId>,
    comp_index: HashMap<ComponentId, Vec<ArchetypeId>>,
}

impl ArchetypeRegistry {
    pub fn new() -> Self {
        let components = ComponentRegistry::new();
        let empty = ArchetypeStorage::new(ArchetypeId::EMPTY, Vec::new(), &components);
        let mut lookup = HashMap::new();
        lookup.insert(Vec::new(), ArchetypeId::EMPTY);
        Self {
            components,
            storages: vec![empty],
            lookup,
            comp_index: HashMap::new(),
        }
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn register<T: Component>(&mut self) -> Result<ComponentId, WorldError> {
        self.components.register::<T>()
    }

    /// Look up (or create) the archetype for a set of component ids.
    ///
    /// Order and duplicates in `components` are ignored, so the same set
    /// always yields the same id. Every id must already be registered.
    pub fn get_or_create(&mut self, components: &[ComponentId]) -> Result<ArchetypeId, WorldError> {
        let mut ids = components.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Err(WorldError::InvalidArchetype);
        }
        self.resolve(ids)
    }

    /// Register the components of `S` and return their archetype.
    pub fn get_or_create_for<S: ComponentSet>(&mut self) -> Result<ArchetypeId, WorldError> {
        let ids = S::register_all(&mut self.components)?;
        self.get_or_create(&ids)
    }

    /// `ids` must be sorted and deduplicated.
    fn resolve(&mut self, ids: Vec<ComponentId>) -> Result<ArchetypeId, WorldError> {
        if let Some(&id) = self.lookup.get(&ids) {
            return Ok(id);
        }
        if let Some(&component_id) = ids.iter().find(|&&cid| !self.components.contains(cid)) {
            return Err(WorldError::UnregisteredComponent { component_id });
        }

        let id = ArchetypeId(self.storages.len() as u32);
        self.storages
            .push(ArchetypeStorage::new(id, ids.clone(), &self.components));
        for &cid in &ids {
            self.comp_index.entry(cid).or_default().push(id);
        }
        debug!(archetype = %id, components = ?ids, "created archetype");
        self.lookup.insert(ids, id);
        Ok(id)
    }

    /// Archetype of `base` plus `cid`.
    pub(crate) fn with_component(
        &mut self,
        base: ArchetypeId,
        cid: ComponentId,
    ) -> Result<ArchetypeId, WorldError> {
        let mut ids = self.storage(base)?.components.clone();
        if let Err(pos) = ids.binary_search(&cid) {
            ids.insert(pos, cid);
        }
        self.resolve(ids)
    }

    /// Archetype of `base` minus `cid`; may be the empty archetype.
    pub(crate) fn without_component(
        &mut self,
        base: ArchetypeId,
        cid: ComponentId,
    ) -> Result<ArchetypeId, WorldError> {
        let mut ids = self.storage(base)?.components.clone();
        ids.retain(|&c| c != cid);
        self.resolve(ids)
    }

    /// Allocate `count` entities of one archetype in a single call, every
    /// component default-valued.
    ///
    /// Rows are appended contiguously and entity handles are issued in row
    /// order. The empty archetype is rejected with `InvalidArchetype`.
    pub fn allocate_batch(
        &mut self,
        entities: &mut EntityAllocator,
        archetype: ArchetypeId,
        count: usize,
    ) -> Result<Vec<Entity>, WorldError> {
        if archetype == ArchetypeId::EMPTY {
            return Err(WorldError::InvalidArchetype);
        }
        let storage = self.storage_mut(archetype)?;
        let start = storage.len();
        let batch: Vec<Entity> = (0..count)
            .map(|i| {
                entities.alloc(EntityLoc {
                    archetype,
                    row: start + i,
                })
            })
            .collect();
        storage.push_default_rows(&batch);
        Ok(batch)
    }

    pub fn archetype(&self, id: ArchetypeId) -> Option<&ArchetypeStorage> {
        self.storages.get(id.index())
    }

    pub(crate) fn storage(&self, id: ArchetypeId) -> Result<&ArchetypeStorage, WorldError> {
        self.storages
            .get(id.index())
            .ok_or(WorldError::UnknownArchetype { archetype: id })
    }

    pub(crate) fn storage_mut(
        &mut self,
        id: ArchetypeId,
    ) -> Result<&mut ArchetypeStorage, WorldError> {
        self.storages
            .get_mut(id.index())
            .ok_or(WorldError::UnknownArchetype { archetype: id })
    }

    /// Storage of the empty archetype, created with the registry.
    pub(crate) fn empty_mut(&mut self) -> &mut ArchetypeStorage {
        &mut self.storages[ArchetypeId::EMPTY.index()]
    }

    /// Two distinct storages borrowed mutably at once.
    pub(crate) fn pair_mut(
        &mut self,
        a: ArchetypeId,
        b: ArchetypeId,
    ) -> Result<(&mut ArchetypeStorage, &mut ArchetypeStorage), WorldError> {
        let (ai, bi) = (a.index(), b.index());
        let len = self.storages.len();
        if ai >= len {
            return Err(WorldError::UnknownArchetype { archetype: a });
        }
        if bi >= len {
            return Err(WorldError::UnknownArchetype { archetype: b });
        }
        assert_ne!(ai, bi, "pair_mut needs two distinct archetypes");
        if ai < bi {
            let (lo, hi) = self.storages.split_at_mut(bi);
            Ok((&mut lo[ai], &mut hi[0]))
        } else {
            let (lo, hi) = self.storages.split_at_mut(ai);
            Ok((&mut hi[0], &mut lo[bi]))
        }
    }

    /// Archetypes containing `cid`.
    pub fn archetypes_with(&self, cid: ComponentId) -> &[ArchetypeId] {
        self.comp_index.get(&cid).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Number of archetypes, the empty one included.
    pub fn len(&self) -> usize {
        self.storages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArchetypeStorage> {
        self.storages.iter()
    }

    /// Drop all rows, keeping archetypes and registrations.
    pub(crate) fn clear_rows(&mut self) {
        for storage in &mut self.storages {
            storage.clear();
        }
    }
}

impl Default for ArchetypeRegistry {
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

    fn registry() -> ArchetypeRegistry {
        let mut reg = ArchetypeRegistry::new();
        reg.register::<Position>().unwrap();
        reg.register::<Velocity>().unwrap();
        reg.register::<Health>().unwrap();
        reg
    }

    #[test]
    fn get_or_create_is_idempotent_and_order_insensitive() {
        let mut reg = registry();
        let a = reg.get_or_create(&[Position::ID, Velocity::ID]).unwrap();
        let b = reg
            .get_or_create(&[Velocity::ID, Position::ID, Velocity::ID])
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, ArchetypeId::EMPTY);
        assert_eq!(reg.archetype(a).unwrap().components(), &[100, 101]);

        let c = reg.get_or_create(&[Position::ID]).unwrap();
        assert_ne!(a, c);
        assert_eq!(reg.archetypes_with(Position::ID), &[a, c]);
        assert_eq!(reg.archetypes_with(Velocity::ID), &[a]);
    }

    #[test]
    fn empty_type_set_is_invalid() {
        let mut reg = registry();
        assert_eq!(reg.get_or_create(&[]), Err(WorldError::InvalidArchetype));
    }

    #[test]
    fn unregistered_component_is_rejected() {
        let mut reg = registry();
        assert_eq!(
            reg.get_or_create(&[Position::ID, 999]),
            Err(WorldError::UnregisteredComponent { component_id: 999 })
        );
    }

    #[test]
    fn get_or_create_for_registers_types() {
        let mut reg = ArchetypeRegistry::new();
        let id = reg.get_or_create_for::<(Health, Position)>().unwrap();
        assert_eq!(reg.archetype(id).unwrap().components(), &[100, 102]);
        assert!(reg.components().contains(Health::ID));
    }

    #[test]
    fn allocate_batch_defaults_every_component() {
        let mut reg = registry();
        let mut entities = EntityAllocator::new();
        let arch = reg.get_or_create(&[Position::ID, Health::ID]).unwrap();

        let batch = reg.allocate_batch(&mut entities, arch, 4).unwrap();
        assert_eq!(batch.len(), 4);
        assert_eq!(entities.len(), 4);

        let storage = reg.archetype(arch).unwrap();
        assert_eq!(storage.entities(), batch.as_slice());
        assert_eq!(storage.column::<Position>().unwrap(), &[Position::default(); 4]);
        assert_eq!(storage.column::<Health>().unwrap().len(), 4);
        for (row, &e) in batch.iter().enumerate() {
            assert_eq!(entities.resolve(e).unwrap(), EntityLoc { archetype: arch, row });
        }
    }

    #[test]
    fn allocate_batch_rejects_empty_archetype() {
        let mut reg = registry();
        let mut entities = EntityAllocator::new();
        assert_eq!(
            reg.allocate_batch(&mut entities, ArchetypeId::EMPTY, 3),
            Err(WorldError::InvalidArchetype)
        );
        assert!(entities.is_empty());
    }

    #[test]
    fn with_and_without_component_walk_the_graph() {
        let mut reg = registry();
        let pos = reg.get_or_create(&[Position::ID]).unwrap();
        let pos_vel = reg.with_component(pos, Velocity::ID).unwrap();
        assert_eq!(reg.archetype(pos_vel).unwrap().components(), &[100, 101]);
        assert_eq!(reg.without_component(pos_vel, Velocity::ID).unwrap(), pos);
        assert_eq!(
            reg.without_component(pos, Position::ID).unwrap(),
            ArchetypeId::EMPTY
        );
    }
}
