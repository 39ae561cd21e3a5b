//! Entity handle with generational index
//!
//! Entities are lightweight handles (8 bytes) that reference data in the World.
//! The generation counter prevents use-after-free bugs.

use std::fmt;

use crate::ecs::{ArchetypeId, WorldError};

/// Entity handle (generation-indexed for safety)
///
/// Format: [32-bit index | 32-bit generation]
/// - Index: Position in entity metadata array
/// - Generation: Incremented on entity destruction (prevents use-after-free)
///
/// Example:
/// ```ignore
/// let entity = world.create();
/// world.destroy(entity)?;
/// // entity handle is now invalid (generation mismatch)
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Serialize to 64-bit integer (for networking/save files)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Where a live entity's component data sits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EntityLoc {
    pub archetype: ArchetypeId,
    pub row: usize,
}

struct Slot {
    generation: u32,
    loc: Option<EntityLoc>,
}

/// Owns entity identities: hands out indices, recycles freed slots and
/// tracks the storage location of every live entity.
///
/// Locations are updated whenever an entity's row moves (swap-remove,
/// archetype change); the handle itself never changes.
#[derive(Default)]
pub struct EntityAllocator {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle for an entity stored at `loc`.
    ///
    /// Freed slots are reused most-recent-first with their bumped generation.
    pub fn alloc(&mut self, loc: EntityLoc) -> Entity {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.loc = Some(loc);
            return Entity::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            loc: Some(loc),
        });
        Entity::new(index, 0)
    }

    /// Resolve a handle to its current location.
    pub fn resolve(&self, entity: Entity) -> Result<EntityLoc, WorldError> {
        let slot = self
            .slots
            .get(entity.index as usize)
            .ok_or(WorldError::EntityNotFound { entity })?;
        match slot.loc {
            Some(loc) if slot.generation == entity.generation => Ok(loc),
            _ => Err(WorldError::StaleHandle { entity }),
        }
    }

    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.resolve(entity).is_ok()
    }

    /// Release a live handle, returning where its data was stored.
    ///
    /// The slot's generation is incremented so the released handle (and any
    /// copy of it) reports `StaleHandle` from now on.
    pub fn free(&mut self, entity: Entity) -> Result<EntityLoc, WorldError> {
        let loc = self.resolve(entity)?;
        let slot = &mut self.slots[entity.index as usize];
        slot.loc = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(entity.index);
        self.live -= 1;
        Ok(loc)
    }

    /// Record that a live entity's data moved to `loc`.
    pub(crate) fn relocate(&mut self, entity: Entity, loc: EntityLoc) {
        if let Some(slot) = self.slots.get_mut(entity.index as usize) {
            debug_assert_eq!(slot.generation, entity.generation, "relocating stale entity");
            slot.loc = Some(loc);
        }
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Invalidate every live handle.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.loc.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.live = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(row: usize) -> EntityLoc {
        EntityLoc {
            archetype: ArchetypeId::EMPTY,
            row,
        }
    }

    #[test]
    fn bits_round_trip() {
        let e = Entity::new(7, 3);
        assert_eq!(e.to_bits(), (3u64 << 32) | 7);
        assert_eq!(Entity::from_bits(e.to_bits()), e);
    }

    #[test]
    fn freed_slot_is_reused_with_new_generation() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.alloc(loc(0));
        let b = alloc.alloc(loc(1));
        assert_eq!(alloc.len(), 2);

        alloc.free(a).unwrap();
        assert_eq!(alloc.resolve(a), Err(WorldError::StaleHandle { entity: a }));

        let c = alloc.alloc(loc(0));
        assert_eq!(c.index(), a.index());
        assert_eq!(c.generation(), a.generation() + 1);
        assert!(alloc.contains(b));
        assert!(alloc.contains(c));
        assert!(!alloc.contains(a));
    }

    #[test]
    fn unknown_index_is_not_found() {
        let alloc = EntityAllocator::new();
        let ghost = Entity::new(42, 0);
        assert_eq!(
            alloc.resolve(ghost),
            Err(WorldError::EntityNotFound { entity: ghost })
        );
    }

    #[test]
    fn double_free_is_stale() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.alloc(loc(0));
        alloc.free(a).unwrap();
        assert!(matches!(alloc.free(a), Err(WorldError::StaleHandle { .. })));
        assert_eq!(alloc.len(), 0);
    }

    #[test]
    fn clear_invalidates_all() {
        let mut alloc = EntityAllocator::new();
        let handles: Vec<_> = (0..4).map(|i| alloc.alloc(loc(i))).collect();
        alloc.clear();
        assert!(alloc.is_empty());
        assert!(handles.iter().all(|&e| !alloc.contains(e)));
    }
}
