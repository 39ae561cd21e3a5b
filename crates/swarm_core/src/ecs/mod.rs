//! Entity Component System core types.
//!
//! Entities are generational handles; their component data lives in one
//! structure-of-arrays storage per archetype (unique set of component
//! types). Structural work can be deferred through a `CommandBuffer` and
//! applied later in a single-threaded playback.

mod archetype;
mod column;
mod command;
mod component;
mod entity;
mod error;
mod world;

pub use archetype::{ArchetypeId, ArchetypeRegistry, ArchetypeStorage};
pub use column::{Column, ColumnError, TypedColumn};
pub use command::{CommandBuffer, CommandError, CommandSegment, EntityMap, PlaceholderId, Target};
pub use component::{Component, ComponentId, ComponentMeta, ComponentRegistry, ComponentSet};
pub use entity::{Entity, EntityAllocator, EntityLoc};
pub use error::WorldError;
pub use world::World;
