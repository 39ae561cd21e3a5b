// component.rs - Component trait and per-world registration
//
// Components are identified by u32 IDs declared next to the type, not by
// Rust TypeIds. Each World keeps its own registry; there is no global state.

use crate::ecs::column::{Column, TypedColumn};
use crate::ecs::WorldError;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::mem::{align_of, size_of};

pub type ComponentId = u32;

/// Trait for plain-data components.
///
/// Implementors must be plain values: no behavior, no references into the
/// world. `Default` provides the value used by batch allocation.
pub trait Component: 'static + Clone + Default + fmt::Debug + Send + Sync {
    /// Globally unique component ID.
    const ID: ComponentId;

    /// Human-readable name for debugging.
    const NAME: &'static str;
}

/// Helper macro to implement Component trait.
///
/// # Example
/// ```ignore
/// #[derive(Clone, Copy, Debug, Default)]
/// struct Position { x: f32, y: f32 }
///
/// define_component!(Position, 1, "Position");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $id:expr, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const ID: $crate::ecs::ComponentId = $id;
            const NAME: &'static str = $name;
        }
    };
}

/// Metadata describing a registered component.
#[derive(Clone)]
pub struct ComponentMeta {
    pub id: ComponentId,
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
    type_id: TypeId,
    new_column: fn() -> Box<dyn Column>,
}

impl ComponentMeta {
    pub fn of<T: Component>() -> Self {
        Self {
            id: T::ID,
            name: T::NAME,
            size: size_of::<T>(),
            align: align_of::<T>(),
            type_id: TypeId::of::<T>(),
            new_column: TypedColumn::<T>::boxed,
        }
    }

    /// Fresh, empty column able to hold this component.
    pub(crate) fn new_column(&self) -> Box<dyn Column> {
        (self.new_column)()
    }
}

impl fmt::Debug for ComponentMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentMeta")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("align", &self.align)
            .finish()
    }
}

/// Component metadata known to one World.
#[derive(Default, Debug)]
pub struct ComponentRegistry {
    metas: HashMap<ComponentId, ComponentMeta>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`. Re-registering the same type is a no-op; claiming an id
    /// already taken by another type fails.
    pub fn register<T: Component>(&mut self) -> Result<ComponentId, WorldError> {
        if let Some(existing) = self.metas.get(&T::ID) {
            if existing.type_id != TypeId::of::<T>() {
                return Err(WorldError::ComponentConflict {
                    component_id: T::ID,
                    existing: existing.name,
                    requested: T::NAME,
                });
            }
            return Ok(T::ID);
        }
        self.metas.insert(T::ID, ComponentMeta::of::<T>());
        Ok(T::ID)
    }

    pub fn meta(&self, id: ComponentId) -> Option<&ComponentMeta> {
        self.metas.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.metas.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentMeta> {
        self.metas.values()
    }
}

/// A tuple of component types that can be registered together, e.g. to look
/// up the archetype for `(Transform, RenderMesh, RenderBounds)`.
pub trait ComponentSet {
    fn register_all(registry: &mut ComponentRegistry) -> Result<Vec<ComponentId>, WorldError>;
}

macro_rules! impl_component_set {
    ($($T:ident),+) => {
        impl<$($T: Component),+> ComponentSet for ($($T,)+) {
            fn register_all(
                registry: &mut ComponentRegistry,
            ) -> Result<Vec<ComponentId>, WorldError> {
                Ok(vec![$(registry.register::<$T>()?),+])
            }
        }
    };
}

impl_component_set!(T1);
impl_component_set!(T1, T2);
impl_component_set!(T1, T2, T3);
impl_component_set!(T1, T2, T3, T4);
impl_component_set!(T1, T2, T3, T4, T5);
impl_component_set!(T1, T2, T3, T4, T5, T6);
