use crate::ecs::{ArchetypeId, ColumnError, ComponentId, Entity};
use thiserror::Error;

/// Errors reported by the entity store and archetype registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("entity {entity} was never allocated")]
    EntityNotFound { entity: Entity },

    #[error("entity {entity} has no component '{component}'")]
    ComponentNotFound {
        entity: Entity,
        component: &'static str,
    },

    #[error("entity handle {entity} is stale (destroyed or reused)")]
    StaleHandle { entity: Entity },

    #[error("archetype type set is empty")]
    InvalidArchetype,

    #[error("archetype {archetype} does not exist")]
    UnknownArchetype { archetype: ArchetypeId },

    #[error("component id {component_id} is not registered")]
    UnregisteredComponent { component_id: ComponentId },

    #[error("component id {component_id} is registered as '{existing}', cannot register '{requested}'")]
    ComponentConflict {
        component_id: ComponentId,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("prototype {prototype} is not a live entity")]
    DanglingPrototype { prototype: Entity },

    #[error(transparent)]
    Column(#[from] ColumnError),
}

impl WorldError {
    /// True for both flavours of "not found": a missing entity or a missing component.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorldError::EntityNotFound { .. } | WorldError::ComponentNotFound { .. }
        )
    }
}
