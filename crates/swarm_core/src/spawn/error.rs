use crate::ecs::{CommandError, Entity, WorldError};
use crate::spawn::SpawnState;
use thiserror::Error;

/// Aggregated failure of one spawn call.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("invalid spawn configuration: {reason}")]
    InvalidConfig { reason: &'static str },

    #[error("failed to build spawn worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    #[error("prototype {prototype} is not a live entity")]
    DanglingPrototype { prototype: Entity },

    #[error(transparent)]
    NotFound(WorldError),

    #[error("illegal spawn state transition {from} -> {to}")]
    InvalidTransition { from: SpawnState, to: SpawnState },

    #[error(transparent)]
    World(WorldError),

    #[error(transparent)]
    Command(CommandError),
}

impl From<WorldError> for SpawnError {
    fn from(err: WorldError) -> Self {
        match err {
            WorldError::DanglingPrototype { prototype } => SpawnError::DanglingPrototype { prototype },
            err if err.is_not_found() => SpawnError::NotFound(err),
            err => SpawnError::World(err),
        }
    }
}

impl From<CommandError> for SpawnError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::DanglingPrototype { prototype } => {
                SpawnError::DanglingPrototype { prototype }
            }
            CommandError::World(err) => err.into(),
            err => SpawnError::Command(err),
        }
    }
}
