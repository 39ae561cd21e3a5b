use crate::ecs::{ArchetypeId, Entity, World, WorldError};
use tracing::debug;

/// Allocate `count` entities of `archetype` in one call, then run `init` on
/// each of them in index order.
///
/// This is the direct path: no prototype, no command buffer, no worker
/// threads. Every component starts at its `Default` value until `init`
/// overwrites it. The first error from `init` stops the loop; entities
/// allocated so far stay alive.
pub fn spawn_archetype_batch<F>(
    world: &mut World,
    archetype: ArchetypeId,
    count: usize,
    mut init: F,
) -> Result<Vec<Entity>, WorldError>
where
    F: FnMut(usize, Entity, &mut World) -> Result<(), WorldError>,
{
    let entities = world.allocate_batch(archetype, count)?;
    for (index, &entity) in entities.iter().enumerate() {
        init(index, entity, world)?;
    }
    debug!(%archetype, count, "archetype batch spawned");
    Ok(entities)
}
