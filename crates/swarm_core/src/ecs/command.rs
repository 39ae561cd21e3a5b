//! Deferred command buffers.
//!
//! Commands describe *what* should happen to the world, recorded now and
//! applied later in one single-threaded playback. A buffer is made of
//! segments: each segment can be filled by a different thread without any
//! locking, then handed back to the buffer. Playback walks segments in the
//! order they were issued, so the result does not depend on which thread
//! finished first.
//!
//! Playback order:
//! 1. every `Instantiate`, batched per run of the same prototype
//! 2. every `SetComponent` / `AddComponent`, in record order
//! 3. every `Destroy`
//!
//! Playback is not transactional: when a command fails, the commands applied
//! before it stay applied.

use crate::ecs::{Component, Entity, World, WorldError};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("command buffer was already played back")]
    BufferAlreadyConsumed,

    #[error("placeholder {placeholder} was never recorded")]
    UnknownPlaceholder { placeholder: PlaceholderId },

    #[error("segment {segment} was issued by a different command buffer")]
    ForeignSegment { segment: u32 },

    #[error("prototype {prototype} is not a live entity")]
    DanglingPrototype { prototype: Entity },

    #[error(transparent)]
    World(#[from] WorldError),
}

/// Stand-in for an entity that will only exist after playback.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceholderId {
    segment: u32,
    slot: u32,
}

impl PlaceholderId {
    pub fn segment(&self) -> u32 {
        self.segment
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }
}

impl fmt::Display for PlaceholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}.{}", self.segment, self.slot)
    }
}

/// Entity a set/add command applies to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Target {
    Placeholder(PlaceholderId),
    Entity(Entity),
}

impl From<PlaceholderId> for Target {
    fn from(p: PlaceholderId) -> Self {
        Target::Placeholder(p)
    }
}

impl From<Entity> for Target {
    fn from(e: Entity) -> Self {
        Target::Entity(e)
    }
}

/// Type-erased component value carried by a command.
trait ComponentValue: fmt::Debug + Send + Sync {
    fn set_on(self: Box<Self>, world: &mut World, entity: Entity) -> Result<(), WorldError>;

    fn insert_on(self: Box<Self>, world: &mut World, entity: Entity) -> Result<(), WorldError>;
}

#[derive(Debug)]
struct Value<T>(T);

impl<T: Component> ComponentValue for Value<T> {
    fn set_on(self: Box<Self>, world: &mut World, entity: Entity) -> Result<(), WorldError> {
        world.set(entity, self.0)
    }

    fn insert_on(self: Box<Self>, world: &mut World, entity: Entity) -> Result<(), WorldError> {
        world.insert(entity, self.0)
    }
}

#[derive(Debug)]
enum Command {
    Instantiate {
        placeholder: PlaceholderId,
        prototype: Entity,
    },
    SetComponent {
        target: Target,
        value: Box<dyn ComponentValue>,
    },
    AddComponent {
        target: Target,
        value: Box<dyn ComponentValue>,
    },
    Destroy {
        entity: Entity,
    },
}

/// Monotonic source of buffer identities, used to reject segments handed to
/// the wrong buffer.
static NEXT_BUFFER: AtomicU64 = AtomicU64::new(1);

/// An independently recordable slice of a `CommandBuffer`.
///
/// Segments are plain owned values: a worker thread fills its own segment
/// and returns it, so recording never contends on shared state.
#[derive(Debug)]
pub struct CommandSegment {
    owner: u64,
    id: u32,
    commands: Vec<Command>,
    next_slot: u32,
    failure: Option<CommandError>,
}

impl CommandSegment {
    fn new(owner: u64, id: u32) -> Self {
        Self {
            owner,
            id,
            commands: Vec::new(),
            next_slot: 0,
            failure: None,
        }
    }

    /// Issue order of this segment within its buffer.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.commands.reserve(additional);
    }

    /// Record cloning `prototype`; the clone is addressed by the returned
    /// placeholder until playback.
    pub fn record_instantiate(&mut self, prototype: Entity) -> PlaceholderId {
        let placeholder = PlaceholderId {
            segment: self.id,
            slot: self.next_slot,
        };
        self.next_slot += 1;
        self.commands.push(Command::Instantiate {
            placeholder,
            prototype,
        });
        placeholder
    }

    /// Record overwriting a component the target already has.
    pub fn record_set_component<T: Component>(&mut self, target: impl Into<Target>, value: T) {
        self.commands.push(Command::SetComponent {
            target: target.into(),
            value: Box::new(Value(value)),
        });
    }

    /// Record adding (or overwriting) a component; may change the archetype.
    pub fn record_add_component<T: Component>(&mut self, target: impl Into<Target>, value: T) {
        self.commands.push(Command::AddComponent {
            target: target.into(),
            value: Box::new(Value(value)),
        });
    }

    pub fn record_destroy(&mut self, entity: Entity) {
        self.commands.push(Command::Destroy { entity });
    }

    /// Mark this segment as failed. Playback of the owning buffer will
    /// report `err` without touching the world.
    pub fn fail(&mut self, err: CommandError) {
        if self.failure.is_none() {
            self.failure = Some(err);
        }
    }

    #[inline]
    pub fn failure(&self) -> Option<&CommandError> {
        self.failure.as_ref()
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Placeholder to entity resolution produced by playback.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntityMap {
    order: Vec<(PlaceholderId, Entity)>,
    index: HashMap<PlaceholderId, usize>,
}

impl EntityMap {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    fn insert(&mut self, placeholder: PlaceholderId, entity: Entity) {
        self.index.insert(placeholder, self.order.len());
        self.order.push((placeholder, entity));
    }

    pub fn get(&self, placeholder: PlaceholderId) -> Option<Entity> {
        self.index.get(&placeholder).map(|&i| self.order[i].1)
    }

    fn resolve(&self, target: Target) -> Result<Entity, CommandError> {
        match target {
            Target::Entity(e) => Ok(e),
            Target::Placeholder(placeholder) => self
                .get(placeholder)
                .ok_or(CommandError::UnknownPlaceholder { placeholder }),
        }
    }

    /// Created entities in placeholder order (segment issue order, then
    /// record order).
    pub fn entities(&self) -> Vec<Entity> {
        self.order.iter().map(|&(_, e)| e).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceholderId, Entity)> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Ordered log of deferred world mutations, consumed exactly once.
#[derive(Debug)]
pub struct CommandBuffer {
    id: u64,
    next_segment: u32,
    segments: Vec<CommandSegment>,
    open: Option<CommandSegment>,
    consumed: bool,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self {
            id: NEXT_BUFFER.fetch_add(1, Ordering::Relaxed),
            next_segment: 0,
            segments: Vec::new(),
            open: None,
            consumed: false,
        }
    }

    #[inline]
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    fn ensure_live(&self) -> Result<(), CommandError> {
        if self.consumed {
            return Err(CommandError::BufferAlreadyConsumed);
        }
        Ok(())
    }

    fn issue(&mut self) -> CommandSegment {
        let segment = CommandSegment::new(self.id, self.next_segment);
        self.next_segment += 1;
        segment
    }

    /// Issue `count` empty segments, in order, for concurrent recording.
    ///
    /// Playback applies them in issue order regardless of when they are
    /// pushed back.
    pub fn segments(&mut self, count: usize) -> Result<Vec<CommandSegment>, CommandError> {
        self.ensure_live()?;
        self.close_open();
        Ok((0..count).map(|_| self.issue()).collect())
    }

    /// Hand a recorded segment back to the buffer.
    pub fn push_segment(&mut self, segment: CommandSegment) -> Result<(), CommandError> {
        self.ensure_live()?;
        if segment.owner != self.id {
            return Err(CommandError::ForeignSegment {
                segment: segment.id,
            });
        }
        self.segments.push(segment);
        Ok(())
    }

    fn close_open(&mut self) {
        if let Some(open) = self.open.take() {
            self.segments.push(open);
        }
    }

    fn open_segment(&mut self) -> Result<&mut CommandSegment, CommandError> {
        self.ensure_live()?;
        let segment = match self.open.take() {
            Some(segment) => segment,
            None => self.issue(),
        };
        Ok(self.open.insert(segment))
    }

    pub fn record_instantiate(&mut self, prototype: Entity) -> Result<PlaceholderId, CommandError> {
        Ok(self.open_segment()?.record_instantiate(prototype))
    }

    pub fn record_set_component<T: Component>(
        &mut self,
        target: impl Into<Target>,
        value: T,
    ) -> Result<(), CommandError> {
        self.open_segment()?.record_set_component(target, value);
        Ok(())
    }

    pub fn record_add_component<T: Component>(
        &mut self,
        target: impl Into<Target>,
        value: T,
    ) -> Result<(), CommandError> {
        self.open_segment()?.record_add_component(target, value);
        Ok(())
    }

    pub fn record_destroy(&mut self, entity: Entity) -> Result<(), CommandError> {
        self.open_segment()?.record_destroy(entity);
        Ok(())
    }

    /// Total recorded commands across all segments.
    pub fn len(&self) -> usize {
        self.segments.iter().map(CommandSegment::len).sum::<usize>()
            + self.open.as_ref().map_or(0, CommandSegment::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply every recorded command to `world`. Succeeds at most once.
    pub fn playback(&mut self, world: &mut World) -> Result<EntityMap, CommandError> {
        self.ensure_live()?;
        self.consumed = true;
        self.close_open();

        let mut segments = std::mem::take(&mut self.segments);
        segments.sort_by_key(|s| s.id);

        if let Some(err) = segments.iter().find_map(|s| s.failure.clone()) {
            return Err(err);
        }

        let commands: Vec<Command> = segments
            .into_iter()
            .flat_map(|s| s.commands)
            .collect();

        let map = instantiate_all(world, &commands)?;

        let mut destroys = Vec::new();
        let mut applied = 0usize;
        for command in commands {
            match command {
                Command::Instantiate { .. } => {}
                Command::SetComponent { target, value } => {
                    let entity = map.resolve(target)?;
                    value.set_on(world, entity)?;
                    applied += 1;
                }
                Command::AddComponent { target, value } => {
                    let entity = map.resolve(target)?;
                    value.insert_on(world, entity)?;
                    applied += 1;
                }
                Command::Destroy { entity } => destroys.push(entity),
            }
        }
        for &entity in &destroys {
            world.destroy(entity)?;
        }

        debug!(
            created = map.len(),
            components = applied,
            destroyed = destroys.len(),
            "command buffer played back"
        );
        Ok(map)
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase 1 of playback: create every instantiated entity, batching runs of
/// the same prototype.
fn instantiate_all(world: &mut World, commands: &[Command]) -> Result<EntityMap, CommandError> {
    let total = commands
        .iter()
        .filter(|c| matches!(c, Command::Instantiate { .. }))
        .count();
    let mut map = EntityMap::with_capacity(total);
    let mut run: Vec<PlaceholderId> = Vec::new();
    let mut run_prototype: Option<Entity> = None;

    for command in commands {
        let Command::Instantiate {
            placeholder,
            prototype,
        } = command
        else {
            continue;
        };
        if run_prototype != Some(*prototype) {
            if let Some(proto) = run_prototype {
                flush_run(world, proto, &mut run, &mut map)?;
            }
            run_prototype = Some(*prototype);
        }
        run.push(*placeholder);
    }
    if let Some(proto) = run_prototype {
        flush_run(world, proto, &mut run, &mut map)?;
    }
    Ok(map)
}

fn flush_run(
    world: &mut World,
    prototype: Entity,
    run: &mut Vec<PlaceholderId>,
    map: &mut EntityMap,
) -> Result<(), CommandError> {
    let entities = world
        .instantiate_batch(prototype, run.len())
        .map_err(|err| match err {
            WorldError::DanglingPrototype { prototype } => {
                CommandError::DanglingPrototype { prototype }
            }
            other => CommandError::World(other),
        })?;
    for (placeholder, entity) in run.drain(..).zip(entities) {
        map.insert(placeholder, entity);
    }
    Ok(())
}
