//! Parallel spawn scheduling.
//!
//! ## Scheduling model
//!
//! `[0, count)` is cut into contiguous chunks of `chunk_size` indices. Each
//! chunk runs as one task on a dedicated rayon pool and records into its own
//! `CommandSegment`, reading the world only through a shared reference. Once
//! every task is done, the segments are played back on the calling thread in
//! chunk order, so the committed data equals a sequential run over
//! `0..count` whatever the pool size or chunk size.
//!
//! The `&mut World` borrow held by `spawn` is what serializes spawn calls
//! against one store.

use crate::components::Transform;
use crate::ecs::{CommandBuffer, CommandError, CommandSegment, Component, Entity, World, WorldError};
use crate::spawn::{SpawnConfig, SpawnError, SpawnState};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use std::ops::Range;
use swarm_metrics::{Counter, PhaseProfiler};
use tracing::{debug, trace, warn};

/// Outcome of a successful spawn call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnReport {
    /// New entities in index order.
    pub entities: Vec<Entity>,
    /// Chunk tasks dispatched.
    pub chunks: usize,
    pub state: SpawnState,
}

/// Bulk factory cloning a prototype entity on a worker pool.
pub struct Spawner {
    config: SpawnConfig,
    pool: OnceCell<rayon::ThreadPool>,
    counter: Counter,
    profiler: PhaseProfiler,
}

impl Spawner {
    pub fn new(config: SpawnConfig) -> Result<Self, SpawnError> {
        config.validate()?;
        Ok(Self {
            config,
            pool: OnceCell::new(),
            counter: Counter::new(),
            profiler: PhaseProfiler::new(),
        })
    }

    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// Spawn counters (`spawned`, `chunks`, `spawn_calls`).
    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    /// Accumulated time spent in the `record` and `playback` phases.
    pub fn profiler(&self) -> &PhaseProfiler {
        &self.profiler
    }

    /// Clone `prototype` `count` times, giving clone `i` the transform `f(i)`.
    ///
    /// Returns the clones in index order. `f` must be a pure function of the
    /// index.
    pub fn spawn<F>(
        &mut self,
        world: &mut World,
        prototype: Entity,
        count: usize,
        f: F,
    ) -> Result<Vec<Entity>, SpawnError>
    where
        F: Fn(usize) -> Transform + Sync,
    {
        self.spawn_with(world, prototype, count, f)
            .map(|report| report.entities)
    }

    /// Like [`Spawner::spawn`] for any component `C` the prototype carries.
    pub fn spawn_with<C, F>(
        &mut self,
        world: &mut World,
        prototype: Entity,
        count: usize,
        f: F,
    ) -> Result<SpawnReport, SpawnError>
    where
        C: Component,
        F: Fn(usize) -> C + Sync,
    {
        let mut state = SpawnState::Pending;
        if count == 0 {
            debug!(%prototype, "spawn of zero entities, nothing scheduled");
            return Ok(SpawnReport {
                entities: Vec::new(),
                chunks: 0,
                state: SpawnState::Completed,
            });
        }

        let pool = worker_pool(&self.pool, self.config.worker_pool_size)?;
        let chunks = chunk_ranges(count, self.config.chunk_size);
        let chunk_count = chunks.len();
        let mut buffer = CommandBuffer::new();
        let segments = buffer.segments(chunk_count)?;

        advance(&mut state, SpawnState::Dispatched)?;
        debug!(
            %prototype,
            count,
            chunks = chunk_count,
            component = C::NAME,
            "dispatching spawn"
        );

        let view: &World = world;
        let recorded: Vec<CommandSegment> = self.profiler.time_phase("record", || {
            pool.install(|| {
                segments
                    .into_par_iter()
                    .zip(chunks.into_par_iter())
                    .map(|(mut segment, range)| {
                        record_chunk(view, prototype, range, &f, &mut segment);
                        segment
                    })
                    .collect()
            })
        });

        if let Some(err) = recorded.iter().find_map(|s| s.failure().cloned()) {
            advance(&mut state, SpawnState::Failed)?;
            warn!(%prototype, error = %err, "spawn chunk failed");
            return Err(err.into());
        }
        advance(&mut state, SpawnState::AllChunksDone)?;

        for segment in recorded {
            buffer.push_segment(segment)?;
        }
        let played = self
            .profiler
            .time_phase("playback", || buffer.playback(world));
        let map = match played {
            Ok(map) => map,
            Err(err) => {
                advance(&mut state, SpawnState::Failed)?;
                warn!(%prototype, error = %err, "spawn playback failed");
                return Err(err.into());
            }
        };
        advance(&mut state, SpawnState::PlayedBack)?;

        let entities = map.entities();
        debug_assert_eq!(entities.len(), count, "one entity per index");
        advance(&mut state, SpawnState::Completed)?;

        self.counter.increment("spawn_calls", 1);
        self.counter.increment("spawned", count);
        self.counter.increment("chunks", chunk_count);

        Ok(SpawnReport {
            entities,
            chunks: chunk_count,
            state,
        })
    }
}

impl Default for Spawner {
    fn default() -> Self {
        Self {
            config: SpawnConfig::default(),
            pool: OnceCell::new(),
            counter: Counter::new(),
            profiler: PhaseProfiler::new(),
        }
    }
}

/// Contiguous `[start, end)` chunks covering `[0, count)`.
pub fn chunk_ranges(count: usize, chunk_size: usize) -> Vec<Range<usize>> {
    let chunk_size = chunk_size.max(1);
    (0..count)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(count))
        .collect()
}

fn worker_pool(
    cell: &OnceCell<rayon::ThreadPool>,
    size: usize,
) -> Result<&rayon::ThreadPool, SpawnError> {
    cell.get_or_try_init(|| {
        debug!(threads = size, "building spawn worker pool");
        rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("swarm-spawn-{i}"))
            .build()
            .map_err(SpawnError::from)
    })
}

fn advance(state: &mut SpawnState, next: SpawnState) -> Result<(), SpawnError> {
    if !state.can_advance_to(next) {
        return Err(SpawnError::InvalidTransition {
            from: *state,
            to: next,
        });
    }
    debug!(from = %state, to = %next, "spawn state");
    *state = next;
    Ok(())
}

/// Record one chunk. Runs on a worker thread with read-only world access.
fn record_chunk<C, F>(
    world: &World,
    prototype: Entity,
    range: Range<usize>,
    f: &F,
    segment: &mut CommandSegment,
) where
    C: Component,
    F: Fn(usize) -> C + Sync,
{
    if !world.contains(prototype) {
        segment.fail(CommandError::DanglingPrototype { prototype });
        return;
    }
    if !world.has::<C>(prototype) {
        segment.fail(CommandError::World(WorldError::ComponentNotFound {
            entity: prototype,
            component: C::NAME,
        }));
        return;
    }
    trace!(start = range.start, end = range.end, "recording chunk");
    segment.reserve(range.len() * 2);
    for index in range {
        let placeholder = segment.record_instantiate(prototype);
        segment.record_set_component(placeholder, f(index));
    }
}
