//! Swarm Runtime
//!
//! Small driver that spawns a grid of renderable entities with the path
//! chosen in the settings file and logs how it went.

use anyhow::{Context, Result};
use std::time::Instant;
use swarm_core::components::{
    LocalToWorld, MaterialRef, MeshRef, RenderBounds, RenderMesh, Transform,
};
use swarm_core::ecs::World;
use swarm_core::glam::Vec3;
use swarm_core::spawn::{spawn_archetype_batch, Spawner};
use swarm_services::{Settings, SpawnMode, SpawnSettings};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_SETTINGS_PATH: &str = "swarm.json";

fn main() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("loading settings from {path}"))?,
        None => Settings::load_or_default(DEFAULT_SETTINGS_PATH)
            .context("loading default settings file")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    info!("Swarm v{}", swarm_core::VERSION);
    info!(
        mode = ?settings.spawn.mode,
        count = settings.spawn.entity_count,
        chunk_size = settings.spawn.chunk_size,
        workers = settings.spawn.worker_pool_size,
        "spawning"
    );

    let mut world = World::new();
    let start = Instant::now();
    let spawned = match settings.spawn.mode {
        SpawnMode::Job => run_job(&mut world, &settings.spawn)?,
        SpawnMode::Batch => run_batch(&mut world, &settings.spawn)?,
    };

    info!(
        spawned,
        alive = world.len(),
        archetypes = world.archetypes().len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "spawn finished"
    );
    Ok(())
}

fn mesh() -> RenderMesh {
    RenderMesh::new(MeshRef(0), MaterialRef(0))
}

/// Prototype + parallel command-buffer path.
fn run_job(world: &mut World, spawn: &SpawnSettings) -> Result<usize> {
    let prototype = world.create();
    world.insert(prototype, mesh())?;
    world.insert(prototype, RenderBounds::default())?;
    world.insert(prototype, LocalToWorld::default())?;

    let mut spawner = Spawner::new(spawn.to_config())?;
    let report = spawner.spawn_with(world, prototype, spawn.entity_count, |i| {
        LocalToWorld::from_translation(Vec3::new(i as f32, 0.0, 0.0))
    })?;
    world.destroy(prototype)?;

    swarm_metrics::metrics! {
        for (phase, elapsed) in spawner.profiler().iter() {
            debug!(phase, elapsed_us = elapsed.as_micros() as u64, "spawn phase");
        }
        debug!(chunks = spawner.counter().get("chunks"), "spawn chunks");
    }

    Ok(report.entities.len())
}

/// Archetype batch path, filled on the calling thread.
fn run_batch(world: &mut World, spawn: &SpawnSettings) -> Result<usize> {
    let archetype = world
        .archetypes_mut()
        .get_or_create_for::<(Transform, RenderMesh, RenderBounds, LocalToWorld)>()?;
    let entities = spawn_archetype_batch(world, archetype, spawn.entity_count, |i, entity, w| {
        w.set(entity, RenderBounds::default())?;
        w.set(entity, Transform::from_xyz(i as f32, 0.0, 0.0))?;
        w.set(entity, mesh())
    })?;
    Ok(entities.len())
}
