//! Swarm Core
//!
//! Data-oriented bulk entity instantiation:
//! - Entity store with archetype (structure-of-arrays) storage
//! - Deferred command buffers with single-threaded playback
//! - Parallel spawn scheduler cloning a prototype entity N times
//! - Built-in plain-data components (transforms, bounds, render refs)

pub mod components;
pub mod ecs;
pub mod spawn;

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
