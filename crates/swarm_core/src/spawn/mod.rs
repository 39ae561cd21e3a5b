//! Bulk spawning.
//!
//! Two paths:
//! - [`Spawner`] clones a prototype entity N times. Worker threads record
//!   "instantiate + set component" commands for their chunk of indices into
//!   private command segments; the segments are then played back in index
//!   order on the calling thread.
//! - [`spawn_archetype_batch`] allocates N default-valued entities of an
//!   archetype in one call and initializes them in a sequential loop.

mod batch;
mod config;
mod error;
mod scheduler;
mod state;

pub use batch::spawn_archetype_batch;
pub use config::{SpawnConfig, DEFAULT_CHUNK_SIZE};
pub use error::SpawnError;
pub use scheduler::{chunk_ranges, SpawnReport, Spawner};
pub use state::SpawnState;
