//! Swarm Services Layer
//!
//! Host-side concerns around the core: settings files today.

pub mod settings;

pub use settings::{Settings, SettingsError, SpawnMode, SpawnSettings};
