use crate::spawn::SpawnError;
use serde::{Deserialize, Serialize};

/// Indices per chunk task unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Tuning knobs of the parallel spawn scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Indices handled by one chunk task. Larger chunks mean less per-task
    /// overhead, smaller ones better load balance.
    pub chunk_size: usize,
    /// Worker threads in the spawn pool.
    pub worker_pool_size: usize,
}

impl SpawnConfig {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_worker_pool_size(mut self, worker_pool_size: usize) -> Self {
        self.worker_pool_size = worker_pool_size;
        self
    }

    pub fn validate(&self) -> Result<(), SpawnError> {
        if self.chunk_size == 0 {
            return Err(SpawnError::InvalidConfig {
                reason: "chunk_size must be at least 1",
            });
        }
        if self.worker_pool_size == 0 {
            return Err(SpawnError::InvalidConfig {
                reason: "worker_pool_size must be at least 1",
            });
        }
        Ok(())
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            worker_pool_size: default_pool_size(),
        }
    }
}

fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
