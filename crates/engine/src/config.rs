use serde::Deserialize;

use quotedraft_core::resolve::ResolutionPolicy;
use quotedraft_storage::{schema::MAX_BOUND_PARAMS, staging::PARTIAL_ROW_PARAMS};

use crate::error::EngineError;

/// Rows per statement used by the batch paths.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Largest chunk whose partial upsert still fits SQLite's bound-parameter limit.
pub const MAX_CHUNK_SIZE: usize = MAX_BOUND_PARAMS / PARTIAL_ROW_PARAMS;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub chunk_size: usize,
    pub resolution: ResolutionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            resolution: ResolutionPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.chunk_size == 0 {
            return Err(EngineError::Config("chunk_size must be at least 1".into()));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(EngineError::Config(format!(
                "chunk_size {} exceeds {MAX_CHUNK_SIZE}",
                self.chunk_size
            )));
        }
        Ok(())
    }
}
