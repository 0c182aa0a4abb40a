use quotedraft_core::{CoreError, ids::ProjectId};
use quotedraft_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(CoreError),

    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => Self::Validation(msg),
            other => Self::Core(other),
        }
    }
}
