use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("chunk of {rows} rows binds {params} parameters (max {max})")]
    ChunkTooLarge { rows: usize, params: usize, max: usize },

    #[error("core error: {0}")]
    Core(#[from] quotedraft_core::CoreError),
}

impl StorageError {
    /// Map constraint failures to `ConstraintViolation`, keep everything else.
    pub(crate) fn from_write(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, ref msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            other => Self::Sqlite(other),
        }
    }
}
