use std::path::Path;

use quotedraft_core::ids::{Category, ProductId, ProjectId};
use quotedraft_engine::{BatchReport, DraftChange, Engine, EngineConfig, EngineError};
use quotedraft_storage::{SqliteStorage, StorageError};

/// An engine over a fresh database with one project already created.
pub struct TestProject {
    pub engine: Engine,
    pub project_id: ProjectId,
}

impl TestProject {
    pub fn new() -> Result<Self, EngineError> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        let storage = SqliteStorage::open_in_memory()?;
        Self::from_storage(storage, config)
    }

    pub fn on_disk(path: &Path) -> Result<Self, EngineError> {
        let path = path
            .to_str()
            .ok_or_else(|| EngineError::Validation("database path is not UTF-8".into()))?;
        Self::from_storage(SqliteStorage::open(path)?, EngineConfig::default())
    }

    fn from_storage(storage: SqliteStorage, config: EngineConfig) -> Result<Self, EngineError> {
        let mut engine = Engine::with_config(storage, config)?;
        let project_id = engine.create_project("Test project")?;
        Ok(Self { engine, project_id })
    }

    /// Full-record save of `changes` into `category`.
    pub fn stage(
        &mut self,
        category: &Category,
        changes: Vec<DraftChange>,
    ) -> Result<BatchReport, EngineError> {
        self.engine
            .save_draft_changes(self.project_id, category, changes, None, None)
    }

    /// Make every insert of `product_id` into `table` fail, so tests can
    /// observe rollback of a call that already applied earlier chunks.
    pub fn fail_inserts_of(&self, table: &str, product_id: ProductId) -> Result<(), StorageError> {
        self.engine.storage().conn().execute_batch(&format!(
            "CREATE TRIGGER fail_{table}_{id} BEFORE INSERT ON {table}
             WHEN NEW.product_id = {id}
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
            id = product_id.get()
        ))?;
        Ok(())
    }

    pub fn clear_failures(&self, table: &str, product_id: ProductId) -> Result<(), StorageError> {
        self.engine.storage().conn().execute_batch(&format!(
            "DROP TRIGGER IF EXISTS fail_{table}_{id};",
            id = product_id.get()
        ))?;
        Ok(())
    }
}
