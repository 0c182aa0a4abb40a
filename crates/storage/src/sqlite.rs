use rusqlite::{Connection, Transaction, TransactionBehavior};

use quotedraft_core::{
    change::{CommittedLineItem, StagedChange},
    fields::FieldUpdate,
    ids::*,
};

use crate::error::StorageError;
use crate::traits::{
    CommittedStore, ProjectRecord, ProjectStore, PromotionLog, PromotionRecord, StagingStore, Storage,
};
use crate::{committed, projects, staging};

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start an IMMEDIATE transaction. Every write goes through the returned
    /// handle; dropping it without `commit` rolls everything back.
    pub fn begin(&mut self) -> Result<StoreTx<'_>, StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(StoreTx { tx })
    }
}

/// A single all-or-nothing unit of work against both stores.
pub struct StoreTx<'conn> {
    tx: Transaction<'conn>,
}

impl StoreTx<'_> {
    pub fn commit(self) -> Result<(), StorageError> {
        self.tx.commit()?;
        Ok(())
    }

    pub fn rollback(self) -> Result<(), StorageError> {
        self.tx.rollback()?;
        Ok(())
    }
}

impl StagingStore for StoreTx<'_> {
    fn upsert_partial(&self, rows: &[StagedChange]) -> Result<usize, StorageError> {
        staging::upsert_partial(&self.tx, rows)
    }

    fn upsert_field(
        &self,
        project_id: ProjectId,
        category: &Category,
        updates: &[(ProductId, FieldUpdate)],
    ) -> Result<usize, StorageError> {
        staging::upsert_field(&self.tx, project_id, category, updates)
    }

    fn get_staged(
        &self,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<Vec<StagedChange>, StorageError> {
        staging::get_staged(&self.tx, project_id, category)
    }

    fn count_staged(
        &self,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<u64, StorageError> {
        staging::count_staged(&self.tx, project_id, category)
    }

    fn delete_staged(
        &self,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<usize, StorageError> {
        staging::delete_staged(&self.tx, project_id, category)
    }
}

impl CommittedStore for StoreTx<'_> {
    fn upsert_committed(
        &self,
        items: &[CommittedLineItem],
        promotion_id: PromotionId,
    ) -> Result<usize, StorageError> {
        committed::upsert_committed(&self.tx, items, promotion_id)
    }

    fn get_committed(&self, project_id: ProjectId) -> Result<Vec<CommittedLineItem>, StorageError> {
        committed::get_committed(&self.tx, project_id)
    }

    fn delete_committed(&self, project_id: ProjectId) -> Result<usize, StorageError> {
        committed::delete_committed(&self.tx, project_id)
    }
}

impl ProjectStore for StoreTx<'_> {
    fn create_project(&self, name: &str) -> Result<ProjectId, StorageError> {
        projects::create_project(&self.tx, name)
    }

    fn get_project(&self, project_id: ProjectId) -> Result<Option<ProjectRecord>, StorageError> {
        projects::get_project(&self.tx, project_id)
    }

    fn delete_project(&self, project_id: ProjectId) -> Result<bool, StorageError> {
        projects::delete_project(&self.tx, project_id)
    }
}

impl PromotionLog for StoreTx<'_> {
    fn insert_promotion(&self, record: &PromotionRecord) -> Result<(), StorageError> {
        projects::insert_promotion(&self.tx, record)
    }

    fn list_promotions(&self, project_id: ProjectId) -> Result<Vec<PromotionRecord>, StorageError> {
        projects::list_promotions(&self.tx, project_id)
    }
}

impl Storage for SqliteStorage {
    fn get_project(&self, project_id: ProjectId) -> Result<Option<ProjectRecord>, StorageError> {
        projects::get_project(&self.conn, project_id)
    }

    fn get_staged(
        &self,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<Vec<StagedChange>, StorageError> {
        staging::get_staged(&self.conn, project_id, category)
    }

    fn count_staged(
        &self,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<u64, StorageError> {
        staging::count_staged(&self.conn, project_id, category)
    }

    fn get_committed(&self, project_id: ProjectId) -> Result<Vec<CommittedLineItem>, StorageError> {
        committed::get_committed(&self.conn, project_id)
    }

    fn list_promotions(&self, project_id: ProjectId) -> Result<Vec<PromotionRecord>, StorageError> {
        projects::list_promotions(&self.conn, project_id)
    }
}
