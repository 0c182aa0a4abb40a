use quotedraft_core::{
    change::{CommittedLineItem, StagedChange},
    fields::FieldUpdate,
    ids::*,
};

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub project_id: ProjectId,
    pub name: String,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionRecord {
    pub promotion_id: PromotionId,
    pub project_id: ProjectId,
    pub category: Option<Category>,
    pub staged_rows: u64,
    pub committed_rows: u64,
    pub cleared_rows: u64,
    pub checksum: [u8; 32],
    pub promoted_at_ms: i64,
}

/// Pending partial edits keyed by (project, product, category).
pub trait StagingStore {
    /// Insert-or-merge every row in one statement. Present fields overwrite,
    /// absent fields keep their stored value. Keys must be distinct.
    fn upsert_partial(&self, rows: &[StagedChange]) -> Result<usize, StorageError>;

    /// Insert-or-update a single column for many products of one category.
    /// New rows hold only that column. Product ids must be distinct and every
    /// update must target the same field.
    fn upsert_field(
        &self,
        project_id: ProjectId,
        category: &Category,
        updates: &[(ProductId, FieldUpdate)],
    ) -> Result<usize, StorageError>;

    /// Staged rows of a project ordered by (product_id, category).
    fn get_staged(
        &self,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<Vec<StagedChange>, StorageError>;

    fn count_staged(
        &self,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<u64, StorageError>;

    fn delete_staged(
        &self,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<usize, StorageError>;
}

/// Last-promoted configuration keyed by (project, product).
pub trait CommittedStore {
    /// Insert or fully replace each item. Product ids must be distinct.
    fn upsert_committed(
        &self,
        items: &[CommittedLineItem],
        promotion_id: PromotionId,
    ) -> Result<usize, StorageError>;

    /// Committed items of a project ordered by product id.
    fn get_committed(&self, project_id: ProjectId) -> Result<Vec<CommittedLineItem>, StorageError>;

    fn delete_committed(&self, project_id: ProjectId) -> Result<usize, StorageError>;
}

pub trait ProjectStore {
    fn create_project(&self, name: &str) -> Result<ProjectId, StorageError>;

    fn get_project(&self, project_id: ProjectId) -> Result<Option<ProjectRecord>, StorageError>;

    fn project_exists(&self, project_id: ProjectId) -> Result<bool, StorageError> {
        Ok(self.get_project(project_id)?.is_some())
    }

    /// Removes the project together with its staged, committed and promotion rows.
    fn delete_project(&self, project_id: ProjectId) -> Result<bool, StorageError>;
}

pub trait PromotionLog {
    fn insert_promotion(&self, record: &PromotionRecord) -> Result<(), StorageError>;

    /// Receipts of a project, oldest first.
    fn list_promotions(&self, project_id: ProjectId) -> Result<Vec<PromotionRecord>, StorageError>;
}

/// Read access outside of a write transaction.
pub trait Storage {
    fn get_project(&self, project_id: ProjectId) -> Result<Option<ProjectRecord>, StorageError>;

    fn get_staged(
        &self,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<Vec<StagedChange>, StorageError>;

    fn count_staged(
        &self,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<u64, StorageError>;

    fn get_committed(&self, project_id: ProjectId) -> Result<Vec<CommittedLineItem>, StorageError>;

    fn list_promotions(&self, project_id: ProjectId) -> Result<Vec<PromotionRecord>, StorageError>;
}
