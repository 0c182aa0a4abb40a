pub mod batch;
pub mod category;
pub mod config;
pub mod error;
pub mod promotion;

pub use batch::{BatchReport, BatchUpsertExecutor, UpsertShape};
pub use category::CategoryFieldBatchUpdater;
pub use config::EngineConfig;
pub use error::EngineError;
pub use promotion::PromotionEngine;
pub use quotedraft_storage::PromotionRecord as PromotionReceipt;

use std::time::Instant;

use quotedraft_core::{
    change::{CommittedLineItem, PartialChange, StagedChange, StagingKey},
    fields::{FieldUpdate, MainOptionFlag, StagedField},
    ids::*,
};
use quotedraft_storage::{
    ProjectStore, PromotionRecord, SqliteStorage, StagingStore, Storage, StoreTx,
};

/// One line-item edit as submitted by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftChange {
    pub product_id: ProductId,
    pub change: PartialChange,
}

impl DraftChange {
    pub fn new(product_id: impl Into<ProductId>, change: PartialChange) -> Self {
        Self {
            product_id: product_id.into(),
            change,
        }
    }
}

/// Options of a project-wide save. Category-level margin and discount are
/// applied to prices upstream; here they are only validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectSettings {
    pub category: Option<Category>,
    pub category_margin: Option<f64>,
    pub category_discount: Option<f64>,
}

fn check_knob(name: &str, value: Option<f64>) -> Result<(), EngineError> {
    match value {
        Some(v) if !v.is_finite() => Err(EngineError::Validation(format!(
            "{name} must be a finite number, got {v}"
        ))),
        _ => Ok(()),
    }
}

/// Runs `f` inside one IMMEDIATE transaction. Commits on success, rolls back
/// and reports on failure.
fn in_transaction<T>(
    storage: &mut SqliteStorage,
    op: &'static str,
    f: impl FnOnce(&StoreTx<'_>) -> Result<T, EngineError>,
) -> Result<T, EngineError> {
    let tx = storage.begin()?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            tracing::warn!(op, error = %e, "rolling back");
            if let Err(rollback) = tx.rollback() {
                tracing::warn!(op, error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}

fn require_project(tx: &StoreTx<'_>, project_id: ProjectId) -> Result<(), EngineError> {
    if tx.project_exists(project_id)? {
        Ok(())
    } else {
        Err(EngineError::ProjectNotFound(project_id))
    }
}

pub struct Engine {
    storage: SqliteStorage,
    config: EngineConfig,
}

impl Engine {
    pub fn new(storage: SqliteStorage) -> Self {
        Self {
            storage,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(storage: SqliteStorage, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { storage, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    // ========================================================================
    // Projects
    // ========================================================================

    pub fn create_project(&mut self, name: &str) -> Result<ProjectId, EngineError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation("project name must not be empty".into()));
        }
        let project_id = in_transaction(&mut self.storage, "create_project", |tx| {
            Ok(tx.create_project(name)?)
        })?;
        tracing::info!(%project_id, name, "project created");
        Ok(project_id)
    }

    /// Delete a project with all of its staged, committed and promotion rows.
    pub fn delete_project(&mut self, project_id: ProjectId) -> Result<(), EngineError> {
        in_transaction(&mut self.storage, "delete_project", |tx| {
            if tx.delete_project(project_id)? {
                Ok(())
            } else {
                Err(EngineError::ProjectNotFound(project_id))
            }
        })?;
        tracing::info!(%project_id, "project deleted");
        Ok(())
    }

    // ========================================================================
    // Staging
    // ========================================================================

    /// Stage edits for one category of a project.
    ///
    /// With neither category knob set every change is merged field by field
    /// (full-record shape). When a category margin or discount is set, prices
    /// are re-derived at category level, so only quantities are staged and
    /// every change must carry one.
    pub fn save_draft_changes(
        &mut self,
        project_id: ProjectId,
        category: &Category,
        changes: Vec<DraftChange>,
        category_margin: Option<f64>,
        category_discount: Option<f64>,
    ) -> Result<BatchReport, EngineError> {
        check_knob("category margin", category_margin)?;
        check_knob("category discount", category_discount)?;
        let quantity_only = category_margin.is_some() || category_discount.is_some();
        let started = Instant::now();

        let report = if quantity_only {
            let mut updates = Vec::with_capacity(changes.len());
            for draft in &changes {
                let quantity = draft.change.quantity.ok_or_else(|| {
                    EngineError::Validation(format!(
                        "product {} has no quantity in a quantity-only save",
                        draft.product_id
                    ))
                })?;
                updates.push((draft.product_id, FieldUpdate::Quantity(quantity)));
            }
            let updater = CategoryFieldBatchUpdater::new(self.config.chunk_size);
            let prepared = CategoryFieldBatchUpdater::prepare(StagedField::Quantity, updates)?;
            let mut report = in_transaction(&mut self.storage, "save_draft_changes", |tx| {
                require_project(tx, project_id)?;
                updater.apply(tx, project_id, category, StagedField::Quantity, prepared)
            })?;
            report.requested = changes.len();
            report.shape = UpsertShape::QuantityOnly;
            report
        } else {
            let mut rows = Vec::with_capacity(changes.len());
            for draft in changes {
                draft.change.validate()?;
                rows.push(StagedChange::new(
                    StagingKey::new(project_id, draft.product_id, category.clone()),
                    draft.change,
                ));
            }
            let executor = BatchUpsertExecutor::new(self.config.chunk_size);
            in_transaction(&mut self.storage, "save_draft_changes", |tx| {
                require_project(tx, project_id)?;
                executor.apply(tx, rows)
            })?
        };

        tracing::info!(
            %project_id,
            %category,
            shape = ?report.shape,
            requested = report.requested,
            rows = report.rows,
            chunks = report.chunks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "draft changes saved"
        );
        Ok(report)
    }

    /// Set the main/optional flag on many products of a category at once.
    pub fn update_group_option_batch(
        &mut self,
        project_id: ProjectId,
        category: &Category,
        product_ids: &[ProductId],
        option: MainOptionFlag,
    ) -> Result<BatchReport, EngineError> {
        let updates = product_ids
            .iter()
            .map(|&product_id| (product_id, FieldUpdate::MainOptionFlag(option)))
            .collect();
        self.update_category_field(project_id, category, StagedField::MainOptionFlag, updates)
    }

    /// Write `field` for many products of a category. Every update must
    /// target that field; a product listed twice keeps its last value.
    pub fn update_category_field(
        &mut self,
        project_id: ProjectId,
        category: &Category,
        field: StagedField,
        updates: Vec<(ProductId, FieldUpdate)>,
    ) -> Result<BatchReport, EngineError> {
        let started = Instant::now();
        let requested = updates.len();
        let prepared = CategoryFieldBatchUpdater::prepare(field, updates)?;
        let updater = CategoryFieldBatchUpdater::new(self.config.chunk_size);
        let mut report = in_transaction(&mut self.storage, "update_category_field", |tx| {
            require_project(tx, project_id)?;
            updater.apply(tx, project_id, category, field, prepared)
        })?;
        report.requested = requested;

        tracing::info!(
            %project_id,
            %category,
            shape = ?report.shape,
            requested = report.requested,
            rows = report.rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "category field updated"
        );
        Ok(report)
    }

    /// Drop staged rows without promoting them.
    pub fn discard_draft(
        &mut self,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<usize, EngineError> {
        let discarded = in_transaction(&mut self.storage, "discard_draft", |tx| {
            require_project(tx, project_id)?;
            Ok(tx.delete_staged(project_id, category)?)
        })?;
        tracing::info!(%project_id, category = ?category, discarded, "draft discarded");
        Ok(discarded)
    }

    // ========================================================================
    // Promotion
    // ========================================================================

    /// Promote the staged set of a project (or one of its categories) to
    /// committed state in a single transaction.
    pub fn promote(
        &mut self,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<PromotionReceipt, EngineError> {
        let started = Instant::now();
        let promotion = PromotionEngine::new(self.config.resolution, self.config.chunk_size);
        let receipt = in_transaction(&mut self.storage, "promote", |tx| {
            require_project(tx, project_id)?;
            promotion.promote(tx, project_id, category)
        })?;

        tracing::info!(
            %project_id,
            category = ?category,
            promotion_id = %receipt.promotion_id,
            staged = receipt.staged_rows,
            committed = receipt.committed_rows,
            cleared = receipt.cleared_rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "staging promoted"
        );
        Ok(receipt)
    }

    /// Save the project: promotes whatever is staged, optionally limited to
    /// `settings.category`.
    pub fn save_project_data(
        &mut self,
        project_id: ProjectId,
        settings: &ProjectSettings,
    ) -> Result<PromotionReceipt, EngineError> {
        check_knob("category margin", settings.category_margin)?;
        check_knob("category discount", settings.category_discount)?;
        self.promote(project_id, settings.category.as_ref())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn staged_changes(
        &self,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<Vec<StagedChange>, EngineError> {
        Ok(self.storage.get_staged(project_id, category)?)
    }

    pub fn pending_count(&self, project_id: ProjectId) -> Result<u64, EngineError> {
        Ok(self.storage.count_staged(project_id, None)?)
    }

    pub fn committed_items(&self, project_id: ProjectId) -> Result<Vec<CommittedLineItem>, EngineError> {
        Ok(self.storage.get_committed(project_id)?)
    }

    pub fn promotions(&self, project_id: ProjectId) -> Result<Vec<PromotionRecord>, EngineError> {
        Ok(self.storage.list_promotions(project_id)?)
    }
}
