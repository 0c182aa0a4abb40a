use std::collections::HashMap;

use quotedraft_core::{
    fields::{FieldUpdate, StagedField},
    ids::*,
};
use quotedraft_storage::StagingStore;

use crate::batch::{BatchReport, UpsertShape};
use crate::error::EngineError;

/// Writes one field across many products of a category without reading the
/// rows first. Missing rows are created holding only that field; existing
/// rows keep everything else they have staged.
#[derive(Debug, Clone, Copy)]
pub struct CategoryFieldBatchUpdater {
    chunk_size: usize,
}

impl CategoryFieldBatchUpdater {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Checks that every update targets `field` and keeps the last value per
    /// product, preserving first-seen order.
    pub fn prepare(
        field: StagedField,
        updates: Vec<(ProductId, FieldUpdate)>,
    ) -> Result<Vec<(ProductId, FieldUpdate)>, EngineError> {
        let mut index: HashMap<ProductId, usize> = HashMap::with_capacity(updates.len());
        let mut deduped: Vec<(ProductId, FieldUpdate)> = Vec::with_capacity(updates.len());
        for (product_id, update) in updates {
            if update.field() != field {
                return Err(EngineError::Validation(format!(
                    "batch targets {} but product {product_id} updates {}",
                    field.column(),
                    update.field().column()
                )));
            }
            update.validate()?;
            match index.get(&product_id) {
                Some(&pos) => deduped[pos].1 = update,
                None => {
                    index.insert(product_id, deduped.len());
                    deduped.push((product_id, update));
                }
            }
        }
        Ok(deduped)
    }

    pub fn apply<S: StagingStore>(
        &self,
        store: &S,
        project_id: ProjectId,
        category: &Category,
        field: StagedField,
        updates: Vec<(ProductId, FieldUpdate)>,
    ) -> Result<BatchReport, EngineError> {
        let requested = updates.len();
        let updates = Self::prepare(field, updates)?;

        let mut chunks = 0;
        for chunk in updates.chunks(self.chunk_size) {
            store.upsert_field(project_id, category, chunk)?;
            chunks += 1;
            tracing::debug!(
                chunk = chunks,
                rows = chunk.len(),
                column = field.column(),
                "applied single-field chunk"
            );
        }

        Ok(BatchReport {
            shape: UpsertShape::SingleField(field),
            requested,
            rows: updates.len(),
            chunks,
        })
    }
}
