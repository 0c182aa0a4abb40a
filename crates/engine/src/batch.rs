use std::collections::HashMap;

use quotedraft_core::{
    change::{StagedChange, StagingKey},
    fields::StagedField,
};
use quotedraft_storage::StagingStore;

use crate::error::EngineError;

/// Statement shape a batch call used against the staging store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertShape {
    FullRecord,
    QuantityOnly,
    SingleField(StagedField),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub shape: UpsertShape,
    /// Entries supplied by the caller.
    pub requested: usize,
    /// Distinct keys written after coalescing.
    pub rows: usize,
    pub chunks: usize,
}

/// Applies arbitrarily long change lists to the staging store in bounded
/// chunks. The caller owns the transaction; every chunk goes through the same
/// handle so a failure anywhere aborts the whole call.
#[derive(Debug, Clone, Copy)]
pub struct BatchUpsertExecutor {
    chunk_size: usize,
}

impl BatchUpsertExecutor {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Folds repeated keys into one row, in first-seen order. Later entries
    /// are merged on top of earlier ones, which matches applying them one by
    /// one.
    pub fn coalesce(rows: Vec<StagedChange>) -> Vec<StagedChange> {
        let mut index: HashMap<StagingKey, usize> = HashMap::with_capacity(rows.len());
        let mut out: Vec<StagedChange> = Vec::with_capacity(rows.len());
        for row in rows {
            match index.get(&row.key) {
                Some(&pos) => out[pos].change.merge(&row.change),
                None => {
                    index.insert(row.key.clone(), out.len());
                    out.push(row);
                }
            }
        }
        out
    }

    /// Partial upsert of every row.
    pub fn apply<S: StagingStore>(
        &self,
        store: &S,
        rows: Vec<StagedChange>,
    ) -> Result<BatchReport, EngineError> {
        let requested = rows.len();
        let rows = Self::coalesce(rows);

        let mut chunks = 0;
        for chunk in rows.chunks(self.chunk_size) {
            store.upsert_partial(chunk)?;
            chunks += 1;
            tracing::debug!(chunk = chunks, rows = chunk.len(), "applied partial upsert chunk");
        }

        Ok(BatchReport {
            shape: UpsertShape::FullRecord,
            requested,
            rows: rows.len(),
            chunks,
        })
    }
}
