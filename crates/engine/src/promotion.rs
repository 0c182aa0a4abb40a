use std::collections::{BTreeMap, HashMap};

use quotedraft_core::{
    change::CommittedLineItem,
    checksum::committed_checksum,
    clock::physical_now,
    ids::*,
    resolve::{NumericResolution, ResolutionPolicy},
};
use quotedraft_storage::{CommittedStore, PromotionLog, PromotionRecord, StagingStore};

use crate::error::EngineError;

/// Turns the staged set of a project into committed rows. Runs entirely on
/// the caller's transaction handle.
#[derive(Debug, Clone, Copy)]
pub struct PromotionEngine {
    policy: ResolutionPolicy,
    chunk_size: usize,
}

impl PromotionEngine {
    pub fn new(policy: ResolutionPolicy, chunk_size: usize) -> Self {
        Self {
            policy,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn promote<S>(
        &self,
        store: &S,
        project_id: ProjectId,
        category: Option<&Category>,
    ) -> Result<PromotionRecord, EngineError>
    where
        S: StagingStore + CommittedStore + PromotionLog,
    {
        let promotion_id = PromotionId::new();
        let staged = store.get_staged(project_id, category)?;

        if staged.is_empty() {
            // Nothing pending for the whole project means nothing committed.
            // A category-scoped promotion with nothing staged leaves committed rows alone.
            let cleared = match category {
                None => store.delete_committed(project_id)?,
                Some(_) => 0,
            };
            let record = PromotionRecord {
                promotion_id,
                project_id,
                category: category.cloned(),
                staged_rows: 0,
                committed_rows: 0,
                cleared_rows: cleared as u64,
                checksum: committed_checksum(&[])?,
                promoted_at_ms: physical_now()?,
            };
            store.insert_promotion(&record)?;
            return Ok(record);
        }

        let previous: HashMap<ProductId, CommittedLineItem> = match self.policy.numeric {
            NumericResolution::KeepCommitted => store
                .get_committed(project_id)?
                .into_iter()
                .map(|item| (item.product_id, item))
                .collect(),
            NumericResolution::Zero => HashMap::new(),
        };

        // Staged rows arrive ordered by (product_id, category); when a product
        // is staged under several categories the last one wins.
        let mut resolved: BTreeMap<ProductId, CommittedLineItem> = BTreeMap::new();
        for row in &staged {
            let item = self.policy.resolve(row, previous.get(&row.key.product_id));
            resolved.insert(item.product_id, item);
        }
        let items: Vec<CommittedLineItem> = resolved.into_values().collect();

        for chunk in items.chunks(self.chunk_size) {
            store.upsert_committed(chunk, promotion_id)?;
        }

        let deleted = store.delete_staged(project_id, category)?;
        tracing::debug!(%project_id, staged = staged.len(), deleted, "cleared promoted staging rows");

        let record = PromotionRecord {
            promotion_id,
            project_id,
            category: category.cloned(),
            staged_rows: staged.len() as u64,
            committed_rows: items.len() as u64,
            cleared_rows: 0,
            checksum: committed_checksum(&items)?,
            promoted_at_ms: physical_now()?,
        };
        store.insert_promotion(&record)?;
        Ok(record)
    }
}
