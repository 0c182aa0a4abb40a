use serde::{Deserialize, Serialize};

use crate::change::{CommittedLineItem, PartialChange, StagedChange};
use crate::fields::{MainOptionFlag, PriceChangeSource};

/// How a numeric field that was never staged is resolved at promotion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericResolution {
    /// Unstaged numeric fields become `0`.
    #[default]
    Zero,
    /// Unstaged numeric fields keep the value currently committed for the
    /// same product, or `0` when nothing is committed yet.
    KeepCommitted,
}

/// Defaults applied to absent staged fields when building committed rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionPolicy {
    pub numeric: NumericResolution,
    pub option_flag: MainOptionFlag,
    pub price_change_source: PriceChangeSource,
}

impl ResolutionPolicy {
    /// Build the committed row for `staged`. `previous` is the row currently
    /// committed for the same (project, product), if any.
    pub fn resolve(
        &self,
        staged: &StagedChange,
        previous: Option<&CommittedLineItem>,
    ) -> CommittedLineItem {
        let change: &PartialChange = &staged.change;
        let keep = |pick: fn(&CommittedLineItem) -> f64| match (self.numeric, previous) {
            (NumericResolution::KeepCommitted, Some(prev)) => pick(prev),
            _ => 0.0,
        };

        CommittedLineItem {
            project_id: staged.key.project_id,
            product_id: staged.key.product_id,
            category: staged.key.category.clone(),
            retail_price: change.retail_price.unwrap_or_else(|| keep(|p| p.retail_price)),
            purchase_price: change.purchase_price.unwrap_or_else(|| keep(|p| p.purchase_price)),
            selling_price: change.selling_price.unwrap_or_else(|| keep(|p| p.selling_price)),
            quantity: change.quantity.unwrap_or_else(|| keep(|p| p.quantity)),
            margin_percent: change.margin_percent.unwrap_or_else(|| keep(|p| p.margin_percent)),
            discount_percent: change
                .discount_percent
                .unwrap_or_else(|| keep(|p| p.discount_percent)),
            price_change_source: change.price_change_source.unwrap_or(self.price_change_source),
            main_option_flag: change.main_option_flag.unwrap_or(self.option_flag),
        }
    }
}
