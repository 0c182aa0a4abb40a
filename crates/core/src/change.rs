use serde::{Deserialize, Serialize};

use crate::fields::{FieldUpdate, MainOptionFlag, PriceChangeSource, StagedField};
use crate::ids::{Category, ProductId, ProjectId};
use crate::CoreError;

/// Unique key of a staged row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StagingKey {
    pub project_id: ProjectId,
    pub product_id: ProductId,
    pub category: Category,
}

impl StagingKey {
    pub fn new(project_id: ProjectId, product_id: ProductId, category: Category) -> Self {
        Self {
            project_id,
            product_id,
            category,
        }
    }
}

/// A set of pending field edits. `None` means "no pending change", which is
/// distinct from `Some(0.0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialChange {
    pub retail_price: Option<f64>,
    pub purchase_price: Option<f64>,
    pub selling_price: Option<f64>,
    pub quantity: Option<f64>,
    pub margin_percent: Option<f64>,
    pub discount_percent: Option<f64>,
    pub main_option_flag: Option<MainOptionFlag>,
    pub price_change_source: Option<PriceChangeSource>,
}

impl PartialChange {
    /// A change holding exactly one field.
    pub fn only(update: FieldUpdate) -> Self {
        let mut change = Self::default();
        change.apply(update);
        change
    }

    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::RetailPrice(v) => self.retail_price = Some(v),
            FieldUpdate::PurchasePrice(v) => self.purchase_price = Some(v),
            FieldUpdate::SellingPrice(v) => self.selling_price = Some(v),
            FieldUpdate::Quantity(v) => self.quantity = Some(v),
            FieldUpdate::MarginPercent(v) => self.margin_percent = Some(v),
            FieldUpdate::DiscountPercent(v) => self.discount_percent = Some(v),
            FieldUpdate::MainOptionFlag(v) => self.main_option_flag = Some(v),
            FieldUpdate::PriceChangeSource(v) => self.price_change_source = Some(v),
        }
    }

    /// Applies `other` on top of `self`: present fields overwrite, absent
    /// fields leave the current value alone.
    pub fn merge(&mut self, other: &PartialChange) {
        for update in other.updates() {
            self.apply(update);
        }
    }

    /// The present fields as individual updates, in column order.
    pub fn updates(&self) -> Vec<FieldUpdate> {
        let mut out = Vec::new();
        if let Some(v) = self.retail_price {
            out.push(FieldUpdate::RetailPrice(v));
        }
        if let Some(v) = self.purchase_price {
            out.push(FieldUpdate::PurchasePrice(v));
        }
        if let Some(v) = self.selling_price {
            out.push(FieldUpdate::SellingPrice(v));
        }
        if let Some(v) = self.quantity {
            out.push(FieldUpdate::Quantity(v));
        }
        if let Some(v) = self.margin_percent {
            out.push(FieldUpdate::MarginPercent(v));
        }
        if let Some(v) = self.discount_percent {
            out.push(FieldUpdate::DiscountPercent(v));
        }
        if let Some(v) = self.main_option_flag {
            out.push(FieldUpdate::MainOptionFlag(v));
        }
        if let Some(v) = self.price_change_source {
            out.push(FieldUpdate::PriceChangeSource(v));
        }
        out
    }

    pub fn present_fields(&self) -> Vec<StagedField> {
        self.updates().iter().map(FieldUpdate::field).collect()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        self.updates().iter().try_for_each(FieldUpdate::validate)
    }
}

/// One row of the staging store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedChange {
    pub key: StagingKey,
    pub change: PartialChange,
}

impl StagedChange {
    pub fn new(key: StagingKey, change: PartialChange) -> Self {
        Self { key, change }
    }
}

/// One row of the committed store, every field resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedLineItem {
    pub project_id: ProjectId,
    pub product_id: ProductId,
    pub category: Category,
    pub retail_price: f64,
    pub purchase_price: f64,
    pub selling_price: f64,
    pub quantity: f64,
    pub margin_percent: f64,
    pub discount_percent: f64,
    pub price_change_source: PriceChangeSource,
    pub main_option_flag: MainOptionFlag,
}
