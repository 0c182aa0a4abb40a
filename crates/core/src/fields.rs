use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Whether a line item is part of the main offer or an optional add-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MainOptionFlag {
    #[default]
    None,
    Main,
    Optional,
}

impl MainOptionFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Main => "main",
            Self::Optional => "optional",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "none" => Ok(Self::None),
            "main" => Ok(Self::Main),
            "optional" => Ok(Self::Optional),
            _ => Err(CoreError::InvalidData(format!("unknown main option flag: {s}"))),
        }
    }
}

/// Which edit path produced the price fields of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PriceChangeSource {
    #[default]
    Manual,
    Margin,
    Discount,
}

impl PriceChangeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Margin => "margin",
            Self::Discount => "discount",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "manual" => Ok(Self::Manual),
            "margin" => Ok(Self::Margin),
            "discount" => Ok(Self::Discount),
            _ => Err(CoreError::InvalidData(format!("unknown price change source: {s}"))),
        }
    }
}

/// Names one of the optional fields of a staged change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StagedField {
    RetailPrice,
    PurchasePrice,
    SellingPrice,
    Quantity,
    MarginPercent,
    DiscountPercent,
    MainOptionFlag,
    PriceChangeSource,
}

impl StagedField {
    pub const ALL: [StagedField; 8] = [
        Self::RetailPrice,
        Self::PurchasePrice,
        Self::SellingPrice,
        Self::Quantity,
        Self::MarginPercent,
        Self::DiscountPercent,
        Self::MainOptionFlag,
        Self::PriceChangeSource,
    ];

    /// Column name in both the staging and committed tables.
    pub fn column(&self) -> &'static str {
        match self {
            Self::RetailPrice => "retail_price",
            Self::PurchasePrice => "purchase_price",
            Self::SellingPrice => "selling_price",
            Self::Quantity => "quantity",
            Self::MarginPercent => "margin_percent",
            Self::DiscountPercent => "discount_percent",
            Self::MainOptionFlag => "main_option_flag",
            Self::PriceChangeSource => "price_change_source",
        }
    }
}

/// Exactly one present field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FieldUpdate {
    RetailPrice(f64),
    PurchasePrice(f64),
    SellingPrice(f64),
    Quantity(f64),
    MarginPercent(f64),
    DiscountPercent(f64),
    MainOptionFlag(MainOptionFlag),
    PriceChangeSource(PriceChangeSource),
}

impl FieldUpdate {
    pub fn field(&self) -> StagedField {
        match self {
            Self::RetailPrice(_) => StagedField::RetailPrice,
            Self::PurchasePrice(_) => StagedField::PurchasePrice,
            Self::SellingPrice(_) => StagedField::SellingPrice,
            Self::Quantity(_) => StagedField::Quantity,
            Self::MarginPercent(_) => StagedField::MarginPercent,
            Self::DiscountPercent(_) => StagedField::DiscountPercent,
            Self::MainOptionFlag(_) => StagedField::MainOptionFlag,
            Self::PriceChangeSource(_) => StagedField::PriceChangeSource,
        }
    }

    /// The numeric payload, if this update targets a numeric field.
    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Self::RetailPrice(v)
            | Self::PurchasePrice(v)
            | Self::SellingPrice(v)
            | Self::Quantity(v)
            | Self::MarginPercent(v)
            | Self::DiscountPercent(v) => Some(v),
            Self::MainOptionFlag(_) | Self::PriceChangeSource(_) => None,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(v) = self.as_number() {
            if !v.is_finite() {
                return Err(CoreError::Validation(format!(
                    "{} must be a finite number, got {v}",
                    self.field().column()
                )));
            }
            if matches!(self, Self::Quantity(_)) && v < 0.0 {
                return Err(CoreError::Validation(format!("quantity must not be negative, got {v}")));
            }
        }
        Ok(())
    }
}
