use quotedraft_core::{
    change::PartialChange,
    fields::{MainOptionFlag, PriceChangeSource},
    ids::Category,
};
use quotedraft_engine::DraftChange;

pub fn tile() -> Category {
    Category::new("TILE").expect("static category")
}

pub fn gutter() -> Category {
    Category::new("GUTTER").expect("static category")
}

/// A fully populated change whose values are derived from `seed`.
pub fn full_change(seed: i64) -> PartialChange {
    let retail = 10.0 + (seed % 97) as f64;
    PartialChange {
        retail_price: Some(retail),
        purchase_price: Some(retail * 0.6),
        selling_price: Some(retail * 0.9),
        quantity: Some((seed % 13 + 1) as f64),
        margin_percent: Some(33.0),
        discount_percent: Some(10.0),
        main_option_flag: Some(if seed % 2 == 0 {
            MainOptionFlag::Main
        } else {
            MainOptionFlag::Optional
        }),
        price_change_source: Some(PriceChangeSource::Discount),
    }
}

pub fn quantity(value: f64) -> PartialChange {
    PartialChange {
        quantity: Some(value),
        ..Default::default()
    }
}

/// `count` full-record edits for consecutive product ids starting at `first`.
pub fn bulk_changes(first: i64, count: usize) -> Vec<DraftChange> {
    (first..first + count as i64)
        .map(|product| DraftChange::new(product, full_change(product)))
        .collect()
}

/// A scratch directory and a database path inside it. Keep the directory
/// alive for as long as the database is used.
pub fn temp_db() -> std::io::Result<(tempfile::TempDir, std::path::PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("quotedraft.db");
    Ok((dir, path))
}
