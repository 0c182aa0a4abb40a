use rusqlite::{Connection, params_from_iter, types::Value};

use quotedraft_core::{
    change::CommittedLineItem,
    fields::{MainOptionFlag, PriceChangeSource},
    ids::*,
};

use crate::error::StorageError;
use crate::staging::check_chunk;

/// Bound parameters per committed row.
pub const COMMITTED_ROW_PARAMS: usize = 12;

const COMMITTED_COLUMNS: &str = "project_id, product_id, category, retail_price, purchase_price, selling_price, quantity, margin_percent, discount_percent, main_option_flag, price_change_source";

pub(crate) fn upsert_committed(
    conn: &Connection,
    items: &[CommittedLineItem],
    promotion_id: PromotionId,
) -> Result<usize, StorageError> {
    if items.is_empty() {
        return Ok(0);
    }
    check_chunk(items.len(), COMMITTED_ROW_PARAMS)?;

    let row = format!("({})", vec!["?"; COMMITTED_ROW_PARAMS].join(", "));
    let sql = format!(
        "INSERT INTO committed_line_items ({COMMITTED_COLUMNS}, promoted_in) VALUES {}
         ON CONFLICT(project_id, product_id) DO UPDATE SET
            category = excluded.category,
            retail_price = excluded.retail_price,
            purchase_price = excluded.purchase_price,
            selling_price = excluded.selling_price,
            quantity = excluded.quantity,
            margin_percent = excluded.margin_percent,
            discount_percent = excluded.discount_percent,
            main_option_flag = excluded.main_option_flag,
            price_change_source = excluded.price_change_source,
            promoted_in = excluded.promoted_in",
        vec![row; items.len()].join(", ")
    );

    let mut values = Vec::with_capacity(items.len() * COMMITTED_ROW_PARAMS);
    for item in items {
        values.extend([
            Value::Integer(item.project_id.get()),
            Value::Integer(item.product_id.get()),
            Value::Text(item.category.as_str().to_string()),
            Value::Real(item.retail_price),
            Value::Real(item.purchase_price),
            Value::Real(item.selling_price),
            Value::Real(item.quantity),
            Value::Real(item.margin_percent),
            Value::Real(item.discount_percent),
            Value::Text(item.main_option_flag.as_str().to_string()),
            Value::Text(item.price_change_source.as_str().to_string()),
            Value::Blob(promotion_id.as_bytes().to_vec()),
        ]);
    }

    let mut stmt = conn.prepare_cached(&sql)?;
    let written = stmt
        .execute(params_from_iter(values))
        .map_err(StorageError::from_write)?;
    Ok(written)
}

pub(crate) fn get_committed(
    conn: &Connection,
    project_id: ProjectId,
) -> Result<Vec<CommittedLineItem>, StorageError> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {COMMITTED_COLUMNS} FROM committed_line_items WHERE project_id = ?1 ORDER BY product_id"
    ))?;
    let rows = stmt.query_map(rusqlite::params![project_id.get()], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            [
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, f64>(7)?,
                row.get::<_, f64>(8)?,
            ],
            row.get::<_, String>(9)?,
            row.get::<_, String>(10)?,
        ))
    })?;

    let mut result = Vec::new();
    for row in rows {
        let (project_id, product_id, category, numbers, flag, source) = row?;
        let [retail_price, purchase_price, selling_price, quantity, margin_percent, discount_percent] = numbers;
        result.push(CommittedLineItem {
            project_id: ProjectId::new(project_id),
            product_id: ProductId::new(product_id),
            category: Category::new(category)?,
            retail_price,
            purchase_price,
            selling_price,
            quantity,
            margin_percent,
            discount_percent,
            main_option_flag: MainOptionFlag::parse(&flag)?,
            price_change_source: PriceChangeSource::parse(&source)?,
        });
    }
    Ok(result)
}

pub(crate) fn delete_committed(conn: &Connection, project_id: ProjectId) -> Result<usize, StorageError> {
    let deleted = conn.execute(
        "DELETE FROM committed_line_items WHERE project_id = ?1",
        rusqlite::params![project_id.get()],
    )?;
    Ok(deleted)
}
