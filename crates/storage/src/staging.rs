use rusqlite::{Connection, params_from_iter, types::Value};

use quotedraft_core::{
    change::{PartialChange, StagedChange, StagingKey},
    clock::physical_now,
    fields::{FieldUpdate, MainOptionFlag, PriceChangeSource},
    ids::*,
};

use crate::error::StorageError;
use crate::schema::MAX_BOUND_PARAMS;

/// Bound parameters per row of a partial upsert.
pub const PARTIAL_ROW_PARAMS: usize = 12;

/// Bound parameters per row of a single-field upsert.
pub const FIELD_ROW_PARAMS: usize = 5;

const STAGED_COLUMNS: &str = "project_id, product_id, category, retail_price, purchase_price, selling_price, quantity, margin_percent, discount_percent, main_option_flag, price_change_source";

pub(crate) fn check_chunk(rows: usize, per_row: usize) -> Result<(), StorageError> {
    let params = rows * per_row;
    if params > MAX_BOUND_PARAMS {
        return Err(StorageError::ChunkTooLarge {
            rows,
            params,
            max: MAX_BOUND_PARAMS,
        });
    }
    Ok(())
}

fn placeholders(rows: usize, per_row: usize) -> String {
    let row = format!("({})", vec!["?"; per_row].join(", "));
    vec![row; rows].join(", ")
}

fn real(v: Option<f64>) -> Value {
    v.map_or(Value::Null, Value::Real)
}

fn text(v: Option<&'static str>) -> Value {
    v.map_or(Value::Null, |s| Value::Text(s.to_string()))
}

fn update_value(update: &FieldUpdate) -> Value {
    match update {
        FieldUpdate::MainOptionFlag(flag) => Value::Text(flag.as_str().to_string()),
        FieldUpdate::PriceChangeSource(source) => Value::Text(source.as_str().to_string()),
        numeric => real(numeric.as_number()),
    }
}

pub(crate) fn upsert_partial(conn: &Connection, rows: &[StagedChange]) -> Result<usize, StorageError> {
    if rows.is_empty() {
        return Ok(0);
    }
    check_chunk(rows.len(), PARTIAL_ROW_PARAMS)?;

    let sql = format!(
        "INSERT INTO staged_changes ({STAGED_COLUMNS}, updated_at) VALUES {}
         ON CONFLICT(project_id, product_id, category) DO UPDATE SET
            retail_price = COALESCE(excluded.retail_price, staged_changes.retail_price),
            purchase_price = COALESCE(excluded.purchase_price, staged_changes.purchase_price),
            selling_price = COALESCE(excluded.selling_price, staged_changes.selling_price),
            quantity = COALESCE(excluded.quantity, staged_changes.quantity),
            margin_percent = COALESCE(excluded.margin_percent, staged_changes.margin_percent),
            discount_percent = COALESCE(excluded.discount_percent, staged_changes.discount_percent),
            main_option_flag = COALESCE(excluded.main_option_flag, staged_changes.main_option_flag),
            price_change_source = COALESCE(excluded.price_change_source, staged_changes.price_change_source),
            updated_at = excluded.updated_at",
        placeholders(rows.len(), PARTIAL_ROW_PARAMS)
    );

    let now = physical_now()?;
    let mut values = Vec::with_capacity(rows.len() * PARTIAL_ROW_PARAMS);
    for row in rows {
        let c = &row.change;
        values.extend([
            Value::Integer(row.key.project_id.get()),
            Value::Integer(row.key.product_id.get()),
            Value::Text(row.key.category.as_str().to_string()),
            real(c.retail_price),
            real(c.purchase_price),
            real(c.selling_price),
            real(c.quantity),
            real(c.margin_percent),
            real(c.discount_percent),
            text(c.main_option_flag.map(|f| f.as_str())),
            text(c.price_change_source.map(|s| s.as_str())),
            Value::Integer(now),
        ]);
    }

    let mut stmt = conn.prepare_cached(&sql)?;
    let written = stmt
        .execute(params_from_iter(values))
        .map_err(StorageError::from_write)?;
    tracing::trace!(rows = rows.len(), written, "staged partial upsert");
    Ok(written)
}

pub(crate) fn upsert_field(
    conn: &Connection,
    project_id: ProjectId,
    category: &Category,
    updates: &[(ProductId, FieldUpdate)],
) -> Result<usize, StorageError> {
    let Some((_, first)) = updates.first() else {
        return Ok(0);
    };
    let field = first.field();
    if let Some((product_id, stray)) = updates.iter().find(|(_, u)| u.field() != field) {
        return Err(StorageError::ConstraintViolation(format!(
            "mixed fields in single-field upsert: {} for product {product_id} in a {} batch",
            stray.field().column(),
            field.column()
        )));
    }
    check_chunk(updates.len(), FIELD_ROW_PARAMS)?;

    // Column names come from a closed enum, never from caller text.
    let column = field.column();
    let sql = format!(
        "INSERT INTO staged_changes (project_id, product_id, category, {column}, updated_at) VALUES {}
         ON CONFLICT(project_id, product_id, category) DO UPDATE SET
            {column} = excluded.{column},
            updated_at = excluded.updated_at",
        placeholders(updates.len(), FIELD_ROW_PARAMS)
    );

    let now = physical_now()?;
    let mut values = Vec::with_capacity(updates.len() * FIELD_ROW_PARAMS);
    for (product_id, update) in updates {
        values.extend([
            Value::Integer(project_id.get()),
            Value::Integer(product_id.get()),
            Value::Text(category.as_str().to_string()),
            update_value(update),
            Value::Integer(now),
        ]);
    }

    let mut stmt = conn.prepare_cached(&sql)?;
    let written = stmt
        .execute(params_from_iter(values))
        .map_err(StorageError::from_write)?;
    tracing::trace!(rows = updates.len(), column, written, "staged single-field upsert");
    Ok(written)
}

type RawStagedRow = (
    i64,
    i64,
    String,
    [Option<f64>; 6],
    Option<String>,
    Option<String>,
);

fn read_staged_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawStagedRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        [row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?, row.get(8)?],
        row.get(9)?,
        row.get(10)?,
    ))
}

fn decode_staged(raw: RawStagedRow) -> Result<StagedChange, StorageError> {
    let (project_id, product_id, category, numbers, flag, source) = raw;
    let [retail_price, purchase_price, selling_price, quantity, margin_percent, discount_percent] = numbers;
    let key = StagingKey::new(
        ProjectId::new(project_id),
        ProductId::new(product_id),
        Category::new(category)?,
    );
    let change = PartialChange {
        retail_price,
        purchase_price,
        selling_price,
        quantity,
        margin_percent,
        discount_percent,
        main_option_flag: flag.as_deref().map(MainOptionFlag::parse).transpose()?,
        price_change_source: source.as_deref().map(PriceChangeSource::parse).transpose()?,
    };
    Ok(StagedChange::new(key, change))
}

pub(crate) fn get_staged(
    conn: &Connection,
    project_id: ProjectId,
    category: Option<&Category>,
) -> Result<Vec<StagedChange>, StorageError> {
    let raw: Vec<RawStagedRow> = match category {
        Some(category) => {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {STAGED_COLUMNS} FROM staged_changes WHERE project_id = ?1 AND category = ?2 ORDER BY product_id, category"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![project_id.get(), category.as_str()], read_staged_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {STAGED_COLUMNS} FROM staged_changes WHERE project_id = ?1 ORDER BY product_id, category"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![project_id.get()], read_staged_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };

    raw.into_iter().map(decode_staged).collect()
}

pub(crate) fn count_staged(
    conn: &Connection,
    project_id: ProjectId,
    category: Option<&Category>,
) -> Result<u64, StorageError> {
    let count: i64 = match category {
        Some(category) => conn.query_row(
            "SELECT COUNT(*) FROM staged_changes WHERE project_id = ?1 AND category = ?2",
            rusqlite::params![project_id.get(), category.as_str()],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COUNT(*) FROM staged_changes WHERE project_id = ?1",
            rusqlite::params![project_id.get()],
            |row| row.get(0),
        )?,
    };
    Ok(count as u64)
}

pub(crate) fn delete_staged(
    conn: &Connection,
    project_id: ProjectId,
    category: Option<&Category>,
) -> Result<usize, StorageError> {
    let deleted = match category {
        Some(category) => conn.execute(
            "DELETE FROM staged_changes WHERE project_id = ?1 AND category = ?2",
            rusqlite::params![project_id.get(), category.as_str()],
        )?,
        None => conn.execute(
            "DELETE FROM staged_changes WHERE project_id = ?1",
            rusqlite::params![project_id.get()],
        )?,
    };
    Ok(deleted)
}
