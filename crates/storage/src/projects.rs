use rusqlite::{Connection, OptionalExtension};

use quotedraft_core::{clock::physical_now, ids::*};

use crate::error::StorageError;
use crate::traits::{ProjectRecord, PromotionRecord};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

pub(crate) fn create_project(conn: &Connection, name: &str) -> Result<ProjectId, StorageError> {
    conn.execute(
        "INSERT INTO projects (name, created_at) VALUES (?1, ?2)",
        rusqlite::params![name, physical_now()?],
    )
    .map_err(StorageError::from_write)?;
    Ok(ProjectId::new(conn.last_insert_rowid()))
}

pub(crate) fn get_project(
    conn: &Connection,
    project_id: ProjectId,
) -> Result<Option<ProjectRecord>, StorageError> {
    let record = conn
        .query_row(
            "SELECT project_id, name, created_at FROM projects WHERE project_id = ?1",
            rusqlite::params![project_id.get()],
            |row| {
                Ok(ProjectRecord {
                    project_id: ProjectId::new(row.get(0)?),
                    name: row.get(1)?,
                    created_at_ms: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

pub(crate) fn delete_project(conn: &Connection, project_id: ProjectId) -> Result<bool, StorageError> {
    let deleted = conn.execute(
        "DELETE FROM projects WHERE project_id = ?1",
        rusqlite::params![project_id.get()],
    )?;
    Ok(deleted > 0)
}

pub(crate) fn insert_promotion(conn: &Connection, record: &PromotionRecord) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO promotions (promotion_id, project_id, category, staged_rows, committed_rows, cleared_rows, checksum, promoted_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            record.promotion_id.as_bytes().as_slice(),
            record.project_id.get(),
            record.category.as_ref().map(|c| c.as_str()),
            record.staged_rows as i64,
            record.committed_rows as i64,
            record.cleared_rows as i64,
            &record.checksum[..],
            record.promoted_at_ms,
        ],
    )
    .map_err(StorageError::from_write)?;
    Ok(())
}

pub(crate) fn list_promotions(
    conn: &Connection,
    project_id: ProjectId,
) -> Result<Vec<PromotionRecord>, StorageError> {
    let mut stmt = conn.prepare_cached(
        "SELECT promotion_id, project_id, category, staged_rows, committed_rows, cleared_rows, checksum, promoted_at FROM promotions WHERE project_id = ?1 ORDER BY promoted_at, promotion_id",
    )?;
    let rows = stmt.query_map(rusqlite::params![project_id.get()], |row| {
        Ok((
            row.get::<_, Vec<u8>>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, Vec<u8>>(6)?,
            row.get::<_, i64>(7)?,
        ))
    })?;

    let mut result = Vec::new();
    for row in rows {
        let (id_bytes, project_id, category, staged, committed, cleared, checksum, promoted_at) = row?;
        result.push(PromotionRecord {
            promotion_id: PromotionId::from_bytes(to_array::<16>(id_bytes, "promotion_id")?),
            project_id: ProjectId::new(project_id),
            category: category.map(Category::new).transpose()?,
            staged_rows: staged as u64,
            committed_rows: committed as u64,
            cleared_rows: cleared as u64,
            checksum: to_array::<32>(checksum, "checksum")?,
            promoted_at_ms: promoted_at,
        });
    }
    Ok(result)
}
