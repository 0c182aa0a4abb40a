use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

/// SQLite's default `SQLITE_MAX_VARIABLE_NUMBER` for the bundled library.
pub const MAX_BOUND_PARAMS: usize = 32766;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -32000;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    tracing::debug!(version = SCHEMA_VERSION, "schema initialised");
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS projects (
    project_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS staged_changes (
    project_id INTEGER NOT NULL REFERENCES projects (project_id) ON DELETE CASCADE,
    product_id INTEGER NOT NULL,
    category TEXT NOT NULL CHECK (length(category) > 0),
    retail_price REAL,
    purchase_price REAL,
    selling_price REAL,
    quantity REAL,
    margin_percent REAL,
    discount_percent REAL,
    main_option_flag TEXT CHECK (main_option_flag IS NULL OR main_option_flag IN ('none', 'main', 'optional')),
    price_change_source TEXT CHECK (price_change_source IS NULL OR price_change_source IN ('manual', 'margin', 'discount')),
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (project_id, product_id, category)
) WITHOUT ROWID;
CREATE INDEX IF NOT EXISTS idx_staged_category ON staged_changes (project_id, category);

CREATE TABLE IF NOT EXISTS committed_line_items (
    project_id INTEGER NOT NULL REFERENCES projects (project_id) ON DELETE CASCADE,
    product_id INTEGER NOT NULL,
    category TEXT NOT NULL CHECK (length(category) > 0),
    retail_price REAL NOT NULL,
    purchase_price REAL NOT NULL,
    selling_price REAL NOT NULL,
    quantity REAL NOT NULL,
    margin_percent REAL NOT NULL,
    discount_percent REAL NOT NULL,
    main_option_flag TEXT NOT NULL CHECK (main_option_flag IN ('none', 'main', 'optional')),
    price_change_source TEXT NOT NULL CHECK (price_change_source IN ('manual', 'margin', 'discount')),
    promoted_in BLOB NOT NULL CHECK (length(promoted_in) = 16),
    PRIMARY KEY (project_id, product_id)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS promotions (
    promotion_id BLOB PRIMARY KEY CHECK (length(promotion_id) = 16),
    project_id INTEGER NOT NULL REFERENCES projects (project_id) ON DELETE CASCADE,
    category TEXT,
    staged_rows INTEGER NOT NULL,
    committed_rows INTEGER NOT NULL,
    cleared_rows INTEGER NOT NULL,
    checksum BLOB NOT NULL CHECK (length(checksum) = 32),
    promoted_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_promotions_project ON promotions (project_id, promoted_at);
";
