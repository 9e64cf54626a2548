//! SQLite schema for the document store
//!
//! `versions` is the append-only history: one row per write, never updated.
//! `attr_values` projects the current version of each document into one row
//! per attribute element for pattern matching, and `attr_fts` indexes its
//! string values for full-text search.

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Bitemporal document versions (append-only)
        CREATE TABLE IF NOT EXISTS versions (
            tx_id INTEGER PRIMARY KEY AUTOINCREMENT,
            doc_key TEXT NOT NULL,
            valid_time INTEGER NOT NULL,
            tx_time INTEGER NOT NULL,
            body TEXT NOT NULL
        );

        -- Current attribute values, one row per collection element
        CREATE TABLE IF NOT EXISTS attr_values (
            doc_key TEXT NOT NULL,
            attr TEXT NOT NULL,
            position INTEGER NOT NULL,
            value TEXT NOT NULL,
            text TEXT,
            PRIMARY KEY (doc_key, attr, position)
        );

        -- Saved queries
        CREATE TABLE IF NOT EXISTS saved_queries (
            name TEXT PRIMARY KEY,
            query TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Current-version lookup
        CREATE INDEX IF NOT EXISTS idx_versions_doc
            ON versions(doc_key, valid_time, tx_id);

        -- Pattern matching by attribute and value
        CREATE INDEX IF NOT EXISTS idx_attr_values_attr_value
            ON attr_values(attr, value);

        -- Full-text search over string attribute values
        CREATE VIRTUAL TABLE IF NOT EXISTS attr_fts USING fts5(
            doc_key UNINDEXED,
            attr UNINDEXED,
            text
        );

        -- Keep FTS in sync with attr_values
        CREATE TRIGGER IF NOT EXISTS attr_values_ai AFTER INSERT ON attr_values
        WHEN NEW.text IS NOT NULL BEGIN
            INSERT INTO attr_fts(rowid, doc_key, attr, text)
            VALUES (NEW.rowid, NEW.doc_key, NEW.attr, NEW.text);
        END;

        CREATE TRIGGER IF NOT EXISTS attr_values_ad AFTER DELETE ON attr_values
        WHEN OLD.text IS NOT NULL BEGIN
            DELETE FROM attr_fts WHERE rowid = OLD.rowid;
        END;
        "#,
    )?;

    // Set schema version
    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
