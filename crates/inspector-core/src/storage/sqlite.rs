//! SQLite-backed document store, search index and saved-query store
//!
//! Every write runs in one `IMMEDIATE` transaction that appends a row to
//! `versions` and rebuilds that document's rows in `attr_values` (which the
//! FTS triggers mirror into `attr_fts`). Readers therefore never observe a
//! half-applied version.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use super::error::{StorageError, StorageResult};
use super::schema::{init_schema, needs_init};
use super::{
    Document, DocumentStore, IndexHit, SavedQueries, SearchIndex, Triple, TriplePattern,
    VersionInfo,
};
use crate::deadline::Deadline;
use crate::edn::{self, Keyword, Value};
use crate::id::DocumentId;
use crate::value::ID_ATTRIBUTE;

/// How long a writer waits for the database lock held by another process
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Words of context around a search match
const SNIPPET_TOKENS: i32 = 12;

type Attributes = BTreeMap<Keyword, Value>;

/// Document store on a single SQLite connection
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
        }

        let conn = Connection::open(path)?;
        debug!("Opened document store at {:?}", path);
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Number of documents with at least one version
    pub fn document_count(&self) -> StorageResult<i64> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COUNT(DISTINCT doc_key) FROM versions",
            [],
            |row| row.get(0),
        )
        .map_err(Into::into)
    }

    /// Apply `change` to the current attributes and append the result
    fn write_version<F>(&self, id: &DocumentId, change: F) -> StorageResult<()>
    where
        F: FnOnce(Option<Attributes>) -> Attributes,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now().timestamp_millis();

        let current = current_attributes(&tx, id.as_str(), now)?;
        let mut attributes = change(current);
        attributes.insert(Keyword::new(ID_ATTRIBUTE), id.to_value());

        tx.execute(
            "INSERT INTO versions (doc_key, valid_time, tx_time, body) VALUES (?1, ?2, ?3, ?4)",
            params![id.as_str(), now, now, encode_body(&attributes)],
        )?;
        project_document(&tx, id.as_str(), &attributes)?;
        tx.commit()?;

        debug!("Wrote version of {} with {} attributes", id, attributes.len());
        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    fn entity(&self, id: &DocumentId) -> StorageResult<Option<Document>> {
        let conn = self.lock()?;
        let now = Utc::now().timestamp_millis();
        Ok(
            current_attributes(&conn, id.as_str(), now)?.map(|attributes| Document {
                id: id.clone(),
                attributes,
            }),
        )
    }

    fn triples(&self, pattern: &TriplePattern) -> StorageResult<Vec<Triple>> {
        let mut sql = String::from("SELECT doc_key, value FROM attr_values WHERE attr = ?");
        let mut args = vec![pattern.attribute.name().to_string()];
        if let Some(entity) = &pattern.entity {
            sql.push_str(" AND doc_key = ?");
            args.push(entity.as_str().to_string());
        }
        if let Some(value) = &pattern.value {
            sql.push_str(" AND value = ?");
            args.push(value.to_string());
        }
        sql.push_str(" ORDER BY doc_key, position");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(key, value)| {
                Ok(Triple {
                    entity: parse_key(&key)?,
                    attribute: pattern.attribute.clone(),
                    value: edn::parse(&value).map_err(|e| corrupt(&key, e))?,
                })
            })
            .collect()
    }

    fn has_attribute(&self, attribute: &Keyword) -> StorageResult<bool> {
        let conn = self.lock()?;
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM attr_values WHERE attr = ?1)",
            params![attribute.name()],
            |row| row.get(0),
        )?;
        Ok(exists != 0)
    }

    fn put_attribute(
        &self,
        id: &DocumentId,
        attribute: &Keyword,
        value: Value,
    ) -> StorageResult<()> {
        self.write_version(id, |current| {
            let mut attributes = current.unwrap_or_default();
            attributes.insert(attribute.clone(), value);
            attributes
        })
    }

    fn put_document(&self, id: &DocumentId, attributes: Attributes) -> StorageResult<()> {
        self.write_version(id, |_| attributes)
    }

    fn history(&self, id: &DocumentId) -> StorageResult<Vec<VersionInfo>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT tx_id, valid_time, tx_time FROM versions
            WHERE doc_key = ?1
            ORDER BY valid_time DESC, tx_id DESC
            "#,
        )?;
        let rows = stmt
            .query_map(params![id.as_str()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(tx_id, valid_time, tx_time)| {
                Ok(VersionInfo {
                    tx_id,
                    valid_time: timestamp(id.as_str(), valid_time)?,
                    tx_time: timestamp(id.as_str(), tx_time)?,
                })
            })
            .collect()
    }
}

impl SearchIndex for SqliteStore {
    fn search_index(
        &self,
        index_query: &str,
        limit: usize,
        deadline: Deadline,
    ) -> StorageResult<Vec<IndexHit>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT doc_key, attr, snippet(attr_fts, 2, '', '', '…', ?2)
            FROM attr_fts
            WHERE attr_fts MATCH ?1
            ORDER BY rank, rowid
            "#,
        )?;
        let mut rows = stmt.query(params![index_query, SNIPPET_TOKENS])?;

        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        while hits.len() < limit {
            if deadline.expired() {
                return Err(StorageError::DeadlineExceeded);
            }
            let Some(row) = rows.next()? else {
                break;
            };
            let key: String = row.get(0)?;
            if !seen.insert(key.clone()) {
                continue;
            }
            hits.push(IndexHit {
                id: parse_key(&key)?,
                attribute: Keyword::new(row.get::<_, String>(1)?),
                preview: row.get(2)?,
            });
        }
        Ok(hits)
    }
}

impl SavedQueries for SqliteStore {
    fn save_query(&self, name: &str, text: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO saved_queries (name, query, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET query = excluded.query, updated_at = excluded.updated_at
            "#,
            params![name, text, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    fn query_names(&self) -> StorageResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM saved_queries ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn load_query(&self, name: &str) -> StorageResult<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT query FROM saved_queries WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    fn delete_query(&self, name: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM saved_queries WHERE name = ?1", params![name])?;
        Ok(deleted > 0)
    }
}

// ==================== Helpers ====================

/// Attributes of the version current at `at`
fn current_attributes(conn: &Connection, key: &str, at: i64) -> StorageResult<Option<Attributes>> {
    let body: Option<String> = conn
        .query_row(
            r#"
            SELECT body FROM versions
            WHERE doc_key = ?1 AND valid_time <= ?2
            ORDER BY valid_time DESC, tx_id DESC
            LIMIT 1
            "#,
            params![key, at],
            |row| row.get(0),
        )
        .optional()?;

    body.map(|text| decode_body(key, &text)).transpose()
}

/// Replace the projected rows of one document
fn project_document(conn: &Connection, key: &str, attributes: &Attributes) -> StorageResult<()> {
    conn.execute("DELETE FROM attr_values WHERE doc_key = ?1", params![key])?;

    let mut insert = conn.prepare(
        "INSERT INTO attr_values (doc_key, attr, position, value, text) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (attribute, value) in attributes {
        let elements: Vec<&Value> = match value {
            Value::Vector(items) | Value::Set(items) => items.iter().collect(),
            other => vec![other],
        };
        for (position, element) in elements.into_iter().enumerate() {
            // the id is searchable through its own fields, never as text
            let text = if attribute.name() == ID_ATTRIBUTE {
                None
            } else {
                element.as_str()
            };
            insert.execute(params![
                key,
                attribute.name(),
                position as i64,
                element.to_string(),
                text,
            ])?;
        }
    }
    Ok(())
}

fn encode_body(attributes: &Attributes) -> String {
    Value::Map(
        attributes
            .iter()
            .map(|(k, v)| (Value::Keyword(k.clone()), v.clone()))
            .collect(),
    )
    .to_string()
}

fn decode_body(key: &str, text: &str) -> StorageResult<Attributes> {
    match edn::parse(text).map_err(|e| corrupt(key, e))? {
        Value::Map(entries) => entries
            .into_iter()
            .map(|(k, v)| match k {
                Value::Keyword(kw) => Ok((kw, v)),
                other => Err(corrupt(key, format!("non-keyword attribute {}", other))),
            })
            .collect(),
        other => Err(corrupt(key, format!("body is a {}", other.type_name()))),
    }
}

fn parse_key(key: &str) -> StorageResult<DocumentId> {
    DocumentId::from_edn_text(key).map_err(|e| corrupt(key, e))
}

fn timestamp(key: &str, millis: i64) -> StorageResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| corrupt(key, format!("timestamp {} out of range", millis)))
}

fn corrupt(key: &str, details: impl ToString) -> StorageError {
    StorageError::CorruptDocument {
        key: key.to_string(),
        details: details.to_string(),
    }
}
