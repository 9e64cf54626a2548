//! Storage layer
//!
//! The bridge components talk to storage only through the traits here:
//!
//! - [`DocumentStore`]: current attributes, pattern scans, append-only writes
//! - [`SearchIndex`]: ranked full-text lookup
//! - [`SavedQueries`]: name → query text persistence
//!
//! [`SqliteStore`] implements all three on one SQLite database.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::deadline::Deadline;
use crate::edn::{Keyword, Value};
use crate::id::DocumentId;

pub mod error;
pub mod schema;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteStore;

/// Current state of one document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub attributes: BTreeMap<Keyword, Value>,
}

/// Metadata of one stored version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub tx_id: i64,
    pub valid_time: DateTime<Utc>,
    pub tx_time: DateTime<Utc>,
}

/// Constraints for a triple scan; `None` positions are unconstrained
#[derive(Debug, Clone, PartialEq)]
pub struct TriplePattern {
    pub entity: Option<DocumentId>,
    pub attribute: Keyword,
    pub value: Option<Value>,
}

/// One (entity, attribute, value) fact from a current document version
///
/// Collection-valued attributes yield one triple per element.
#[derive(Debug, Clone, PartialEq)]
pub struct Triple {
    pub entity: DocumentId,
    pub attribute: Keyword,
    pub value: Value,
}

/// A raw hit from the full-text index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: DocumentId,
    pub attribute: Keyword,
    pub preview: String,
}

/// Document persistence with append-only versioning
pub trait DocumentStore {
    /// Latest version visible now, or `None` for an unknown id
    fn entity(&self, id: &DocumentId) -> StorageResult<Option<Document>>;

    /// Facts of current versions matching `pattern`, in a stable order
    fn triples(&self, pattern: &TriplePattern) -> StorageResult<Vec<Triple>>;

    /// Whether any current document carries `attribute`
    fn has_attribute(&self, attribute: &Keyword) -> StorageResult<bool>;

    /// Write one attribute as a new version effective now, keeping all
    /// other attributes of the current version
    fn put_attribute(&self, id: &DocumentId, attribute: &Keyword, value: Value)
        -> StorageResult<()>;

    /// Write a whole document as a new version effective now
    fn put_document(
        &self,
        id: &DocumentId,
        attributes: BTreeMap<Keyword, Value>,
    ) -> StorageResult<()>;

    /// Versions of a document, newest first
    fn history(&self, id: &DocumentId) -> StorageResult<Vec<VersionInfo>>;
}

/// Full-text index over current string attribute values
pub trait SearchIndex {
    /// Run an already-escaped index query, best match first, at most
    /// `limit` hits and at most one per document
    fn search_index(
        &self,
        index_query: &str,
        limit: usize,
        deadline: Deadline,
    ) -> StorageResult<Vec<IndexHit>>;
}

/// Named query text persistence
pub trait SavedQueries {
    /// Insert or overwrite
    fn save_query(&self, name: &str, text: &str) -> StorageResult<()>;

    /// All names, sorted
    fn query_names(&self) -> StorageResult<Vec<String>>;

    fn load_query(&self, name: &str) -> StorageResult<Option<String>>;

    /// Returns `false` when nothing was stored under `name`
    fn delete_query(&self, name: &str) -> StorageResult<bool>;
}
