//! Inspector Core Library
//!
//! The bridge layer behind the document inspector's query console,
//! attribute editor and search panel, over a bitemporal document store.
//!
//! # Architecture
//!
//! - **EDN**: identifiers, values and queries are all EDN literals
//! - **SQLite**: append-only version table, a current-state projection for
//!   pattern matching, and an FTS5 index for search
//!
//! Components reach storage only through the traits in [`storage`], so each
//! can be tested against any store.
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open()?;
//!
//! // Edit a document addressed by a URL token
//! let id = DocumentId::decode("%3Ahello")?;
//! store.put_attribute(&id, ":test-attr", "hello cypress", ValueKind::String)?;
//!
//! // Query and link results
//! let result = store.query("{:find [e thing] :where [[e :things thing]]}", &[])?;
//! for row in &result.rows {
//!     println!("{:?}", row[0].href());
//! }
//! ```
//!
//! # Modules
//!
//! - `store`: Unified interface (main entry point)
//! - `edn`: EDN reader and canonical printer
//! - `id`: Document identifiers and their URL token codec
//! - `value`: Attribute values parsed from raw input
//! - `query`: find/where query parser and executor
//! - `saved`: Named saved queries
//! - `attributes`: Reading and versioned editing of attributes
//! - `search`: Full-text search adapter
//! - `storage`: Store traits and the SQLite implementation
//! - `config`: Application configuration

pub mod attributes;
pub mod config;
pub mod deadline;
pub mod edn;
pub mod error;
pub mod id;
pub mod query;
pub mod saved;
pub mod search;
pub mod storage;
pub mod store;
pub mod value;

pub use config::Config;
pub use deadline::Deadline;
pub use edn::{Keyword, Value};
pub use error::{Error, ErrorKind, Result};
pub use id::{DocumentId, MalformedIdentifier};
pub use query::{Cell, QueryError, QueryResult, Row};
pub use search::SearchHit;
pub use storage::{SqliteStore, StorageError, VersionInfo};
pub use store::Store;
pub use value::{AttributeValue, ValidationError, ValueKind};
