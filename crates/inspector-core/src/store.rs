//! Unified entry point
//!
//! The `Store` owns the SQLite-backed store and the configuration, and
//! applies the configured time budgets and limits to every operation. It is
//! cheap to clone; clones share one database connection.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open()?;
//!
//! let id = DocumentId::decode("%3Ahello")?;
//! store.put_attribute(&id, ":test-attr", "hello cypress", ValueKind::String)?;
//!
//! let result = store.query("{:find [e thing] :where [[e :things thing]]}", &[])?;
//! let hits = store.search("nathanial")?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::attributes::{self, parse_document};
use crate::config::Config;
use crate::deadline::Deadline;
use crate::edn::{Keyword, Value};
use crate::error::Result;
use crate::id::DocumentId;
use crate::query::{self, QueryResult};
use crate::saved;
use crate::search::{self, SearchHit, DEFAULT_SEARCH_LIMIT};
use crate::storage::{SqliteStore, VersionInfo};
use crate::value::{AttributeValue, ValueKind};

/// Shared handle to the document store
#[derive(Clone)]
pub struct Store {
    backend: Arc<SqliteStore>,
    config: Config,
}

impl Store {
    /// Open the store using the default configuration sources
    pub fn open() -> anyhow::Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: Config) -> anyhow::Result<Self> {
        let path = config.sqlite_path();
        let backend = SqliteStore::open(&path)
            .with_context(|| format!("Failed to open document store at {:?}", path))?;
        info!("Document store ready at {:?}", path);

        Ok(Self {
            backend: Arc::new(backend),
            config,
        })
    }

    /// Store backed by an in-memory database (for testing)
    pub fn in_memory(config: Config) -> anyhow::Result<Self> {
        let backend =
            SqliteStore::open_in_memory().context("Failed to open in-memory document store")?;
        Ok(Self {
            backend: Arc::new(backend),
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying store, for direct trait access
    pub fn backend(&self) -> &SqliteStore {
        &self.backend
    }

    pub fn document_count(&self) -> Result<i64> {
        Ok(self.backend.document_count()?)
    }

    // ==================== Documents ====================

    /// Current attributes of a document
    pub fn attributes(&self, id: &DocumentId) -> Result<BTreeMap<Keyword, Value>> {
        Ok(attributes::get_attributes(self.backend.as_ref(), id)?)
    }

    /// Validate and write one attribute as a new version
    pub fn put_attribute(
        &self,
        id: &DocumentId,
        name: &str,
        raw: &str,
        kind: ValueKind,
    ) -> Result<AttributeValue> {
        Ok(attributes::put_attribute(
            self.backend.as_ref(),
            id,
            name,
            raw,
            kind,
        )?)
    }

    /// Write a whole document as a new version
    pub fn put_document(&self, id: &DocumentId, attrs: BTreeMap<Keyword, Value>) -> Result<()> {
        Ok(attributes::put_document(self.backend.as_ref(), id, attrs)?)
    }

    /// Write document maps, each carrying its own `:xt/id`
    ///
    /// A top-level vector is treated as a sequence of documents. Every
    /// form is validated before anything is written.
    pub fn put_documents(&self, forms: Vec<Value>) -> Result<usize> {
        let mut docs = Vec::new();
        for form in forms {
            match form {
                Value::Vector(items) | Value::List(items) => {
                    for item in items {
                        docs.push(parse_document(item)?);
                    }
                }
                other => docs.push(parse_document(other)?),
            }
        }

        for (id, attrs) in &docs {
            self.put_document(id, attrs.clone())?;
        }
        info!("Loaded {} documents", docs.len());
        Ok(docs.len())
    }

    /// Versions of a document, newest first
    pub fn history(&self, id: &DocumentId) -> Result<Vec<VersionInfo>> {
        Ok(attributes::history(self.backend.as_ref(), id)?)
    }

    // ==================== Queries ====================

    /// Run a query within the configured time budget
    pub fn query(&self, text: &str, params: &[Value]) -> Result<QueryResult> {
        let deadline = Deadline::after(self.config.query_timeout());
        Ok(query::execute(self.backend.as_ref(), text, params, deadline)?)
    }

    /// Run a saved query by name
    pub fn run_saved_query(&self, name: &str, params: &[Value]) -> Result<QueryResult> {
        let text = self.load_query(name)?;
        self.query(&text, params)
    }

    pub fn save_query(&self, name: &str, text: &str) -> Result<()> {
        Ok(saved::save(self.backend.as_ref(), name, text)?)
    }

    pub fn saved_queries(&self) -> Result<Vec<String>> {
        Ok(saved::list(self.backend.as_ref())?)
    }

    pub fn load_query(&self, name: &str) -> Result<String> {
        Ok(saved::load(self.backend.as_ref(), name)?)
    }

    pub fn delete_query(&self, name: &str) -> Result<()> {
        Ok(saved::delete(self.backend.as_ref(), name)?)
    }

    // ==================== Search ====================

    /// Search with the configured result cap and time budget
    ///
    /// The cap may be lowered by configuration but never raised above
    /// [`DEFAULT_SEARCH_LIMIT`].
    pub fn search(&self, term: &str) -> Result<Vec<SearchHit>> {
        let deadline = Deadline::after(self.config.search_timeout());
        let limit = self.config.search_limit.min(DEFAULT_SEARCH_LIMIT);
        Ok(search::search(self.backend.as_ref(), term, limit, deadline)?)
    }
}
