//! Ad-hoc find/where queries over the document store
//!
//! [`execute`] parses query text, checks its shape, then evaluates its
//! clauses against a [`DocumentStore`]. Results are typed [`Cell`]s so the
//! caller can tell which values address a document.

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::deadline::Deadline;
use crate::edn::{self, ParseError, Value};
use crate::id::DocumentId;
use crate::storage::{DocumentStore, StorageError};

pub mod executor;
pub mod parser;

pub use parser::{parse_query, Clause, Direction, Op, Query, Term, Var};

/// Errors from parsing or running a query
#[derive(Error, Debug)]
pub enum QueryError {
    /// Query text is not readable EDN
    #[error("Query syntax error: {0}")]
    Syntax(#[from] ParseError),

    /// Query reads but has the wrong shape
    #[error("Invalid query: {0}")]
    Parse(String),

    #[error("Query failed: {0}")]
    Execution(String),

    #[error("Query exceeded its time limit")]
    Timeout,

    #[error(transparent)]
    Storage(StorageError),
}

impl QueryError {
    /// Whether the query was rejected before touching the store
    pub fn is_parse(&self) -> bool {
        matches!(self, QueryError::Syntax(_) | QueryError::Parse(_))
    }
}

impl From<StorageError> for QueryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DeadlineExceeded => QueryError::Timeout,
            other => QueryError::Storage(other),
        }
    }
}

/// One value of a result row
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: Value,
    /// Set when the value has identifier shape and can be linked
    pub id: Option<DocumentId>,
}

impl Cell {
    pub fn new(value: Value) -> Self {
        let id = DocumentId::from_value(value.clone()).ok();
        Self { value, id }
    }

    /// Link to the document this value names
    pub fn href(&self) -> Option<String> {
        self.id.as_ref().map(DocumentId::href)
    }

    /// Canonical EDN text of the value
    pub fn render(&self) -> String {
        self.value.to_string()
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let href = self.href();
        let mut state = serializer.serialize_struct("Cell", if href.is_some() { 2 } else { 1 })?;
        state.serialize_field("value", &self.render())?;
        if let Some(href) = href {
            state.serialize_field("href", &href)?;
        }
        state.end()
    }
}

/// Cells in `:find` order
pub type Row = Vec<Cell>;

/// Column names plus rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Parse and run `text` with positional `:in` parameters
pub fn execute<S>(
    store: &S,
    text: &str,
    params: &[Value],
    deadline: Deadline,
) -> Result<QueryResult, QueryError>
where
    S: DocumentStore + ?Sized,
{
    let query = parse_query(text)?;
    let rows = executor::run(store, &query, params, deadline)?;
    debug!("Query returned {} rows", rows.len());

    Ok(QueryResult {
        columns: query.find.iter().map(|v| v.name().to_string()).collect(),
        rows,
    })
}

/// Read parameter values given as EDN text
pub fn parse_params<T: AsRef<str>>(raw: &[T]) -> Result<Vec<Value>, QueryError> {
    raw.iter()
        .enumerate()
        .map(|(i, text)| {
            edn::parse(text.as_ref()).map_err(|e| {
                QueryError::Parse(format!("parameter {} is not valid EDN: {}", i + 1, e))
            })
        })
        .collect()
}
