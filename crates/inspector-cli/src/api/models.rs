//! Request and response bodies for the HTTP API.

use inspector_core::{Cell, DocumentId, Keyword, SearchHit, Value, ValueKind, VersionInfo};
use serde::{Deserialize, Serialize};

/// `GET /doc/:token`
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    /// Canonical EDN text of the identifier
    pub id: String,
    pub href: String,
    pub attributes: Vec<AttributeView>,
    /// Newest first
    pub history: Vec<VersionInfo>,
}

/// One attribute row of the document page
#[derive(Debug, Serialize)]
pub struct AttributeView {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl AttributeView {
    pub fn new(name: &Keyword, value: &Value) -> Self {
        let cell = Cell::new(value.clone());
        Self {
            name: name.to_string(),
            value: cell.render(),
            href: cell.href(),
        }
    }
}

impl DocumentResponse {
    pub fn new<'a, I>(id: &DocumentId, attributes: I, history: Vec<VersionInfo>) -> Self
    where
        I: IntoIterator<Item = (&'a Keyword, &'a Value)>,
    {
        Self {
            id: id.to_string(),
            href: id.href(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| AttributeView::new(k, v))
                .collect(),
            history,
        }
    }
}

/// `POST /doc/:token/attributes`
#[derive(Debug, Deserialize)]
pub struct PutAttributeRequest {
    /// Attribute keyword, e.g. `:test-attr`
    pub name: String,
    /// Raw editor text
    pub value: String,
    #[serde(default)]
    pub kind: ValueKind,
}

/// `POST /query`
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// `:in` parameters as EDN text
    #[serde(default)]
    pub params: Vec<String>,
}

/// `PUT /queries/:name`
#[derive(Debug, Deserialize)]
pub struct SaveQueryRequest {
    pub query: String,
}

/// `GET /queries/:name`
#[derive(Debug, Serialize, Deserialize)]
pub struct SavedQueryResponse {
    pub name: String,
    pub query: String,
}

/// `GET /search` query string
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub documents: i64,
}
