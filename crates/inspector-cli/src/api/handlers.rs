//! HTTP request handlers and shared application state.
//!
//! Store calls are synchronous, so each handler runs its work on the
//! blocking pool. Reads answer within the configured time budget; writes
//! always run to completion.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::Json;
use inspector_core::id::DOC_PATH_PREFIX;
use inspector_core::query::parse_params;
use inspector_core::{DocumentId, QueryResult, Store};
use tracing::debug;

use crate::api::errors::ApiError;
use crate::api::models::*;

/// Shared application state passed to every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn query_budget(&self) -> Duration {
        self.store.config().query_timeout()
    }

    fn search_budget(&self) -> Duration {
        self.store.config().search_timeout()
    }
}

/// Run a read on the blocking pool, giving up after `budget`
///
/// Only for work with no side effects: the worker keeps running after the
/// timeout fires.
async fn blocking<T, F>(budget: Duration, work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> inspector_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(budget, to_completion(work)).await {
        Err(_) => Err(ApiError::Timeout(format!(
            "Request exceeded its {} ms time limit",
            budget.as_millis()
        ))),
        Ok(result) => result,
    }
}

/// Run `work` on the blocking pool and wait for its outcome
///
/// Writes go through here uncut, so the response always reports whether the
/// new version was committed.
async fn to_completion<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> inspector_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Err(join_err) => Err(ApiError::Internal(format!("Worker failed: {}", join_err))),
        Ok(result) => result.map_err(ApiError::from),
    }
}

/// The still-encoded identifier token of a `/doc/...` path
///
/// Read from the raw URI because the `Path` extractor percent-decodes.
fn doc_token(uri: &Uri) -> &str {
    let path = uri.path();
    let rest = path.strip_prefix(DOC_PATH_PREFIX).unwrap_or(path);
    rest.strip_suffix("/attributes").unwrap_or(rest)
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let store = state.store.clone();
    let documents = blocking(state.query_budget(), move || store.document_count()).await?;
    Ok(Json(HealthResponse {
        status: "ok",
        documents,
    }))
}

/// `GET /doc/:token`
pub async fn get_document(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Json<DocumentResponse>, ApiError> {
    let id = DocumentId::decode(doc_token(&uri))?;
    debug!("Loading document {}", id);

    let store = state.store.clone();
    let response = blocking(state.query_budget(), move || {
        let attributes = store.attributes(&id)?;
        let history = store.history(&id)?;
        Ok(DocumentResponse::new(&id, &attributes, history))
    })
    .await?;
    Ok(Json(response))
}

/// `POST /doc/:token/attributes`
pub async fn put_attribute(
    State(state): State<AppState>,
    uri: Uri,
    Json(req): Json<PutAttributeRequest>,
) -> Result<StatusCode, ApiError> {
    let id = DocumentId::decode(doc_token(&uri))?;

    let store = state.store.clone();
    to_completion(move || store.put_attribute(&id, &req.name, &req.value, req.kind)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /query`
pub async fn run_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResult>, ApiError> {
    let store = state.store.clone();
    let result = blocking(state.query_budget(), move || {
        let params = parse_params(&req.params)?;
        store.query(&req.query, &params)
    })
    .await?;
    Ok(Json(result))
}

/// `GET /queries`
pub async fn list_queries(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let store = state.store.clone();
    let names = blocking(state.query_budget(), move || store.saved_queries()).await?;
    Ok(Json(names))
}

/// `PUT /queries/:name`
pub async fn save_query(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<SaveQueryRequest>,
) -> Result<StatusCode, ApiError> {
    let store = state.store.clone();
    to_completion(move || store.save_query(&name, &req.query)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /queries/:name`
pub async fn get_query(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SavedQueryResponse>, ApiError> {
    let store = state.store.clone();
    let response = blocking(state.query_budget(), move || {
        let query = store.load_query(&name)?;
        Ok(SavedQueryResponse { name, query })
    })
    .await?;
    Ok(Json(response))
}

/// `DELETE /queries/:name`
pub async fn delete_query(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    let store = state.store.clone();
    to_completion(move || store.delete_query(&name)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /search?q=term`
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let store = state.store.clone();
    let results = blocking(state.search_budget(), move || store.search(&params.q)).await?;
    Ok(Json(SearchResponse { results }))
}
