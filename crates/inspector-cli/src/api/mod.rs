//! HTTP transport for the inspector's logical operations.

pub mod errors;
pub mod handlers;
pub mod models;

use axum::routing::{get, post};
use axum::Router;

use handlers::AppState;

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/doc/:token", get(handlers::get_document))
        .route("/doc/:token/attributes", post(handlers::put_attribute))
        .route("/query", post(handlers::run_query))
        .route("/queries", get(handlers::list_queries))
        .route(
            "/queries/:name",
            get(handlers::get_query)
                .put(handlers::save_query)
                .delete(handlers::delete_query),
        )
        .route("/search", get(handlers::search))
        .with_state(state)
}
