//! API error types mapped to HTTP status codes.
//!
//! Every error body is `{"error": message, "kind": kind}`, where `kind` is
//! one of `malformed-identifier`, `query-parse`, `query-execution`,
//! `validation`, `not-found`, `timeout` or `internal`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use inspector_core::{Error, ErrorKind, MalformedIdentifier};
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug)]
pub enum ApiError {
    /// A classified failure from the core library
    Core(Error),
    /// The request did not finish within its time budget (504)
    Timeout(String),
    /// Unexpected server error (500)
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Core(e) => e.kind(),
            ApiError::Timeout(_) => ErrorKind::Timeout,
            ApiError::Internal(_) => ErrorKind::Storage,
        }
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.kind())
    }
}

/// HTTP status for each failure category
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MalformedIdentifier | ErrorKind::QueryParse | ErrorKind::Validation => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::QueryExecution => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Core(err)
    }
}

impl From<MalformedIdentifier> for ApiError {
    fn from(err: MalformedIdentifier) -> Self {
        ApiError::Core(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = match self {
            ApiError::Core(e) => e.to_string(),
            ApiError::Timeout(msg) | ApiError::Internal(msg) => msg,
        };

        if status.is_server_error() {
            error!("{} {}: {}", status.as_u16(), kind, message);
        } else {
            warn!("{} {}: {}", status.as_u16(), kind, message);
        }

        let body = Json(json!({ "error": message, "kind": kind.as_str() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspector_core::query::QueryError;
    use inspector_core::DocumentId;

    #[test]
    fn test_status_mapping() {
        let err: ApiError = DocumentId::decode("_%3Ahello").unwrap_err().into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ApiError::Core(QueryError::Execution("x".into()).into());
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::Core(QueryError::Timeout.into());
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);

        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
    }
}
