//! Crate-wide error type
//!
//! Each component keeps its own error enum; [`Error`] wraps them so callers
//! at the edge (CLI, HTTP) can classify any failure with [`Error::kind`].

use std::fmt;

use thiserror::Error;

use crate::attributes::AttributeError;
use crate::id::MalformedIdentifier;
use crate::query::QueryError;
use crate::saved::SavedQueryError;
use crate::search::SearchError;
use crate::storage::StorageError;
use crate::value::ValidationError;

/// Broad failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedIdentifier,
    QueryParse,
    QueryExecution,
    Validation,
    NotFound,
    Timeout,
    Storage,
}

impl ErrorKind {
    /// Stable name used in error bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedIdentifier => "malformed-identifier",
            ErrorKind::QueryParse => "query-parse",
            ErrorKind::QueryExecution => "query-execution",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Storage => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed document identifier: {0}")]
    MalformedIdentifier(#[from] MalformedIdentifier),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Attribute(#[from] AttributeError),

    #[error(transparent)]
    SavedQuery(#[from] SavedQueryError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedIdentifier(_) => ErrorKind::MalformedIdentifier,
            Error::Query(e) => match e {
                QueryError::Syntax(_) | QueryError::Parse(_) => ErrorKind::QueryParse,
                QueryError::Execution(_) => ErrorKind::QueryExecution,
                QueryError::Timeout => ErrorKind::Timeout,
                QueryError::Storage(_) => ErrorKind::Storage,
            },
            Error::Attribute(e) => match e {
                AttributeError::NotFound(_) => ErrorKind::NotFound,
                AttributeError::Validation(_) => ErrorKind::Validation,
                AttributeError::Storage(_) => ErrorKind::Storage,
            },
            Error::SavedQuery(e) => match e {
                SavedQueryError::NotFound(_) => ErrorKind::NotFound,
                SavedQueryError::Validation(_) => ErrorKind::Validation,
                SavedQueryError::Storage(_) => ErrorKind::Storage,
            },
            Error::Search(e) => match e {
                SearchError::Timeout => ErrorKind::Timeout,
                SearchError::Storage(_) => ErrorKind::Storage,
            },
            Error::Validation(_) => ErrorKind::Validation,
            Error::Storage(StorageError::DeadlineExceeded) => ErrorKind::Timeout,
            Error::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl Error {
    /// What an operator can do about the failure, when there is something
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Storage(e)
            | Error::Query(QueryError::Storage(e))
            | Error::Attribute(AttributeError::Storage(e))
            | Error::SavedQuery(SavedQueryError::Storage(e))
            | Error::Search(SearchError::Storage(e)) => e.recovery_suggestion(),
            Error::Query(QueryError::Timeout) | Error::Search(SearchError::Timeout) => {
                StorageError::DeadlineExceeded.recovery_suggestion()
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::DocumentId;

    #[test]
    fn test_kinds() {
        let err: Error = DocumentId::decode("").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::MalformedIdentifier);

        let err: Error = QueryError::Parse("x".into()).into();
        assert_eq!(err.kind().as_str(), "query-parse");

        let err: Error = QueryError::Execution("x".into()).into();
        assert_eq!(err.kind().as_str(), "query-execution");

        let err: Error = SavedQueryError::NotFound("q".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: Error = SearchError::Timeout.into();
        assert_eq!(err.kind(), ErrorKind::Timeout);

        let err: Error = StorageError::Poisoned.into();
        assert_eq!(err.kind().as_str(), "internal");
    }

    #[test]
    fn test_recovery_suggestions() {
        let err: Error = QueryError::Timeout.into();
        assert!(err.recovery_suggestion().unwrap().contains("timeout"));

        let corrupt = StorageError::CorruptDocument {
            key: ":hello".to_string(),
            details: "invalid number".to_string(),
        };
        let err: Error = AttributeError::Storage(corrupt).into();
        assert!(err.recovery_suggestion().is_some());

        let err: Error = QueryError::Parse("x".into()).into();
        assert_eq!(err.recovery_suggestion(), None);
    }

    #[test]
    fn test_message_passes_through() {
        let err: Error = AttributeError::NotFound(DocumentId::keyword("nope")).into();
        assert_eq!(err.to_string(), "Document :nope not found");
    }
}
