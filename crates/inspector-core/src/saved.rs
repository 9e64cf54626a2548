//! Named saved queries

use thiserror::Error;
use tracing::info;

use crate::storage::{SavedQueries, StorageError};
use crate::value::ValidationError;

#[derive(Error, Debug)]
pub enum SavedQueryError {
    #[error("No saved query named '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Names are compared after trimming surrounding whitespace
fn validate_name(name: &str) -> Result<&str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyQueryName);
    }
    Ok(name)
}

/// Store `text` under `name`, replacing any previous text
pub fn save<S>(store: &S, name: &str, text: &str) -> Result<(), SavedQueryError>
where
    S: SavedQueries + ?Sized,
{
    let name = validate_name(name)?;
    store.save_query(name, text)?;
    info!("Saved query '{}'", name);
    Ok(())
}

/// All saved names, sorted
pub fn list<S>(store: &S) -> Result<Vec<String>, SavedQueryError>
where
    S: SavedQueries + ?Sized,
{
    Ok(store.query_names()?)
}

pub fn load<S>(store: &S, name: &str) -> Result<String, SavedQueryError>
where
    S: SavedQueries + ?Sized,
{
    let name = validate_name(name)?;
    store
        .load_query(name)?
        .ok_or_else(|| SavedQueryError::NotFound(name.to_string()))
}

pub fn delete<S>(store: &S, name: &str) -> Result<(), SavedQueryError>
where
    S: SavedQueries + ?Sized,
{
    let name = validate_name(name)?;
    if !store.delete_query(name)? {
        return Err(SavedQueryError::NotFound(name.to_string()));
    }
    info!("Deleted saved query '{}'", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    const QUERY: &str = "{:find [e thing] :where [[e :things thing]]}";

    #[test]
    fn test_save_and_load() {
        let store = SqliteStore::open_in_memory().unwrap();
        save(&store, "test-query", QUERY).unwrap();
        assert_eq!(load(&store, "test-query").unwrap(), QUERY);
    }

    #[test]
    fn test_save_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        save(&store, "test-query", QUERY).unwrap();
        save(&store, "test-query", QUERY).unwrap();

        assert_eq!(list(&store).unwrap(), vec!["test-query"]);
        assert_eq!(load(&store, "test-query").unwrap(), QUERY);
    }

    #[test]
    fn test_save_overwrites() {
        let store = SqliteStore::open_in_memory().unwrap();
        save(&store, "q", "{:find [a] :where [[a :x]]}").unwrap();
        save(&store, "q", QUERY).unwrap();
        assert_eq!(load(&store, "q").unwrap(), QUERY);
    }

    #[test]
    fn test_list_is_sorted() {
        let store = SqliteStore::open_in_memory().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            save(&store, name, QUERY).unwrap();
        }
        assert_eq!(list(&store).unwrap(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_unknown_name() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            load(&store, "missing"),
            Err(SavedQueryError::NotFound(name)) if name == "missing"
        ));
        assert!(matches!(
            delete(&store, "missing"),
            Err(SavedQueryError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        save(&store, "q", QUERY).unwrap();
        delete(&store, "q").unwrap();
        assert!(list(&store).unwrap().is_empty());
    }

    #[test]
    fn test_blank_name_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            save(&store, "   ", QUERY),
            Err(SavedQueryError::Validation(ValidationError::EmptyQueryName))
        ));
        save(&store, "  padded  ", QUERY).unwrap();
        assert_eq!(load(&store, "padded").unwrap(), QUERY);
    }
}
