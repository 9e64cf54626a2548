//! Free-text search over document attributes
//!
//! User terms are rewritten into an FTS5 query in which every word is a
//! quoted string, so punctuation typed into the search box can never change
//! the query structure. Only `AND`, `OR`, `NOT` between two words and a
//! trailing `*` keep their operator meaning.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;
use tracing::debug;

use crate::deadline::Deadline;
use crate::edn::Keyword;
use crate::id::DocumentId;
use crate::storage::{SearchIndex, StorageError};

/// Default cap on search results
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search exceeded its time limit")]
    Timeout,

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for SearchError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DeadlineExceeded => SearchError::Timeout,
            other => SearchError::Storage(other),
        }
    }
}

/// One matching document
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: DocumentId,
    /// Best-ranked attribute that matched
    pub attribute: Keyword,
    pub preview: String,
}

impl SearchHit {
    pub fn href(&self) -> String {
        self.id.href()
    }
}

impl Serialize for SearchHit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SearchHit", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("href", &self.href())?;
        state.serialize_field("attribute", &self.attribute.to_string())?;
        state.serialize_field("preview", &self.preview)?;
        state.end()
    }
}

/// Rewrite a user term as an FTS5 query, `None` when the term is blank
pub fn to_index_query(term: &str) -> Option<String> {
    let tokens: Vec<&str> = term.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let mut parts: Vec<String> = Vec::with_capacity(tokens.len());
    let mut after_word = false;
    for (i, token) in tokens.iter().enumerate() {
        let is_operator = matches!(*token, "AND" | "OR" | "NOT");
        if is_operator && after_word && i + 1 < tokens.len() {
            parts.push(token.to_string());
            after_word = false;
            continue;
        }

        let part = match token.strip_suffix('*') {
            Some(stem) if !stem.is_empty() && !stem.ends_with('*') => format!("{}*", quote(stem)),
            _ => quote(token),
        };
        parts.push(part);
        after_word = true;
    }
    Some(parts.join(" "))
}

fn quote(word: &str) -> String {
    format!("\"{}\"", word.replace('"', "\"\""))
}

/// Run a search, best match first, at most `limit` documents
pub fn search<S>(
    index: &S,
    term: &str,
    limit: usize,
    deadline: Deadline,
) -> Result<Vec<SearchHit>, SearchError>
where
    S: SearchIndex + ?Sized,
{
    let Some(index_query) = to_index_query(term) else {
        return Ok(Vec::new());
    };
    if deadline.expired() {
        return Err(SearchError::Timeout);
    }

    let hits = index.search_index(&index_query, limit, deadline)?;
    debug!("Search {:?} matched {} documents", index_query, hits.len());

    Ok(hits
        .into_iter()
        .map(|hit| SearchHit {
            id: hit.id,
            attribute: hit.attribute,
            preview: hit.preview,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edn::Value;
    use crate::storage::{DocumentStore, IndexHit, SqliteStore, StorageResult};
    use std::collections::BTreeMap;
    use std::time::Duration;

    struct UnreachableIndex;

    impl SearchIndex for UnreachableIndex {
        fn search_index(&self, _: &str, _: usize, _: Deadline) -> StorageResult<Vec<IndexHit>> {
            panic!("index must not be consulted");
        }
    }

    fn put(store: &SqliteStore, id: DocumentId, pairs: &[(&str, &str)]) {
        let attrs: BTreeMap<Keyword, Value> = pairs
            .iter()
            .map(|(k, v)| (Keyword::new(*k), Value::string(*v)))
            .collect();
        store.put_document(&id, attrs).unwrap();
    }

    fn directory() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        put(
            &store,
            DocumentId::from_edn_text("{:person-id 1}").unwrap(),
            &[("name", "Nathanial"), ("role", "maintainer")],
        );
        for i in 0..12 {
            put(
                &store,
                DocumentId::keyword(format!("dev-{}", i)),
                &[("title", "developer"), ("team", "platform devs")],
            );
        }
        store
    }

    #[test]
    fn test_index_query_quotes_words() {
        assert_eq!(to_index_query("hello").as_deref(), Some("\"hello\""));
        assert_eq!(
            to_index_query("  hello   world ").as_deref(),
            Some("\"hello\" \"world\"")
        );
        assert_eq!(
            to_index_query("a:b (c) \"d\" -e ^f").as_deref(),
            Some("\"a:b\" \"(c)\" \"\"\"d\"\"\" \"-e\" \"^f\"")
        );
    }

    #[test]
    fn test_index_query_operators() {
        assert_eq!(to_index_query("dev*").as_deref(), Some("\"dev\"*"));
        assert_eq!(to_index_query("a OR b").as_deref(), Some("\"a\" OR \"b\""));
        assert_eq!(to_index_query("a NOT b").as_deref(), Some("\"a\" NOT \"b\""));
        // operators need a word on both sides
        assert_eq!(to_index_query("OR b").as_deref(), Some("\"OR\" \"b\""));
        assert_eq!(to_index_query("a AND").as_deref(), Some("\"a\" \"AND\""));
        assert_eq!(
            to_index_query("a AND OR b").as_deref(),
            Some("\"a\" AND \"OR\" \"b\"")
        );
        // lowercase is a word
        assert_eq!(to_index_query("a or b").as_deref(), Some("\"a\" \"or\" \"b\""));
        assert_eq!(to_index_query("*").as_deref(), Some("\"*\""));
        assert_eq!(to_index_query("a**").as_deref(), Some("\"a**\""));
    }

    #[test]
    fn test_blank_term_skips_index() {
        assert!(to_index_query("   ").is_none());
        let hits = search(&UnreachableIndex, "", 10, Deadline::none()).unwrap();
        assert!(hits.is_empty());
        let hits = search(&UnreachableIndex, " \t ", 10, Deadline::none()).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_prefix_search_is_capped() {
        let store = directory();
        let hits = search(&store, "dev*", DEFAULT_SEARCH_LIMIT, Deadline::none()).unwrap();
        assert_eq!(hits.len(), 10);

        let ids: std::collections::HashSet<_> = hits.iter().map(|h| h.id.clone()).collect();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_search_finds_composite_id() {
        let store = directory();
        let hits = search(&store, "nathanial", DEFAULT_SEARCH_LIMIT, Deadline::none()).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "{:person-id 1}");
        assert_eq!(hits[0].href(), "/doc/_%7B%3Aperson-id%201%7D");
        assert_eq!(hits[0].attribute, Keyword::new("name"));
        assert!(hits[0].preview.contains("Nathanial"));
    }

    #[test]
    fn test_reserved_characters_are_harmless() {
        let store = directory();
        for term in ["\"", "(", "name:x", "-", "^", "a AND", "NOT"] {
            assert!(search(&store, term, 10, Deadline::none()).is_ok(), "{}", term);
        }
    }

    #[test]
    fn test_search_timeout() {
        let store = directory();
        let err = search(&store, "developer", 10, Deadline::after(Duration::ZERO)).unwrap_err();
        assert!(matches!(err, SearchError::Timeout));
    }

    #[test]
    fn test_hit_serializes_with_href() {
        let hit = SearchHit {
            id: DocumentId::keyword("hello"),
            attribute: Keyword::new("greeting"),
            preview: "hello inspector".to_string(),
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["id"], ":hello");
        assert_eq!(json["href"], "/doc/%3Ahello");
        assert_eq!(json["attribute"], ":greeting");
    }
}
