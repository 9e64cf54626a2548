//! Reading and editing document attributes
//!
//! Every edit is validated before the store is touched, then written as a
//! new version of the whole document. A rejected edit writes nothing.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::edn::{Keyword, Value};
use crate::id::DocumentId;
use crate::storage::{DocumentStore, StorageError, VersionInfo};
use crate::value::{writable_attribute, AttributeValue, ValidationError, ValueKind, ID_ATTRIBUTE};

/// Errors from the document attribute service
#[derive(Error, Debug)]
pub enum AttributeError {
    #[error("Document {0} not found")]
    NotFound(DocumentId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Current attributes of a document, including `:xt/id`
pub fn get_attributes<S>(store: &S, id: &DocumentId) -> Result<BTreeMap<Keyword, Value>, AttributeError>
where
    S: DocumentStore + ?Sized,
{
    store
        .entity(id)?
        .map(|doc| doc.attributes)
        .ok_or_else(|| AttributeError::NotFound(id.clone()))
}

/// Parse `raw` as `kind` and write it to `name` as a new version
///
/// Unknown documents are created. Returns the value as stored.
pub fn put_attribute<S>(
    store: &S,
    id: &DocumentId,
    name: &str,
    raw: &str,
    kind: ValueKind,
) -> Result<AttributeValue, AttributeError>
where
    S: DocumentStore + ?Sized,
{
    let attribute = writable_attribute(name)?;
    let value = AttributeValue::parse(raw, kind)?;

    store.put_attribute(id, &attribute, value.to_value())?;
    info!("Set {} on {} ({})", attribute, id, value.kind());
    Ok(value)
}

/// Write a whole document as a new version
pub fn put_document<S>(
    store: &S,
    id: &DocumentId,
    attributes: BTreeMap<Keyword, Value>,
) -> Result<(), AttributeError>
where
    S: DocumentStore + ?Sized,
{
    store.put_document(id, attributes)?;
    debug!("Put document {}", id);
    Ok(())
}

/// Stored versions of a document, newest first
pub fn history<S>(store: &S, id: &DocumentId) -> Result<Vec<VersionInfo>, AttributeError>
where
    S: DocumentStore + ?Sized,
{
    let versions = store.history(id)?;
    if versions.is_empty() {
        return Err(AttributeError::NotFound(id.clone()));
    }
    Ok(versions)
}

/// Split an EDN document map into its identifier and attributes
///
/// The map must carry `:xt/id`, and every key must be a keyword.
pub fn parse_document(value: Value) -> Result<(DocumentId, BTreeMap<Keyword, Value>), ValidationError> {
    let entries = match value {
        Value::Map(entries) => entries,
        other => return Err(ValidationError::InvalidDocument(other.type_name().to_string())),
    };

    let mut attributes = BTreeMap::new();
    for (key, value) in entries {
        match key {
            Value::Keyword(kw) => {
                attributes.insert(kw, value);
            }
            other => return Err(ValidationError::InvalidDocument(format!("key {}", other))),
        }
    }

    let id_value = attributes
        .get(&Keyword::new(ID_ATTRIBUTE))
        .cloned()
        .ok_or_else(|| ValidationError::InvalidDocument(format!("a map without :{}", ID_ATTRIBUTE)))?;
    let id = DocumentId::from_value(id_value)
        .map_err(|e| ValidationError::InvalidDocument(format!("an unusable :{} ({})", ID_ATTRIBUTE, e)))?;

    Ok((id, attributes))
}
