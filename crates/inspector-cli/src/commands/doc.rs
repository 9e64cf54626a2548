//! Document command handlers

use anyhow::Result;
use inspector_core::{Store, ValueKind};

use super::parse_id;
use crate::output::Output;

/// Show a document's current attributes
pub fn show(store: &Store, id: &str, output: &Output) -> Result<()> {
    let id = parse_id(id)?;
    let attributes = store.attributes(&id)?;
    let history = store.history(&id)?;
    output.print_document(&id, &attributes, history);
    Ok(())
}

/// Set one attribute, writing a new version of the document
pub fn put(
    store: &Store,
    id: &str,
    attr: &str,
    value: &str,
    kind: ValueKind,
    output: &Output,
) -> Result<()> {
    let id = parse_id(id)?;
    let stored = store.put_attribute(&id, attr, value, kind)?;
    output.success(&format!(
        "Set {} on {} to {} ({})",
        attr,
        id,
        stored.to_value(),
        stored.kind()
    ));
    Ok(())
}

/// Show the version history of a document
pub fn history(store: &Store, id: &str, output: &Output) -> Result<()> {
    let id = parse_id(id)?;
    let versions = store.history(&id)?;
    output.print_history(&versions);
    Ok(())
}
