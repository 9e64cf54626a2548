//! Search command handler

use anyhow::Result;
use inspector_core::Store;

use crate::output::Output;

/// Full-text search over attribute values
pub fn run(store: &Store, terms: &[String], output: &Output) -> Result<()> {
    let term = terms.join(" ");
    let hits = store.search(&term)?;
    output.print_search_hits(&hits);
    Ok(())
}
