//! Bulk document loading

use std::path::Path;

use anyhow::{Context, Result};
use inspector_core::{edn, Store};
use tracing::debug;

use crate::output::Output;

/// Load every document map in an EDN file
///
/// A top-level vector counts as a sequence of documents, so a file may
/// hold either bare maps or a single vector of maps.
pub fn run(store: &Store, file: &Path, output: &Output) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let forms =
        edn::parse_all(&text).with_context(|| format!("Failed to parse {}", file.display()))?;
    debug!("Read {} top-level forms from {}", forms.len(), file.display());

    let count = store
        .put_documents(forms)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    output.success(&format!("Loaded {} document(s) from {}", count, file.display()));
    Ok(())
}
