//! Query command handler

use anyhow::Result;
use inspector_core::query::parse_params;
use inspector_core::Store;

use crate::output::Output;

/// Run a Datalog query given as EDN text
pub fn run(store: &Store, text: &str, params: &[String], output: &Output) -> Result<()> {
    let params = parse_params(params)?;
    let result = store.query(text, &params)?;
    output.print_query_result(&result);
    Ok(())
}
