//! Saved query command handlers

use anyhow::Result;
use inspector_core::query::parse_params;
use inspector_core::Store;

use crate::output::{Output, OutputFormat};

pub fn list(store: &Store, output: &Output) -> Result<()> {
    let names = store.saved_queries()?;
    output.print_names(&names, "No saved queries.");
    Ok(())
}

pub fn save(store: &Store, name: &str, text: &str, output: &Output) -> Result<()> {
    store.save_query(name, text)?;
    output.success(&format!("Saved query '{}'", name.trim()));
    Ok(())
}

pub fn show(store: &Store, name: &str, output: &Output) -> Result<()> {
    let text = store.load_query(name)?;
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({ "name": name.trim(), "query": text })
            );
        }
        OutputFormat::Human | OutputFormat::Quiet => println!("{}", text),
    }
    Ok(())
}

pub fn delete(store: &Store, name: &str, output: &Output) -> Result<()> {
    store.delete_query(name)?;
    output.success(&format!("Deleted query '{}'", name.trim()));
    Ok(())
}

/// Load a saved query and run it with the given parameters
pub fn run(store: &Store, name: &str, params: &[String], output: &Output) -> Result<()> {
    let params = parse_params(params)?;
    let result = store.run_saved_query(name, &params)?;
    output.print_query_result(&result);
    Ok(())
}
