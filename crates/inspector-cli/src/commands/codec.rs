//! Identifier encoding commands

use anyhow::{Context, Result};
use inspector_core::DocumentId;

use crate::output::{Output, OutputFormat};

/// Print the path token and link for an identifier given as EDN text
pub fn encode(id: &str, output: &Output) -> Result<()> {
    let id = DocumentId::from_edn_text(id)
        .with_context(|| format!("Invalid document identifier: {}", id))?;
    print_pair(&id, output);
    Ok(())
}

/// Print the identifier held by a path token
pub fn decode(token: &str, output: &Output) -> Result<()> {
    let id = DocumentId::decode(token).with_context(|| format!("Invalid token: {}", token))?;
    print_pair(&id, output);
    Ok(())
}

fn print_pair(id: &DocumentId, output: &Output) {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "id": id.to_string(),
                    "token": id.encode(),
                    "href": id.href(),
                })
            );
        }
        OutputFormat::Quiet => println!("{}", id.encode()),
        OutputFormat::Human => {
            println!("Identifier: {}", id);
            println!("Token:      {}", id.encode());
            println!("Link:       {}", id.href());
        }
    }
}
