//! Command handlers

pub mod codec;
pub mod config;
pub mod doc;
pub mod load;
pub mod query;
pub mod saved;
pub mod search;
pub mod serve;

use anyhow::{Context, Result};
use inspector_core::DocumentId;

/// Parse a document identifier given either as EDN text or as a path token
///
/// EDN text is tried first so `:hello` and `{:person-id 1}` work as typed;
/// anything that does not read as an identifier is decoded as a token.
pub fn parse_id(input: &str) -> Result<DocumentId> {
    if let Ok(id) = DocumentId::from_edn_text(input) {
        return Ok(id);
    }
    DocumentId::decode(input).with_context(|| format!("Invalid document identifier: {}", input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_accepts_edn_text() {
        let id = parse_id("{:person-id 1}").unwrap();
        assert!(id.is_composite());
        assert_eq!(id.to_string(), "{:person-id 1}");
    }

    #[test]
    fn test_parse_id_accepts_token() {
        let id = parse_id("_%7B%3Aperson-id%201%7D").unwrap();
        assert_eq!(id.to_string(), "{:person-id 1}");
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(parse_id("_%7B%3Aperson-id").is_err());
    }
}
