//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::collections::BTreeMap;

use inspector_cli::api::models::DocumentResponse;
use inspector_core::{DocumentId, Keyword, QueryResult, SearchHit, Value, VersionInfo};
use serde::Serialize;

/// Widest a table cell may get before it is truncated
const MAX_CELL_WIDTH: usize = 48;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Pretty-print any serializable value as JSON
    pub fn print_json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize output: {}", e),
        }
    }

    /// Print a document's current attributes and version history
    pub fn print_document(
        &self,
        id: &DocumentId,
        attributes: &BTreeMap<Keyword, Value>,
        history: Vec<VersionInfo>,
    ) {
        match self.format {
            OutputFormat::Human => {
                println!("Document: {}", id);
                println!("Link:     {}", id.href());
                println!();
                let rows: Vec<Vec<String>> = attributes
                    .iter()
                    .map(|(k, v)| vec![k.to_string(), v.to_string()])
                    .collect();
                print_table(&["attribute", "value"], &rows);
                println!();
                println!("{} version(s)", history.len());
                if let Some(latest) = history.first() {
                    println!(
                        "Latest:   tx {} valid {}",
                        latest.tx_id,
                        latest.valid_time.format("%Y-%m-%d %H:%M:%S%.3f")
                    );
                }
            }
            OutputFormat::Json => {
                self.print_json(&DocumentResponse::new(id, attributes, history));
            }
            OutputFormat::Quiet => {
                for (k, v) in attributes {
                    println!("{}\t{}", k, v);
                }
            }
        }
    }

    /// Print version history, newest first
    pub fn print_history(&self, history: &[VersionInfo]) {
        match self.format {
            OutputFormat::Human => {
                let rows: Vec<Vec<String>> = history
                    .iter()
                    .map(|v| {
                        vec![
                            v.tx_id.to_string(),
                            v.valid_time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                            v.tx_time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                        ]
                    })
                    .collect();
                print_table(&["tx", "valid time", "tx time"], &rows);
                println!("\n{} version(s)", history.len());
            }
            OutputFormat::Json => self.print_json(&history),
            OutputFormat::Quiet => {
                for v in history {
                    println!("{}", v.tx_id);
                }
            }
        }
    }

    /// Print query results as a table
    pub fn print_query_result(&self, result: &QueryResult) {
        match self.format {
            OutputFormat::Human => {
                let rows: Vec<Vec<String>> = result
                    .rows
                    .iter()
                    .map(|row| row.iter().map(|cell| cell.render()).collect())
                    .collect();
                let columns: Vec<&str> = result.columns.iter().map(String::as_str).collect();
                print_table(&columns, &rows);
                println!("\n{} row(s)", result.rows.len());
            }
            OutputFormat::Json => self.print_json(result),
            OutputFormat::Quiet => {
                for row in &result.rows {
                    let cells: Vec<String> = row.iter().map(|cell| cell.render()).collect();
                    println!("{}", cells.join("\t"));
                }
            }
        }
    }

    /// Print search hits
    pub fn print_search_hits(&self, hits: &[SearchHit]) {
        match self.format {
            OutputFormat::Human => {
                if hits.is_empty() {
                    println!("No matches.");
                    return;
                }
                let rows: Vec<Vec<String>> = hits
                    .iter()
                    .map(|hit| {
                        vec![
                            hit.id.to_string(),
                            hit.attribute.to_string(),
                            hit.preview.clone(),
                        ]
                    })
                    .collect();
                print_table(&["document", "attribute", "preview"], &rows);
                println!("\n{} match(es)", hits.len());
            }
            OutputFormat::Json => {
                self.print_json(&serde_json::json!({ "results": hits }));
            }
            OutputFormat::Quiet => {
                for hit in hits {
                    println!("{}", hit.id);
                }
            }
        }
    }

    /// Print a list of names
    pub fn print_names(&self, names: &[String], empty: &str) {
        match self.format {
            OutputFormat::Human => {
                if names.is_empty() {
                    println!("{}", empty);
                    return;
                }
                for name in names {
                    println!("{}", name);
                }
            }
            OutputFormat::Json => self.print_json(&names),
            OutputFormat::Quiet => {
                for name in names {
                    println!("{}", name);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Print rows under a header, columns padded to their widest cell
fn print_table(header: &[&str], rows: &[Vec<String>]) {
    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count().min(MAX_CELL_WIDTH))
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", truncate(cell, MAX_CELL_WIDTH), width = width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    println!("{}", line(header.iter().map(|h| h.to_string()).collect()));
    println!(
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
    );
    for row in rows {
        println!("{}", line(row.clone()));
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        // counts characters, not bytes
        assert_eq!(truncate("ééééééééééé", 10), "ééééééé...");
    }
}
