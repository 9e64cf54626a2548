//! Config command handlers

use std::path::Path;

use anyhow::Result;

use inspector_core::Config;

use crate::output::{Output, OutputFormat};

/// Show the effective configuration
pub fn show(config: &Config, config_path: Option<&Path>, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:          {}", config.data_dir.display());
            println!("  database:          {}", config.sqlite_path().display());
            println!("  bind:              {}", config.bind);
            println!("  query_timeout_ms:  {}", config.query_timeout_ms);
            println!("  search_timeout_ms: {}", config.search_timeout_ms);
            println!("  search_limit:      {}", config.search_limit);
            println!("  log_level:         {}", config.log_level);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Print the effective configuration as TOML, ready to save as a config file
pub fn dump(config: &Config) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
