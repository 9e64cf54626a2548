//! Inspector CLI
//!
//! Command-line interface for the bitemporal document inspector: browse
//! documents, edit attributes, run Datalog queries, search, and serve the
//! HTTP API.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use inspector_core::{Config, StorageError, Store, ValueKind};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "inspector")]
#[command(about = "Inspector - browse, edit, query and search a bitemporal document store")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on (overrides the configured bind address)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show a document's current attributes
    #[command(alias = "show")]
    Doc {
        /// Identifier as EDN text (`:hello`, `{:person-id 1}`) or path token
        id: String,
    },
    /// Set one attribute on a document
    #[command(alias = "set")]
    Put {
        /// Identifier as EDN text or path token
        id: String,
        /// Attribute keyword, e.g. `:email`
        #[arg(allow_hyphen_values = true)]
        attr: String,
        /// Raw value text
        #[arg(allow_hyphen_values = true)]
        value: String,
        /// How to read the value: string, number, boolean or edn
        #[arg(short, long, default_value_t = ValueKind::String)]
        kind: ValueKind,
    },
    /// Show the version history of a document
    History {
        /// Identifier as EDN text or path token
        id: String,
    },
    /// Run a Datalog query
    Query {
        /// Query text, e.g. `{:find [e] :where [[e :xt/id _]]}`
        query: String,
        /// Value for an `:in` variable, as EDN text (repeatable, in order)
        #[arg(short, long = "param")]
        param: Vec<String>,
    },
    /// Manage saved queries
    Saved {
        #[command(subcommand)]
        command: SavedCommands,
    },
    /// Full-text search over attribute values
    Search {
        /// Search terms; a trailing `*` matches by prefix
        #[arg(required = true)]
        terms: Vec<String>,
    },
    /// Load documents from an EDN file
    Load {
        /// File holding document maps, each with an `:xt/id`
        file: PathBuf,
    },
    /// Print the path token for an identifier
    Encode {
        /// Identifier as EDN text
        id: String,
    },
    /// Print the identifier held by a path token
    Decode {
        /// Path token, e.g. `_%7B%3Aperson-id%201%7D`
        token: String,
    },
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum SavedCommands {
    /// List saved query names
    #[command(alias = "ls")]
    List,
    /// Save (or overwrite) a named query
    Save {
        name: String,
        /// Query text
        query: String,
    },
    /// Print a saved query's text
    Show { name: String },
    /// Delete a saved query
    #[command(alias = "rm")]
    Delete { name: String },
    /// Run a saved query
    Run {
        name: String,
        /// Value for an `:in` variable, as EDN text (repeatable, in order)
        #[arg(short, long = "param")]
        param: Vec<String>,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Print the configuration as TOML
    Dump,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            if let Some(hint) = recovery_hint(&err) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// Recovery suggestion carried by the root cause, if any
fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(e) = err.downcast_ref::<inspector_core::Error>() {
        return e.recovery_suggestion();
    }
    err.downcast_ref::<StorageError>()
        .and_then(StorageError::recovery_suggestion)
}

async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = Config::load_with_override(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    // Commands that don't need the store
    match &cli.command {
        Commands::Encode { id } => return commands::codec::encode(id, &output),
        Commands::Decode { token } => return commands::codec::decode(token, &output),
        Commands::Config { command } => {
            return match command.unwrap_or(ConfigCommands::Show) {
                ConfigCommands::Show => {
                    commands::config::show(&config, cli.config.as_deref(), &output)
                }
                ConfigCommands::Dump => commands::config::dump(&config),
            };
        }
        _ => {}
    }

    let store = Store::open_with_config(config)?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| store.config().bind.clone());
            commands::serve::run(store, &bind, &output).await
        }
        Commands::Doc { id } => commands::doc::show(&store, &id, &output),
        Commands::Put {
            id,
            attr,
            value,
            kind,
        } => commands::doc::put(&store, &id, &attr, &value, kind, &output),
        Commands::History { id } => commands::doc::history(&store, &id, &output),
        Commands::Query { query, param } => commands::query::run(&store, &query, &param, &output),
        Commands::Saved { command } => handle_saved_command(command, &store, &output),
        Commands::Search { terms } => commands::search::run(&store, &terms, &output),
        Commands::Load { file } => commands::load::run(&store, &file, &output),
        Commands::Encode { .. } | Commands::Decode { .. } | Commands::Config { .. } => Ok(()),
    }
}

fn handle_saved_command(command: SavedCommands, store: &Store, output: &Output) -> Result<()> {
    match command {
        SavedCommands::List => commands::saved::list(store, output),
        SavedCommands::Save { name, query } => commands::saved::save(store, &name, &query, output),
        SavedCommands::Show { name } => commands::saved::show(store, &name, output),
        SavedCommands::Delete { name } => commands::saved::delete(store, &name, output),
        SavedCommands::Run { name, param } => commands::saved::run(store, &name, &param, output),
    }
}

/// Log to stderr so stdout stays clean for command output
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(config: &Config) {
    let level = &config.log_level;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "inspector={},inspector_core={},inspector_cli={}",
            level, level, level
        ))
    });

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
