//! native-query CLI - inspect and update template tags of native queries
//!
//! Usage:
//!   native-query scan <query.sql>
//!   native-query classify <name>...
//!   native-query edit --document <doc.json> --text <query.sql> [--metadata <metadata.json>]
//!   native-query sync-snippets --document <doc.json> --snippets <snippets.json> [--metadata <metadata.json>]
//!
//! Examples:
//!   native-query scan report.sql
//!   native-query classify '#42-orders' 'snippet: filters' category
//!   native-query edit --document card.json --text report.sql > card.updated.json

use clap::{Parser, Subcommand};
use native_query::prelude::*;
use native_query::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "native-query")]
#[command(about = "Inspect and reconcile template tags of native queries")]
#[command(version)]
struct Cli {
    /// Path to a settings file (defaults to native-query.toml discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "native_query=trace" (defaults to RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tag names referenced by a query file
    Scan {
        /// Path to the query text
        file: PathBuf,
    },

    /// Print how tag names are classified
    Classify {
        /// Tag names, e.g. "#42-orders" or "snippet: filters"
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Apply a text edit to a query document and print the result
    Edit {
        /// Query document (JSON)
        #[arg(short, long)]
        document: PathBuf,

        /// New query text
        #[arg(short, long)]
        text: PathBuf,

        /// Database metadata (JSON). Without it the document's database is
        /// assumed to support parameters.
        #[arg(short, long)]
        metadata: Option<PathBuf>,
    },

    /// Bind and rename snippet references against a snippet list
    SyncSnippets {
        /// Query document (JSON)
        #[arg(short, long)]
        document: PathBuf,

        /// Snippet directory (JSON array of {"id", "name"})
        #[arg(short, long)]
        snippets: PathBuf,

        /// Database metadata (JSON)
        #[arg(short, long)]
        metadata: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let settings = match cli.config.as_deref() {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Scan { file } => cmd_scan(&file),
        Commands::Classify { names } => cmd_classify(&names),
        Commands::Edit {
            document,
            text,
            metadata,
        } => cmd_edit(settings, &document, &text, metadata.as_deref()),
        Commands::SyncSnippets {
            document,
            snippets,
            metadata,
        } => cmd_sync_snippets(settings, &document, &snippets, metadata.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_scan(file: &Path) -> Result<()> {
    let text = fs::read_to_string(file)?;
    for name in recognize_template_tags(&text) {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_classify(names: &[String]) -> Result<()> {
    for name in names {
        match classify(name) {
            Classification::Card { card_id: Some(id) } => println!("{}\tcard\t{}", name, id),
            Classification::Card { card_id: None } => println!("{}\tcard\t-", name),
            Classification::Snippet { snippet_name } => {
                println!("{}\tsnippet\t{}", name, snippet_name)
            }
            Classification::Variable => println!("{}\tvariable", name),
        }
    }
    Ok(())
}

fn cmd_edit(
    settings: Settings,
    document: &Path,
    text: &Path,
    metadata: Option<&Path>,
) -> Result<()> {
    let dataset = NativeDatasetQuery::from_json(&fs::read_to_string(document)?)?;
    let text = fs::read_to_string(text)?;

    let query = load_query(settings, dataset, metadata)?.set_query_text(text);
    println!("{}", query.dataset().to_json_pretty()?);
    Ok(())
}

fn cmd_sync_snippets(
    settings: Settings,
    document: &Path,
    snippets: &Path,
    metadata: Option<&Path>,
) -> Result<()> {
    let dataset = NativeDatasetQuery::from_json(&fs::read_to_string(document)?)?;
    let snippets: Vec<Snippet> = serde_json::from_str(&fs::read_to_string(snippets)?)?;

    let query = load_query(settings, dataset, metadata)?
        .update_snippets_with_ids(&snippets)
        .update_snippet_names(&snippets);
    println!("{}", query.dataset().to_json_pretty()?);
    Ok(())
}

fn load_query(
    settings: Settings,
    dataset: NativeDatasetQuery,
    metadata: Option<&Path>,
) -> Result<NativeQuery> {
    let metadata = match metadata {
        Some(path) => Metadata::from_json(&fs::read_to_string(path)?)?,
        None => {
            tracing::debug!(
                database = ?dataset.database,
                "no metadata given, assuming parameter support"
            );
            Metadata::assumed(dataset.database, settings.parameters.feature.clone())
        }
    };

    let context = QueryContext::new(metadata).with_settings(settings);
    Ok(NativeQuery::from_dataset(Arc::new(context), dataset))
}
