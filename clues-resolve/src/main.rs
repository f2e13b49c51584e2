//! clues-resolve - property field resolution CLI
//!
//! **Usage:**
//! ```bash
//! clues-resolve resolve --address "<addr>" [--flat <file>] [--mls <file>] [--search] [--config <file>]
//! ```
//!
//! Stages run least to most authoritative: flat, then web search, then MLS.
//! Prints the grouped record JSON followed by the quality summary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clues_common::config::{load_or_default, TomlConfig};
use clues_common::logging::init_tracing;
use clues_resolve::adapters::flat::FlatAdapter;
use clues_resolve::adapters::mls::remarks::RemarksTaxonomy;
use clues_resolve::adapters::mls::MlsAdapter;
use clues_resolve::adapters::AdapterContext;
use clues_resolve::search::config::SearchFieldTable;
use clues_resolve::search::tavily::TavilyClient;
use clues_resolve::search::WebSearchFetcher;
use clues_resolve::{ResolutionPipeline, SchemaRegistry};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[clap(name = "clues-resolve")]
#[clap(about = "Resolve property fields from MLS, flat and web-search sources")]
struct Args {
    /// TOML config file (otherwise CLUES_CONFIG, then the standard locations)
    #[clap(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve one property and print the record
    Resolve {
        /// Full property address
        #[clap(long)]
        address: String,

        /// RESO-style MLS listing JSON
        #[clap(long, value_name = "FILE")]
        mls: Option<PathBuf>,

        /// Flat `{token: {value, source, ...}}` JSON
        #[clap(long, value_name = "FILE")]
        flat: Option<PathBuf>,

        /// Fetch fields through the configured web-search provider
        #[clap(long)]
        search: bool,
    },
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn build_pipeline(
    config: &TomlConfig,
    registry: Arc<SchemaRegistry>,
    mls: Option<&Path>,
    flat: Option<&Path>,
    search: bool,
) -> Result<ResolutionPipeline> {
    let mut pipeline = ResolutionPipeline::from_config(registry.clone(), config)?;

    if let Some(path) = flat {
        pipeline = pipeline.stage(Arc::new(FlatAdapter::new(registry.clone())), read_json(path)?);
    }

    if search {
        let table = SearchFieldTable::load_or_standard(config.search.field_config.as_deref())?;
        table.validate_against(&registry)?;
        match TavilyClient::from_config(config) {
            Ok(client) => {
                let fetcher = WebSearchFetcher::new(Arc::new(client), Arc::new(table), registry.clone())
                    .with_timeout(Duration::from_secs(config.search.timeout_secs));
                pipeline = pipeline.stage(Arc::new(fetcher), Value::Null);
            }
            Err(e) => warn!(error = %e, "Web search disabled"),
        }
    }

    if let Some(path) = mls {
        let taxonomy = RemarksTaxonomy::load_or_standard(config.taxonomy.path.as_deref())?;
        pipeline = pipeline.stage(Arc::new(MlsAdapter::new(Arc::new(taxonomy))), read_json(path)?);
    }

    Ok(pipeline)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Step 1: Configuration (missing file means defaults)
    let config = load_or_default(args.config.as_deref())?;
    init_tracing(&config.logging)?;
    info!("Starting clues-resolve {}", env!("CARGO_PKG_VERSION"));

    // Step 2: Schema
    let registry = Arc::new(SchemaRegistry::standard()?);

    match args.command {
        Command::Resolve {
            address,
            mls,
            flat,
            search,
        } => {
            // Step 3: Stages, least to most authoritative
            let pipeline =
                build_pipeline(&config, registry.clone(), mls.as_deref(), flat.as_deref(), search)?;
            info!(stages = ?pipeline.stage_names(), "Pipeline ready");

            // Step 4: Resolve and print
            let ctx = AdapterContext::for_address(&address);
            let resolution = pipeline.run(&ctx).await;

            println!("{}", serde_json::to_string_pretty(&resolution.record.to_grouped_json(&registry))?);
            println!("{}", serde_json::to_string_pretty(&resolution.report)?);

            for diagnostic in &resolution.diagnostics {
                eprintln!("stage {} failed: {}", diagnostic.stage, diagnostic.error);
            }
            for warning in &resolution.warnings {
                eprintln!("warning: {}", warning);
            }
        }
    }

    Ok(())
}
