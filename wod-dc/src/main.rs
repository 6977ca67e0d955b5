//! wod-dc - Workout catalog cleaning pipeline
//!
//! Batch CLI over the CrossFit workout catalog: clean, enrich, merge,
//! publish, plus the duplicate scan and library pruning maintenance
//! passes. Each subcommand reads its inputs, runs one phase, writes its
//! outputs and a run report, and exits.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wod_common::config::{KnowledgeConfig, RunLimits};

use wod_dc::clients::{AiClient, Cache, FileCache, MetadataLookup, NullCache, TextSearch, WebSearchClient};
use wod_dc::io;
use wod_dc::pipeline::Pipeline;
use wod_dc::services::fill_router::FillRouter;
use wod_dc::services::report::RunReport;
use wod_dc::services::{dedup, LibraryPruner};

/// Command-line arguments for wod-dc
#[derive(Parser, Debug)]
#[command(name = "wod-dc")]
#[command(about = "Workout catalog cleaning and enrichment pipeline")]
#[command(version)]
struct Args {
    /// Knowledge tables TOML; compiled-in defaults when omitted
    #[arg(short, long, env = "WOD_DC_CONFIG")]
    config: Option<PathBuf>,

    /// Run report path (a .json artifact lands next to it)
    #[arg(long, default_value = "report.md")]
    report: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Offline cleaning: normalize fields and flag what needs a value
    Clean {
        /// Raw catalog, CSV or a prior JSON catalog
        #[arg(short, long)]
        input: PathBuf,
        /// Working catalog output (JSON)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Run the filler chain over flagged records
    Enrich {
        /// Working catalog (JSON)
        #[arg(short, long)]
        input: PathBuf,
        /// Enriched catalog output (JSON)
        #[arg(short, long)]
        output: PathBuf,
        /// AI call budget for this run
        #[arg(long, env = "WOD_DC_MAX_AI_CALLS")]
        max_ai_calls: Option<usize>,
        /// Allow web searches for citations
        #[arg(long)]
        enable_web: bool,
        /// Offline fillers only: no AI, no web, no cache writes
        #[arg(long)]
        dry_run: bool,
        /// Query cache file
        #[arg(long, default_value = "fill_cache.json")]
        cache: PathBuf,
        /// AI chat-completions endpoint
        #[arg(long, env = "WOD_DC_AI_ENDPOINT")]
        ai_endpoint: Option<String>,
        /// AI API key
        #[arg(long, env = "WOD_DC_AI_KEY", hide_env_values = true)]
        ai_key: Option<String>,
        /// Web search endpoint
        #[arg(long, env = "WOD_DC_WEB_ENDPOINT")]
        web_endpoint: Option<String>,
        /// Web search API key
        #[arg(long, env = "WOD_DC_WEB_KEY", hide_env_values = true)]
        web_key: Option<String>,
    },
    /// Fold an enriched batch back into the base catalog
    Merge {
        /// Base catalog (JSON)
        #[arg(short, long)]
        base: PathBuf,
        /// Enriched batch (JSON)
        #[arg(short, long)]
        enriched: PathBuf,
        /// Merged catalog output (JSON)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Gate and apply targeted overrides, producing the published catalog
    Publish {
        /// Working catalog (JSON)
        #[arg(short, long)]
        input: PathBuf,
        /// Published catalog output (JSON)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Report duplicate and near-duplicate workout names
    Dedup {
        /// Catalog to scan (JSON)
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Prune parsing artifacts from the movement/equipment library
    Prune {
        /// Directory holding the four library CSV tables
        #[arg(short, long)]
        library_dir: PathBuf,
    },
}

fn load_config(path: &Option<PathBuf>) -> Result<KnowledgeConfig> {
    match path {
        Some(p) => KnowledgeConfig::load_from_path(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(KnowledgeConfig::default()),
    }
}

/// Read a catalog from CSV or JSON by extension
fn load_catalog(path: &PathBuf, report: &mut RunReport) -> Result<Vec<wod_common::record::Workout>> {
    if path.extension().and_then(|e| e.to_str()) == Some("csv") {
        let (workouts, stats) = io::load_workouts(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        report.ids_assigned = stats.ids_assigned;
        report.rows_failed = stats.rows_failed;
        Ok(workouts)
    } else {
        io::read_workouts(path).with_context(|| format!("Failed to load {}", path.display()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wod_dc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = load_config(&args.config)?;
    let mut limits = RunLimits::default();
    let mut report = RunReport::new(Utc::now().to_rfc3339());

    match args.command {
        Command::Clean { input, output } => {
            let mut workouts = load_catalog(&input, &mut report)?;
            let pipeline = Pipeline::new(&config, &limits);
            pipeline.clean(&mut workouts, &mut report);
            io::write_workouts(&output, &workouts)?;
        }

        Command::Enrich {
            input,
            output,
            max_ai_calls,
            enable_web,
            dry_run,
            cache,
            ai_endpoint,
            ai_key,
            web_endpoint,
            web_key,
        } => {
            if let Some(budget) = max_ai_calls {
                limits.max_ai_calls = budget;
            }

            let ai: Option<Arc<dyn MetadataLookup>> = if dry_run {
                info!("Dry run: offline fillers only");
                None
            } else {
                match (ai_endpoint, ai_key) {
                    (Some(endpoint), Some(key)) => Some(Arc::new(
                        AiClient::new(endpoint, key, limits.ai_min_interval_ms)
                            .context("Failed to build AI client")?,
                    )),
                    _ => {
                        info!("No AI endpoint configured, offline fillers only");
                        None
                    }
                }
            };

            let web: Option<Arc<dyn TextSearch>> = match (enable_web, web_endpoint, web_key) {
                (true, Some(endpoint), Some(key)) if !dry_run => Some(Arc::new(
                    WebSearchClient::new(endpoint, key, limits.web_min_interval_ms)
                        .context("Failed to build web search client")?,
                )),
                _ => None,
            };

            let cache: Arc<dyn Cache> = if dry_run {
                Arc::new(NullCache)
            } else {
                Arc::new(FileCache::open(&cache))
            };

            let mut workouts = load_catalog(&input, &mut report)?;
            report.rows_processed = workouts.len();
            let pipeline = Pipeline::new(&config, &limits);
            let mut router = FillRouter::new(&config, &limits, ai, web, cache);
            pipeline.enrich(&mut workouts, &mut router, &mut report).await;
            if dry_run {
                info!(path = %output.display(), "Dry run: catalog not written");
            } else {
                io::write_workouts(&output, &workouts)?;
            }
        }

        Command::Merge {
            base,
            enriched,
            output,
        } => {
            let base_catalog = load_catalog(&base, &mut report)?;
            let enriched_catalog = load_catalog(&enriched, &mut report)?;
            let pipeline = Pipeline::new(&config, &limits);
            let merged = pipeline.merge_batch(&base_catalog, &enriched_catalog, &mut report);
            report.rows_processed = merged.len();
            io::write_workouts(&output, &merged)?;
        }

        Command::Publish { input, output } => {
            let workouts = load_catalog(&input, &mut report)?;
            report.rows_processed = workouts.len();
            let pipeline = Pipeline::new(&config, &limits);
            let published = pipeline.publish(&workouts, &mut report);
            io::write_workouts(&output, &published)?;
        }

        Command::Dedup { input } => {
            let workouts = load_catalog(&input, &mut report)?;
            report.rows_processed = workouts.len();
            let dedup_report = dedup::detect(&workouts);
            report.absorb_dedup(&dedup_report);
            for group in &dedup_report.exact_groups {
                info!(canonical = %group.canonical, members = group.members.len(),
                    "Duplicate group");
            }
            for near in &dedup_report.near_duplicates {
                info!(left = %near.left.1, right = %near.right.1,
                    similarity = near.similarity, "Near duplicate");
            }
        }

        Command::Prune { library_dir } => {
            let paths = io::LibraryPaths::in_dir(&library_dir);
            let mut library = io::load_library(&paths)
                .with_context(|| format!("Failed to load library from {}", library_dir.display()))?;
            let pruner = LibraryPruner::new(&config)?;
            let outcome = pruner.prune(&mut library);
            report.absorb_prune(&outcome);
            io::write_library(&paths, &library)?;
        }
    }

    io::write_report(&args.report, &report)?;
    info!(report = %args.report.display(), "Run complete");
    Ok(())
}
