//! Terralog CLI
//!
//! Command-line interface for the terralog measurement engine:
//! - Inspect datasets and their statistics
//! - Interpolate values and scan for jumps and coverage gaps
//! - Log records, split and remove datasets

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use terralog::config::{generate_default_config, Config, StoreBackend};
use terralog::engine::{find_date_gaps, LifecycleManager, NewRecord, QueryEngine};
use terralog::store::{CatalogStore, IdAllocator, MemoryStore, RecordStore, SqliteStore};
use terralog::Error;

#[derive(Parser)]
#[command(name = "terralog")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Environmental measurement time-series engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (default: standard locations)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List datasets, optionally filtered by site and instrument
    List {
        /// Site id
        #[arg(long)]
        site: Option<i64>,

        /// Instrument id
        #[arg(long)]
        instrument: Option<i64>,
    },

    /// Show one dataset's metadata and record count
    Show {
        /// Dataset id
        dataset: i64,
    },

    /// Mean, standard deviation and count of calibrated values
    Stats {
        /// Dataset id
        dataset: i64,
    },

    /// Interpolate the value at a point in time
    Value {
        /// Dataset id
        dataset: i64,

        /// Time (RFC 3339, e.g. 2026-08-30T12:00:00Z)
        time: String,
    },

    /// Scan for value jumps above a threshold
    Jumps {
        /// Dataset id
        dataset: i64,

        /// Minimum absolute difference between consecutive values
        threshold: f64,

        /// Scan start (RFC 3339)
        #[arg(long)]
        start: Option<String>,

        /// Scan end (RFC 3339)
        #[arg(long)]
        end: Option<String>,
    },

    /// Report coverage gaps at a site/instrument
    Gaps {
        /// Site id
        site: i64,

        /// Instrument id
        instrument: i64,

        /// Report start (RFC 3339)
        #[arg(long)]
        start: Option<String>,

        /// Report end (RFC 3339)
        #[arg(long)]
        end: Option<String>,
    },

    /// Log one record into a dataset
    Log {
        /// Dataset id
        dataset: i64,

        /// Raw (uncalibrated) value
        value: f64,

        /// Measurement time (RFC 3339, default: now)
        #[arg(long)]
        time: Option<String>,

        /// Sample label
        #[arg(long)]
        sample: Option<String>,

        /// Comment
        #[arg(long)]
        comment: Option<String>,
    },

    /// Split a dataset in two at a point in time
    Split {
        /// Dataset id
        dataset: i64,

        /// Cut time (RFC 3339)
        time: String,
    },

    /// Delete datasets and their records. Irreversible.
    Remove {
        /// Dataset ids
        datasets: Vec<i64>,

        /// Actually delete; without this flag nothing happens
        #[arg(long)]
        force: bool,
    },

    /// Print a default config file to stdout
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load_default(),
    };
    init_logging(&config);

    if matches!(cli.command, Commands::Config) {
        print!("{}", generate_default_config());
        return Ok(());
    }

    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("memory store selected; data will not be persisted");
            run(&MemoryStore::new(), cli)
        }
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(&config.store.path)
                .with_context(|| format!("opening database {}", config.store.path))?;
            run(&store, cli)
        }
    }
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("terralog={}", config.logging.level).into());
    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn run<S>(store: &S, cli: Cli) -> Result<()>
where
    S: RecordStore + CatalogStore + IdAllocator,
{
    let engine = QueryEngine::new(store);

    match cli.command {
        Commands::List { site, instrument } => {
            let datasets = store
                .list_datasets(site, instrument)
                .map_err(Error::from)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&datasets)?);
            } else {
                for dataset in datasets {
                    println!("{dataset}");
                }
            }
        }

        Commands::Show { dataset } => {
            let dataset = load(store, dataset)?;
            let size = engine.size(&dataset)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&dataset)?);
            } else {
                println!("{dataset}");
                println!("  measured by: {}", dataset.measured_by);
                println!("  start: {}", format_opt(dataset.start));
                println!("  end:   {}", format_opt(dataset.end));
                println!("  records: {size}");
                if let Some(expression) = dataset.expression() {
                    println!("  expression: {expression}");
                }
            }
        }

        Commands::Stats { dataset } => {
            let dataset = load(store, dataset)?;
            let stats = engine.statistics(&dataset)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!(
                    "mean={:.4} stddev={:.4} n={}",
                    stats.mean, stats.stddev, stats.count
                );
            }
        }

        Commands::Value { dataset, time } => {
            let dataset = load(store, dataset)?;
            let time = parse_time(&time)?;
            let (value, distance) = engine.find_value(&dataset, time)?;
            println!("{value:.4} (nearest record {distance:.1} s away)");
        }

        Commands::Jumps {
            dataset,
            threshold,
            start,
            end,
        } => {
            let dataset = load(store, dataset)?;
            let start = start.as_deref().map(parse_time).transpose()?;
            let end = end.as_deref().map(parse_time).transpose()?;
            let mut found = 0usize;
            for record in engine.find_jumps(&dataset, threshold, start, end)? {
                println!(
                    "{}  value {}",
                    record.time,
                    record.value.map_or("null".to_string(), |v| v.to_string())
                );
                found += 1;
            }
            println!("{found} jumps above {threshold}");
        }

        Commands::Gaps {
            site,
            instrument,
            start,
            end,
        } => {
            let start = start.as_deref().map(parse_time).transpose()?;
            let end = end.as_deref().map(parse_time).transpose()?;
            match find_date_gaps(store, site, instrument, start, end)? {
                None => println!("no datasets at site {site}, instrument {instrument}"),
                Some(gaps) if gaps.is_empty() => println!("no gaps"),
                Some(gaps) => {
                    for (from, until) in gaps {
                        println!("{from} .. {until}");
                    }
                }
            }
        }

        Commands::Log {
            dataset,
            value,
            time,
            sample,
            comment,
        } => {
            let dataset = load(store, dataset)?;
            let record = engine.add_record(
                &dataset,
                NewRecord {
                    id: None,
                    value: Some(value),
                    time: time.as_deref().map(parse_time).transpose()?,
                    sample,
                    comment,
                },
            )?;
            println!(
                "logged record {} at {} into {}",
                record.id, record.time, dataset
            );
        }

        Commands::Split { dataset, time } => {
            let time = parse_time(&time)?;
            let manager = LifecycleManager::new(store);
            let (original, copy) = manager.split(dataset, time)?;
            println!("split {original}");
            println!("  continued in {copy}");
        }

        Commands::Remove { datasets, force } => {
            if datasets.is_empty() {
                bail!("no dataset ids given");
            }
            if !force {
                bail!("removal is irreversible; pass --force to proceed");
            }
            let manager = LifecycleManager::new(store);
            manager.remove(&datasets)?;
            println!("removed {} dataset(s)", datasets.len());
        }

        Commands::Config => unreachable!("handled before the store is opened"),
    }

    Ok(())
}

fn load<S: CatalogStore>(store: &S, id: i64) -> Result<terralog::model::Dataset> {
    Ok(store
        .get_dataset(id)
        .map_err(Error::from)?
        .ok_or(Error::DatasetNotFound(id))?)
}

fn parse_time(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("invalid RFC 3339 time: {text}"))
}

fn format_opt(time: Option<DateTime<Utc>>) -> String {
    time.map_or("-".to_string(), |t| t.to_rfc3339())
}
