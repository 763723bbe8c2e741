//! Patient Features CLI
//!
//! Computes time-windowed lab features from event and lab tables.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use patient_features::{
    config::{parse_name_list, parse_windows, Config},
    core::{ExportBuilder, FeatureEngine, FeatureSchema, FeatureTable},
    stats::create_shared_stats,
    table::{read_records, render_records, write_output, PatientEvent, PatientLab, TableFormat},
    AggFunc, WindowAnchor, VERSION,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patient-features")]
#[command(version = VERSION)]
#[command(about = "Time-windowed patient lab features for ML pipelines", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct IoArgs {
    /// Patient events table (.json array or .jsonl)
    #[arg(long)]
    events: PathBuf,

    /// Patient labs table (.json array or .jsonl)
    #[arg(long)]
    labs: PathBuf,

    /// Output file (prints to stdout if omitted)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Output format (json or jsonl)
    #[arg(long)]
    format: Option<TableFormat>,

    /// Wrap rows in an envelope with run metadata and statistics
    #[arg(long)]
    envelope: bool,

    /// Worker threads, partitioned by patient
    #[arg(long)]
    workers: Option<usize>,

    /// Comma-separated lab types
    #[arg(long)]
    lab_types: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Latest lab value at or before each event
    AsOf {
        #[command(flatten)]
        io: IoArgs,

        /// Ignore labs older than this many seconds before the event
        #[arg(long)]
        tolerance_secs: Option<u64>,

        /// Return null lab values instead of searching further back
        #[arg(long)]
        keep_nulls: bool,
    },

    /// Numeric aggregates over trailing day windows
    Sliding {
        #[command(flatten)]
        io: IoArgs,

        /// Comma-separated window lengths in days
        #[arg(long)]
        windows: Option<String>,

        /// Comma-separated aggregate functions
        #[arg(long)]
        aggs: Option<String>,

        /// Window start anchoring (exact or calendar-day)
        #[arg(long)]
        anchor: Option<WindowAnchor>,
    },

    /// Raw lab readings in a trailing window of seconds
    EventWindow {
        #[command(flatten)]
        io: IoArgs,

        /// Window length in seconds
        #[arg(long)]
        window_secs: Option<u64>,
    },

    /// Print the output columns the configuration produces
    Schema {
        #[arg(value_enum)]
        kind: SchemaKind,
    },

    /// Show configuration
    Config {
        /// Write the effective configuration back to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaKind {
    AsOf,
    Sliding,
    EventWindow,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .with_context(|| format!("loading config from {}", config_path.display()))?;

    match cli.command {
        Commands::AsOf {
            io,
            tolerance_secs,
            keep_nulls,
        } => {
            if let Some(types) = &io.lab_types {
                config.as_of.lab_types = parse_name_list(types);
            }
            if tolerance_secs.is_some() {
                config.as_of.tolerance_secs = tolerance_secs;
            }
            if keep_nulls {
                config.as_of.skip_nulls = false;
            }
            let params = config.as_of.clone();
            cmd_compute(&config, &io, |engine, events, labs| {
                Ok(engine.lab_as_of_features(events, labs, &params)?)
            })
        }
        Commands::Sliding {
            io,
            windows,
            aggs,
            anchor,
        } => {
            if let Some(types) = &io.lab_types {
                config.sliding_window.lab_types = parse_name_list(types);
            }
            if let Some(windows) = windows {
                config.sliding_window.windows_in_days =
                    parse_windows(&windows).map_err(anyhow::Error::msg)?;
            }
            if let Some(aggs) = aggs {
                config.sliding_window.agg_funcs = AggFunc::parse_list(&aggs)?;
            }
            if let Some(anchor) = anchor {
                config.sliding_window.anchor = anchor;
            }
            let params = config.sliding_window.clone();
            cmd_compute(&config, &io, |engine, events, labs| {
                Ok(engine.sliding_window_numeric_aggregates(events, labs, &params)?)
            })
        }
        Commands::EventWindow { io, window_secs } => {
            if let Some(types) = &io.lab_types {
                config.event_window.lab_types = parse_name_list(types);
            }
            if let Some(secs) = window_secs {
                config.event_window.window_size_in_seconds = secs;
            }
            let params = config.event_window.clone();
            cmd_compute(&config, &io, |engine, events, labs| {
                Ok(engine.events_based_lab_features(events, labs, &params)?)
            })
        }
        Commands::Schema { kind } => cmd_schema(&config, kind),
        Commands::Config { save } => {
            if save {
                match &cli.config {
                    Some(path) => config.save_to(path),
                    None => config.save(),
                }
                .with_context(|| format!("saving config to {}", config_path.display()))?;
                tracing::info!(path = %config_path.display(), "saved config");
            }
            cmd_config(&config, &config_path)
        }
    }
}

/// Read inputs, run one feature function, and write the result.
fn cmd_compute<F>(config: &Config, io: &IoArgs, run: F) -> Result<()>
where
    F: FnOnce(&FeatureEngine, &[PatientEvent], &[PatientLab]) -> Result<FeatureTable>,
{
    let events: Vec<PatientEvent> = read_records(&io.events)
        .with_context(|| format!("reading events from {}", io.events.display()))?;
    let labs: Vec<PatientLab> = read_records(&io.labs)
        .with_context(|| format!("reading labs from {}", io.labs.display()))?;

    let workers = io.workers.unwrap_or(config.workers);
    let stats = create_shared_stats();
    let engine = FeatureEngine::new(workers).with_stats(stats.clone());

    tracing::info!(
        events = events.len(),
        labs = labs.len(),
        workers = engine.workers(),
        "computing features"
    );
    let table = run(&engine, &events, &labs)?;

    let format = io
        .format
        .or_else(|| io.output.as_deref().map(TableFormat::from_path))
        .unwrap_or(config.output_format);

    let rendered = if io.envelope {
        if format == TableFormat::Jsonl {
            bail!("--envelope requires json output");
        }
        let export = ExportBuilder::new().build(&table, Some(stats.snapshot()));
        serde_json::to_string_pretty(&export)?
    } else {
        render_records(&table.records(), format)?
    };

    match &io.output {
        Some(path) => {
            write_output(path, &rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(rows = table.len(), path = %path.display(), "wrote feature table");
        }
        None => println!("{rendered}"),
    }

    eprintln!("{}", stats.summary());
    Ok(())
}

fn cmd_schema(config: &Config, kind: SchemaKind) -> Result<()> {
    let schema = match kind {
        SchemaKind::AsOf => FeatureSchema::as_of(&config.as_of.lab_types, Vec::new())?,
        SchemaKind::Sliding => FeatureSchema::sliding_window(
            &config.sliding_window.lab_types,
            &config.sliding_window.windows_in_days,
            &config.sliding_window.agg_funcs,
        )?,
        SchemaKind::EventWindow => FeatureSchema::event_window(&config.event_window.lab_types)?,
    };

    for name in schema.column_names() {
        println!("{name}");
    }
    if matches!(kind, SchemaKind::AsOf) {
        println!("(plus any passthrough event attributes, after event_ts)");
    }
    Ok(())
}

fn cmd_config(config: &Config, path: &Path) -> Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {path:?}");
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
