mod fetcher;
mod headless;

use std::fs;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser as ClapParser;
use clap::Subcommand;
use collection_view_lib::CollectionView;
use collection_view_lib::cell::CellId;
use collection_view_lib::cell::SupplementaryKind;
use collection_view_lib::config::CollectionConfig;
use collection_view_lib::error::ConfigError;
use collection_view_lib::error::FetchError;
use collection_view_lib::model::Row;
use collection_view_lib::model::Value;
use collection_view_lib::pipeline::DataUpdate;
use collection_view_lib::pipeline::UpdateOutcome;
use collection_view_lib::template::HttpTemplateFetcher;
use collection_view_lib::template::TemplateCache;
use collection_view_lib::template::TemplateFetcher;
use fetcher::DirectoryFetcher;
use headless::HeadlessEngine;
use headless::PrintingHost;
use headless::PrintingRuntime;
use log::LevelFilter;
use log::info;
use serde::Deserialize;
use simplelog::ColorChoice;
use simplelog::Config;
use simplelog::TermLogger;
use simplelog::TerminalMode;
use simplelog::WriteLogger;

#[derive(ClapParser)]
#[command(name = "collection-view")]
#[command(about = "Drive a headless collection view from JSON files")]
struct Cli {
    /// Write debug logs to this file instead of the terminal
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Terminal log level
    #[arg(long, global = true, default_value = "warn")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a sequence of data updates through a collection view
    Replay {
        /// Collection configuration (JSON)
        config: PathBuf,
        /// Steps to replay (JSON array)
        steps: PathBuf,
        /// Directory holding `<template>.json` definitions
        #[arg(long, default_value = "templates")]
        templates: PathBuf,
        /// Number of items displayed after each step
        #[arg(long, default_value_t = 10)]
        viewport: usize,
        /// Do not print the republished data table
        #[arg(long)]
        quiet_data: bool,
    },
    /// Fetch one template definition from a server and print it
    Fetch {
        /// Server base URL
        base_url: String,
        /// Template name
        name: String,
        /// Path segment between the base URL and the name
        #[arg(long, default_value = "Mashups")]
        prefix: String,
        /// Extra request header, as `name=value`
        #[arg(long = "header")]
        headers: Vec<String>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid header '{0}', expected name=value")]
    Header(String),

    #[error(transparent)]
    View(#[from] collection_view_lib::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// One replay step.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Step {
    /// Replace the data with these rows.
    Rows(Vec<Row>),
    /// A host property change, e.g. `SortField`.
    Property { property: String, value: Value },
    /// Indices selected by another component.
    Select { source: String, select: Vec<usize> },
    /// A data update with explicit options.
    #[serde(rename_all = "camelCase")]
    Update {
        rows: Option<Vec<Row>>,
        #[serde(default)]
        force_layout: bool,
    },
    /// No data.
    Clear(()),
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn init_logging(cli: &Cli) {
    match &cli.log_file {
        Some(path) => {
            if let Ok(log_file) = File::create(path) {
                let _ = WriteLogger::init(LevelFilter::Debug, Config::default(), log_file);
            }
        }
        None => {
            let _ = TermLogger::init(
                cli.log_level,
                Config::default(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            );
        }
    }
}

// =============================================================================
// Replay
// =============================================================================

async fn replay(
    config: PathBuf,
    steps: PathBuf,
    templates: PathBuf,
    viewport: usize,
    quiet_data: bool,
) -> Result<(), CliError> {
    let config: CollectionConfig = read_json(&config)?;
    let steps: Vec<Step> = read_json(&steps)?;

    let view = CollectionView::builder(config)
        .cache(TemplateCache::new(DirectoryFetcher::new(templates)))
        .host(Arc::new(PrintingHost::new(quiet_data)))
        .engine(Arc::new(HeadlessEngine))
        .runtime(Arc::new(PrintingRuntime))
        .build()?;
    view.start().await;

    let mut visible: Vec<CellId> = Vec::new();
    for (index, step) in steps.into_iter().enumerate() {
        println!("step {}", index + 1);
        let outcome = match step {
            Step::Rows(rows) => Some(view.update_data(Some(rows)).await?),
            Step::Update { rows, force_layout } => Some(view.update(DataUpdate { rows, force_layout }).await?),
            Step::Clear(()) => Some(view.update_data(None).await?),
            Step::Property { property, value } => {
                view.property_changed(&property, value).await?;
                None
            }
            Step::Select { source, select } => {
                view.apply_external_selection(&source, &select);
                None
            }
        };
        if let Some(UpdateOutcome::Committed(report)) = outcome {
            info!("Step {} committed: {:?}", index + 1, report);
        }

        for cell in visible.drain(..) {
            view.recycle_cell(cell);
        }
        let snapshot = view.snapshot();
        let mut shown: Vec<CellId> = Vec::new();
        if snapshot.is_empty() {
            shown.extend(view.supplementary_cell(SupplementaryKind::Empty, 0));
        }
        for section in 0..snapshot.number_of_sections() {
            shown.extend(view.supplementary_cell(SupplementaryKind::Header, section));
        }
        for path in snapshot.index_paths().take(viewport) {
            shown.push(view.cell_for_item(path)?);
        }
        for cell in shown {
            view.display_cell(cell);
            visible.push(cell);
        }
        view.settle().await;
    }
    Ok(())
}

// =============================================================================
// Fetch
// =============================================================================

async fn fetch(base_url: &str, name: &str, prefix: String, headers: Vec<String>) -> Result<(), CliError> {
    let mut fetcher = HttpTemplateFetcher::new(base_url)?.with_path_prefix(prefix);
    for header in headers {
        let (key, value) = header.split_once('=').ok_or_else(|| CliError::Header(header.clone()))?;
        fetcher = fetcher.with_header(key, value);
    }

    let definition = fetcher.fetch(name).await?;
    match serde_json::to_string_pretty(&definition) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: {}", e),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Commands::Replay {
            config,
            steps,
            templates,
            viewport,
            quiet_data,
        } => replay(config, steps, templates, viewport, quiet_data).await,
        Commands::Fetch {
            base_url,
            name,
            prefix,
            headers,
        } => fetch(&base_url, &name, prefix, headers).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
