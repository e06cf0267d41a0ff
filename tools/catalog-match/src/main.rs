//! Catalog Match
//!
//! Classifies a torrent title dataset with the learned mask templates and
//! keeps the torrents whose series appears in a catalog, writing one JSON
//! object per line. With `--train` the run also updates the settings.

mod catalog;
mod fixtures;
mod pipeline;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use titlemask_core::{CharClassConfig, Engine, EngineConfig, FileStore, Mode, StructuralVars};
use tracing::{Level, debug, info, warn};

use crate::catalog::Catalog;
use crate::pipeline::RunPaths;

/// CLI arguments
#[derive(Parser)]
#[command(name = "catalog-match")]
#[command(about = "Match torrent titles against a series catalog")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Update template and vocabulary frequencies from the dataset
    #[arg(short = 't', long = "train")]
    train: bool,

    /// Settings directory
    #[arg(short, long, env = "TITLEMASK_SETTINGS", default_value = "settings")]
    settings: PathBuf,

    /// Directory holding the clean.json and mask.json fixtures
    #[arg(long, env = "TITLEMASK_FIXTURES", default_value = "test")]
    fixtures: PathBuf,

    /// Catalog CSV (`imdb_id,title`)
    #[arg(long, default_value = "datasets/imdb_tv_shows.csv")]
    shows: PathBuf,

    /// Torrent CSV (`torrent_id,title`)
    #[arg(long, default_value = "datasets/torrents_titles.csv")]
    torrents: PathBuf,

    /// JSON-lines output
    #[arg(short, long, default_value = "/tmp/torrents.json")]
    output: PathBuf,

    /// Stop after this many catalog matches (0 = no limit)
    #[arg(long, default_value_t = 1000)]
    limit: usize,

    /// Overwrite an existing output file
    #[arg(short, long)]
    force: bool,

    /// Characters kept literally in masks
    #[arg(long, default_value = "[]{}&@#\u{2019}%")]
    whitelist: String,
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose))
        .init();

    let mode = if cli.train { Mode::Training } else { Mode::Production };
    let mut store = FileStore::new(&cli.settings);
    let chars = CharClassConfig::default().with_whitelist(cli.whitelist.as_str());

    let mut engine = Engine::open(chars, &store, EngineConfig::default().with_mode(mode))
        .with_context(|| format!("failed to load settings from {}", cli.settings.display()))?;
    engine
        .compile(&StructuralVars::default())
        .context("failed to compile mask templates")?;
    info!(%mode, templates = engine.matchers().len(), "engine ready");

    let checked = fixtures::verify(engine.normalizer(), &cli.fixtures)
        .context("normalizer self-check failed")?;
    debug!(checked, "normalizer fixtures passed");

    let catalog = Catalog::load(&cli.shows, engine.normalizer())?;
    if catalog.is_empty() {
        warn!(file = %cli.shows.display(), "catalog is empty, nothing can match");
    }
    info!(shows = catalog.len(), "catalog loaded");

    let paths = RunPaths {
        torrents: &cli.torrents,
        output: &cli.output,
    };
    if let Some(summary) =
        pipeline::run(&mut engine, &catalog, &mut store, paths, cli.limit, cli.force)?
    {
        let report = serde_json::json!({ "summary": summary, "cache": engine.stats() });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
