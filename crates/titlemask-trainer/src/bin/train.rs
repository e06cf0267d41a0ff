//! Training run over a title dataset.
//!
//! Loads the settings directory, classifies every title of the dataset in
//! training mode and writes the learned statistics back into the same
//! directory.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use titlemask_core::{CharClassConfig, FileStore, StructuralVars};
use titlemask_trainer::Trainer;
use tracing::Level;

/// CLI arguments
#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Learn vocabulary and mask statistics from a title dataset")]
#[command(version)]
struct Cli {
    /// Dataset: `id,title` CSV (.csv) or one title per line
    dataset: PathBuf,

    /// Settings directory, updated in place
    #[arg(short, long, env = "TITLEMASK_SETTINGS", default_value = "settings")]
    settings: PathBuf,

    /// Characters kept literally in masks
    #[arg(short, long, default_value = "")]
    whitelist: String,

    /// Log a progress line every N titles
    #[arg(long, default_value_t = 1000)]
    progress: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
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

    let chars = CharClassConfig::default().with_whitelist(cli.whitelist);
    let store = FileStore::new(&cli.settings);
    let mut trainer = Trainer::new(chars, store, &StructuralVars::default())?
        .with_progress_interval(cli.progress);

    trainer.train_on_file(&cli.dataset)?;
    let (report, _) = trainer.finish()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
