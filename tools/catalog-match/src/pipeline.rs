//! One catalog-match run: classify the torrents unless the output already
//! exists, then persist training statistics if anything was classified.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use titlemask_core::{Engine, SettingsStore};
use tracing::{info, warn};

use crate::catalog::{Catalog, CrossReference, Summary};

/// Input and output files of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunPaths<'a> {
    pub torrents: &'a Path,
    pub output: &'a Path,
}

/// Classifies `paths.torrents` into `paths.output`.
///
/// Returns `None` when the output exists and `force` is off. Statistics are
/// written to `store` only after a training engine actually classified the
/// dataset; a skipped run leaves the settings untouched.
pub fn run<S: SettingsStore + ?Sized>(
    engine: &mut Engine,
    catalog: &Catalog,
    store: &mut S,
    paths: RunPaths<'_>,
    limit: usize,
    force: bool,
) -> Result<Option<Summary>> {
    if paths.output.exists() && !force {
        if engine.mode().is_training() {
            warn!(
                file = %paths.output.display(),
                "output exists, training skipped and settings left unchanged (use --force)"
            );
        } else {
            info!(file = %paths.output.display(), "output exists, skipping classification");
        }
        return Ok(None);
    }

    let started = Instant::now();
    let torrents = File::open(paths.torrents)
        .with_context(|| format!("failed to open {}", paths.torrents.display()))?;
    let output = File::create(paths.output)
        .with_context(|| format!("failed to create {}", paths.output.display()))?;

    let summary = CrossReference::new(engine, catalog)
        .with_limit(limit)
        .run(torrents, BufWriter::new(output))?;
    info!(
        classified = summary.classified,
        found = summary.found,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "classification complete"
    );

    if engine.mode().is_training() {
        engine
            .update_stats(store)
            .context("failed to persist training statistics")?;
    }

    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use titlemask_core::{
        Category, CharClassConfig, EngineConfig, MemoryStore, Normalizer, StructuralVars,
        TEMPLATES,
    };

    const TEMPLATES_JSON: &str = r#"{"tv_episode": {
        "pattern": "^{series_name} s{season_no}e{episode_no}$",
        "samples": ["The Wire S02E05"],
        "freq": 40,
        "masks": [["aaa_aaaa_a99a99", 40]]
    }}"#;

    fn settings() -> MemoryStore {
        Category::ALL
            .into_iter()
            .fold(MemoryStore::new().with(TEMPLATES, TEMPLATES_JSON), |store, c| {
                store.with(c.settings_name(), "{}")
            })
    }

    fn training_engine(store: &MemoryStore) -> Engine {
        let mut engine =
            Engine::open(CharClassConfig::default(), store, EngineConfig::training()).unwrap();
        engine.compile(&StructuralVars::default()).unwrap();
        engine
    }

    fn catalog() -> Catalog {
        Catalog::from_reader("tt0306414,The Wire\n".as_bytes(), &Normalizer::default()).unwrap()
    }

    #[test]
    fn skipped_training_run_keeps_learned_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let torrents = dir.path().join("torrents.csv");
        let output = dir.path().join("out.json");
        std::fs::write(&torrents, "a1,The.Wire.S02E05\n").unwrap();
        std::fs::write(&output, "").unwrap();

        let mut store = settings();
        let mut engine = training_engine(&store);
        let paths = RunPaths { torrents: &torrents, output: &output };

        let summary = run(&mut engine, &catalog(), &mut store, paths, 0, false).unwrap();
        assert!(summary.is_none());

        let saved: serde_json::Value =
            serde_json::from_str(store.get(TEMPLATES).unwrap()).unwrap();
        assert_eq!(saved["tv_episode"]["freq"], 40);
        assert_eq!(saved["tv_episode"]["masks"], serde_json::json!([["aaa_aaaa_a99a99", 40]]));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
    }

    #[test]
    fn forced_training_run_persists_new_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let torrents = dir.path().join("torrents.csv");
        let output = dir.path().join("out.json");
        std::fs::write(&torrents, "a1,The.Wire.S02E05\na2,The.Wire.S02E06\n").unwrap();
        std::fs::write(&output, "").unwrap();

        let mut store = settings();
        let mut engine = training_engine(&store);
        let paths = RunPaths { torrents: &torrents, output: &output };

        let summary = run(&mut engine, &catalog(), &mut store, paths, 0, true)
            .unwrap()
            .unwrap();
        assert_eq!(summary.found, 2);

        let saved: serde_json::Value =
            serde_json::from_str(store.get(TEMPLATES).unwrap()).unwrap();
        assert_eq!(saved["tv_episode"]["freq"], 2);
        assert_eq!(saved["tv_episode"]["masks"], serde_json::json!([["aaa_aaaa_a99a99", 2]]));
        assert_eq!(std::fs::read_to_string(&output).unwrap().lines().count(), 2);
    }

    #[test]
    fn production_run_never_writes_settings() {
        let dir = tempfile::tempdir().unwrap();
        let torrents = dir.path().join("torrents.csv");
        let output = dir.path().join("out.json");
        std::fs::write(&torrents, "a1,The.Wire.S02E05\n").unwrap();

        let mut store = settings();
        let mut engine =
            Engine::open(CharClassConfig::default(), &store, EngineConfig::default()).unwrap();
        engine.compile(&StructuralVars::default()).unwrap();
        let before = store.get(TEMPLATES).unwrap().to_string();

        let paths = RunPaths { torrents: &torrents, output: &output };
        let summary = run(&mut engine, &catalog(), &mut store, paths, 0, false)
            .unwrap()
            .unwrap();
        assert_eq!(summary.found, 1);
        assert_eq!(store.get(TEMPLATES).unwrap(), before);
    }
}
