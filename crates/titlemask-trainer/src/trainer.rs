//! Training loop over a title dataset.

use std::fmt;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use titlemask_core::{
    CharClassConfig, Engine, EngineConfig, ParsedTitle, SettingsStore, StructuralVars,
};
use tracing::info;

use crate::data::load_titles;

/// Titles between two progress lines.
const DEFAULT_PROGRESS_INTERVAL: usize = 1000;

/// Summary of a training run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrainingReport {
    pub titles_seen: usize,
    pub matched: usize,
    pub distinct_masks: usize,
    /// Learned frequency per template, in template order.
    pub template_freqs: Vec<(String, u64)>,
}

impl TrainingReport {
    pub fn match_rate(&self) -> f64 {
        if self.titles_seen == 0 {
            0.0
        } else {
            self.matched as f64 / self.titles_seen as f64
        }
    }
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} titles, {} matched ({:.2}%), {} distinct masks",
            self.titles_seen,
            self.matched,
            self.match_rate() * 100.0,
            self.distinct_masks
        )?;
        for (id, freq) in &self.template_freqs {
            writeln!(f, "  {id:<32} {freq}")?;
        }
        Ok(())
    }
}

/// Runs an engine in training mode and persists what it learned into the
/// store it was loaded from.
pub struct Trainer<S: SettingsStore> {
    engine: Engine,
    store: S,
    titles_seen: usize,
    matched: usize,
    progress_interval: usize,
}

impl<S: SettingsStore> Trainer<S> {
    /// Loads settings from `store` and compiles them in training mode.
    pub fn new(chars: CharClassConfig, store: S, vars: &StructuralVars) -> anyhow::Result<Self> {
        let mut engine = Engine::open(chars, &store, EngineConfig::training())
            .context("failed to load settings")?;
        engine
            .compile(vars)
            .context("failed to compile mask templates")?;

        Ok(Self {
            engine,
            store,
            titles_seen: 0,
            matched: 0,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        })
    }

    /// Log progress every `interval` titles; 0 disables progress lines.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Classifies one title, recording feedback for every matching template.
    pub fn observe(&mut self, title: &str) -> anyhow::Result<Option<ParsedTitle>> {
        let parsed = self.engine.parse_title(title)?;
        self.titles_seen += 1;
        if parsed.is_some() {
            self.matched += 1;
        }
        if self.progress_interval > 0 && self.titles_seen % self.progress_interval == 0 {
            info!(
                titles = self.titles_seen,
                matched = self.matched,
                "training progress"
            );
        }
        Ok(parsed)
    }

    pub fn train_on_titles<I, T>(&mut self, titles: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for title in titles {
            self.observe(title.as_ref())?;
        }
        Ok(())
    }

    /// Trains on every title of a CSV (`id,title`) or line-per-title dataset.
    pub fn train_on_file<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let titles = load_titles(path)?;
        info!(file = %path.display(), titles = titles.len(), "training on dataset");
        self.train_on_titles(&titles)
    }

    pub fn report(&self) -> TrainingReport {
        TrainingReport {
            titles_seen: self.titles_seen,
            matched: self.matched,
            distinct_masks: self.engine.stats().distinct_masks,
            template_freqs: self
                .engine
                .templates()
                .iter()
                .map(|(id, template)| (id.to_string(), template.freq))
                .collect(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Persists the statistics and returns the run summary with the store.
    pub fn finish(mut self) -> anyhow::Result<(TrainingReport, S)> {
        self.engine
            .update_stats(&mut self.store)
            .context("failed to persist training statistics")?;
        let report = self.report();
        info!(
            titles = report.titles_seen,
            matched = report.matched,
            masks = report.distinct_masks,
            "training complete"
        );
        Ok((report, self.store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use titlemask_core::{Category, FileStore, MemoryStore, TEMPLATES, TemplateSet, Vocabulary};

    const TEMPLATES_JSON: &str = r#"{
        "tv_episode_group": {
            "pattern": "^{series_name} s{season_no}e{episode_no} {release_group}$",
            "samples": ["The.Wire.S02E05-LOL"],
            "freq": 99,
            "masks": [["stale", 99]]
        },
        "tv_episode": {
            "pattern": "^{series_name} s{season_no}e{episode_no}$",
            "samples": ["The Wire S02E05"]
        }
    }"#;

    fn documents() -> Vec<(String, String)> {
        let mut docs: Vec<(String, String)> = Category::ALL
            .into_iter()
            .map(|c| (c.settings_name().to_string(), "{}".to_string()))
            .collect();
        docs.push((
            "release_groups".into(),
            r#"{"LOL": {"freq": 3}, "ntb": {"freq": 0}}"#.into(),
        ));
        docs.push((TEMPLATES.into(), TEMPLATES_JSON.into()));
        docs
    }

    fn memory_store() -> MemoryStore {
        documents()
            .into_iter()
            .fold(MemoryStore::new(), |store, (name, doc)| store.with(name, doc))
    }

    fn trainer<S: SettingsStore>(store: S) -> Trainer<S> {
        Trainer::new(CharClassConfig::default(), store, &StructuralVars::default()).unwrap()
    }

    #[test]
    fn report_counts_titles_and_templates() {
        let mut t = trainer(memory_store());
        t.train_on_titles([
            "The.Wire.S02E05-LOL",
            "The.Wire.S02E06-LOL",
            "Lost.S01E01-NTb",
            "Lost S01E02",
            "Not a release",
        ])
        .unwrap();

        let report = t.report();
        assert_eq!(report.titles_seen, 5);
        assert_eq!(report.matched, 4);
        assert_eq!(report.distinct_masks, 4);
        assert_eq!(
            report.template_freqs,
            [("tv_episode_group".to_string(), 3), ("tv_episode".to_string(), 1)]
        );
        assert!((report.match_rate() - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn finish_persists_statistics() {
        let mut t = trainer(memory_store()).with_progress_interval(2);
        t.train_on_titles(["The.Wire.S02E05-LOL", "The.Wire.S02E06-LOL", "Lost.S01E01-NTb"])
            .unwrap();
        let (report, store) = t.finish().unwrap();
        assert_eq!(report.matched, 3);

        let templates = TemplateSet::load(&store).unwrap();
        let group = templates.get("tv_episode_group").unwrap();
        assert_eq!(group.freq, 3);
        // "lost" shape seen once and pruned, the stale mask was reset
        assert_eq!(group.mask_usage.sorted(), [("aaa_aaaa_a99a99_aaa", 2)]);

        let vocabulary = Vocabulary::load(&store).unwrap();
        assert_eq!(vocabulary.freq(Category::ReleaseGroups, "LOL"), 5);
        assert_eq!(vocabulary.freq(Category::ReleaseGroups, "ntb"), 1);
    }

    #[test]
    fn trains_from_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let settings = dir.path().join("settings");
        std::fs::create_dir(&settings).unwrap();
        for (name, doc) in documents() {
            std::fs::write(settings.join(format!("{name}.json")), doc).unwrap();
        }
        let dataset = dir.path().join("torrents.csv");
        std::fs::write(&dataset, "a1,The.Wire.S02E05-LOL\na2,The.Wire.S02E07-LOL\nbad row\n")
            .unwrap();

        let mut t = trainer(FileStore::new(&settings));
        t.train_on_file(&dataset).unwrap();
        let (report, _) = t.finish().unwrap();
        assert_eq!(report.titles_seen, 2);

        let saved = std::fs::read_to_string(settings.join("torrents_masks.json")).unwrap();
        let saved: serde_json::Value = serde_json::from_str(&saved).unwrap();
        assert_eq!(saved["tv_episode_group"]["freq"], 2);
        assert_eq!(saved["tv_episode"]["freq"], 0);
    }

    #[test]
    fn invalid_settings_fail_to_load() {
        let store = memory_store().with(TEMPLATES, r#"{"t": {"pattern": "{nope}", "samples": []}}"#);
        let err = Trainer::new(CharClassConfig::default(), store, &StructuralVars::default())
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("nope"));
    }
}
