//! # Classification Engine
//!
//! Classifies titles with the compiled matchers, using the mask of a title
//! as the key of an index of matchers known to succeed for that shape.
//!
//! The first title of a new mask scans every matcher in template order and
//! records all matchers that fire. Later titles with the same mask only try
//! the recorded matchers. The returned fields come from the first matcher
//! that fires: when several templates overlap, template order decides, and
//! that choice is never revisited for a mask.

use std::collections::HashMap;

use tracing::{debug, info, trace};

use crate::cache::{CacheStats, Memo};
use crate::compiler::{CompiledMatcher, PatternCompiler, StructuralVars};
use crate::error::{Result, TitlemaskError};
use crate::feedback;
use crate::normalize::{CharClassConfig, Normalizer};
use crate::settings::SettingsStore;
use crate::template::TemplateSet;
use crate::types::{Mode, ParsedTitle};
use crate::vocabulary::Vocabulary;

/// Configuration for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Production or training behavior.
    pub mode: Mode,
    /// Per-memo LRU capacity. `None` keeps every entry for the lifetime of
    /// the engine.
    pub cache_capacity: Option<usize>,
    /// Pre-populate the mask index from the templates' persisted masks
    /// (production only).
    pub seed_mask_index: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Production,
            cache_capacity: None,
            seed_mask_index: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration in training mode.
    pub fn training() -> Self {
        Self::default().with_mode(Mode::Training)
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Bound every memo to `capacity` entries.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn with_mask_seeding(mut self, enabled: bool) -> Self {
        self.seed_mask_index = enabled;
        self
    }
}

/// Mask-indexed title classifier.
///
/// # Examples
///
/// ```
/// use titlemask_core::{
///     CharClassConfig, Engine, EngineConfig, MaskTemplate, StructuralVars, TemplateSet,
///     Vocabulary,
/// };
///
/// let templates = TemplateSet::new().with(
///     "tv_episode",
///     MaskTemplate::new("^{series_name} s{season_no}e{episode_no}$")
///         .with_sample("the wire s02e05"),
/// );
/// let mut engine = Engine::new(
///     CharClassConfig::default(),
///     Vocabulary::new(),
///     templates,
///     EngineConfig::default(),
/// );
/// engine.compile(&StructuralVars::default()).unwrap();
///
/// let parsed = engine.parse_title("The Wire S02E05").unwrap().unwrap();
/// assert_eq!(parsed.series_name(), Some("the wire"));
/// assert_eq!(parsed.season(), Some(2));
/// assert_eq!(parsed.episode(), Some(5));
/// ```
pub struct Engine {
    config: EngineConfig,
    normalizer: Normalizer,
    vocabulary: Vocabulary,
    templates: TemplateSet,
    matchers: Option<Vec<CompiledMatcher>>,
    // mask -> positions in `matchers`, in the order they were recorded
    mask_index: HashMap<String, Vec<usize>>,
    clean_memo: Memo<String, String>,
    mask_memo: Memo<String, String>,
    parse_memo: Memo<String, Option<ParsedTitle>>,
    stats: CacheStats,
}

impl Engine {
    /// Creates an engine over already loaded settings. Call
    /// [`Engine::compile`] before classifying.
    pub fn new(
        chars: CharClassConfig,
        vocabulary: Vocabulary,
        templates: TemplateSet,
        config: EngineConfig,
    ) -> Self {
        let capacity = config.cache_capacity;
        Self {
            normalizer: Normalizer::new(chars),
            vocabulary,
            templates,
            matchers: None,
            mask_index: HashMap::new(),
            clean_memo: Memo::new(capacity),
            mask_memo: Memo::new(capacity),
            parse_memo: Memo::new(capacity),
            stats: CacheStats::default(),
            config,
        }
    }

    /// Loads vocabulary and templates from `store` and creates an engine.
    ///
    /// # Errors
    ///
    /// Any missing or malformed settings document.
    pub fn open<S: SettingsStore + ?Sized>(
        chars: CharClassConfig,
        store: &S,
        config: EngineConfig,
    ) -> Result<Self> {
        let vocabulary = Vocabulary::load(store)?;
        let templates = TemplateSet::load(store)?;
        Ok(Self::new(chars, vocabulary, templates, config))
    }

    /// Compiles every template. Must be called exactly once.
    ///
    /// In training mode the templates' statistics are reset. In production
    /// mode the mask index is seeded from the persisted masks unless
    /// seeding is disabled.
    ///
    /// # Errors
    ///
    /// `TitlemaskError::AlreadyCompiled` on a second call, otherwise any
    /// template rendering, compilation or sample error.
    pub fn compile(&mut self, vars: &StructuralVars) -> Result<()> {
        if self.matchers.is_some() {
            return Err(TitlemaskError::AlreadyCompiled);
        }

        let mode = self.config.mode;
        let compiler = PatternCompiler::new(&self.vocabulary, vars, mode);
        let matchers = compiler.compile(&self.templates, &self.normalizer)?;

        if mode.is_training() {
            self.templates.reset_statistics();
        } else if self.config.seed_mask_index {
            for (position, matcher) in matchers.iter().enumerate() {
                let template = self.templates.at(matcher.template_index());
                for mask in template.mask_usage.masks() {
                    self.mask_index
                        .entry(mask.to_string())
                        .or_default()
                        .push(position);
                }
            }
        }

        info!(
            %mode,
            matchers = matchers.len(),
            seeded_masks = self.mask_index.len(),
            "matchers compiled"
        );
        self.matchers = Some(matchers);
        Ok(())
    }

    /// Clean form of `title`, memoized per raw title.
    pub fn clean_title(&mut self, title: &str) -> String {
        if let Some(clean) = self.clean_memo.get(title) {
            self.stats.clean_hits += 1;
            return clean.clone();
        }
        let clean = self.normalizer.clean(title);
        self.clean_memo.insert(title.to_string(), clean.clone());
        clean
    }

    /// Mask of `title`, memoized per clean title.
    pub fn mask_title(&mut self, title: &str) -> String {
        let clean = self.clean_title(title);
        self.mask_of_clean(&clean)
    }

    /// Classifies `title`.
    ///
    /// Returns `Ok(None)` when no template matches. Production results are
    /// memoized per raw title; in training mode every call goes through the
    /// matchers so that every occurrence is counted.
    ///
    /// # Errors
    ///
    /// `TitlemaskError::NotCompiled` if [`Engine::compile`] was not called.
    pub fn parse_title(&mut self, title: &str) -> Result<Option<ParsedTitle>> {
        if self.matchers.is_none() {
            return Err(TitlemaskError::NotCompiled);
        }

        let training = self.config.mode.is_training();
        if !training {
            if let Some(cached) = self.parse_memo.get(title) {
                self.stats.parse_hits += 1;
                return Ok(cached.clone());
            }
        }

        let clean = self.clean_title(title);
        let mask = self.mask_of_clean(&clean);
        let parsed = self.classify(&clean, &mask);
        trace!(title, %mask, matched = parsed.is_some(), "title classified");

        if !training {
            self.parse_memo.insert(title.to_string(), parsed.clone());
        }
        Ok(parsed)
    }

    /// Persists the training statistics to `store`.
    ///
    /// # Errors
    ///
    /// `TitlemaskError::TrainingDisabled` in production mode, otherwise any
    /// write error.
    pub fn update_stats<S: SettingsStore + ?Sized>(&mut self, store: &mut S) -> Result<()> {
        if !self.config.mode.is_training() {
            return Err(TitlemaskError::TrainingDisabled);
        }
        feedback::finalize(&self.vocabulary, &mut self.templates, store)
    }

    /// Template ids recorded for `mask`, in the order they are tried.
    pub fn mask_candidates(&self, mask: &str) -> Option<Vec<&str>> {
        let matchers = self.matchers.as_ref()?;
        self.mask_index
            .get(mask)
            .map(|positions| positions.iter().map(|&i| matchers[i].id()).collect())
    }

    pub fn matchers(&self) -> &[CompiledMatcher] {
        self.matchers.as_deref().unwrap_or_default()
    }

    pub fn is_compiled(&self) -> bool {
        self.matchers.is_some()
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            distinct_masks: self.mask_index.len(),
            memoized_titles: self.parse_memo.len(),
            ..self.stats.clone()
        }
    }

    fn mask_of_clean(&mut self, clean: &str) -> String {
        if let Some(mask) = self.mask_memo.get(clean) {
            self.stats.mask_hits += 1;
            return mask.clone();
        }
        let mask = self.normalizer.translate(clean);
        self.mask_memo.insert(clean.to_string(), mask.clone());
        mask
    }

    fn classify(&mut self, clean: &str, mask: &str) -> Option<ParsedTitle> {
        let training = self.config.mode.is_training();
        let matchers = self.matchers.as_ref()?;
        let mut first: Option<ParsedTitle> = None;

        match self.mask_index.get(mask) {
            Some(candidates) => {
                self.stats.index_hits += 1;
                for &position in candidates {
                    let matcher = &matchers[position];
                    let Some(captures) = matcher.captures(clean) else {
                        continue;
                    };
                    if first.is_none() {
                        first = Some(matcher.to_parsed(&captures));
                    }
                    if !training {
                        break;
                    }
                    feedback::record_match(
                        &mut self.vocabulary,
                        &mut self.templates,
                        matcher,
                        mask,
                        &captures,
                    );
                }
            }
            None => {
                self.stats.scans += 1;
                let mut fired = Vec::new();
                for (position, matcher) in matchers.iter().enumerate() {
                    let Some(captures) = matcher.captures(clean) else {
                        continue;
                    };
                    fired.push(position);
                    if first.is_none() {
                        first = Some(matcher.to_parsed(&captures));
                    }
                    if training {
                        feedback::record_match(
                            &mut self.vocabulary,
                            &mut self.templates,
                            matcher,
                            mask,
                            &captures,
                        );
                    }
                }

                debug!(%mask, candidates = fired.len(), "new mask indexed");
                let foreign: String = self.normalizer.unclassified(mask).collect();
                if !foreign.is_empty() {
                    trace!(%mask, %foreign, "mask contains unclassified characters");
                }
                self.mask_index.insert(mask.to_string(), fired);
            }
        }

        if first.is_none() {
            self.stats.misses += 1;
        }
        first
    }
}
