//! # Vocabulary Store
//!
//! Known literal values per category (codecs, sources, release groups, ...)
//! with the number of times each value was observed in training. Each
//! category is persisted as its own settings document.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::settings::{self, SettingsStore};

/// Vocabulary category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    AudioCodecs,
    AudioChannels,
    VideoCodecs,
    VideoSources,
    VideoResolutions,
    ReleaseProps,
    ReleaseGroups,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Self::AudioCodecs,
        Self::AudioChannels,
        Self::VideoCodecs,
        Self::VideoSources,
        Self::VideoResolutions,
        Self::ReleaseProps,
        Self::ReleaseGroups,
    ];

    /// Settings document name, e.g. `audio_codecs`.
    pub fn settings_name(self) -> &'static str {
        match self {
            Self::AudioCodecs => "audio_codecs",
            Self::AudioChannels => "audio_channels",
            Self::VideoCodecs => "video_codecs",
            Self::VideoSources => "video_sources",
            Self::VideoResolutions => "video_resolutions",
            Self::ReleaseProps => "release_props",
            Self::ReleaseGroups => "release_groups",
        }
    }

    /// Template placeholder and capture group name, e.g. `audio_codec`.
    pub fn group_name(self) -> &'static str {
        match self {
            Self::AudioCodecs => "audio_codec",
            Self::AudioChannels => "audio_channel",
            Self::VideoCodecs => "video_codec",
            Self::VideoSources => "video_source",
            Self::VideoResolutions => "video_resolution",
            Self::ReleaseProps => "release_prop",
            Self::ReleaseGroups => "release_group",
        }
    }

    /// Inverse of [`Category::group_name`].
    pub fn from_group_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.group_name() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.settings_name())
    }
}

/// One known value of a category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    /// Observed frequency. Missing or `null` reads as 0.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub freq: u64,

    /// Any other metadata carried by the settings document.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl VocabularyEntry {
    pub fn with_freq(freq: u64) -> Self {
        Self {
            freq,
            extra: serde_json::Map::new(),
        }
    }
}

pub(crate) fn null_as_zero<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Values of one category, keyed by value as written in the settings.
#[derive(Debug, Clone, Default)]
struct CategoryValues {
    entries: BTreeMap<String, VocabularyEntry>,
    // lower-cased value -> key in `entries`
    folded: HashMap<String, String>,
}

impl CategoryValues {
    fn new(entries: BTreeMap<String, VocabularyEntry>) -> Self {
        let folded = entries
            .keys()
            .map(|key| (key.to_lowercase(), key.clone()))
            .collect();
        Self { entries, folded }
    }

    fn insert(&mut self, value: String, entry: VocabularyEntry) {
        self.folded.insert(value.to_lowercase(), value.clone());
        self.entries.insert(value, entry);
    }

    fn lookup_mut(&mut self, value: &str) -> Option<&mut VocabularyEntry> {
        let key = if self.entries.contains_key(value) {
            value.to_string()
        } else {
            self.folded.get(&value.to_lowercase())?.clone()
        };
        self.entries.get_mut(&key)
    }
}

/// All vocabulary categories.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    categories: BTreeMap<Category, CategoryValues>,
}

impl Vocabulary {
    /// Creates a vocabulary with every category empty.
    pub fn new() -> Self {
        Self {
            categories: Category::ALL
                .into_iter()
                .map(|c| (c, CategoryValues::default()))
                .collect(),
        }
    }

    /// Loads every category document from `store`.
    ///
    /// # Errors
    ///
    /// Fails on the first missing or malformed category document.
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> Result<Self> {
        let mut vocabulary = Self::new();
        for category in Category::ALL {
            let entries: BTreeMap<String, VocabularyEntry> =
                settings::load_json(store, category.settings_name())?;
            debug!(%category, values = entries.len(), "vocabulary loaded");
            vocabulary.set_category(category, entries);
        }
        Ok(vocabulary)
    }

    /// Writes every category document to `store`.
    pub fn save<S: SettingsStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        for category in Category::ALL {
            let entries = self.entries(category);
            settings::save_json(store, category.settings_name(), entries)?;
        }
        Ok(())
    }

    /// Replaces all values of `category`.
    pub fn set_category(&mut self, category: Category, entries: BTreeMap<String, VocabularyEntry>) {
        self.categories.insert(category, CategoryValues::new(entries));
    }

    /// Adds or replaces one value.
    pub fn insert(&mut self, category: Category, value: impl Into<String>, entry: VocabularyEntry) {
        self.categories
            .entry(category)
            .or_default()
            .insert(value.into(), entry);
    }

    /// Values of `category` in key order.
    pub fn entries(&self, category: Category) -> &BTreeMap<String, VocabularyEntry> {
        static EMPTY: BTreeMap<String, VocabularyEntry> = BTreeMap::new();
        self.categories
            .get(&category)
            .map_or(&EMPTY, |values| &values.entries)
    }

    pub fn get(&self, category: Category, value: &str) -> Option<&VocabularyEntry> {
        self.entries(category).get(value)
    }

    pub fn freq(&self, category: Category, value: &str) -> u64 {
        self.get(category, value).map_or(0, |entry| entry.freq)
    }

    /// Increments the frequency of `value`, matching keys case-insensitively.
    /// Returns `false` if the value is unknown.
    pub fn increment(&mut self, category: Category, value: &str) -> bool {
        let Some(entry) = self
            .categories
            .get_mut(&category)
            .and_then(|values| values.lookup_mut(value))
        else {
            return false;
        };
        entry.freq += 1;
        true
    }

    /// Total number of known values over all categories.
    pub fn len(&self) -> usize {
        self.categories.values().map(|v| v.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;

    fn store_with(category: Category, json: &str) -> MemoryStore {
        let mut store = MemoryStore::new();
        for c in Category::ALL {
            let doc = if c == category { json } else { "{}" };
            store = store.with(c.settings_name(), doc);
        }
        store
    }

    #[test]
    fn group_names_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_group_name(category.group_name()), Some(category));
        }
        assert_eq!(Category::from_group_name("series_name"), None);
    }

    #[test]
    fn load_reads_freq_and_metadata() {
        let store = store_with(
            Category::AudioCodecs,
            r#"{"AAC": {"freq": 4, "lossy": true}, "flac": {}, "dts": {"freq": null}}"#,
        );
        let vocab = Vocabulary::load(&store).unwrap();

        assert_eq!(vocab.freq(Category::AudioCodecs, "AAC"), 4);
        assert_eq!(vocab.freq(Category::AudioCodecs, "flac"), 0);
        assert_eq!(vocab.freq(Category::AudioCodecs, "dts"), 0);
        let aac = vocab.get(Category::AudioCodecs, "AAC").unwrap();
        assert_eq!(aac.extra["lossy"], serde_json::Value::Bool(true));
        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn load_fails_on_missing_category() {
        let store = MemoryStore::new().with("audio_codecs", "{}");
        assert!(Vocabulary::load(&store).is_err());
    }

    #[test]
    fn increment_is_case_insensitive() {
        let mut vocab = Vocabulary::new();
        vocab.insert(Category::VideoCodecs, "x264", VocabularyEntry::default());
        vocab.insert(Category::VideoSources, "WEB DL", VocabularyEntry::with_freq(2));

        assert!(vocab.increment(Category::VideoCodecs, "x264"));
        assert!(vocab.increment(Category::VideoSources, "web dl"));
        assert!(!vocab.increment(Category::VideoSources, "vhs"));
        assert!(!vocab.increment(Category::ReleaseGroups, "x264"));

        assert_eq!(vocab.freq(Category::VideoCodecs, "x264"), 1);
        assert_eq!(vocab.freq(Category::VideoSources, "WEB DL"), 3);
    }

    #[test]
    fn save_preserves_metadata() {
        let store = store_with(
            Category::ReleaseGroups,
            r#"{"rarbg": {"freq": 1, "note": "p2p"}}"#,
        );
        let mut vocab = Vocabulary::load(&store).unwrap();
        vocab.increment(Category::ReleaseGroups, "rarbg");

        let mut out = MemoryStore::new();
        vocab.save(&mut out).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(out.get("release_groups").unwrap()).unwrap();
        assert_eq!(saved["rarbg"]["freq"], 2);
        assert_eq!(saved["rarbg"]["note"], "p2p");
        assert_eq!(out.get("audio_codecs"), Some("{}"));
    }
}
