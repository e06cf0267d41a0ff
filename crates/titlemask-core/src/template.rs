//! # Mask Templates
//!
//! A mask template is a parametrized pattern describing one title shape
//! (e.g. series + season + episode) together with literal sample titles it
//! must match. Templates keep the order of the settings document; that
//! order is the order in which matchers are tried.

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::Result;
use crate::settings::{self, SettingsStore, TEMPLATES};

/// Per-mask usage counter of one template.
///
/// Persisted as a list of `[mask, count]` pairs, most used first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskUsage {
    counts: HashMap<String, u64>,
}

impl MaskUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, mask: &str) {
        *self.counts.entry(mask.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, mask: &str) -> u64 {
        self.counts.get(mask).copied().unwrap_or(0)
    }

    /// Drops masks seen at most `min_count` times.
    pub fn prune(&mut self, min_count: u64) {
        self.counts.retain(|_, count| *count > min_count);
    }

    /// Entries by count descending, then mask ascending.
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .counts
            .iter()
            .map(|(mask, count)| (mask.as_str(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    pub fn masks(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<(String, u64)> for MaskUsage {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

impl Serialize for MaskUsage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.sorted())
    }
}

impl<'de> Deserialize<'de> for MaskUsage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Older documents stored the usage as an object.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Pairs(Vec<(String, u64)>),
            Object(HashMap<String, u64>),
            Null,
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Pairs(pairs) => pairs.into_iter().collect(),
            Repr::Object(counts) => Self { counts },
            Repr::Null => Self::default(),
        })
    }
}

/// One title shape.
///
/// A template missing its `pattern` or its `samples` is a draft: it is kept
/// and persisted like any other but never compiled into a matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskTemplate {
    /// Pattern with `{placeholder}` slots; `{{` and `}}` are literal braces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Titles the compiled pattern must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<String>>,

    /// Number of titles matched during training.
    #[serde(default, deserialize_with = "crate::vocabulary::null_as_zero")]
    pub freq: u64,

    /// Masks of the titles matched during training.
    #[serde(default, rename = "masks")]
    pub mask_usage: MaskUsage,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MaskTemplate {
    /// A compilable template with no samples yet.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            samples: Some(Vec::new()),
            freq: 0,
            mask_usage: MaskUsage::default(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_sample(mut self, sample: impl Into<String>) -> Self {
        self.samples.get_or_insert_with(Vec::new).push(sample.into());
        self
    }

    /// Pattern and samples, or `None` for a draft.
    pub fn compilable(&self) -> Option<(&str, &[String])> {
        match (&self.pattern, &self.samples) {
            (Some(pattern), Some(samples)) => Some((pattern.as_str(), samples.as_slice())),
            _ => None,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.compilable().is_none()
    }
}

/// Ordered collection of templates keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateSet {
    templates: Vec<(String, MaskTemplate)>,
    index: HashMap<String, usize>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the templates document from `store`.
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> Result<Self> {
        let templates: Self = settings::load_json(store, TEMPLATES)?;
        debug!(templates = templates.len(), "mask templates loaded");
        Ok(templates)
    }

    /// Writes the templates document to `store`.
    pub fn save<S: SettingsStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        settings::save_json(store, TEMPLATES, self)
    }

    /// Appends a template. A template with an existing id is replaced in place.
    pub fn push(&mut self, id: impl Into<String>, template: MaskTemplate) {
        let id = id.into();
        match self.index.get(&id) {
            Some(&position) => self.templates[position].1 = template,
            None => {
                self.index.insert(id.clone(), self.templates.len());
                self.templates.push((id, template));
            }
        }
    }

    /// Builder form of [`TemplateSet::push`].
    pub fn with(mut self, id: impl Into<String>, template: MaskTemplate) -> Self {
        self.push(id, template);
        self
    }

    pub fn get(&self, id: &str) -> Option<&MaskTemplate> {
        self.index.get(id).map(|&i| &self.templates[i].1)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id_at(&self, position: usize) -> &str {
        &self.templates[position].0
    }

    pub fn at(&self, position: usize) -> &MaskTemplate {
        &self.templates[position].1
    }

    pub fn at_mut(&mut self, position: usize) -> &mut MaskTemplate {
        &mut self.templates[position].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MaskTemplate)> {
        self.templates.iter().map(|(id, t)| (id.as_str(), t))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut MaskTemplate)> {
        self.templates.iter_mut().map(|(id, t)| (id.as_str(), t))
    }

    /// Zeroes `freq` and empties the mask usage of every template.
    pub fn reset_statistics(&mut self) {
        for (_, template) in &mut self.templates {
            template.freq = 0;
            template.mask_usage.clear();
        }
    }

    /// Drops masks seen only once from every template.
    pub fn prune_mask_usage(&mut self) {
        for (_, template) in &mut self.templates {
            template.mask_usage.prune(1);
        }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Serialize for TemplateSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.templates.len()))?;
        for (id, template) in &self.templates {
            map.serialize_entry(id, template)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TemplateSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = TemplateSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of mask templates keyed by id")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut set = TemplateSet::new();
                while let Some((id, template)) = access.next_entry::<String, MaskTemplate>()? {
                    set.push(id, template);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;

    #[test]
    fn document_order_is_preserved() {
        let json = r#"{
            "zeta": {"pattern": "^{series_name}$", "samples": ["a"]},
            "alpha": {"pattern": "^{year}$", "samples": []},
            "mid": {"pattern": "x"}
        }"#;
        let set: TemplateSet = serde_json::from_str(json).unwrap();

        let ids: Vec<&str> = set.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["zeta", "alpha", "mid"]);
        assert_eq!(set.position("alpha"), Some(1));
        assert!(set.get("mid").unwrap().is_draft());
        assert!(!set.get("alpha").unwrap().is_draft());

        let back = serde_json::to_string(&set).unwrap();
        let zeta = back.find("zeta").unwrap();
        let alpha = back.find("alpha").unwrap();
        assert!(zeta < alpha);
    }

    #[test]
    fn incomplete_templates_load_as_drafts() {
        let store = MemoryStore::new().with(
            TEMPLATES,
            r#"{"no_pattern": {"samples": []}, "no_samples": {"pattern": "^x$", "freq": 3}}"#,
        );
        let set = TemplateSet::load(&store).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.get("no_pattern").unwrap().is_draft());
        assert!(set.get("no_samples").unwrap().is_draft());

        // Absent keys stay absent when written back.
        let json = serde_json::to_value(&set).unwrap();
        assert!(json["no_pattern"].get("pattern").is_none());
        assert!(json["no_samples"].get("samples").is_none());
        assert_eq!(json["no_samples"]["freq"], 3);
    }

    #[test]
    fn mask_usage_reads_pairs_objects_and_null() {
        let t: MaskTemplate =
            serde_json::from_str(r#"{"pattern": "p", "masks": [["m1", 1], ["m2", 3]]}"#).unwrap();
        assert_eq!(t.mask_usage.count("m2"), 3);

        let t: MaskTemplate =
            serde_json::from_str(r#"{"pattern": "p", "masks": {"m1": 2}}"#).unwrap();
        assert_eq!(t.mask_usage.count("m1"), 2);

        let t: MaskTemplate =
            serde_json::from_str(r#"{"pattern": "p", "masks": null, "freq": null}"#).unwrap();
        assert!(t.mask_usage.is_empty());
        assert_eq!(t.freq, 0);
    }

    #[test]
    fn mask_usage_serializes_most_used_first() {
        let usage: MaskUsage = [
            ("b".to_string(), 2),
            ("a".to_string(), 2),
            ("c".to_string(), 7),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_value(&usage).unwrap();
        assert_eq!(json, serde_json::json!([["c", 7], ["a", 2], ["b", 2]]));
    }

    #[test]
    fn prune_drops_single_observations() {
        let mut set = TemplateSet::new().with("t", MaskTemplate::new("p"));
        let usage: MaskUsage = [("m1".to_string(), 1), ("m2".to_string(), 3)]
            .into_iter()
            .collect();
        set.at_mut(0).mask_usage = usage;

        set.prune_mask_usage();

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["t"]["masks"], serde_json::json!([["m2", 3]]));
    }

    #[test]
    fn reset_statistics_clears_counters() {
        let mut template = MaskTemplate::new("p");
        template.freq = 9;
        template.mask_usage.record("m");
        let mut set = TemplateSet::new().with("t", template);

        set.reset_statistics();

        assert_eq!(set.at(0).freq, 0);
        assert!(set.at(0).mask_usage.is_empty());
    }

    #[test]
    fn push_replaces_existing_id_in_place() {
        let set = TemplateSet::new()
            .with("a", MaskTemplate::new("1"))
            .with("b", MaskTemplate::new("2"))
            .with("a", MaskTemplate::new("3"));

        assert_eq!(set.len(), 2);
        assert_eq!(set.id_at(0), "a");
        assert_eq!(set.at(0).pattern.as_deref(), Some("3"));
    }

    #[test]
    fn extra_keys_round_trip() {
        let t: MaskTemplate =
            serde_json::from_str(r#"{"pattern": "p", "comment": "hand written"}"#).unwrap();
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["comment"], "hand written");
    }
}
