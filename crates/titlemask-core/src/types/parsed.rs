use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fields captured from a title by the first matching template.
///
/// Keys are the named capture groups of the template (`series_name`,
/// `season_no`, `video_codec`, ...). Groups that did not participate in
/// the match are absent. Values are taken from the clean title, so they
/// are lower-case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTitle {
    /// Id of the template that produced the fields.
    pub template: String,

    /// Captured fields by group name.
    pub fields: BTreeMap<String, String>,
}

impl ParsedTitle {
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn series_name(&self) -> Option<&str> {
        self.get("series_name")
    }

    pub fn episode_name(&self) -> Option<&str> {
        self.get("episode_name")
    }

    /// Season number, if captured.
    pub fn season(&self) -> Option<u32> {
        self.get("season_no").and_then(|s| s.parse().ok())
    }

    /// Episode number, if captured.
    pub fn episode(&self) -> Option<u32> {
        self.get("episode_no").and_then(|s| s.parse().ok())
    }

    pub fn year(&self) -> Option<u16> {
        self.get("year").and_then(|s| s.parse().ok())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consumes the result, keeping only the field map.
    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }
}

impl std::fmt::Display for ParsedTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ParsedTitle(template={:?}", self.template)?;
        for (name, value) in &self.fields {
            write!(f, ", {name}={value:?}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParsedTitle {
        let mut parsed = ParsedTitle::new("tv_episode");
        parsed.fields.insert("series_name".into(), "the wire".into());
        parsed.fields.insert("season_no".into(), "02".into());
        parsed.fields.insert("episode_no".into(), "05".into());
        parsed
    }

    #[test]
    fn new_parsed_title_is_empty() {
        let parsed = ParsedTitle::new("t");
        assert!(parsed.is_empty());
        assert_eq!(parsed.series_name(), None);
        assert_eq!(parsed.season(), None);
    }

    #[test]
    fn numeric_accessors_parse_captures() {
        let parsed = sample();
        assert_eq!(parsed.series_name(), Some("the wire"));
        assert_eq!(parsed.season(), Some(2));
        assert_eq!(parsed.episode(), Some(5));
        assert_eq!(parsed.year(), None);
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn parsed_title_display() {
        let display = sample().to_string();
        assert!(display.contains("tv_episode"));
        assert!(display.contains("series_name=\"the wire\""));
    }

    #[test]
    fn serializes_fields_as_map() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["fields"]["season_no"], "02");
        assert_eq!(json["template"], "tv_episode");
    }
}
