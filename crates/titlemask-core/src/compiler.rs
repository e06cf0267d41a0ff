//! # Pattern Compiler
//!
//! Renders mask templates into regexes. Structural placeholders (`year`,
//! `series_name`, ...) are replaced by caller supplied sub-patterns and
//! vocabulary placeholders (`audio_codec`, `release_group`, ...) by an
//! alternation group over the category's values. Every compiled matcher is
//! checked against its template's samples.

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::{Captures, Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::error::{Result, TitlemaskError};
use crate::normalize::Normalizer;
use crate::template::TemplateSet;
use crate::types::{Mode, ParsedTitle};
use crate::vocabulary::{Category, Vocabulary, VocabularyEntry};

/// Large vocabularies (release groups especially) produce big alternations.
const REGEX_SIZE_LIMIT: usize = 64 * (1 << 20);

/// Sub-patterns substituted for the structural placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralVars {
    pub year: String,
    pub space: String,
    pub series_name: String,
    pub episode_name: String,
    pub season_no: String,
    pub episode_no: String,
}

impl Default for StructuralVars {
    fn default() -> Self {
        Self {
            year: r"(?P<year>19\d\d|20\d\d)".into(),
            space: r"(?:[\s]?)".into(),
            series_name: r"(?P<series_name>[\w\d\s]*?[\w\d])".into(),
            episode_name: r"(?P<episode_name>.*?)".into(),
            season_no: r"(?P<season_no>\d{1,2})".into(),
            episode_no: r"(?P<episode_no>\d{1,2})".into(),
        }
    }
}

impl StructuralVars {
    /// Placeholder name and sub-pattern pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("year", self.year.as_str()),
            ("space", self.space.as_str()),
            ("series_name", self.series_name.as_str()),
            ("episode_name", self.episode_name.as_str()),
            ("season_no", self.season_no.as_str()),
            ("episode_no", self.episode_no.as_str()),
        ]
        .into_iter()
    }
}

/// Regex compiled from one mask template.
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    template: usize,
    id: String,
    regex: Regex,
}

impl CompiledMatcher {
    /// Id of the owning template.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Position of the owning template in its [`TemplateSet`].
    pub fn template_index(&self) -> usize {
        self.template
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// The fully substituted pattern.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn captures<'t>(&self, clean: &'t str) -> Option<Captures<'t>> {
        self.regex.captures(clean)
    }

    /// Named groups of `captures` that participated in the match.
    pub fn to_parsed(&self, captures: &Captures<'_>) -> ParsedTitle {
        let mut parsed = ParsedTitle::new(&self.id);
        for name in self.regex.capture_names().flatten() {
            if let Some(m) = captures.name(name) {
                parsed.fields.insert(name.to_string(), m.as_str().to_string());
            }
        }
        parsed
    }
}

/// Builds the alternation group for one category.
///
/// Production keeps only values seen before, most frequent first, ties in
/// key order. Training keeps every value, sorted ascending.
pub fn alternation_group(
    category: Category,
    entries: &BTreeMap<String, VocabularyEntry>,
    mode: Mode,
) -> String {
    let choices: Vec<String> = match mode {
        Mode::Production => {
            let mut ranked: Vec<(&String, u64)> = entries
                .iter()
                .filter(|(_, entry)| entry.freq > 0)
                .map(|(value, entry)| (value, entry.freq))
                .collect();
            // stable sort: equal frequencies stay in key order
            ranked.sort_by(|a, b| b.1.cmp(&a.1));

            let mut seen = HashSet::new();
            ranked
                .into_iter()
                .map(|(value, _)| regex::escape(&value.to_lowercase()))
                .filter(|choice| seen.insert(choice.clone()))
                .collect()
        }
        Mode::Training => {
            let mut choices: Vec<String> = entries
                .keys()
                .map(|value| regex::escape(&value.to_lowercase()))
                .collect();
            choices.sort();
            choices.dedup();
            choices
        }
    };

    format!("(?P<{}>{})", category.group_name(), choices.join("|"))
}

/// Substitutes placeholders and compiles templates.
pub struct PatternCompiler {
    mode: Mode,
    vars: HashMap<&'static str, String>,
    empty_groups: HashSet<&'static str>,
}

impl PatternCompiler {
    pub fn new(vocabulary: &Vocabulary, structural: &StructuralVars, mode: Mode) -> Self {
        let mut vars = HashMap::new();
        let mut empty_groups = HashSet::new();

        for category in Category::ALL {
            let entries = vocabulary.entries(category);
            let group = alternation_group(category, entries, mode);
            if group == format!("(?P<{}>)", category.group_name()) {
                empty_groups.insert(category.group_name());
            }
            vars.insert(category.group_name(), group);
        }
        for (name, pattern) in structural.iter() {
            vars.insert(name, pattern.to_string());
        }

        Self {
            mode,
            vars,
            empty_groups,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Sub-pattern substituted for `name`, if any.
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Substitutes every `{placeholder}` of `pattern`.
    ///
    /// # Errors
    ///
    /// `TitlemaskError::UnknownPlaceholder` for a placeholder with no
    /// variable, `TitlemaskError::TemplateSyntax` for unbalanced braces.
    pub fn render(&self, id: &str, pattern: &str) -> Result<String> {
        let syntax = |reason: &str| TitlemaskError::TemplateSyntax {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        let mut out = String::with_capacity(pattern.len() * 2);
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => return Err(syntax("unclosed '{' in pattern")),
                        }
                    }
                    let value = self.vars.get(name.as_str()).ok_or_else(|| {
                        TitlemaskError::UnknownPlaceholder {
                            id: id.to_string(),
                            placeholder: name.clone(),
                        }
                    })?;
                    if self.empty_groups.contains(name.as_str()) {
                        warn!(template = id, group = %name, "alternation group has no values");
                    }
                    out.push_str(value);
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '}' => return Err(syntax("single '}' encountered in pattern")),
                c => out.push(c),
            }
        }

        Ok(out)
    }

    /// Compiles every template in order and validates its samples. Drafts
    /// (no pattern or no samples) are skipped.
    ///
    /// # Errors
    ///
    /// Fails on the first template that cannot be rendered or compiled, or
    /// whose compiled regex does not match one of its samples.
    pub fn compile(
        &self,
        templates: &TemplateSet,
        normalizer: &Normalizer,
    ) -> Result<Vec<CompiledMatcher>> {
        let mut matchers = Vec::with_capacity(templates.len());

        for (position, (id, template)) in templates.iter().enumerate() {
            let Some((source, samples)) = template.compilable() else {
                debug!(template = id, "draft template skipped");
                continue;
            };
            let pattern = self.render(id, source)?;
            let regex = RegexBuilder::new(&pattern)
                .size_limit(REGEX_SIZE_LIMIT)
                .build()
                .map_err(|source| TitlemaskError::TemplateCompile {
                    id: id.to_string(),
                    pattern: pattern.clone(),
                    source,
                })?;

            for sample in samples {
                let clean = normalizer.clean(sample);
                if !regex.is_match(&clean) {
                    return Err(TitlemaskError::SampleMismatch {
                        id: id.to_string(),
                        pattern,
                        sample: sample.clone(),
                    });
                }
            }

            debug!(template = id, samples = samples.len(), "template compiled");
            matchers.push(CompiledMatcher {
                template: position,
                id: id.to_string(),
                regex,
            });
        }

        Ok(matchers)
    }
}
