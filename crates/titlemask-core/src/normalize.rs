//! # Title Normalizer
//!
//! Canonicalizes raw release titles into a *clean title* and, from that,
//! a coarser *mask* in which every character is replaced by the symbol of
//! its class. Titles sharing a mask share a field layout, which is what
//! the engine's matcher index is keyed on.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Mask symbol for an ASCII lower-case letter.
pub const LETTER: char = 'a';
/// Mask symbol for any ASCII digit.
pub const DIGIT: char = '9';
/// Mask symbol for punctuation-class characters.
pub const PUNCTUATION: char = 'p';
/// Mask symbol for space-class characters.
pub const SPACE: char = '_';

/// Character classes driving [`Normalizer`].
///
/// The four sets are disjoint by convention. When a character appears in
/// more than one of them, the whitelist wins for the mask and the space
/// class wins over the punctuation class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharClassConfig {
    /// Kept in the clean title, collapsed to [`PUNCTUATION`] in the mask.
    pub punctuation: String,
    /// Replaced by a plain space in the clean title.
    pub spaces: String,
    /// Removed from the clean title.
    pub blacklist: String,
    /// Never translated in the mask.
    pub whitelist: String,
}

impl Default for CharClassConfig {
    fn default() -> Self {
        Self {
            punctuation: ":,!?".into(),
            spaces: ".+-~_\u{2013}\\/=| ".into(),
            blacklist: "*\"'".into(),
            whitelist: String::new(),
        }
    }
}

impl CharClassConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_punctuation(mut self, chars: impl Into<String>) -> Self {
        self.punctuation = chars.into();
        self
    }

    pub fn with_spaces(mut self, chars: impl Into<String>) -> Self {
        self.spaces = chars.into();
        self
    }

    pub fn with_blacklist(mut self, chars: impl Into<String>) -> Self {
        self.blacklist = chars.into();
        self
    }

    pub fn with_whitelist(mut self, chars: impl Into<String>) -> Self {
        self.whitelist = chars.into();
        self
    }

    /// The characters a fully classified mask is made of.
    pub fn mask_alphabet(&self) -> String {
        let mut alphabet = String::from_iter([LETTER, PUNCTUATION, SPACE, DIGIT]);
        alphabet.push_str(&self.whitelist);
        alphabet
    }
}

/// Deterministic clean/mask functions for one [`CharClassConfig`].
///
/// The normalizer itself holds no caches; memoization is the engine's job.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: CharClassConfig,
    spaces: HashSet<char>,
    blacklist: HashSet<char>,
    whitelist: HashSet<char>,
    table: HashMap<char, char>,
}

impl Normalizer {
    pub fn new(config: CharClassConfig) -> Self {
        let mut table = HashMap::new();
        for c in config.punctuation.chars() {
            table.insert(c, PUNCTUATION);
        }
        for c in config.spaces.chars() {
            table.insert(c, SPACE);
        }

        Self {
            spaces: config.spaces.chars().collect(),
            blacklist: config.blacklist.chars().collect(),
            whitelist: config.whitelist.chars().collect(),
            table,
            config,
        }
    }

    pub fn config(&self) -> &CharClassConfig {
        &self.config
    }

    /// Produces the clean title: lower-cased, trimmed, space-class characters
    /// turned into spaces, blacklisted characters dropped, and runs of
    /// whitespace collapsed to a single space.
    ///
    /// # Examples
    /// ```
    /// use titlemask_core::{CharClassConfig, Normalizer};
    ///
    /// let normalizer = Normalizer::new(CharClassConfig::default());
    /// assert_eq!(normalizer.clean("The.Wire_S02E05"), "the wire s02e05");
    /// ```
    pub fn clean(&self, title: &str) -> String {
        let lowered = title.to_lowercase();
        let spaced: String = lowered
            .trim()
            .chars()
            .map(|c| if self.spaces.contains(&c) { ' ' } else { c })
            .filter(|c| !self.blacklist.contains(c))
            .collect();

        spaced.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Applies the translation table to an already clean title.
    pub fn translate(&self, clean: &str) -> String {
        clean.chars().map(|c| self.translate_char(c)).collect()
    }

    /// `translate(clean(title))`.
    ///
    /// # Examples
    /// ```
    /// use titlemask_core::{CharClassConfig, Normalizer};
    ///
    /// let normalizer = Normalizer::new(CharClassConfig::default());
    /// assert_eq!(normalizer.mask("The Wire S02E05"), "aaa_aaaa_a99a99");
    /// ```
    pub fn mask(&self, title: &str) -> String {
        self.translate(&self.clean(title))
    }

    /// Characters of `mask` outside the configured mask alphabet.
    pub fn unclassified<'a>(&'a self, mask: &'a str) -> impl Iterator<Item = char> + 'a {
        mask.chars().filter(move |&c| {
            !matches!(c, LETTER | DIGIT | PUNCTUATION | SPACE) && !self.whitelist.contains(&c)
        })
    }

    fn translate_char(&self, c: char) -> char {
        if self.whitelist.contains(&c) {
            return c;
        }
        if let Some(&symbol) = self.table.get(&c) {
            return symbol;
        }
        if c.is_ascii_lowercase() {
            LETTER
        } else if c.is_ascii_digit() {
            DIGIT
        } else {
            c
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(CharClassConfig::default())
    }
}
