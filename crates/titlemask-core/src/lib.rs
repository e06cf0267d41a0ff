//! # Titlemask Core
//!
//! Mask-based title classification. A title is reduced to a *mask* (every
//! letter becomes `a`, every digit `9`, ...) and the mask selects which
//! compiled templates are worth trying. Templates are regexes built from a
//! vocabulary of known codecs, sources, release groups and so on, whose
//! frequencies are learned in training mode.
//!
//! ## Quick Start
//!
//! ```rust
//! use titlemask_core::{
//!     Category, CharClassConfig, Engine, EngineConfig, MaskTemplate, StructuralVars,
//!     TemplateSet, Vocabulary, VocabularyEntry,
//! };
//!
//! let mut vocabulary = Vocabulary::new();
//! vocabulary.insert(Category::VideoCodecs, "x264", VocabularyEntry::with_freq(12));
//!
//! let templates = TemplateSet::new().with(
//!     "tv_episode_codec",
//!     MaskTemplate::new("^{series_name} s{season_no}e{episode_no} {video_codec}$")
//!         .with_sample("Lost.S01E01.x264"),
//! );
//!
//! let mut engine = Engine::new(
//!     CharClassConfig::default(),
//!     vocabulary,
//!     templates,
//!     EngineConfig::default(),
//! );
//! engine.compile(&StructuralVars::default()).unwrap();
//!
//! let parsed = engine.parse_title("The.Wire.S02E05.x264").unwrap().unwrap();
//! assert_eq!(parsed.series_name(), Some("the wire"));
//! assert_eq!(parsed.get("video_codec"), Some("x264"));
//! ```
pub mod cache;
pub mod compiler;
pub mod engine;
pub mod error;
mod feedback;
pub mod normalize;
pub mod settings;
pub mod template;
pub mod types;
pub mod vocabulary;

// Re-export primary API
pub use cache::{CacheStats, Memo};
pub use compiler::{CompiledMatcher, PatternCompiler, StructuralVars, alternation_group};
pub use engine::{Engine, EngineConfig};
pub use error::{Result, TitlemaskError};
pub use normalize::{CharClassConfig, Normalizer};
pub use settings::{FileStore, MemoryStore, SettingsStore, TEMPLATES};
pub use template::{MaskTemplate, MaskUsage, TemplateSet};
pub use types::{Mode, ParsedTitle};
pub use vocabulary::{Category, Vocabulary, VocabularyEntry};
