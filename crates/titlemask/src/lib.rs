//! # Titlemask
//!
//! Classifies media release titles (`The.Wire.S02E05.720p.HDTV.x264-LOL`)
//! into structured fields using templates learned from a title corpus.
//!
//! ```rust
//! use titlemask::{CharClassConfig, Normalizer};
//!
//! let normalizer = Normalizer::new(CharClassConfig::default());
//! assert_eq!(normalizer.mask("Lost.S01E01"), "aaaa_a99a99");
//! ```
pub use titlemask_core::*;

pub mod trainer {
    pub use titlemask_trainer::*;
}

pub use titlemask_trainer::{Trainer, TrainingReport};
