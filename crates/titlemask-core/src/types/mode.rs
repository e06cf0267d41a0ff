use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating mode of the classification engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Classify with previously learned statistics. Alternation groups only
    /// contain values seen before, most frequent first.
    #[default]
    Production,
    /// Classify with every known value and record match statistics for
    /// `update_stats`.
    Training,
}

impl Mode {
    #[must_use]
    pub fn is_training(self) -> bool {
        self == Self::Training
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Training => write!(f, "training"),
        }
    }
}
