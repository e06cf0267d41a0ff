use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, compiling or persisting the
/// classification model.
#[derive(Debug, Error)]
pub enum TitlemaskError {
    /// A vocabulary or template settings document does not exist.
    #[error("settings file not found: {name} ({})", .path.display())]
    MissingSettings {
        /// Logical settings name (e.g. `audio_codecs`).
        name: String,
        /// Where the document was expected.
        path: PathBuf,
    },

    /// A settings document could not be read or written.
    #[error("I/O error on settings {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// A settings document is not valid JSON or does not have the expected shape.
    #[error("unable to parse settings {name}: bad json: {source}")]
    MalformedJson {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// A template pattern has unbalanced braces.
    #[error("template {id:?} is malformed: {reason}")]
    TemplateSyntax { id: String, reason: String },

    /// A template references a placeholder that no variable provides.
    #[error("template {id:?} references unknown placeholder {{{placeholder}}}")]
    UnknownPlaceholder { id: String, placeholder: String },

    /// The substituted pattern is not a valid regex.
    #[error("unable to compile template {id:?}\npattern\n{pattern}\n{source}")]
    TemplateCompile {
        id: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A declared sample is not matched by its own template.
    #[error("template {id:?} does not match its sample {sample:?}\npattern\n{pattern}")]
    SampleMismatch {
        id: String,
        pattern: String,
        sample: String,
    },

    /// Classification was requested before `compile`.
    #[error("matchers are not compiled yet")]
    NotCompiled,

    /// `compile` was called a second time on the same engine.
    #[error("matchers are already compiled")]
    AlreadyCompiled,

    /// Statistics can only be persisted by a training engine.
    #[error("statistics are only collected in training mode")]
    TrainingDisabled,
}

impl TitlemaskError {
    /// Returns `true` for errors caused by broken settings rather than by
    /// API misuse. These are not recoverable within a run.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        !matches!(
            self,
            Self::NotCompiled | Self::AlreadyCompiled | Self::TrainingDisabled
        )
    }
}

/// Result type alias for titlemask operations.
pub type Result<T> = std::result::Result<T, TitlemaskError>;
