//! Error types for the roadmap content pipeline.
//!
//! Library crates use [`RoadmapError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum RoadmapError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A source document failed to parse as structured data.
    #[error("parse error in {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Two domain files define the same concept ID.
    #[error("duplicate concept ID across domain files: \"{id}\" in {second:?} (first defined in {first:?})")]
    DuplicateConceptId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A track's concept entry points at an ID the library does not define.
    #[error("unresolved concept reference in track \"{track}\", topic \"{topic}\": ref \"{reference}\" not found in library")]
    UnresolvedReference {
        track: String,
        topic: String,
        reference: String,
    },

    /// A topic ID occurs more than once across the track set.
    #[error("duplicate topic ID \"{topic}\" appears in: {}", tracks.join(", "))]
    DuplicateTopicId { topic: String, tracks: Vec<String> },

    /// The glossary source file does not exist. Not fatal.
    #[error("glossary source not found at {path:?}")]
    MissingGlossary { path: PathBuf },

    /// The glossary source exists but is structurally invalid.
    #[error("invalid glossary format in {path:?}: {message}")]
    MalformedGlossary { path: PathBuf, message: String },

    /// Two glossary terms slugify to the same ID.
    #[error("glossary terms \"{first}\" and \"{second}\" both derive the ID \"{id}\"")]
    DuplicateTermId {
        id: String,
        first: String,
        second: String,
    },

    /// Two glossary terms claim the same lookup key (strict mode only).
    #[error("lookup key \"{key}\" is claimed by both \"{first}\" and \"{second}\"")]
    AmbiguousLookupKey {
        key: String,
        first: String,
        second: String,
    },

    /// Data validation error (schema mismatch, empty required field, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Output serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RoadmapError>;

impl RoadmapError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error for the given source file.
    pub fn parse(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the run.
    ///
    /// Only a missing glossary degrades gracefully; everything else is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MissingGlossary { .. })
    }
}
