//! Error types for the site-relocate crate.

use std::path::PathBuf;

/// Relocation-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum RelocateError {
    /// The install type string does not name a known install type.
    #[error("unknown install type: {0}")]
    UnknownInstallType(String),

    /// Paths cannot be mapped before an install type has been chosen.
    #[error("cannot map archive paths with install type {0}")]
    InstallTypeNotSet(String),

    /// Standalone/subsite install types need a recorded uploads path.
    #[error("no uploads override recorded for install type {0}")]
    MissingUploadsOverride(String),

    /// Every computed mapping was empty or pruned away.
    #[error("paths archive mapping is inconsistent: no mapping left")]
    EmptyMapping,

    /// A serialized rule record carries a kind this crate does not know.
    #[error("unknown rule kind: {0}")]
    UnknownKind(String),

    /// A generated or supplied search pattern failed to compile.
    #[error("invalid search pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A pattern hit a runtime limit (backtracking) while matching.
    #[error("search pattern {pattern} aborted: {reason}")]
    MatchAborted { pattern: String, reason: String },

    /// A migration plan lacks a section the requested operation needs.
    #[error("migration plan has no {0} section")]
    IncompletePlan(&'static str),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error with context.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience result type for site-relocate operations.
pub type RelocateResult<T> = Result<T, RelocateError>;
