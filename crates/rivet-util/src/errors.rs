use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Rivet operations.
#[derive(Debug, Error, Diagnostic)]
pub enum RivetError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed version or version range string.
    #[error("invalid version `{input}`: {reason}")]
    #[diagnostic(help("versions use 2-4 numeric components plus an optional `-label` suffix"))]
    VersionParse { input: String, reason: String },

    /// Invalid or malformed project manifest (e.g. rivet.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your rivet.toml for syntax errors"))]
    Manifest { message: String },

    /// A dependency provider raised during lookup or initialization.
    /// Fatal to the whole resolution request.
    #[error("Dependency provider failed: {message}")]
    Provider { message: String },

    /// Dependency resolution failed (e.g. the root itself is unresolvable).
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Cache-layer failure outside a factory (factory errors propagate verbatim).
    #[error("Cache error: {message}")]
    Cache { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type RivetResult<T> = miette::Result<T>;
