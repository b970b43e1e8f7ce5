//! Crate-wide error types.
//!
//! Each subsystem owns a specific error enum built with `thiserror`
//! ([`FingerprintError`], [`AdapterError`], [`ConfigError`]); this module
//! aggregates them into a single [`Error`] for callers that just want `?`.
//!
//! # Propagation
//!
//! - Adapter failures are absorbed inside the matcher and only show up as
//!   warnings on a verdict. They reach [`Error`] only from direct adapter
//!   calls such as record updates.
//! - Fingerprinting failures are fatal for one asset, never for a batch.
//! - Configuration failures are fatal at startup.
//!
//! # Example
//!
//! ```ignore
//! use music_dedupe::error::{Result, ResultExt};
//!
//! fn fingerprint(path: &Path) -> Result<Fingerprint> {
//!     generator.generate(path).map_err(Into::into).with_context("while checking import")
//! }
//! ```
//!
//! [`FingerprintError`]: crate::fingerprint::FingerprintError
//! [`AdapterError`]: crate::sources::AdapterError
//! [`ConfigError`]: crate::config::ConfigError

use std::path::PathBuf;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Verdict store error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Fingerprint generation failed for one asset
    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] crate::fingerprint::FingerprintError),

    /// A direct source adapter call failed
    #[error("Source adapter error: {0}")]
    Adapter(#[from] crate::sources::AdapterError),

    /// Configuration could not be loaded or is incomplete
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// File not found
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Database(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, crate::fingerprint::FingerprintError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Fingerprint(e).context(ctx))
    }
}
