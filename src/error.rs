//! Error types for filterhost.
//!
//! Only host-facing operations return [`Error`]. Failures inside callbacks
//! invoked by a plugin never cross the native boundary as errors; they are
//! reported as [`SuiteStatus`](crate::suites::SuiteStatus) codes instead.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using filterhost's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for filterhost operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// System call error (via rustix).
    #[cfg(unix)]
    #[error("system error: {0}")]
    System(#[from] rustix::io::Errno),

    /// The module is not a well-formed image of the expected format.
    #[error("invalid module `{path}`: {reason}")]
    InvalidModule {
        /// Path of the module.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The native module could not be loaded.
    #[error("failed to load plugin module: {0}")]
    PluginLoad(String),

    /// The module does not export a required entry point.
    #[error("missing entry point `{0}`")]
    MissingEntryPoint(String),

    /// The module targets an architecture this process cannot run.
    #[error("module architecture {module:?} cannot run on {host:?}")]
    Incompatible {
        /// Architecture of the host process.
        host: crate::discovery::Architecture,
        /// Architecture of the module.
        module: crate::discovery::Architecture,
    },

    /// The filter cannot process the supplied image.
    #[error("unsupported image: {0}")]
    UnsupportedImage(String),

    /// The filter returned a non-zero status from one of its phases.
    #[error("filter failed with status {status}: {message}")]
    FilterFailed {
        /// Raw status code reported by the plugin.
        status: i16,
        /// Human readable message from the status table.
        message: String,
    },

    /// The user cancelled the filter.
    #[error("filter cancelled by the user")]
    Cancelled,

    /// A tile was requested outside the image and the filter asked for
    /// an error instead of padding.
    #[error("requested tile {0:?} lies outside the image bounds")]
    TileOutOfBounds(crate::geometry::Rect),

    /// The out-of-process shim failed.
    #[error("shim error: {0}")]
    Shim(String),

    /// Serialization or deserialization of the shim contract failed.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Invalid host configuration or argument.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build an [`Error::InvalidModule`].
    pub fn invalid_module(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidModule {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error represents a user cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
