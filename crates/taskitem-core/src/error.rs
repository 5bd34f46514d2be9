//! Error types for taskitem-core
//!
//! Every fallible operation in this crate returns [`Result<T>`]. Errors fall into
//! a small set of kinds:
//!
//! - **Null argument**: a required item reference was absent
//! - **Invalid argument**: a metadata name was empty or reserved
//! - **Boundary**: an isolation context failed to start, died, or refused a request
//! - **Codec**: a transfer payload could not be encoded or decoded
//! - **Config**: a configuration source was malformed
//! - **Io**: filesystem or pipe failures outside of timestamp reads
//!
//! Timestamp lookups against missing paths are not errors; they resolve to an
//! empty string.

use strum::{Display, EnumIter};
use thiserror::Error;

/// Core error type for build item operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A required reference was absent
    #[error("Missing required argument '{parameter}'")]
    NullArgument {
        /// Name of the offending parameter
        parameter: &'static str,
    },

    /// An argument was present but unacceptable
    #[error("Invalid argument '{parameter}': {reason}")]
    InvalidArgument {
        /// Name of the offending parameter
        parameter: &'static str,
        /// Human-readable explanation
        reason: String,
    },

    /// The isolation context could not be used
    #[error("Isolation boundary failure: {0}")]
    Boundary(String),

    /// A transfer payload was malformed
    #[error("Transfer encoding error: {0}")]
    Codec(String),

    /// A configuration source was malformed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(String),
}

/// Fieldless error categories, for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    NullArgument,
    InvalidArgument,
    Boundary,
    Codec,
    Config,
    Io,
}

impl Error {
    /// Create a null-argument error for `parameter`.
    #[must_use]
    pub const fn null_argument(parameter: &'static str) -> Self {
        Self::NullArgument { parameter }
    }

    /// Create an invalid-argument error for `parameter`.
    pub fn invalid_argument(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }

    /// The error raised for any write or removal aimed at a derived modifier.
    pub fn reserved_metadata_name(name: &str) -> Self {
        Self::invalid_argument(
            "name",
            format!("\"{name}\" is a reserved item metadata name and cannot be modified or deleted"),
        )
    }

    /// Create a boundary error.
    pub fn boundary(msg: impl Into<String>) -> Self {
        Self::Boundary(msg.into())
    }

    /// Create a codec error.
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// The category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NullArgument { .. } => ErrorKind::NullArgument,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Boundary(_) => ErrorKind::Boundary,
            Self::Codec(_) => ErrorKind::Codec,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::codec(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse config: {err}"))
    }
}

/// Result type alias for taskitem-core operations
pub type Result<T> = std::result::Result<T, Error>;
