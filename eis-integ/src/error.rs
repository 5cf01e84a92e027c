//! Error types for the integration layer.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse outcome codes, used verbatim as process exit statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Success sentinel.
    NoError,
    /// A wrapped external command exited nonzero or could not be started.
    ExtCmdError,
    /// A required input is missing or invalid.
    ConfigError,
    /// A local file could not be read.
    FileSystemError,
}

impl ErrorCode {
    /// Returns the numeric value of this code.
    #[must_use]
    pub fn value(self) -> u8 {
        match self {
            Self::NoError => 0,
            Self::ExtCmdError => 1,
            Self::ConfigError => 2,
            Self::FileSystemError => 3,
        }
    }
}

/// Errors raised by integration operations.
#[derive(Debug, Error)]
pub enum IntegError {
    /// An external command exited with a nonzero status.
    #[error("command `{command}` failed ({status}): {output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    /// An external command could not be started at all.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A required environment variable is not set.
    #[error("variable {0} is not set")]
    VariableNotSet(String),

    /// A required path does not reference an existing regular file.
    #[error("variable {name} doesn't represent an existing file: {}", .path.display())]
    NotAFile { name: String, path: PathBuf },

    /// A JSON document could not be parsed.
    #[error("invalid JSON in {}: {source}", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A JSON document parsed but is not an object.
    #[error("JSON document must be an object, got {0}")]
    NotAnObject(&'static str),

    /// A local file could not be read.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be serialized for storage.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntegError {
    /// Returns the exit code this error maps to.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::CommandFailed { .. } | Self::Spawn { .. } => ErrorCode::ExtCmdError,
            Self::VariableNotSet(_)
            | Self::NotAFile { .. }
            | Self::InvalidJson { .. }
            | Self::NotAnObject(_)
            | Self::Serialization(_) => ErrorCode::ConfigError,
            Self::Io { .. } => ErrorCode::FileSystemError,
        }
    }
}

/// Result type for integration operations.
pub type IntegResult<T> = Result<T, IntegError>;
