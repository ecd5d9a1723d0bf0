//! Error types for the nuro dispatcher

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for resolution, caching and execution
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A source-location string could not be parsed
    #[error("Invalid source location '{uri}': {message}")]
    #[diagnostic(code(nuro::source::invalid))]
    InvalidSource {
        /// The offending location string
        uri: String,
        /// What is wrong with it
        message: String,
    },

    /// A hint or pin names a source that is not in the registry
    #[error("Unknown source '{name}'")]
    #[diagnostic(code(nuro::source::not_found))]
    SourceNotFound {
        /// The source name that was referenced
        name: String,
    },

    /// Copying or downloading one candidate failed
    #[error("Failed to retrieve {location}: {message}")]
    #[diagnostic(code(nuro::fetch::retrieval))]
    Retrieval {
        /// URL or path that was being retrieved
        location: String,
        /// Description of the failure
        message: String,
        /// True when the failure happened below HTTP (connect, DNS, timeout)
        unreachable: bool,
    },

    /// No compatible interpreter binary could be discovered
    #[error("{interpreter} not found")]
    #[diagnostic(code(nuro::host::interpreter_not_found))]
    InterpreterNotFound {
        /// Human readable interpreter name
        interpreter: String,
        /// Installation hint
        #[help]
        help: Option<String>,
    },

    /// The artifact exists but does not declare its entry point
    #[error("'{}' does not define {entry}", .path.display())]
    #[diagnostic(code(nuro::host::entry_not_found))]
    CommandEntryNotFound {
        /// Artifact path
        path: PathBuf,
        /// Name of the missing callable
        entry: String,
    },

    /// Every candidate was exhausted without a runnable artifact
    #[error("command '{command}' not found in any source")]
    #[diagnostic(
        code(nuro::dispatch::not_found),
        help("Check ~/.nuro/config/buckets.json or qualify the command as <source>:<command>")
    )]
    CommandNotFound {
        /// The requested command name
        command: String,
    },

    /// The command name cannot be mapped to a file name
    #[error("invalid command name '{name}'")]
    #[diagnostic(code(nuro::dispatch::invalid_name))]
    InvalidCommandName {
        /// The rejected name
        name: String,
    },

    /// The user interrupted the invocation
    #[error("interrupted")]
    #[diagnostic(code(nuro::interrupted))]
    UserInterrupt,

    /// Configuration error
    #[error("Configuration error: {message}")]
    #[diagnostic(code(nuro::config::invalid))]
    Configuration {
        /// The error message describing the configuration issue
        message: String,
    },

    /// I/O error with path context
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(nuro::io::error))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable
        path: Option<Box<Path>>,
        /// Description of the operation that failed
        operation: String,
    },
}

impl Error {
    /// Create an invalid source error
    pub fn invalid_source(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSource {
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Create a source not found error
    pub fn source_not_found(name: impl Into<String>) -> Self {
        Self::SourceNotFound { name: name.into() }
    }

    /// Create a retrieval error for a candidate whose content was refused
    pub fn retrieval(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Retrieval {
            location: location.into(),
            message: message.into(),
            unreachable: false,
        }
    }

    /// Create a retrieval error for a source that could not be reached at all
    pub fn unreachable(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Retrieval {
            location: location.into(),
            message: message.into(),
            unreachable: true,
        }
    }

    /// Create an interpreter not found error
    pub fn interpreter_not_found(interpreter: impl Into<String>, help: impl Into<String>) -> Self {
        Self::InterpreterNotFound {
            interpreter: interpreter.into(),
            help: Some(help.into()),
        }
    }

    /// Create an entry-point-missing error
    pub fn entry_not_found(path: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        Self::CommandEntryNotFound {
            path: path.into(),
            entry: entry.into(),
        }
    }

    /// Create a command not found error
    pub fn command_not_found(command: impl Into<String>) -> Self {
        Self::CommandNotFound {
            command: command.into(),
        }
    }

    /// Create a configuration error with a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(PathBuf::into_boxed_path),
            operation: operation.into(),
        }
    }

    /// Whether this error only disqualifies one candidate during resolution.
    #[must_use]
    pub const fn is_per_candidate(&self) -> bool {
        matches!(
            self,
            Self::InvalidSource { .. }
                | Self::SourceNotFound { .. }
                | Self::Retrieval { .. }
                | Self::CommandEntryNotFound { .. }
        )
    }
}

/// Result type for nuro operations
pub type Result<T> = std::result::Result<T, Error>;
