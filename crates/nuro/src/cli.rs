use clap::{Parser, Subcommand};
use miette::{Diagnostic, Report};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use thiserror::Error;

use crate::tracing::{LogLevel, TracingFormat};

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Unresolved command, fatal host or configuration error
pub const EXIT_NOT_FOUND: i32 = 1;
/// Invalid global options
pub const EXIT_CLI: i32 = 2;
/// Interrupted by the user (128 + SIGINT)
pub const EXIT_SIGINT: i32 = 130;

/// Flags that ask for the root banner when given in place of a command.
pub use nuro_core::dispatch::HELP_FLAGS;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Invalid global options (exit code 2)
    #[error("CLI error: {message}")]
    #[diagnostic(code(nuro::cli::usage))]
    Usage {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// The command could not be resolved or run (exit code 1)
    #[error("{message}")]
    #[diagnostic(code(nuro::cli::command))]
    Command {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Ctrl-C (exit code 130)
    #[error("interrupted")]
    #[diagnostic(code(nuro::cli::interrupted))]
    Interrupted,
}

impl CliError {
    /// Create a new usage error
    #[must_use]
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new command error
    #[must_use]
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new command error with help text
    #[must_use]
    pub fn command_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<nuro_core::Error> for CliError {
    fn from(err: nuro_core::Error) -> Self {
        match err {
            nuro_core::Error::UserInterrupt => Self::Interrupted,
            nuro_core::Error::CommandNotFound { .. } => Self::command_with_help(
                err.to_string(),
                "Run `nuro` to see known commands, or `nuro list` for cached ones",
            ),
            nuro_core::Error::InterpreterNotFound { ref help, .. } => match help.clone() {
                Some(help) => Self::command_with_help(err.to_string(), help),
                None => Self::command(err.to_string()),
            },
            nuro_core::Error::Configuration { message } => Self::command_with_help(
                format!("Configuration error: {message}"),
                "Check the files under the nuro home directory (NURO_HOME or ~/.nuro)",
            ),
            nuro_core::Error::Io {
                source,
                path,
                operation,
            } => {
                let path_str = path
                    .as_ref()
                    .map_or(String::new(), |p| format!(" on {}", p.display()));
                Self::command_with_help(
                    format!("I/O {operation} failed{path_str}: {source}"),
                    "Check file permissions and ensure the path exists",
                )
            }
            other => Self::command(other.to_string()),
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Usage { .. } => EXIT_CLI,
        CliError::Command { .. } => EXIT_NOT_FOUND,
        CliError::Interrupted => EXIT_SIGINT,
    }
}

/// Render error appropriately based on JSON flag
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": match err {
                CliError::Usage { .. } => "usage",
                CliError::Command { .. } => "command",
                CliError::Interrupted => "interrupted",
            },
            "message": err.to_string()
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Main CLI entry point for nuro.
///
/// Global options come before the command name; everything after it is
/// handed to the command untouched.
#[derive(Parser, Debug)]
#[command(name = "nuro")]
#[command(about = "Resolve a command by name and run it from the first source that has it")]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// The command to dispatch, followed by its arguments.
    #[command(subcommand)]
    pub command: Option<Invocation>,

    /// Logging verbosity level.
    #[arg(short = 'L', long, default_value = "warn", value_enum)]
    pub level: LogLevel,

    /// Diagnostic output format.
    #[arg(long = "log-format", default_value = "compact", value_enum)]
    pub log_format: TracingFormat,

    /// Emit errors as a JSON envelope on stdout.
    #[arg(long)]
    pub json: bool,

    /// Write the debug log file.
    #[arg(short = 'd', long, overrides_with = "no_debug")]
    pub debug: bool,

    /// Do not write the debug log file, even if `NURO_DEBUG` is set.
    #[arg(long, overrides_with = "debug")]
    pub no_debug: bool,

    /// Show the root usage banner.
    #[arg(short = 'h', long)]
    pub help: bool,

    /// Show version information.
    #[arg(short = 'V', long)]
    pub version: bool,
}

/// A command name with its verbatim arguments.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Invocation {
    /// Any command name.
    #[command(external_subcommand)]
    Command(Vec<String>),
}

/// What the front end should do for a parsed command line.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Print the version.
    Version,
    /// Print the root usage banner.
    Banner,
    /// Dispatch a command.
    Dispatch {
        /// Command name, possibly `source:command`
        name: String,
        /// Arguments passed through verbatim
        args: Vec<String>,
    },
}

impl Cli {
    /// Decide what to do.
    #[must_use]
    pub fn action(&self) -> Action {
        if self.version {
            return Action::Version;
        }
        if self.help {
            return Action::Banner;
        }
        match &self.command {
            Some(Invocation::Command(argv)) => match argv.split_first() {
                Some((name, _)) if HELP_FLAGS.contains(&name.as_str()) => Action::Banner,
                Some((name, args)) => Action::Dispatch {
                    name: name.clone(),
                    args: args.to_vec(),
                },
                None => Action::Banner,
            },
            None => Action::Banner,
        }
    }

    /// Resolve the debug switches against the environment default.
    #[must_use]
    pub const fn debug_enabled(&self, from_env: bool) -> bool {
        if self.no_debug {
            false
        } else {
            self.debug || from_env
        }
    }
}

/// Parse arguments, mapping clap failures to a usage error.
///
/// # Errors
///
/// Returns `CliError::Usage` for unknown or malformed global options.
pub fn try_parse_from<I, T>(args: I) -> Result<Cli, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|e| CliError::Usage {
        message: e.to_string().trim().trim_start_matches("error: ").to_string(),
        help: Some("Global options go before the command name; run `nuro -h`".to_string()),
    })
}
