//! Command resolution and execution for nuro
//!
//! This crate turns a command name into a running script:
//! - [`registry`] and [`source`] describe where artifacts come from
//! - [`resolve`] orders candidates and searches the cache before fetching
//! - [`cache`] and [`fetch`] keep write-once local copies of artifacts
//! - [`host`] runs PowerShell, Python and shell artifacts with normalized exit codes
//! - [`usage`] extracts usage text from the same artifacts
//! - [`dispatch`] ties the pipeline together behind a single call
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> nuro_core::Result<()> {
//! use nuro_core::{Dispatcher, Settings};
//!
//! let dispatcher = Dispatcher::from_settings(Settings::from_env()?)?;
//! let code = dispatcher
//!     .dispatch("hello", &["world".to_string()], &mut std::io::stdout())
//!     .await?;
//! println!("exit code {code}");
//! # Ok(())
//! # }
//! ```

// Suppress false positive warnings from thiserror/miette derive macros
#![allow(unused_assignments)]

pub mod artifact;
pub mod builtin;
pub mod cache;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod host;
pub mod listing;
pub mod log;
pub mod paths;
pub mod registry;
pub mod resolve;
pub mod settings;
pub mod source;
pub mod usage;

pub use artifact::ArtifactKind;
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use host::ExecutionResult;
pub use log::{DebugLog, FileDebugLog, MemoryLog, TracingLog};
pub use paths::NuroPaths;
pub use registry::Registry;
pub use settings::Settings;
pub use source::{Descriptor, Source, SourceLocation};
pub use usage::{UsageError, UsageExtractor, UsageText};
