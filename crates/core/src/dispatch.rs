//! The dispatcher: command name in, exit code out.

use regex::Regex;
use std::io::Write;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, instrument};

use crate::artifact::ArtifactKind;
use crate::builtin::{self, BuiltinContext};
use crate::cache::Cache;
use crate::fetch::Fetcher;
use crate::host::{ExecutionHost, Interpreters};
use crate::log::{DebugLog, FileDebugLog, TracingLog};
use crate::registry::Registry;
use crate::resolve::{Resolved, Resolver};
use crate::settings::Settings;
use crate::usage::UsageExtractor;
use crate::{Error, Result};

/// Arguments that request usage instead of running the command.
pub const HELP_FLAGS: [&str; 3] = ["-h", "--help", "/?"];

static COMMAND_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").ok());

/// Split `source:command` into a hint and a name. Both halves must be
/// non-empty, otherwise the whole string is the name.
#[must_use]
pub fn split_hint(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((hint, command)) if !hint.is_empty() && !command.is_empty() => (Some(hint), command),
        _ => (None, name),
    }
}

/// Reject names that cannot be mapped to a single file name.
///
/// # Errors
///
/// Returns `InvalidCommandName` for anything outside
/// `[A-Za-z0-9][A-Za-z0-9_.-]*` or containing `..`.
pub fn validate_command_name(name: &str) -> Result<()> {
    let matches = COMMAND_NAME.as_ref().is_some_and(|re| re.is_match(name));
    if matches && !name.contains("..") {
        Ok(())
    } else {
        Err(Error::InvalidCommandName {
            name: name.to_string(),
        })
    }
}

/// Whether `argv` asks for usage.
#[must_use]
pub fn is_help_request(argv: &[String]) -> bool {
    argv.iter().any(|a| HELP_FLAGS.contains(&a.as_str()))
}

/// Resolves, caches and runs commands for one invocation.
pub struct Dispatcher {
    settings: Settings,
    registry: Registry,
    cache: Cache,
    fetcher: Fetcher,
    host: ExecutionHost,
    usage: UsageExtractor,
    log: Arc<dyn DebugLog>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("home", &self.settings.paths.home())
            .field("sources", &self.registry.sources().len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Assemble a dispatcher from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the HTTP client cannot be built.
    pub fn new(settings: Settings, registry: Registry, log: Arc<dyn DebugLog>) -> Result<Self> {
        let interpreters = Interpreters::from_settings(&settings);
        let fetcher = Fetcher::new(settings.fetch_timeout, Arc::clone(&log))?;
        Ok(Self {
            cache: Cache::new(settings.paths.clone()),
            host: ExecutionHost::new(interpreters.clone(), Arc::clone(&log)),
            usage: UsageExtractor::new(interpreters, settings.usage_timeout),
            fetcher,
            registry,
            settings,
            log,
        })
    }

    /// Create the home tree, load the registry and pick the debug log.
    ///
    /// # Errors
    ///
    /// Returns an error if the home tree cannot be created or the registry
    /// document is malformed.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        settings.paths.ensure_tree()?;
        let registry = Registry::load(&settings.paths)?;
        let log: Arc<dyn DebugLog> = if settings.debug {
            Arc::new(FileDebugLog::new(settings.paths.debug_log_file()))
        } else {
            Arc::new(TracingLog)
        };
        Self::new(settings, registry, log)
    }

    /// Settings in use.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Registry in use.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Artifact cache.
    #[must_use]
    pub const fn cache(&self) -> &Cache {
        &self.cache
    }

    /// HTTP fetcher.
    #[must_use]
    pub const fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Usage extractor.
    #[must_use]
    pub const fn usage(&self) -> &UsageExtractor {
        &self.usage
    }

    /// Resolve `name` (optionally `source:command`) and run it with `argv`.
    ///
    /// Returns the command's own exit code. A help flag anywhere in `argv`
    /// prints usage instead, except for shell artifacts which receive the flag.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommandName`, `CommandNotFound` when every candidate and
    /// built-in is exhausted, `InterpreterNotFound` when the runtime is
    /// missing, or an I/O error from the cache or host.
    #[instrument(skip(self, argv, sink), fields(args = argv.len()))]
    pub async fn dispatch(
        &self,
        name: &str,
        argv: &[String],
        sink: &mut (dyn Write + Send),
    ) -> Result<i32> {
        let (hint, command) = split_hint(name);
        validate_command_name(command)?;
        self.log.record(&format!(
            "Dispatching {command} (hint: {})",
            hint.unwrap_or("none")
        ));

        let resolver = Resolver::new(&self.registry, &self.cache, &self.fetcher, self.log.as_ref());
        if let Some(resolved) = resolver.locate(command, hint).await? {
            info!(
                command,
                source = %resolved.source,
                kind = %resolved.kind,
                fetched = resolved.fetched,
                "Resolved command"
            );
            return self.execute(&resolved, command, argv, sink).await;
        }

        if let Some(builtin) = builtin::lookup(command) {
            debug!(command, "Running built-in");
            let ctx = BuiltinContext {
                cache: &self.cache,
                usage: &self.usage,
            };
            return (builtin.run)(ctx, argv, sink).await;
        }

        self.log
            .record(&format!("Command not found in any source: {command}"));
        Err(Error::command_not_found(command))
    }

    async fn execute(
        &self,
        resolved: &Resolved,
        command: &str,
        argv: &[String],
        sink: &mut (dyn Write + Send),
    ) -> Result<i32> {
        if is_help_request(argv) && resolved.kind != ArtifactKind::Shell {
            return self.print_usage(resolved, command, sink).await;
        }

        let result = self
            .host
            .run(&resolved.path, resolved.kind, command, argv, sink)
            .await?;
        debug!(
            exit_code = result.exit_code,
            output_captured = result.output_captured,
            "Command finished"
        );
        Ok(result.exit_code)
    }

    async fn print_usage(
        &self,
        resolved: &Resolved,
        command: &str,
        sink: &mut (dyn Write + Send),
    ) -> Result<i32> {
        match self
            .usage
            .extract(&resolved.path, resolved.kind, command)
            .await
        {
            Ok(text) => {
                let body = text.as_str();
                sink.write_all(body.as_bytes())
                    .and_then(|()| {
                        if body.ends_with('\n') || body.is_empty() {
                            Ok(())
                        } else {
                            sink.write_all(b"\n")
                        }
                    })
                    .map_err(|e| Error::io(e, None, "write usage"))?;
            }
            Err(e) => {
                self.log.record(&format!("Usage unavailable for {command}: {e}"));
            }
        }
        Ok(0)
    }
}
