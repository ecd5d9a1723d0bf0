//! Execution host: runs a cached artifact in the runtime of its family.
//!
//! All three families share one spawning discipline: stdin and stderr are
//! inherited, stdout is piped and relayed line by line into the caller's
//! sink, and the child is killed if the future running it is dropped.

pub mod interpreter;
pub mod powershell;
pub mod python;
pub mod relay;
pub mod shell;

use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use crate::artifact::ArtifactKind;
use crate::log::DebugLog;
use crate::{Error, Result};

pub use interpreter::Interpreters;

/// Exit code reported when a child ends without one (killed by a signal).
pub const EXIT_ABNORMAL: i32 = 1;

/// Outcome of running one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    /// The command's own exit code.
    pub exit_code: i32,
    /// Whether any output reached the sink.
    pub output_captured: bool,
}

/// Launches artifacts.
pub struct ExecutionHost {
    interpreters: Interpreters,
    log: Arc<dyn DebugLog>,
}

impl std::fmt::Debug for ExecutionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionHost")
            .field("interpreters", &self.interpreters)
            .finish_non_exhaustive()
    }
}

impl ExecutionHost {
    /// Create a host.
    #[must_use]
    pub fn new(interpreters: Interpreters, log: Arc<dyn DebugLog>) -> Self {
        Self { interpreters, log }
    }

    /// Interpreter overrides in use.
    #[must_use]
    pub const fn interpreters(&self) -> &Interpreters {
        &self.interpreters
    }

    /// Run `command` from `artifact` with `args`, relaying output into `sink`.
    ///
    /// A nonzero exit code is not an error; it is returned in the result.
    ///
    /// # Errors
    ///
    /// Returns `InterpreterNotFound` when the family's runtime is missing, or an
    /// I/O error when the child cannot be spawned or temporary files cannot be
    /// created.
    pub async fn run(
        &self,
        artifact: &Path,
        kind: ArtifactKind,
        command: &str,
        args: &[String],
        sink: &mut (dyn Write + Send),
    ) -> Result<ExecutionResult> {
        self.log.record(&format!(
            "Executing {} ({kind}) with {} argument(s)",
            artifact.display(),
            args.len()
        ));
        let result = match kind {
            ArtifactKind::Shell => {
                shell::run(&self.interpreters.shell()?, artifact, args, sink).await?
            }
            ArtifactKind::Python => {
                python::run(&self.interpreters.python()?, artifact, args, sink).await?
            }
            ArtifactKind::PowerShell => {
                powershell::run(
                    &self.interpreters.powershell()?,
                    artifact,
                    command,
                    args,
                    sink,
                    self.log.as_ref(),
                )
                .await?
            }
        };
        self.log
            .record(&format!("{command} exited with {}", result.exit_code));
        Ok(result)
    }
}

/// Spawn `cmd` with the shared stdio discipline and relay its stdout.
///
/// Returns the exit code and the number of bytes relayed.
pub(crate) async fn spawn_and_relay(
    cmd: &mut Command,
    sink: &mut (dyn Write + Send),
) -> Result<(i32, u64)> {
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let program = cmd.as_std().get_program().to_string_lossy().to_string();
    let mut child = cmd
        .spawn()
        .map_err(|e| Error::io(e, Some(program.clone().into()), "spawn interpreter"))?;

    let streamed = match child.stdout.take() {
        Some(stdout) => relay::relay_lines(stdout, sink).await?,
        None => 0,
    };

    let status = child
        .wait()
        .await
        .map_err(|e| Error::io(e, Some(program.into()), "wait for interpreter"))?;
    Ok((status.code().unwrap_or(EXIT_ABNORMAL), streamed))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Temporary scripts for host tests.

    use std::io::Write;
    use std::path::{Path, PathBuf};

    /// Write `body` to `dir/name`, marking it executable on unix.
    pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        drop(f);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }
}
