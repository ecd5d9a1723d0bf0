//! Usage extraction: runs an artifact's usage callable instead of its entry point.
//!
//! Best effort by contract. Callers get a `Result<UsageText, UsageError>` and
//! render nothing on error.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use crate::artifact::ArtifactKind;
use crate::host::{Interpreters, powershell, python};

/// Printed by usage wrappers when the artifact has no usage callable.
pub const USAGE_UNAVAILABLE: &str = "usage unavailable";

/// Why no usage text could be produced.
#[derive(Debug, Error)]
pub enum UsageError {
    /// The family has no usage convention.
    #[error("{kind} artifacts have no usage convention")]
    Unsupported {
        /// Artifact family
        kind: ArtifactKind,
    },
    /// The runtime could not be found or spawned.
    #[error("interpreter unavailable: {0}")]
    Interpreter(#[from] crate::Error),
    /// The child could not be run.
    #[error("failed to run usage callable: {0}")]
    Io(#[from] std::io::Error),
    /// The child did not finish in time.
    #[error("usage extraction timed out after {0:?}")]
    TimedOut(Duration),
    /// The child exited unsuccessfully.
    #[error("usage callable exited with {0}")]
    Failed(i32),
}

/// Captured usage output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageText(String);

impl UsageText {
    /// Wrap captured output.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Full text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First non-empty line, trimmed.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.0
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
    }

    /// Whether the artifact reported that it has no usage callable.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.summary() == USAGE_UNAVAILABLE
    }
}

/// Runs usage callables with a bounded timeout.
#[derive(Debug, Clone)]
pub struct UsageExtractor {
    interpreters: Interpreters,
    timeout: Duration,
}

impl UsageExtractor {
    /// Create an extractor.
    #[must_use]
    pub fn new(interpreters: Interpreters, timeout: Duration) -> Self {
        Self {
            interpreters,
            timeout,
        }
    }

    /// Capture the full usage output of `command` from `artifact`.
    ///
    /// # Errors
    ///
    /// Returns a `UsageError` for unsupported families, missing runtimes,
    /// spawn failures, timeouts, and nonzero exits.
    pub async fn extract(
        &self,
        artifact: &Path,
        kind: ArtifactKind,
        command: &str,
    ) -> Result<UsageText, UsageError> {
        match kind {
            ArtifactKind::Shell => Err(UsageError::Unsupported { kind }),
            ArtifactKind::Python => {
                let py = self.interpreters.python()?;
                let mut cmd = python::command(&py, &python::usage_bootstrap(), artifact, &[]);
                self.capture(&mut cmd).await
            }
            ArtifactKind::PowerShell => {
                let pwsh = self.interpreters.powershell()?;
                let wrapper =
                    powershell::write_wrapper(&powershell::usage_wrapper(artifact, command))?;
                let mut cmd = powershell::command(&pwsh, &wrapper);
                self.capture(&mut cmd).await
            }
        }
    }

    /// First line of the usage output, or an empty string on any failure.
    pub async fn capture_usage(
        &self,
        artifact: &Path,
        kind: ArtifactKind,
        command: &str,
    ) -> String {
        match self.extract(artifact, kind, command).await {
            Ok(text) => text.summary().to_string(),
            Err(e) => {
                tracing::debug!(command, error = %e, "Usage unavailable");
                String::new()
            }
        }
    }

    async fn capture(&self, cmd: &mut Command) -> Result<UsageText, UsageError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| UsageError::TimedOut(self.timeout))??;

        if !output.status.success() {
            return Err(UsageError::Failed(output.status.code().unwrap_or(1)));
        }
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            text = String::from_utf8_lossy(&output.stderr).into_owned();
        }
        Ok(UsageText(text))
    }
}
