//! Shell family: `<shell> <artifact> <args...>`.

use std::io::Write;
use std::path::Path;
use tokio::process::Command;

use super::{ExecutionResult, spawn_and_relay};
use crate::Result;

/// Run a shell artifact.
///
/// # Errors
///
/// Returns an I/O error if the shell cannot be spawned.
pub async fn run(
    shell: &Path,
    artifact: &Path,
    args: &[String],
    sink: &mut (dyn Write + Send),
) -> Result<ExecutionResult> {
    let mut cmd = Command::new(shell);
    cmd.arg(artifact).args(args);

    let (exit_code, streamed) = spawn_and_relay(&mut cmd, sink).await?;
    Ok(ExecutionResult {
        exit_code,
        output_captured: streamed > 0,
    })
}
