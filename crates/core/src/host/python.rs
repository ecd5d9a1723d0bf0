//! Python family: a fixed bootstrap loads the artifact and calls its entry point.

use std::io::Write;
use std::path::Path;
use tokio::process::Command;

use super::{ExecutionResult, spawn_and_relay};
use crate::Result;

/// Exit code used by the bootstrap when the artifact has no `main`.
pub const EXIT_NO_ENTRY: i32 = 127;

const LOADER: &str = r#"import importlib.util, inspect, os, sys
path = sys.argv[1]
args = sys.argv[2:]
sys.path.insert(0, os.path.dirname(os.path.abspath(path)))
spec = importlib.util.spec_from_file_location("nuro_command", path)
mod = importlib.util.module_from_spec(spec)
sys.argv = [path] + args
spec.loader.exec_module(mod)
"#;

const RUN_MAIN: &str = r#"fn = getattr(mod, "main", None)
if not callable(fn):
    sys.stderr.write(path + " does not define main\n")
    sys.exit(127)
try:
    takes_args = len(inspect.signature(fn).parameters) > 0
except (TypeError, ValueError):
    takes_args = True
rc = fn(args) if takes_args else fn()
if inspect.iscoroutine(rc):
    import asyncio
    rc = asyncio.run(rc)
sys.stdout.flush()
sys.exit(0 if rc is None else int(rc))
"#;

const RUN_USAGE: &str = r#"fn = getattr(mod, "usage", None)
if callable(fn):
    text = fn()
    if text is not None:
        print(text)
else:
    print("usage unavailable")
"#;

/// Bootstrap that runs `main` and exits with its coerced return value.
#[must_use]
pub fn main_bootstrap() -> String {
    format!("{LOADER}{RUN_MAIN}")
}

/// Interleaves stderr into stdout so usage capture sees one stream.
const MERGE_STREAMS: &str = "import sys\nsys.stderr = sys.stdout\n";

/// Bootstrap that prints the artifact's usage text on a single combined stream.
#[must_use]
pub fn usage_bootstrap() -> String {
    format!("{MERGE_STREAMS}{LOADER}{RUN_USAGE}")
}

/// Build the interpreter command for `bootstrap` over `artifact`.
#[must_use]
pub fn command(python: &Path, bootstrap: &str, artifact: &Path, args: &[String]) -> Command {
    let mut cmd = Command::new(python);
    cmd.arg("-c")
        .arg(bootstrap)
        .arg(artifact)
        .args(args)
        .env("PYTHONUNBUFFERED", "1")
        .env("PYTHONDONTWRITEBYTECODE", "1");
    cmd
}

/// Run a Python artifact.
///
/// # Errors
///
/// Returns an I/O error if the interpreter cannot be spawned.
pub async fn run(
    python: &Path,
    artifact: &Path,
    args: &[String],
    sink: &mut (dyn Write + Send),
) -> Result<ExecutionResult> {
    let mut cmd = command(python, &main_bootstrap(), artifact, args);
    let (exit_code, streamed) = spawn_and_relay(&mut cmd, sink).await?;
    Ok(ExecutionResult {
        exit_code,
        output_captured: streamed > 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Interpreters;
    use crate::host::test_support::write_script;
    use tempfile::TempDir;

    fn python() -> Option<std::path::PathBuf> {
        Interpreters::default().python().ok()
    }

    #[tokio::test]
    async fn test_return_value_becomes_exit_code() {
        let Some(py) = python() else {
            eprintln!("python not found, skipping");
            return;
        };
        let temp = TempDir::new().unwrap();
        let artifact = write_script(
            temp.path(),
            "ping.py",
            "def main(args):\n    print('pong', *args)\n    return 3\n",
        );

        let mut out = Vec::new();
        let result = run(&py, &artifact, &["x".to_string()], &mut out)
            .await
            .unwrap();
        assert_eq!(result.exit_code, 3);
        assert_eq!(String::from_utf8(out).unwrap(), "pong x\n");
    }

    #[tokio::test]
    async fn test_no_return_is_success_and_argless_main() {
        let Some(py) = python() else {
            eprintln!("python not found, skipping");
            return;
        };
        let temp = TempDir::new().unwrap();
        let artifact = write_script(
            temp.path(),
            "quiet.py",
            "import sys\ndef main():\n    print(sys.argv[1:])\n",
        );

        let mut out = Vec::new();
        let result = run(&py, &artifact, &["a".to_string()], &mut out)
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "['a']\n");
    }

    #[tokio::test]
    async fn test_missing_main() {
        let Some(py) = python() else {
            eprintln!("python not found, skipping");
            return;
        };
        let temp = TempDir::new().unwrap();
        let artifact = write_script(temp.path(), "nothing.py", "X = 1\n");

        let mut out = Vec::new();
        let result = run(&py, &artifact, &[], &mut out).await.unwrap();
        assert_eq!(result.exit_code, EXIT_NO_ENTRY);
        assert!(!result.output_captured);
    }
}
