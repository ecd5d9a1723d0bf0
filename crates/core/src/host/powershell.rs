//! PowerShell family.
//!
//! Artifacts are never invoked directly. A temporary wrapper dot-sources the
//! artifact, calls `NuroCmd_<command>` with the quoted arguments, and exits
//! with a status derived from `$?` and `$LASTEXITCODE`. The wrapper also runs
//! a session transcript into a temporary log: when the piped output turns out
//! empty, the transcript is emitted instead.

use std::io::Write;
use std::path::Path;
use tempfile::TempPath;
use tokio::process::Command;

use super::{ExecutionResult, relay, spawn_and_relay};
use crate::artifact::ArtifactKind;
use crate::log::DebugLog;
use crate::{Error, Result};

/// Characters PowerShell accepts as a single quote.
const SINGLE_QUOTES: [char; 5] = ['\'', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'];

/// Quote `value` as a PowerShell single-quoted literal.
///
/// Every quote character inside is doubled, so the literal ends only at the
/// closing quote added here.
#[must_use]
pub fn ps_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if SINGLE_QUOTES.contains(&c) {
            quoted.push(c);
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

fn path_literal(path: &Path) -> String {
    ps_quote(&path.to_string_lossy())
}

/// Wrapper script that runs `command` from `artifact` under a transcript.
#[must_use]
pub fn command_wrapper(artifact: &Path, command: &str, args: &[String], transcript: &Path) -> String {
    let entry = ArtifactKind::PowerShell.entry_point(command);
    let quoted_args: Vec<String> = args.iter().map(|a| ps_quote(a)).collect();
    let call = if quoted_args.is_empty() {
        entry
    } else {
        format!("{entry} {}", quoted_args.join(" "))
    };

    format!(
        "\u{feff}$ErrorActionPreference = 'Continue'
try {{ Start-Transcript -Path {transcript} -Force | Out-Null }} catch {{ }}
$__nuroStatus = 0
try {{
    . {artifact}
    $global:LASTEXITCODE = 0
    {call}
    $__nuroOk = $?
    if ($LASTEXITCODE -is [int] -and $LASTEXITCODE -ne 0) {{
        $__nuroStatus = $LASTEXITCODE
    }} elseif (-not $__nuroOk) {{
        $__nuroStatus = 1
    }}
}} catch {{
    Write-Error $_
    $__nuroStatus = 1
}} finally {{
    try {{ Stop-Transcript | Out-Null }} catch {{ }}
}}
exit $__nuroStatus
",
        transcript = path_literal(transcript),
        artifact = path_literal(artifact),
    )
}

/// Wrapper script that prints the usage text of `command`, or a sentinel.
#[must_use]
pub fn usage_wrapper(artifact: &Path, command: &str) -> String {
    let usage = ArtifactKind::PowerShell
        .usage_entry(command)
        .unwrap_or_default();
    format!(
        "\u{feff}. {artifact}
if (Get-Command {usage} -ErrorAction SilentlyContinue) {{ {usage} }} else {{ Write-Output 'usage unavailable' }}
",
        artifact = path_literal(artifact),
    )
}

/// Write a wrapper to a uniquely named `.ps1` file, deleted when the
/// returned path is dropped.
///
/// # Errors
///
/// Returns an I/O error if the temporary file cannot be created or written.
pub fn write_wrapper(contents: &str) -> Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix("nuro-wrapper-")
        .suffix(".ps1")
        .tempfile()
        .map_err(|e| Error::io(e, None, "create wrapper script"))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| Error::io(e, Some(file.path().to_path_buf()), "write wrapper script"))?;
    Ok(file.into_temp_path())
}

fn transcript_file() -> Result<TempPath> {
    tempfile::Builder::new()
        .prefix("nuro-transcript-")
        .suffix(".log")
        .tempfile()
        .map(tempfile::NamedTempFile::into_temp_path)
        .map_err(|e| Error::io(e, None, "create transcript file"))
}

/// Build the interpreter command that runs `wrapper` with all streams merged.
#[must_use]
pub fn command(pwsh: &Path, wrapper: &Path) -> Command {
    let mut cmd = Command::new(pwsh);
    cmd.arg("-NoProfile").arg("-NonInteractive");
    if cfg!(windows) {
        cmd.arg("-ExecutionPolicy").arg("Bypass");
    }
    cmd.arg("-Command").arg(format!(
        "& {{ & {}; exit $LASTEXITCODE }} *>&1",
        path_literal(wrapper)
    ));
    cmd
}

/// Run a PowerShell artifact.
///
/// # Errors
///
/// Returns an I/O error if the temporary files cannot be created or the
/// interpreter cannot be spawned.
pub async fn run(
    pwsh: &Path,
    artifact: &Path,
    command_name: &str,
    args: &[String],
    sink: &mut (dyn Write + Send),
    log: &dyn DebugLog,
) -> Result<ExecutionResult> {
    let transcript = transcript_file()?;
    let wrapper = write_wrapper(&command_wrapper(artifact, command_name, args, &transcript))?;
    log.record(&format!(
        "PowerShell wrapper {} (transcript {})",
        wrapper.display(),
        transcript.display()
    ));

    let mut cmd = command(pwsh, &wrapper);
    let (exit_code, streamed) = spawn_and_relay(&mut cmd, sink).await?;

    let output_captured = if streamed > 0 {
        true
    } else {
        log.record("No output streamed, emitting transcript");
        tracing::debug!(transcript = %transcript.display(), "Falling back to transcript");
        relay::emit_file(&transcript, sink)? > 0
    };

    Ok(ExecutionResult {
        exit_code,
        output_captured,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Inverse of `ps_quote`, following PowerShell's single-quoted string rules.
    fn ps_unquote(literal: &str) -> Option<String> {
        let mut chars = literal.chars().peekable();
        if !SINGLE_QUOTES.contains(&chars.next()?) {
            return None;
        }
        let mut out = String::new();
        while let Some(c) = chars.next() {
            if SINGLE_QUOTES.contains(&c) {
                match chars.peek() {
                    Some(next) if SINGLE_QUOTES.contains(next) => {
                        out.push(*next);
                        chars.next();
                    }
                    None => return Some(out),
                    Some(_) => return None,
                }
            } else {
                out.push(c);
            }
        }
        None
    }

    #[test]
    fn test_quote_doubles_quotes() {
        assert_eq!(ps_quote("plain"), "'plain'");
        assert_eq!(ps_quote("it's"), "'it''s'");
        assert_eq!(ps_quote("\u{2019}"), "'\u{2019}\u{2019}'");
        assert_eq!(ps_quote(""), "''");
    }

    #[test]
    fn test_injection_stays_literal() {
        let hostile = "'; Remove-Item -Recurse C:\\ ; '";
        assert_eq!(ps_unquote(&ps_quote(hostile)).as_deref(), Some(hostile));
    }

    proptest! {
        #[test]
        fn quote_round_trips(value in any::<String>()) {
            prop_assert_eq!(ps_unquote(&ps_quote(&value)), Some(value));
        }

        #[test]
        fn quote_round_trips_quote_heavy(value in "[a-z'\u{2018}\u{2019}\u{201A}\u{201B} ]{0,24}") {
            prop_assert_eq!(ps_unquote(&ps_quote(&value)), Some(value));
        }
    }

    #[test]
    fn test_command_wrapper_shape() {
        let wrapper = command_wrapper(
            Path::new("/cache/ps1/official/hello.ps1"),
            "hello",
            &["a b".to_string(), "it's".to_string()],
            Path::new("/tmp/t.log"),
        );
        assert!(wrapper.contains("Start-Transcript -Path '/tmp/t.log'"));
        assert!(wrapper.contains(". '/cache/ps1/official/hello.ps1'"));
        assert!(wrapper.contains("NuroCmd_hello 'a b' 'it''s'"));
        assert!(wrapper.contains("Stop-Transcript"));
        assert!(wrapper.trim_end().ends_with("exit $__nuroStatus"));
    }

    #[test]
    fn test_usage_wrapper_shape() {
        let wrapper = usage_wrapper(Path::new("/c/hello.ps1"), "hello");
        assert!(wrapper.contains("Get-Command NuroUsage_hello"));
        assert!(wrapper.contains("'usage unavailable'"));
        assert!(!wrapper.contains("Start-Transcript"));
    }

    #[test]
    fn test_wrapper_deleted_on_drop() {
        let wrapper = write_wrapper("Write-Output 1").unwrap();
        let path = wrapper.to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "ps1");
        drop(wrapper);
        assert!(!path.exists());
    }

    #[test]
    fn test_invocation_merges_streams() {
        let cmd = command(Path::new("pwsh"), Path::new("/tmp/w.ps1"));
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert!(args.contains(&"-NoProfile".to_string()));
        assert_eq!(
            args.last().unwrap(),
            "& { & '/tmp/w.ps1'; exit $LASTEXITCODE } *>&1"
        );
    }

    #[cfg(unix)]
    mod fake_host {
        use super::super::*;
        use crate::host::test_support::write_script;
        use crate::log::MemoryLog;
        use tempfile::TempDir;

        /// Stand-in for `pwsh`: finds the wrapper in the `-Command` text and the
        /// transcript path inside the wrapper, then runs `body`.
        fn fake_pwsh(dir: &Path, body: &str) -> std::path::PathBuf {
            let script = format!(
                r#"#!/bin/sh
cmd=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-Command" ]; then shift; cmd="$1"; fi
  shift
done
wrapper=$(printf '%s' "$cmd" | sed -n "s/.*& '\([^']*\)'.*/\1/p")
transcript=$(sed -n "s/.*Start-Transcript -Path '\([^']*\)'.*/\1/p" "$wrapper")
{body}
"#
            );
            write_script(dir, "pwsh", &script)
        }

        #[tokio::test]
        async fn test_transcript_fallback_when_stdout_empty() {
            let temp = TempDir::new().unwrap();
            let pwsh = fake_pwsh(
                temp.path(),
                "printf 'from transcript\\n' > \"$transcript\"\nexit 0",
            );
            let artifact = temp.path().join("hello.ps1");
            std::fs::write(&artifact, "function NuroCmd_hello { }").unwrap();
            let log = MemoryLog::new();

            let mut out = Vec::new();
            let result = run(&pwsh, &artifact, "hello", &[], &mut out, &log)
                .await
                .unwrap();

            assert_eq!(String::from_utf8(out).unwrap(), "from transcript\n");
            assert!(result.output_captured);
            assert_eq!(result.exit_code, 0);
            assert_eq!(log.count_containing("emitting transcript"), 1);
        }

        #[tokio::test]
        async fn test_streamed_output_skips_transcript() {
            let temp = TempDir::new().unwrap();
            let pwsh = fake_pwsh(
                temp.path(),
                "printf 'ignored\\n' > \"$transcript\"\necho streamed\nexit 7",
            );
            let artifact = temp.path().join("hello.ps1");
            std::fs::write(&artifact, "function NuroCmd_hello { }").unwrap();

            let mut out = Vec::new();
            let result = run(&pwsh, &artifact, "hello", &[], &mut out, &MemoryLog::new())
                .await
                .unwrap();

            assert_eq!(String::from_utf8(out).unwrap(), "streamed\n");
            assert_eq!(result.exit_code, 7);
        }

        #[tokio::test]
        async fn test_wrapper_removed_after_run() {
            let temp = TempDir::new().unwrap();
            let record = temp.path().join("wrapper-path");
            let pwsh = fake_pwsh(
                temp.path(),
                &format!("printf '%s' \"$wrapper\" > '{}'\nexit 0", record.display()),
            );
            let artifact = temp.path().join("hello.ps1");
            std::fs::write(&artifact, "function NuroCmd_hello { }").unwrap();

            let mut out = Vec::new();
            run(&pwsh, &artifact, "hello", &[], &mut out, &MemoryLog::new())
                .await
                .unwrap();

            let wrapper = std::fs::read_to_string(&record).unwrap();
            assert!(wrapper.ends_with(".ps1"));
            assert!(!Path::new(&wrapper).exists());
        }
    }
}
