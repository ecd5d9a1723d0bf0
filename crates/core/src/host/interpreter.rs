//! Interpreter discovery: explicit override first, then `PATH`.

use std::path::{Path, PathBuf};

use crate::settings::Settings;
use crate::{Error, Result};

const POWERSHELL_HELP: &str =
    "Install PowerShell (pwsh) or point NURO_PWSH at an existing binary";
const PYTHON_HELP: &str = "Install Python 3 or point NURO_PYTHON at an existing binary";
const SHELL_HELP: &str = "Install a POSIX shell or point NURO_SHELL at an existing binary";

/// Overrides for the three runtimes; `None` means search `PATH`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpreters {
    /// PowerShell binary.
    pub pwsh: Option<PathBuf>,
    /// Python binary.
    pub python: Option<PathBuf>,
    /// Shell binary.
    pub shell: Option<PathBuf>,
}

impl Interpreters {
    /// Take overrides from settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            pwsh: settings.pwsh.clone(),
            python: settings.python.clone(),
            shell: settings.shell.clone(),
        }
    }

    /// `pwsh`, or Windows PowerShell on Windows.
    ///
    /// # Errors
    ///
    /// Returns `InterpreterNotFound` if no candidate is found.
    pub fn powershell(&self) -> Result<PathBuf> {
        let candidates: &[&str] = if cfg!(windows) {
            &["pwsh", "powershell"]
        } else {
            &["pwsh"]
        };
        locate(self.pwsh.as_deref(), candidates, "PowerShell", POWERSHELL_HELP)
    }

    /// `python3`, then `python`.
    ///
    /// # Errors
    ///
    /// Returns `InterpreterNotFound` if no candidate is found.
    pub fn python(&self) -> Result<PathBuf> {
        locate(
            self.python.as_deref(),
            &["python3", "python"],
            "Python",
            PYTHON_HELP,
        )
    }

    /// `sh`, then `bash`.
    ///
    /// # Errors
    ///
    /// Returns `InterpreterNotFound` if no candidate is found.
    pub fn shell(&self) -> Result<PathBuf> {
        locate(self.shell.as_deref(), &["sh", "bash"], "Shell", SHELL_HELP)
    }
}

fn locate(
    explicit: Option<&Path>,
    candidates: &[&str],
    name: &str,
    help: &str,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return which::which(path).map_err(|_| {
            Error::interpreter_not_found(
                format!("{name} ({})", path.display()),
                format!("The configured {name} binary does not exist"),
            )
        });
    }

    for candidate in candidates {
        if let Ok(path) = which::which(candidate) {
            tracing::trace!(interpreter = name, path = %path.display(), "Found interpreter");
            return Ok(path);
        }
    }
    Err(Error::interpreter_not_found(name, help))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_override_wins() {
        let temp = TempDir::new().unwrap();
        let fake = temp.path().join("my-python");
        std::fs::write(&fake, "").unwrap();

        let interpreters = Interpreters {
            python: Some(fake.clone()),
            ..Interpreters::default()
        };
        assert_eq!(interpreters.python().unwrap(), fake);
    }

    #[test]
    fn test_missing_override_is_interpreter_not_found() {
        let interpreters = Interpreters {
            pwsh: Some(PathBuf::from("/definitely/not/here/pwsh")),
            ..Interpreters::default()
        };
        let err = interpreters.powershell().unwrap_err();
        assert!(matches!(err, Error::InterpreterNotFound { .. }));
        assert!(!err.is_per_candidate());
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_found_on_path() {
        let shell = Interpreters::default().shell().unwrap();
        assert!(shell.is_absolute());
    }
}
