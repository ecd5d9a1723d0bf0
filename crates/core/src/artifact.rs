//! Artifact families and their entry-point conventions.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

/// Prefix of the PowerShell function implementing a command.
pub const COMMAND_PREFIX: &str = "NuroCmd_";

/// Prefix of the PowerShell function describing a command's usage.
pub const USAGE_PREFIX: &str = "NuroUsage_";

/// Python callable implementing a command.
pub const PYTHON_ENTRY: &str = "main";

/// Python callable describing a command's usage.
pub const PYTHON_USAGE: &str = "usage";

/// Script family, determined by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// `.ps1`, run through an external PowerShell host.
    PowerShell,
    /// `.py`, loaded by a short-lived Python bootstrap.
    Python,
    /// `.sh`, run by the system shell.
    Shell,
}

impl ArtifactKind {
    /// Order in which families are probed for every source.
    pub const PREFERENCE: [Self; 3] = [Self::PowerShell, Self::Python, Self::Shell];

    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::PowerShell => "ps1",
            Self::Python => "py",
            Self::Shell => "sh",
        }
    }

    /// Parse from an extension (with or without the leading dot).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "ps1" => Some(Self::PowerShell),
            "py" => Some(Self::Python),
            "sh" => Some(Self::Shell),
            _ => None,
        }
    }

    /// Family of a file, judged by its extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Name of the callable that runs `command`.
    #[must_use]
    pub fn entry_point(self, command: &str) -> String {
        match self {
            Self::PowerShell => format!("{COMMAND_PREFIX}{command}"),
            Self::Python => PYTHON_ENTRY.to_string(),
            Self::Shell => command.to_string(),
        }
    }

    /// Name of the callable that prints usage for `command`, if the family has one.
    #[must_use]
    pub fn usage_entry(self, command: &str) -> Option<String> {
        match self {
            Self::PowerShell => Some(format!("{USAGE_PREFIX}{command}")),
            Self::Python => Some(PYTHON_USAGE.to_string()),
            Self::Shell => None,
        }
    }

    /// Check that `source` (the artifact text) declares the entry point of `command`.
    #[must_use]
    pub fn declares_entry(self, command: &str, source: &str) -> bool {
        let pattern = match self {
            Self::PowerShell => format!(
                r"(?im)^\s*function\s+(?:global:|script:)?{}(?:\s|\{{|\(|$)",
                regex::escape(&self.entry_point(command))
            ),
            Self::Python => format!(
                r"(?m)^(?:async\s+)?def\s+{}\s*\(|^{}\s*=",
                PYTHON_ENTRY, PYTHON_ENTRY
            ),
            Self::Shell => return true,
        };
        Regex::new(&pattern).is_ok_and(|re| re.is_match(source))
    }

    /// Read the artifact at `path` and fail with `CommandEntryNotFound` when it
    /// does not declare the entry point of `command`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn verify_entry(self, path: &Path, command: &str) -> Result<()> {
        if self == Self::Shell {
            return Ok(());
        }
        let bytes = std::fs::read(path)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read artifact"))?;
        let text = String::from_utf8_lossy(&bytes);
        if self.declares_entry(command, &text) {
            Ok(())
        } else {
            Err(Error::entry_not_found(path, self.entry_point(command)))
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
