//! Centralized path management for the nuro home directory.
//!
//! Layout (default root `~/.nuro`, overridable with `NURO_HOME`):
//!
//! ```text
//! ~/.nuro/
//! ├── config/
//! │   ├── buckets.json     # registry of sources and pins
//! │   └── github.json      # repository used for the default source
//! ├── logs/
//! │   └── nuro-debug.log
//! ├── ps1/<source>/<command>.ps1
//! ├── py/<source>/<command>.py
//! └── sh/<source>/<command>.sh
//! ```

use crate::artifact::ArtifactKind;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Resolved locations under one nuro home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NuroPaths {
    home: PathBuf,
}

impl NuroPaths {
    /// Use `home` as the nuro root.
    #[must_use]
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Resolve the root directory.
    ///
    /// Resolution order:
    /// 1. `NURO_HOME` environment variable
    /// 2. `~/.nuro`
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn discover() -> Result<Self> {
        if let Ok(dir) = std::env::var("NURO_HOME")
            && !dir.is_empty()
        {
            return Ok(Self::new(dir));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::configuration("Could not determine home directory"))?;
        Ok(Self::new(home.join(".nuro")))
    }

    /// The nuro root.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Directory holding configuration documents.
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.home.join("config")
    }

    /// Directory holding log files.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    /// The registry document.
    #[must_use]
    pub fn registry_file(&self) -> PathBuf {
        self.config_dir().join("buckets.json")
    }

    /// Repository settings used to build the default source.
    #[must_use]
    pub fn github_config_file(&self) -> PathBuf {
        self.config_dir().join("github.json")
    }

    /// The debug log file.
    #[must_use]
    pub fn debug_log_file(&self) -> PathBuf {
        self.logs_dir().join("nuro-debug.log")
    }

    /// Cache subtree for one artifact family.
    #[must_use]
    pub fn cache_root(&self, kind: ArtifactKind) -> PathBuf {
        self.home.join(kind.extension())
    }

    /// Create every directory of the layout.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_tree(&self) -> Result<()> {
        let mut dirs = vec![self.home.clone(), self.config_dir(), self.logs_dir()];
        dirs.extend(ArtifactKind::PREFERENCE.iter().map(|k| self.cache_root(*k)));

        for dir in dirs {
            std::fs::create_dir_all(&dir)
                .map_err(|e| Error::io(e, Some(dir.clone()), "create directory"))?;
        }
        Ok(())
    }
}
