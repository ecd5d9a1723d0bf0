//! Runtime settings and the repository document behind the default source.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths::NuroPaths;
use crate::{Error, Result};

/// Default timeout for artifact downloads.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for usage extraction and remote listing.
pub const DEFAULT_USAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for one invocation, read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Home directory layout.
    pub paths: NuroPaths,
    /// Timeout applied to each artifact download.
    pub fetch_timeout: Duration,
    /// Timeout applied to usage extraction.
    pub usage_timeout: Duration,
    /// Whether the debug log file is written.
    pub debug: bool,
    /// Explicit PowerShell binary.
    pub pwsh: Option<PathBuf>,
    /// Explicit Python binary.
    pub python: Option<PathBuf>,
    /// Explicit shell binary.
    pub shell: Option<PathBuf>,
}

impl Settings {
    /// Defaults rooted at `home`, ignoring the environment.
    #[must_use]
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            paths: NuroPaths::new(home),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            usage_timeout: DEFAULT_USAGE_TIMEOUT,
            debug: false,
            pwsh: None,
            python: None,
            shell: None,
        }
    }

    /// Read settings from `NURO_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or
    /// `NURO_FETCH_TIMEOUT` is not a number of seconds.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::with_home(NuroPaths::discover()?.home());

        if let Some(raw) = env_value("NURO_FETCH_TIMEOUT") {
            let secs: u64 = raw.parse().map_err(|_| {
                Error::configuration(format!(
                    "NURO_FETCH_TIMEOUT must be a number of seconds, got '{raw}'"
                ))
            })?;
            settings.fetch_timeout = Duration::from_secs(secs);
        }
        settings.debug = env_value("NURO_DEBUG").is_some_and(|v| is_truthy(&v));
        settings.pwsh = env_value("NURO_PWSH").map(PathBuf::from);
        settings.python = env_value("NURO_PYTHON").map(PathBuf::from);
        settings.shell = env_value("NURO_SHELL").map(PathBuf::from);

        Ok(settings)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Repository used for the `official` source when no registry document exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Repository owner.
    #[serde(default = "default_owner")]
    pub owner: String,
    /// Repository name.
    #[serde(default = "default_repo")]
    pub repo: String,
    /// Branch or tag.
    #[serde(default = "default_ref", rename = "ref")]
    pub git_ref: String,
    /// Commit; wins over `ref` when non-empty.
    #[serde(default)]
    pub sha: String,
}

fn default_owner() -> String {
    "nor-void".to_string()
}

fn default_repo() -> String {
    "nuro".to_string()
}

fn default_ref() -> String {
    normalize_ref(std::env::var("NURO_REF").ok().as_deref())
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            repo: default_repo(),
            git_ref: default_ref(),
            sha: String::new(),
        }
    }
}

/// Strip `refs/heads/` and `refs/tags/`; empty becomes `main`.
#[must_use]
pub fn normalize_ref(git_ref: Option<&str>) -> String {
    let raw = git_ref.map(str::trim).unwrap_or_default();
    let stripped = raw
        .strip_prefix("refs/heads/")
        .or_else(|| raw.strip_prefix("refs/tags/"))
        .unwrap_or(raw);
    if stripped.is_empty() {
        "main".to_string()
    } else {
        stripped.to_string()
    }
}

impl GithubConfig {
    /// Load `path`, writing defaults when it is missing or unreadable.
    ///
    /// # Errors
    ///
    /// Returns an error only if defaults have to be written and cannot be.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let parsed = if raw.trim().is_empty() {
                    serde_json::from_str::<Self>("{}")
                } else {
                    serde_json::from_str::<Self>(&raw)
                };
                match parsed {
                    Ok(mut config) => {
                        config.git_ref = normalize_ref(Some(&config.git_ref));
                        Ok(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Rewriting broken github.json with defaults");
                        Self::write_defaults(path)
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::write_defaults(path),
            Err(e) => Err(Error::io(e, Some(path.to_path_buf()), "read github.json")),
        }
    }

    fn write_defaults(path: &Path) -> Result<Self> {
        let config = Self::default();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io(e, Some(parent.to_path_buf()), "create config directory"))?;
        }
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| Error::configuration(format!("serialize github.json: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "write github.json"))?;
        Ok(config)
    }

    /// `sha` when set, otherwise the normalised ref.
    #[must_use]
    pub fn effective_ref(&self) -> String {
        let sha = self.sha.trim();
        if sha.is_empty() {
            normalize_ref(Some(&self.git_ref))
        } else {
            sha.to_string()
        }
    }

    /// Source location string for this repository.
    #[must_use]
    pub fn repository_uri(&self) -> String {
        format!(
            "repository::{}/{}@{}",
            self.owner.trim(),
            self.repo.trim(),
            self.effective_ref()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_ref() {
        assert_eq!(normalize_ref(None), "main");
        assert_eq!(normalize_ref(Some("")), "main");
        assert_eq!(normalize_ref(Some("refs/heads/dev")), "dev");
        assert_eq!(normalize_ref(Some("refs/tags/v1.2")), "v1.2");
        assert_eq!(normalize_ref(Some("feature/x")), "feature/x");
    }

    #[test]
    fn test_sha_wins_over_ref() {
        let config = GithubConfig {
            owner: "acme".into(),
            repo: "tools".into(),
            git_ref: "refs/heads/dev".into(),
            sha: "abc123".into(),
        };
        assert_eq!(config.repository_uri(), "repository::acme/tools@abc123");

        let config = GithubConfig {
            sha: String::new(),
            ..config
        };
        assert_eq!(config.repository_uri(), "repository::acme/tools@dev");
    }

    #[test]
    fn test_missing_file_is_written_with_defaults() {
        temp_env::with_var_unset("NURO_REF", || {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join("config").join("github.json");

            let config = GithubConfig::load_or_init(&path).unwrap();
            assert_eq!(config.owner, "nor-void");
            assert_eq!(config.repo, "nuro");
            assert_eq!(config.git_ref, "main");
            assert!(path.exists());

            let written: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
            assert_eq!(written["ref"], "main");
            assert_eq!(written["sha"], "");
        });
    }

    #[test]
    fn test_broken_file_is_rewritten() {
        temp_env::with_var("NURO_REF", Some("refs/heads/next"), || {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join("github.json");
            std::fs::write(&path, "{ not json").unwrap();

            let config = GithubConfig::load_or_init(&path).unwrap();
            assert_eq!(config.git_ref, "next");
            assert!(std::fs::read_to_string(&path).unwrap().contains("\"next\""));
        });
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        temp_env::with_var_unset("NURO_REF", || {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join("github.json");
            std::fs::write(&path, r#"{"owner": "acme", "ref": "refs/tags/v2"}"#).unwrap();

            let config = GithubConfig::load_or_init(&path).unwrap();
            assert_eq!(config.owner, "acme");
            assert_eq!(config.repo, "nuro");
            assert_eq!(config.git_ref, "v2");
        });
    }

    #[test]
    fn test_settings_from_env() {
        let temp = TempDir::new().unwrap();
        temp_env::with_vars(
            [
                ("NURO_HOME", Some(temp.path().to_str().unwrap())),
                ("NURO_FETCH_TIMEOUT", Some("5")),
                ("NURO_DEBUG", Some("true")),
                ("NURO_PYTHON", Some("/opt/py/bin/python3")),
                ("NURO_PWSH", None),
                ("NURO_SHELL", Some("")),
            ],
            || {
                let settings = Settings::from_env().unwrap();
                assert_eq!(settings.paths.home(), temp.path());
                assert_eq!(settings.fetch_timeout, Duration::from_secs(5));
                assert_eq!(settings.usage_timeout, DEFAULT_USAGE_TIMEOUT);
                assert!(settings.debug);
                assert_eq!(
                    settings.python.as_deref(),
                    Some(Path::new("/opt/py/bin/python3"))
                );
                assert!(settings.pwsh.is_none());
                assert!(settings.shell.is_none());
            },
        );
    }

    #[test]
    fn test_settings_rejects_bad_timeout() {
        temp_env::with_vars(
            [
                ("NURO_HOME", Some("/tmp/nuro-test")),
                ("NURO_FETCH_TIMEOUT", Some("soon")),
            ],
            || {
                let err = Settings::from_env().unwrap_err();
                assert!(matches!(err, Error::Configuration { .. }));
            },
        );
    }
}
