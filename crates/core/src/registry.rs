//! The registry: ordered sources plus per-command pins.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::dispatch::validate_command_name;
use crate::paths::NuroPaths;
use crate::settings::GithubConfig;
use crate::source::Source;
use crate::{Error, Result};

/// Name of the source synthesised when no registry document exists.
pub const OFFICIAL_SOURCE: &str = "official";

/// Priority of the synthesised `official` source.
pub const OFFICIAL_PRIORITY: i64 = 100;

/// Sources and pins, loaded once per invocation and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// Sources in declaration order.
    #[serde(rename = "buckets", default)]
    sources: Vec<Source>,
    /// Command name to preferred source name.
    #[serde(default)]
    pins: BTreeMap<String, String>,
}

impl Registry {
    /// Build a registry, rejecting duplicate source names.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if two sources share a name or a
    /// name is not usable as a single path component.
    pub fn new(sources: Vec<Source>, pins: BTreeMap<String, String>) -> Result<Self> {
        let registry = Self { sources, pins };
        registry.validate()?;
        Ok(registry)
    }

    /// A registry with no sources.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            // Names become cache directory components.
            validate_command_name(&source.name).map_err(|_| {
                Error::configuration(format!(
                    "invalid source name '{}': use letters, digits, '_', '-' or '.'",
                    source.name
                ))
            })?;
            if !seen.insert(source.name.as_str()) {
                return Err(Error::configuration(format!(
                    "duplicate source name '{}' in registry",
                    source.name
                )));
            }
        }
        Ok(())
    }

    /// Parse a registry document.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error on malformed JSON or duplicate names.
    pub fn from_json(raw: &str) -> Result<Self> {
        let registry: Self = serde_json::from_str(raw)
            .map_err(|e| Error::configuration(format!("invalid registry document: {e}")))?;
        registry.validate()?;
        Ok(registry)
    }

    /// Load `path`; `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json(&raw).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(e, Some(path.to_path_buf()), "read registry")),
        }
    }

    /// Load the registry of a nuro home, falling back to the `official`
    /// repository source when the document is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry document is malformed or the
    /// repository settings cannot be initialised.
    pub fn load(paths: &NuroPaths) -> Result<Self> {
        let file = paths.registry_file();
        if let Some(registry) = Self::load_file(&file)? {
            tracing::debug!(path = %file.display(), sources = registry.sources.len(), "Loaded registry");
            return Ok(registry);
        }
        let github = GithubConfig::load_or_init(&paths.github_config_file())?;
        tracing::debug!(uri = %github.repository_uri(), "No registry document, using official source");
        Ok(Self::official(&github))
    }

    /// The single-source default registry.
    #[must_use]
    pub fn official(github: &GithubConfig) -> Self {
        Self {
            sources: vec![Source::new(
                OFFICIAL_SOURCE,
                github.repository_uri(),
                OFFICIAL_PRIORITY,
            )],
            pins: BTreeMap::new(),
        }
    }

    /// Sources in declaration order.
    #[must_use]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Look up a source by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Pinned source name for `command`.
    #[must_use]
    pub fn pin(&self, command: &str) -> Option<&str> {
        self.pins.get(command).map(String::as_str)
    }

    /// Sources by descending priority; ties keep declaration order.
    #[must_use]
    pub fn by_priority(&self) -> Vec<&Source> {
        let mut ordered: Vec<&Source> = self.sources.iter().collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));
        ordered
    }

    /// Whether the registry has no sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
