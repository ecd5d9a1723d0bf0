//! Source locations and their resolution to fetchable descriptors.
//!
//! Grammar:
//!
//! ```text
//! repository::owner/repo[@ref]   raw files under <repo>/<ref>/cmds
//! rawbase::<url>                 explicit base URL
//! local::<path>                  directory on disk
//! <anything else>                same as local::<anything else>
//! ```
//!
//! `github::` and `raw::` are accepted as older spellings of the first two.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::artifact::ArtifactKind;
use crate::{Error, Result};

const RAW_CONTENT_BASE: &str = "https://raw.githubusercontent.com";
const REPOSITORY_SUBDIR: &str = "cmds";
const DEFAULT_REF: &str = "main";

/// Parsed form of a source-location string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// A hosted repository; artifacts live under `cmds/` at `git_ref`.
    Repository {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
        /// Branch, tag or commit.
        git_ref: String,
    },
    /// An explicit base URL.
    RawBase {
        /// Base URL without trailing slash.
        base: String,
    },
    /// A directory on the local file system.
    Local {
        /// Directory as written.
        dir: PathBuf,
    },
}

impl SourceLocation {
    /// Parse a location string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSource` for an empty repository spec, a repository spec
    /// without `owner/repo`, an empty ref, or an empty raw base.
    pub fn parse(uri: &str) -> Result<Self> {
        if let Some(spec) = uri
            .strip_prefix("repository::")
            .or_else(|| uri.strip_prefix("github::"))
        {
            return Self::parse_repository(uri, spec);
        }
        if let Some(base) = uri
            .strip_prefix("rawbase::")
            .or_else(|| uri.strip_prefix("raw::"))
        {
            let base = base.trim().trim_end_matches('/');
            if base.is_empty() {
                return Err(Error::invalid_source(uri, "empty base URL"));
            }
            return Ok(Self::RawBase {
                base: base.to_string(),
            });
        }
        let dir = uri.strip_prefix("local::").unwrap_or(uri);
        if dir.trim().is_empty() {
            return Err(Error::invalid_source(uri, "empty directory"));
        }
        Ok(Self::Local {
            dir: PathBuf::from(dir),
        })
    }

    fn parse_repository(uri: &str, spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(Error::invalid_source(uri, "empty repository spec"));
        }
        let (repo_part, git_ref) = match spec.split_once('@') {
            Some((_, "")) => return Err(Error::invalid_source(uri, "empty ref after '@'")),
            Some((repo, git_ref)) => (repo, git_ref),
            None => (spec, DEFAULT_REF),
        };
        let Some((owner, repo)) = repo_part.split_once('/') else {
            return Err(Error::invalid_source(uri, "expected owner/repo"));
        };
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(Error::invalid_source(uri, "expected owner/repo"));
        }
        Ok(Self::Repository {
            owner: owner.to_string(),
            repo: repo.to_string(),
            git_ref: git_ref.to_string(),
        })
    }

    /// Whether artifacts are downloaded rather than copied.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        !matches!(self, Self::Local { .. })
    }

    /// Build the descriptor for `command` in family `kind`.
    ///
    /// Pure string and path construction; remote URLs carry a fresh
    /// cache-busting token on every call.
    ///
    /// # Errors
    ///
    /// Returns an I/O error only if the current directory is needed to make a
    /// relative local path absolute and cannot be read.
    pub fn resolve(&self, command: &str, kind: ArtifactKind) -> Result<Descriptor> {
        let file = format!("{command}.{}", kind.extension());
        match self {
            Self::Repository {
                owner,
                repo,
                git_ref,
            } => Ok(Descriptor::Remote {
                url: with_cache_buster(&format!(
                    "{RAW_CONTENT_BASE}/{owner}/{repo}/{git_ref}/{REPOSITORY_SUBDIR}/{file}"
                )),
            }),
            Self::RawBase { base } => Ok(Descriptor::Remote {
                url: with_cache_buster(&format!("{base}/{file}")),
            }),
            Self::Local { dir } => {
                let path = std::path::absolute(dir.join(&file))
                    .map_err(|e| Error::io(e, Some(dir.join(&file)), "resolve local source"))?;
                Ok(Descriptor::Local { path })
            }
        }
    }
}

fn with_cache_buster(url: &str) -> String {
    format!("{url}?cb={}", uuid::Uuid::new_v4())
}

/// Where the bytes of one candidate come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// Download from a URL.
    Remote {
        /// Fully built URL including the cache-busting token.
        url: String,
    },
    /// Copy from a file.
    Local {
        /// Absolute path.
        path: PathBuf,
    },
}

impl std::fmt::Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote { url } => f.write_str(url),
            Self::Local { path } => write!(f, "{}", path.display()),
        }
    }
}

/// A named, prioritised source as it appears in the registry document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Unique name; also the cache subdirectory.
    pub name: String,
    /// Location string, see the module docs.
    pub uri: String,
    /// Higher values are probed first.
    #[serde(default)]
    pub priority: i64,
}

impl Source {
    /// Create a source.
    #[must_use]
    pub fn new(name: impl Into<String>, uri: impl Into<String>, priority: i64) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            priority,
        }
    }

    /// Parse this source's location.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSource` if the location string is malformed.
    pub fn location(&self) -> Result<SourceLocation> {
        SourceLocation::parse(&self.uri)
    }

    /// Resolve `command` in family `kind` against this source.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSource` if the location string is malformed.
    pub fn resolve(&self, command: &str, kind: ArtifactKind) -> Result<Descriptor> {
        self.location()?.resolve(command, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_url(d: Descriptor) -> String {
        match d {
            Descriptor::Remote { url } => url,
            Descriptor::Local { path } => panic!("expected remote, got {}", path.display()),
        }
    }

    #[test]
    fn test_parse_repository() {
        assert_eq!(
            SourceLocation::parse("repository::acme/tools@v1").unwrap(),
            SourceLocation::Repository {
                owner: "acme".into(),
                repo: "tools".into(),
                git_ref: "v1".into(),
            }
        );
        assert_eq!(
            SourceLocation::parse("github::acme/tools").unwrap(),
            SourceLocation::Repository {
                owner: "acme".into(),
                repo: "tools".into(),
                git_ref: "main".into(),
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed_repository() {
        for uri in [
            "repository::",
            "repository::   ",
            "repository::acme",
            "repository::acme/tools@",
            "repository::/tools",
            "rawbase::",
        ] {
            let err = SourceLocation::parse(uri).unwrap_err();
            assert!(
                matches!(err, Error::InvalidSource { .. }),
                "{uri} should be invalid"
            );
        }
    }

    #[test]
    fn test_bare_string_is_local() {
        assert_eq!(
            SourceLocation::parse("/tmp/cmds").unwrap(),
            SourceLocation::Local {
                dir: PathBuf::from("/tmp/cmds")
            }
        );
        assert_eq!(
            SourceLocation::parse("local::/tmp/cmds").unwrap(),
            SourceLocation::parse("/tmp/cmds").unwrap()
        );
    }

    #[test]
    fn test_resolve_repository_url() {
        let url = remote_url(
            Source::new("official", "repository::acme/tools@dev", 10)
                .resolve("hello", ArtifactKind::PowerShell)
                .unwrap(),
        );
        let (base, token) = url.split_once("?cb=").unwrap();
        assert_eq!(
            base,
            "https://raw.githubusercontent.com/acme/tools/dev/cmds/hello.ps1"
        );
        assert!(uuid::Uuid::parse_str(token).is_ok());
    }

    #[test]
    fn test_resolve_raw_base_trims_slash() {
        let url = remote_url(
            Source::new("mirror", "raw::https://cdn.example.com/nuro/", 0)
                .resolve("ping", ArtifactKind::Python)
                .unwrap(),
        );
        assert!(url.starts_with("https://cdn.example.com/nuro/ping.py?cb="));
    }

    #[test]
    fn test_cache_buster_changes_every_call() {
        let source = Source::new("mirror", "rawbase::https://cdn.example.com", 0);
        let a = source.resolve("x", ArtifactKind::Shell).unwrap();
        let b = source.resolve("x", ArtifactKind::Shell).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_resolve_local_is_absolute() {
        let d = Source::new("dev", "local::relative/cmds", 0)
            .resolve("hello", ArtifactKind::Shell)
            .unwrap();
        match d {
            Descriptor::Local { path } => {
                assert!(path.is_absolute());
                assert!(path.ends_with("relative/cmds/hello.sh"));
            }
            Descriptor::Remote { url } => panic!("expected local, got {url}"),
        }
    }

    #[test]
    fn test_priority_defaults_to_zero() {
        let source: Source = serde_json::from_str(r#"{"name":"a","uri":"/x"}"#).unwrap();
        assert_eq!(source.priority, 0);
    }
}
