//! Command listings: what the cache holds and what the official repository offers.

use serde::Deserialize;
use std::time::Duration;

use crate::artifact::ArtifactKind;
use crate::cache::Cache;
use crate::fetch::Fetcher;
use crate::registry::{OFFICIAL_SOURCE, Registry};
use crate::source::SourceLocation;
use crate::usage::UsageExtractor;
use crate::{Error, Result};

/// Default GitHub REST endpoint.
pub const GITHUB_API: &str = "https://api.github.com";

/// A cached command with its usage summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedCommand {
    /// Command name.
    pub name: String,
    /// Source it is cached under.
    pub source: String,
    /// Artifact family.
    pub kind: ArtifactKind,
    /// First line of its usage output; empty when unavailable.
    pub summary: String,
}

/// Every cached artifact with its usage summary, sorted by name then source.
pub async fn cached_commands(cache: &Cache, usage: &UsageExtractor) -> Vec<ListedCommand> {
    let mut listed = Vec::new();
    for entry in cache.entries() {
        let summary = usage
            .capture_usage(&entry.path, entry.kind, &entry.command)
            .await;
        listed.push(ListedCommand {
            name: entry.command,
            source: entry.source,
            kind: entry.kind,
            summary,
        });
    }
    listed.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.source.cmp(&b.source)));
    listed
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    #[serde(rename = "type", default)]
    item_type: Option<String>,
}

/// Lists commands published in a repository's `cmds/` directory.
#[derive(Debug, Clone)]
pub struct RemoteListing {
    api_base: String,
    timeout: Duration,
}

impl RemoteListing {
    /// List through `api_base` (normally [`GITHUB_API`]).
    #[must_use]
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Contents-API URL for a repository's `cmds/` directory.
    #[must_use]
    pub fn contents_url(&self, owner: &str, repo: &str, git_ref: &str) -> String {
        format!(
            "{}/repos/{owner}/{repo}/contents/cmds?ref={git_ref}",
            self.api_base
        )
    }

    /// Command names offered by the `official` source, if it is a repository.
    ///
    /// # Errors
    ///
    /// Returns `Retrieval` if the listing request fails and `InvalidSource`
    /// if the official location is malformed.
    pub async fn official_commands(
        &self,
        registry: &Registry,
        fetcher: &Fetcher,
    ) -> Result<Vec<String>> {
        let Some(official) = registry.get(OFFICIAL_SOURCE) else {
            return Ok(Vec::new());
        };
        let SourceLocation::Repository {
            owner,
            repo,
            git_ref,
        } = official.location()?
        else {
            return Ok(Vec::new());
        };

        let url = self.contents_url(&owner, &repo, &git_ref);
        let items: Vec<ContentItem> = fetcher.get_json(&url, self.timeout).await?;
        let mut names: Vec<String> = items
            .into_iter()
            .filter(|item| item.item_type.as_deref().is_none_or(|t| t == "file"))
            .filter_map(|item| {
                let path = std::path::Path::new(&item.name);
                ArtifactKind::from_path(path)?;
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(ToString::to_string)
            })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Remote names when available, otherwise names found in the cache.
    pub async fn known_commands(
        &self,
        registry: &Registry,
        fetcher: &Fetcher,
        cache: &Cache,
    ) -> Vec<String> {
        match self.official_commands(registry, fetcher).await {
            Ok(names) if !names.is_empty() => return names,
            Ok(_) => {}
            Err(e) => log_offline(&e),
        }
        cache.command_names()
    }
}

fn log_offline(error: &Error) {
    tracing::debug!(error = %error, "Remote listing unavailable, using cache");
}
