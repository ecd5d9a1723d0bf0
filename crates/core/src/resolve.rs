//! Resolution order and the two-pass (cache, then fetch) candidate search.

use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::artifact::ArtifactKind;
use crate::cache::Cache;
use crate::fetch::Fetcher;
use crate::log::DebugLog;
use crate::registry::Registry;
use crate::source::Source;
use crate::{Error, Result};

/// Sources to probe for `command`, first occurrence wins:
/// the hinted source, then the pinned source, then everything by priority.
///
/// Hints and pins naming unknown sources are skipped.
#[must_use]
pub fn build_order<'r>(command: &str, hint: Option<&str>, registry: &'r Registry) -> Vec<&'r Source> {
    let hinted = hint.and_then(|name| registry.get(name));
    let pinned = registry.pin(command).and_then(|name| registry.get(name));

    let mut order: Vec<&Source> = Vec::with_capacity(registry.sources().len());
    let mut seen: HashSet<&str> = HashSet::new();
    for source in hinted.into_iter().chain(pinned).chain(registry.by_priority()) {
        if seen.insert(source.name.as_str()) {
            order.push(source);
        }
    }
    order
}

/// One `(source, family)` pair to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'r> {
    /// Source to probe.
    pub source: &'r Source,
    /// Artifact family.
    pub kind: ArtifactKind,
}

/// Expand an order into candidates, families in preference order per source.
#[must_use]
pub fn candidates<'r>(order: &[&'r Source]) -> Vec<Candidate<'r>> {
    order
        .iter()
        .flat_map(|&source| {
            ArtifactKind::PREFERENCE
                .into_iter()
                .map(move |kind| Candidate { source, kind })
        })
        .collect()
}

/// A candidate that yielded a runnable artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Source the artifact belongs to.
    pub source: String,
    /// Artifact family.
    pub kind: ArtifactKind,
    /// Cached artifact path.
    pub path: PathBuf,
    /// Whether it was fetched during this resolution.
    pub fetched: bool,
}

/// Finds the artifact for a command: every candidate is checked against the
/// cache before any candidate is fetched.
pub struct Resolver<'a> {
    registry: &'a Registry,
    cache: &'a Cache,
    fetcher: &'a Fetcher,
    log: &'a dyn DebugLog,
}

impl<'a> Resolver<'a> {
    /// Create a resolver for one invocation.
    #[must_use]
    pub fn new(
        registry: &'a Registry,
        cache: &'a Cache,
        fetcher: &'a Fetcher,
        log: &'a dyn DebugLog,
    ) -> Self {
        Self {
            registry,
            cache,
            fetcher,
            log,
        }
    }

    /// Locate `command`, fetching on demand. `Ok(None)` means every candidate
    /// was exhausted.
    ///
    /// # Errors
    ///
    /// Per-candidate failures are recorded and skipped; only errors outside
    /// that class (such as an unwritable cache) are returned.
    pub async fn locate(&self, command: &str, hint: Option<&str>) -> Result<Option<Resolved>> {
        if let Some(name) = hint
            && self.registry.get(name).is_none()
        {
            self.skip(&Error::source_not_found(name));
        }
        if let Some(name) = self.registry.pin(command)
            && self.registry.get(name).is_none()
        {
            self.skip(&Error::source_not_found(name));
        }

        let order = build_order(command, hint, self.registry);
        let candidates = candidates(&order);
        debug!(
            command,
            sources = ?order.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "Resolution order"
        );

        if let Some(found) = self.cache_pass(command, &candidates)? {
            return Ok(Some(found));
        }
        self.fetch_pass(command, &candidates).await
    }

    fn cache_pass(&self, command: &str, candidates: &[Candidate<'_>]) -> Result<Option<Resolved>> {
        for candidate in candidates {
            let Some(path) = self
                .cache
                .get(&candidate.source.name, command, candidate.kind)
            else {
                continue;
            };
            match candidate.kind.verify_entry(&path, command) {
                Ok(()) => {
                    self.log.record(&format!("Cache hit: {}", path.display()));
                    return Ok(Some(Resolved {
                        source: candidate.source.name.clone(),
                        kind: candidate.kind,
                        path,
                        fetched: false,
                    }));
                }
                Err(e) if e.is_per_candidate() => self.skip(&e),
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    async fn fetch_pass(
        &self,
        command: &str,
        candidates: &[Candidate<'_>],
    ) -> Result<Option<Resolved>> {
        let mut unreachable: HashSet<&str> = HashSet::new();

        for candidate in candidates {
            let name = candidate.source.name.as_str();
            if unreachable.contains(name) {
                continue;
            }
            if self.cache.exists(name, command, candidate.kind) {
                // Rejected by the cache pass; never refetched.
                continue;
            }

            let descriptor = match candidate.source.resolve(command, candidate.kind) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    self.skip(&e);
                    unreachable.insert(name);
                    continue;
                }
            };

            let bytes = match self.fetcher.fetch(&descriptor).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.log.record(&format!(
                        "Fetch failed [{name}/{command}.{}]: {e}",
                        candidate.kind.extension()
                    ));
                    if matches!(e, Error::Retrieval { unreachable: true, .. }) {
                        warn!(source = name, error = %e, "Source unreachable, skipping its remaining candidates");
                        unreachable.insert(name);
                    }
                    continue;
                }
            };

            let path = self.cache.store(name, command, candidate.kind, &bytes)?;
            self.log.record(&format!("Cached {descriptor} as {}", path.display()));

            match candidate.kind.verify_entry(&path, command) {
                Ok(()) => {
                    return Ok(Some(Resolved {
                        source: name.to_string(),
                        kind: candidate.kind,
                        path,
                        fetched: true,
                    }));
                }
                Err(e) if e.is_per_candidate() => self.skip(&e),
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    fn skip(&self, error: &Error) {
        debug!(error = %error, "Skipping candidate");
        self.log.record(&format!("Skipping: {error}"));
    }
}
