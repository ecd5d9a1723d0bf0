//! Write-once artifact cache.
//!
//! An artifact is keyed by `(source, command, family)` and lives at
//! `<home>/<ext>/<source>/<command>.<ext>`. Presence of the file is
//! authoritative: a stored artifact is never refreshed or overwritten.

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::artifact::ArtifactKind;
use crate::paths::NuroPaths;
use crate::{Error, Result};

/// One artifact found in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    /// Source subdirectory it was stored under.
    pub source: String,
    /// Command name (file stem).
    pub command: String,
    /// Artifact family.
    pub kind: ArtifactKind,
    /// Full path.
    pub path: PathBuf,
}

/// File-system cache rooted at a nuro home.
#[derive(Debug, Clone)]
pub struct Cache {
    paths: NuroPaths,
}

impl Cache {
    /// Create a cache over the given layout.
    #[must_use]
    pub fn new(paths: NuroPaths) -> Self {
        Self { paths }
    }

    /// Path of the artifact for a key, whether or not it exists.
    #[must_use]
    pub fn path(&self, source: &str, command: &str, kind: ArtifactKind) -> PathBuf {
        self.paths
            .cache_root(kind)
            .join(source)
            .join(format!("{command}.{}", kind.extension()))
    }

    /// Check if the artifact for a key is cached.
    #[must_use]
    pub fn exists(&self, source: &str, command: &str, kind: ArtifactKind) -> bool {
        self.path(source, command, kind).is_file()
    }

    /// Get a cached artifact if it exists.
    #[must_use]
    pub fn get(&self, source: &str, command: &str, kind: ArtifactKind) -> Option<PathBuf> {
        let path = self.path(source, command, kind);
        if path.is_file() {
            trace!(source, command, %kind, ?path, "Cache hit");
            Some(path)
        } else {
            trace!(source, command, %kind, "Cache miss");
            None
        }
    }

    /// Store the bytes of an artifact.
    ///
    /// The bytes go to a temporary file next to the destination which is then
    /// persisted without clobbering, so an interrupted write never leaves a file
    /// at the final path. If the destination appeared in the meantime, the
    /// existing file is kept and returned.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or temporary file cannot be
    /// created or written.
    pub fn store(
        &self,
        source: &str,
        command: &str,
        kind: ArtifactKind,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let dest = self.path(source, command, kind);
        let Some(dir) = dest.parent() else {
            return Err(Error::configuration(format!(
                "cache path has no parent: {}",
                dest.display()
            )));
        };
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::io(e, Some(dir.to_path_buf()), "create cache directory"))?;

        let mut temp = tempfile::Builder::new()
            .prefix(".nuro-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|e| Error::io(e, Some(dir.to_path_buf()), "create temporary file"))?;
        temp.write_all(bytes)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| Error::io(e, Some(temp.path().to_path_buf()), "write artifact"))?;

        match temp.persist_noclobber(&dest) {
            Ok(_) => {
                debug!(source, command, %kind, ?dest, "Stored artifact in cache");
                Ok(dest)
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(?dest, "Artifact appeared concurrently, keeping existing file");
                Ok(dest)
            }
            Err(e) => Err(Error::io(e.error, Some(dest), "persist artifact")),
        }
    }

    /// Every cached artifact, ordered by family preference, then source, then command.
    #[must_use]
    pub fn entries(&self) -> Vec<CachedArtifact> {
        let mut entries = Vec::new();
        for kind in ArtifactKind::PREFERENCE {
            let root = self.paths.cache_root(kind);
            let mut found = Vec::new();
            for source_dir in read_dir_sorted(&root) {
                if !source_dir.is_dir() {
                    continue;
                }
                let Some(source) = file_name(&source_dir) else {
                    continue;
                };
                for file in read_dir_sorted(&source_dir) {
                    if ArtifactKind::from_path(&file) != Some(kind) || !file.is_file() {
                        continue;
                    }
                    if let Some(command) = file.file_stem().and_then(|s| s.to_str()) {
                        found.push(CachedArtifact {
                            source: source.clone(),
                            command: command.to_string(),
                            kind,
                            path: file.clone(),
                        });
                    }
                }
            }
            entries.extend(found);
        }
        entries
    }

    /// Distinct command names present in the cache, sorted.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries().into_iter().map(|e| e.command).collect();
        names.sort();
        names.dedup();
        names
    }
}

fn read_dir_sorted(dir: &Path) -> Vec<PathBuf> {
    let Ok(read) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = read.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();
    paths
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(ToString::to_string)
}
