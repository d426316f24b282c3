use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collate;

/// Filesystems cap names at 255 bytes; leave room for the cache layout.
const MAX_CACHED_NAME_BYTES: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFile {
    pub path: String,
    pub name: String,
}

/// One item of a drop or file selection.
#[derive(Debug, Clone)]
pub enum DropEntry {
    /// A native file or directory.
    Path(PathBuf),
    /// File contents with no path behind them.
    Blob { name: String, data: Vec<u8> },
}

impl DropEntry {
    /// Accepts plain paths and `file://` URIs.
    pub fn from_location(location: &str) -> Option<DropEntry> {
        let location = location.trim();
        if location.is_empty() {
            return None;
        }
        if location.starts_with("file://") {
            let url = url::Url::parse(location).ok()?;
            return url.to_file_path().ok().map(DropEntry::Path);
        }
        Some(DropEntry::Path(PathBuf::from(location)))
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to cache {name}: {source}")]
    CacheWrite {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl ResolveError {
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::Io { .. } => "resolution_io_error",
            ResolveError::CacheWrite { .. } => "cache_write_error",
        }
    }

    /// The path or blob name the error belongs to.
    pub fn entry(&self) -> String {
        match self {
            ResolveError::Io { path, .. } => path.to_string_lossy().into_owned(),
            ResolveError::CacheWrite { name, .. } => name.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Resolution {
    pub files: Vec<ResolvedFile>,
    pub skipped: Vec<ResolveError>,
}

/// Process-wide directory holding copies of pathless uploads.
#[derive(Debug)]
pub struct UploadCache {
    root: PathBuf,
}

impl UploadCache {
    /// Wipes and recreates `root`. Only call this once, at start-up.
    pub fn reset(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        match std::fs::remove_dir_all(&root) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("could not clear upload cache {}: {e}", root.display()),
        }
        std::fs::create_dir_all(&root)?;
        let root = std::fs::canonicalize(&root)?;
        debug!("upload cache ready at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `data` under a fresh subdirectory. `name` is kept as the
    /// display name while the on-disk name is sanitized.
    pub fn store(&self, name: &str, data: &[u8]) -> Result<ResolvedFile, ResolveError> {
        let safe_name = sanitize_file_name(name);
        let cache_err = |source| ResolveError::CacheWrite {
            name: name.to_string(),
            source,
        };
        let dir = self.fresh_dir().map_err(cache_err)?;
        let destination = dir.join(&safe_name);
        std::fs::write(&destination, data).map_err(cache_err)?;
        Ok(ResolvedFile {
            path: destination.to_string_lossy().into_owned(),
            name: if name.is_empty() {
                safe_name
            } else {
                name.to_string()
            },
        })
    }

    fn fresh_dir(&self) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        loop {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis();
            let suffix = Uuid::new_v4().simple().to_string();
            let dir = self.root.join(format!("{millis}-{}", &suffix[..8]));
            match std::fs::create_dir(&dir) {
                Ok(()) => return Ok(dir),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Basename only, characters illegal on common filesystems replaced with
/// `_`, at most the last 200 bytes of UTF-8 (cut on a character boundary so
/// the extension survives), `file` when nothing usable is left.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or("");
    let replaced: String = base
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if (c as u32) < 0x20 => '_',
            c => c,
        })
        .collect();
    let mut cut = replaced.len().saturating_sub(MAX_CACHED_NAME_BYTES);
    while !replaced.is_char_boundary(cut) {
        cut += 1;
    }
    match &replaced[cut..] {
        "" | "." | ".." => "file".to_string(),
        capped => capped.to_string(),
    }
}

/// Resolves every entry into a flat file list, deduplicated by path and
/// sorted by name. Failing entries are reported in `skipped`.
pub fn resolve_entries(entries: &[DropEntry], cache: &UploadCache) -> Resolution {
    let mut visited = HashSet::new();
    let mut files = Vec::new();
    let mut skipped = Vec::new();

    for entry in entries {
        match entry {
            DropEntry::Path(path) => walk_path(path, &mut visited, &mut files, &mut skipped),
            DropEntry::Blob { name, data } => {
                if data.is_empty() {
                    debug!("ignoring empty upload {name}");
                    continue;
                }
                match cache.store(name, data) {
                    Ok(file) => files.push(file),
                    Err(e) => {
                        warn!("{e}");
                        skipped.push(e);
                    }
                }
            }
        }
    }

    let files = dedupe_files(files);
    info!(
        entries = entries.len(),
        files = files.len(),
        skipped = skipped.len(),
        "resolved dropped entries"
    );
    Resolution { files, skipped }
}

/// Depth-first walk over `root` using an explicit stack. `visited` holds
/// canonical paths and may be shared across several roots.
pub fn walk_path(
    root: &Path,
    visited: &mut HashSet<PathBuf>,
    files: &mut Vec<ResolvedFile>,
    skipped: &mut Vec<ResolveError>,
) {
    let mut pending = vec![root.to_path_buf()];

    while let Some(candidate) = pending.pop() {
        let resolved = match std::fs::canonicalize(&candidate) {
            Ok(p) => p,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("skipping vanished path {}", candidate.display());
                continue;
            }
            Err(source) => {
                warn!("cannot resolve {}: {source}", candidate.display());
                skipped.push(ResolveError::Io {
                    path: candidate,
                    source,
                });
                continue;
            }
        };
        if !visited.insert(resolved.clone()) {
            continue;
        }

        let meta = match std::fs::metadata(&resolved) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(source) => {
                skipped.push(ResolveError::Io {
                    path: resolved,
                    source,
                });
                continue;
            }
        };

        if meta.is_dir() {
            match sorted_children(&resolved) {
                // Reversed so the stack pops children in name order.
                Ok(children) => pending.extend(children.into_iter().rev()),
                Err(source) => {
                    warn!("cannot list {}: {source}", resolved.display());
                    skipped.push(ResolveError::Io {
                        path: resolved,
                        source,
                    });
                }
            }
        } else if meta.is_file() {
            let name = candidate
                .file_name()
                .or_else(|| resolved.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            files.push(ResolvedFile {
                path: resolved.to_string_lossy().into_owned(),
                name,
            });
        }
    }
}

fn sorted_children(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        match entry {
            Ok(entry) => children.push(entry.path()),
            Err(e) => debug!("skipping unreadable entry in {}: {e}", dir.display()),
        }
    }
    children.sort();
    Ok(children)
}

/// First occurrence of each path wins; result sorted by display name.
pub fn dedupe_files(files: Vec<ResolvedFile>) -> Vec<ResolvedFile> {
    let mut seen = HashSet::new();
    let mut unique: Vec<ResolvedFile> = files
        .into_iter()
        .filter(|f| seen.insert(f.path.clone()))
        .collect();
    unique.sort_by(|a, b| collate::compare(&a.name, &b.name));
    unique
}

/// Merges a new resolution into an existing pool.
pub fn merge_files(existing: &[ResolvedFile], incoming: &[ResolvedFile]) -> Vec<ResolvedFile> {
    dedupe_files(existing.iter().chain(incoming).cloned().collect())
}
