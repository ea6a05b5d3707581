//! Directory traversal.
//!
//! [`walk`] returns a lazy, single-pass iterator yielding one
//! [`DirectoryGroup`] per directory under the root (the root included), in
//! file-name order. Each group holds only the candidate artwork found
//! directly inside that directory; directories without candidates yield an
//! empty group, which consumers skip.
//!
//! ## Symlinks
//!
//! Directory symlinks are not followed unless `follow_symlinks` is set. When
//! following, `walkdir` checks each directory against its ancestors and
//! reports a loop as an error instead of descending; the walker logs it and
//! moves on, so the sequence stays finite.

use crate::types::{ArtworkFile, CandidateSet, DirectoryGroup};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Library root not found: {}", .0.display())]
    RootNotFound(PathBuf),
    #[error("Library root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Traversal options.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    pub follow_symlinks: bool,
}

/// Lazy iterator over the directories of a library tree.
pub struct DirectoryWalker {
    inner: walkdir::IntoIter,
    candidates: CandidateSet,
}

/// Start walking `root`.
///
/// The root is canonicalized first, so every yielded path is absolute.
/// A missing root, or one that is not a directory, is an error before any
/// directory is visited.
pub fn walk(
    root: &Path,
    candidates: &CandidateSet,
    options: &WalkOptions,
) -> Result<DirectoryWalker, WalkError> {
    let root = fs::canonicalize(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => WalkError::RootNotFound(root.to_path_buf()),
        _ => WalkError::Io(e),
    })?;
    if !root.is_dir() {
        return Err(WalkError::NotADirectory(root));
    }
    let inner = WalkDir::new(&root)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name()
        .into_iter();
    Ok(DirectoryWalker {
        inner,
        candidates: candidates.clone(),
    })
}

impl DirectoryWalker {
    fn group_for(&self, dir: &Path) -> DirectoryGroup {
        let mut group = DirectoryGroup::new(dir);
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list {}: {}", dir.display(), e);
                return group;
            }
        };

        let mut matches: Vec<(usize, String)> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                self.candidates.position(&name).map(|pos| (pos, name))
            })
            .collect();

        // Candidate-set order first, then name, for a stable tie-break order.
        matches.sort();
        group.files = matches
            .into_iter()
            .map(|(_, name)| ArtworkFile::new(dir.join(name)))
            .collect();
        group
    }
}

impl Iterator for DirectoryWalker {
    type Item = DirectoryGroup;

    fn next(&mut self) -> Option<DirectoryGroup> {
        loop {
            match self.inner.next()? {
                Ok(entry) if entry.file_type().is_dir() => {
                    return Some(self.group_for(entry.path()));
                }
                Ok(_) => continue,
                Err(e) => {
                    if let Some(ancestor) = e.loop_ancestor() {
                        warn!(
                            "Skipping symlink loop at {} (points back to {})",
                            e.path().map(|p| p.display().to_string()).unwrap_or_default(),
                            ancestor.display()
                        );
                    } else {
                        warn!("Skipping unreadable entry: {}", e);
                    }
                }
            }
        }
    }
}
