//! Duplicate artwork cleanup.
//!
//! Decision and action are separate steps:
//!
//! 1. [`resolve`] is pure. Given a probed [`DirectoryGroup`] it picks the file
//!    to keep (highest pixel count) and lists the others for removal. It never
//!    touches the filesystem.
//! 2. [`delete_duplicates`] performs the removals a [`Resolution`] asks for.
//!
//! [`dedupe`] wires both to the directory walker and runs directories in
//! parallel with rayon; directories are independent units of work.
//!
//! ## Policy
//!
//! - Only successfully probed files take part. Probe failures go to
//!   `unresolved` and are neither kept nor deleted.
//! - Ties on pixel count keep the first file in group order, which is
//!   candidate-set order. The choice is arbitrary but deterministic.
//! - A group with fewer than two probed files has nothing to deduplicate.

use crate::imaging::ImageProber;
use crate::types::{ArtworkFile, CandidateSet, DirectoryGroup, ProbeFailure};
use crate::walk::{WalkError, WalkOptions, walk};
use log::{info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

/// Outcome of resolving one directory group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    pub keep: Option<ArtworkFile>,
    pub remove: Vec<ArtworkFile>,
    pub unresolved: Vec<ArtworkFile>,
}

impl Resolution {
    pub fn is_noop(&self) -> bool {
        self.remove.is_empty()
    }
}

/// Choose the file to keep and the files to remove.
///
/// Precondition: every file in the group has been probed; unprobed files are
/// treated as probe failures.
pub fn resolve(group: &DirectoryGroup) -> Resolution {
    let (probed, unresolved): (Vec<&ArtworkFile>, Vec<&ArtworkFile>) = group
        .files
        .iter()
        .partition(|f| f.dimensions.is_some());
    let unresolved: Vec<ArtworkFile> = unresolved.into_iter().cloned().collect();

    if probed.len() < 2 {
        return Resolution {
            keep: probed.first().map(|f| (*f).clone()),
            remove: Vec::new(),
            unresolved,
        };
    }

    let mut best = 0;
    let mut best_resolution = 0u64;
    for (i, file) in probed.iter().enumerate() {
        let resolution = file.resolution().unwrap_or(0);
        // Strictly greater: on a tie the earlier file stays.
        if i == 0 || resolution > best_resolution {
            best = i;
            best_resolution = resolution;
        }
    }

    let keep = probed[best].clone();
    let remove = probed
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != best)
        .map(|(_, f)| (*f).clone())
        .collect();

    Resolution {
        keep: Some(keep),
        remove,
        unresolved,
    }
}

/// What happened to one file marked for removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalStatus {
    Deleted,
    /// Dry run: the file would have been deleted.
    Planned,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub path: PathBuf,
    pub status: RemovalStatus,
}

/// Delete every file in `resolution.remove`.
///
/// Failures are recorded per file and never stop the remaining deletions.
pub fn delete_duplicates(resolution: &Resolution, dry_run: bool) -> Vec<Removal> {
    let kept = resolution
        .keep
        .as_ref()
        .map(|k| k.path.display().to_string())
        .unwrap_or_default();
    resolution
        .remove
        .iter()
        .map(|file| {
            let status = if dry_run {
                info!("Would delete {} (keeping {})", file.path.display(), kept);
                RemovalStatus::Planned
            } else {
                match std::fs::remove_file(&file.path) {
                    Ok(()) => {
                        info!(
                            "Deleted {} ({} px, keeping {})",
                            file.path.display(),
                            file.resolution().unwrap_or(0),
                            kept
                        );
                        RemovalStatus::Deleted
                    }
                    Err(e) => {
                        warn!("Could not delete {}: {}", file.path.display(), e);
                        RemovalStatus::Failed(e.to_string())
                    }
                }
            };
            Removal {
                path: file.path.clone(),
                status,
            }
        })
        .collect()
}

/// Progress events emitted by [`dedupe`] for console output.
#[derive(Debug)]
pub enum DedupeEvent {
    /// A directory had two or more candidates, or a probe failure.
    DirectoryResolved {
        dir: PathBuf,
        keep: Option<ArtworkFile>,
        removals: Vec<Removal>,
        failures: Vec<ProbeFailure>,
    },
}

/// Options for the cleanup pass.
#[derive(Debug, Clone, Default)]
pub struct DedupeOptions {
    pub walk: WalkOptions,
    pub dry_run: bool,
}

/// Totals for a cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupeSummary {
    pub directories: usize,
    pub groups_with_duplicates: usize,
    pub deleted: usize,
    pub planned: usize,
    pub delete_failures: usize,
    pub probe_failures: usize,
}

impl DedupeSummary {
    fn merge(self, other: Self) -> Self {
        Self {
            directories: self.directories + other.directories,
            groups_with_duplicates: self.groups_with_duplicates + other.groups_with_duplicates,
            deleted: self.deleted + other.deleted,
            planned: self.planned + other.planned,
            delete_failures: self.delete_failures + other.delete_failures,
            probe_failures: self.probe_failures + other.probe_failures,
        }
    }
}

/// Probe, resolve, and delete within one directory.
fn dedupe_directory(
    mut group: DirectoryGroup,
    prober: &dyn ImageProber,
    dry_run: bool,
    events: Option<&Sender<DedupeEvent>>,
) -> DedupeSummary {
    let mut summary = DedupeSummary {
        directories: 1,
        ..Default::default()
    };
    if group.is_empty() {
        return summary;
    }

    let failures = group.probe_all(prober);
    for failure in &failures {
        warn!(
            "Excluded from dedupe, probe failed: {}",
            failure.error
        );
    }
    summary.probe_failures = failures.len();

    let resolution = resolve(&group);
    let removals = delete_duplicates(&resolution, dry_run);
    if !removals.is_empty() {
        summary.groups_with_duplicates = 1;
    }
    for removal in &removals {
        match removal.status {
            RemovalStatus::Deleted => summary.deleted += 1,
            RemovalStatus::Planned => summary.planned += 1,
            RemovalStatus::Failed(_) => summary.delete_failures += 1,
        }
    }

    if (group.files.len() >= 2 || !failures.is_empty())
        && let Some(tx) = events
    {
        tx.send(DedupeEvent::DirectoryResolved {
            dir: group.dir,
            keep: resolution.keep,
            removals,
            failures,
        })
        .ok();
    }
    summary
}

/// Run the cleanup pass over every directory under `root`.
///
/// Only an unusable root is an error. Per-file probe and delete failures are
/// logged, reported through `events`, and counted in the summary.
pub fn dedupe(
    root: &Path,
    candidates: &CandidateSet,
    prober: &dyn ImageProber,
    options: &DedupeOptions,
    events: Option<Sender<DedupeEvent>>,
) -> Result<DedupeSummary, WalkError> {
    let walker = walk(root, candidates, &options.walk)?;
    let summary = walker
        .par_bridge()
        .map(|group| dedupe_directory(group, prober, options.dry_run, events.as_ref()))
        .reduce(DedupeSummary::default, DedupeSummary::merge);
    Ok(summary)
}
