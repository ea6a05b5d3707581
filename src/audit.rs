//! Low-resolution artwork audit.
//!
//! [`scan`] flags probed files below a [`Threshold`]; [`audit`] runs it over
//! a whole library and streams flagged paths to a report file, one absolute
//! path per line. Each line is flushed as it is written, so an interrupted
//! run still leaves a usable partial report that `review` can consume.
//!
//! Probe failures are never flagged. They are a different signal (broken or
//! unsupported file, not small artwork) and are reported through events and
//! the log instead.

use crate::imaging::{Dimensions, ImageProber};
use crate::types::{ArtworkFile, CandidateSet, DirectoryGroup, ProbeFailure};
use crate::walk::{WalkError, WalkOptions, walk};
use log::{info, warn};
use rayon::prelude::*;
use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error(transparent)]
    Walk(#[from] WalkError),
    #[error("Cannot write report {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Minimum acceptable artwork size. Comparison is strict: a file exactly at
/// the threshold passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    pub min_width: u32,
    pub min_height: u32,
}

impl Threshold {
    pub fn new(min_width: u32, min_height: u32) -> Self {
        Self {
            min_width,
            min_height,
        }
    }

    pub fn is_below(&self, dims: Dimensions) -> bool {
        dims.width < self.min_width || dims.height < self.min_height
    }
}

/// Files in `group` whose width or height falls below `threshold`.
///
/// Only successfully probed files are considered.
pub fn scan(group: &DirectoryGroup, threshold: Threshold) -> Vec<ArtworkFile> {
    group
        .probed()
        .filter(|f| f.dimensions.is_some_and(|d| threshold.is_below(d)))
        .cloned()
        .collect()
}

/// Progress events emitted by [`audit`].
#[derive(Debug)]
pub enum AuditEvent {
    Flagged { file: ArtworkFile },
    ProbeFailed(ProbeFailure),
}

/// Totals for an audit pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditSummary {
    pub directories: usize,
    pub files_probed: usize,
    pub flagged: usize,
    pub probe_failures: usize,
}

impl AuditSummary {
    fn merge(self, other: Self) -> Self {
        Self {
            directories: self.directories + other.directories,
            files_probed: self.files_probed + other.files_probed,
            flagged: self.flagged + other.flagged,
            probe_failures: self.probe_failures + other.probe_failures,
        }
    }
}

/// Run the audit pass over `root`, writing flagged paths to `report`.
///
/// The report is created (truncated) before the walk starts. A report that
/// cannot be created or written aborts the pass; per-file probe failures do
/// not.
pub fn audit(
    root: &Path,
    candidates: &CandidateSet,
    prober: &dyn ImageProber,
    threshold: Threshold,
    walk_options: &WalkOptions,
    report: &Path,
    events: Option<Sender<AuditEvent>>,
) -> Result<AuditSummary, AuditError> {
    let walker = walk(root, candidates, walk_options)?;
    let report_error = |source: std::io::Error| AuditError::Report {
        path: report.to_path_buf(),
        source,
    };
    let file = File::create(report).map_err(report_error)?;
    let writer = Mutex::new(LineWriter::new(file));

    let summary = walker
        .par_bridge()
        .map(|mut group| -> Result<AuditSummary, std::io::Error> {
            let mut summary = AuditSummary {
                directories: 1,
                ..Default::default()
            };
            if group.is_empty() {
                return Ok(summary);
            }

            let failures = group.probe_all(prober);
            summary.files_probed = group.files.len() - failures.len();
            summary.probe_failures = failures.len();
            for failure in failures {
                warn!("Could not process {}: {}", failure.path.display(), failure.error);
                if let Some(tx) = &events {
                    tx.send(AuditEvent::ProbeFailed(failure)).ok();
                }
            }

            for file in scan(&group, threshold) {
                {
                    let mut out = writer
                        .lock()
                        .map_err(|_| std::io::Error::other("report writer poisoned"))?;
                    writeln!(out, "{}", file.path.display())?;
                }
                info!(
                    "Found low-res image: {} ({})",
                    file.path.display(),
                    file.dimensions.map(|d| d.to_string()).unwrap_or_default()
                );
                summary.flagged += 1;
                if let Some(tx) = &events {
                    tx.send(AuditEvent::Flagged { file }).ok();
                }
            }
            Ok(summary)
        })
        .try_reduce(AuditSummary::default, |a, b| Ok(a.merge(b)))
        .map_err(report_error)?;

    writer
        .into_inner()
        .map_err(|_| report_error(std::io::Error::other("report writer poisoned")))?
        .flush()
        .map_err(report_error)?;
    Ok(summary)
}
