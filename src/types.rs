//! Shared data model used by the walker, resolver, scanner, and review session.

use crate::imaging::{Dimensions, ImageProber, ProbeError};
use std::path::{Path, PathBuf};

/// Ordered set of filenames recognized as album art.
///
/// Order is significant: it is the traversal order of files within a
/// directory, and therefore the tie-break order for duplicate resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    names: Vec<String>,
    case_insensitive: bool,
}

impl CandidateSet {
    /// Build a set, dropping repeated names (first occurrence wins).
    ///
    /// Returns `None` when no names remain, which callers treat as a
    /// configuration error.
    pub fn new<I, S>(names: I, case_insensitive: bool) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let seen = unique.iter().any(|n| {
                if case_insensitive {
                    n.eq_ignore_ascii_case(name)
                } else {
                    n == name
                }
            });
            if !seen {
                unique.push(name.to_string());
            }
        }
        if unique.is_empty() {
            None
        } else {
            Some(Self {
                names: unique,
                case_insensitive,
            })
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Position of `file_name` in the set, if it is a candidate.
    pub fn position(&self, file_name: &str) -> Option<usize> {
        self.names.iter().position(|n| {
            if self.case_insensitive {
                n.eq_ignore_ascii_case(file_name)
            } else {
                n == file_name
            }
        })
    }
}

/// An artwork file on disk. Dimensions stay `None` until probed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkFile {
    pub path: PathBuf,
    pub dimensions: Option<Dimensions>,
}

impl ArtworkFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dimensions: None,
        }
    }

    pub fn width(&self) -> Option<u32> {
        self.dimensions.map(|d| d.width)
    }

    pub fn height(&self) -> Option<u32> {
        self.dimensions.map(|d| d.height)
    }

    /// Pixel count, available only after a successful probe.
    pub fn resolution(&self) -> Option<u64> {
        self.dimensions.map(Dimensions::pixel_count)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    /// Probe this file, recording dimensions on success.
    pub fn probe(&mut self, prober: &dyn ImageProber) -> Result<Dimensions, ProbeError> {
        let dims = prober.probe(&self.path)?;
        self.dimensions = Some(dims);
        Ok(dims)
    }
}

/// A probe failure, reported separately from any quality decision.
#[derive(Debug)]
pub struct ProbeFailure {
    pub path: PathBuf,
    pub error: ProbeError,
}

/// Candidate artwork found directly inside one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryGroup {
    pub dir: PathBuf,
    pub files: Vec<ArtworkFile>,
}

impl DirectoryGroup {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Probe every file. Failed files keep `dimensions = None` and are
    /// returned so the caller can report them.
    pub fn probe_all(&mut self, prober: &dyn ImageProber) -> Vec<ProbeFailure> {
        let mut failures = Vec::new();
        for file in &mut self.files {
            if let Err(error) = file.probe(prober) {
                failures.push(ProbeFailure {
                    path: file.path.clone(),
                    error,
                });
            }
        }
        failures
    }

    /// Files with successful probes, in group order.
    pub fn probed(&self) -> impl Iterator<Item = &ArtworkFile> {
        self.files.iter().filter(|f| f.dimensions.is_some())
    }
}
