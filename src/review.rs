//! Review session: the operator-confirmed replacement workflow.
//!
//! A [`ReviewSession`] walks a list of local artwork paths (usually the audit
//! report) strictly forward, one item at a time:
//!
//! ```text
//! Idle ─start─▶ Loaded(i) ─▶ AwaitingDecision(i) ─accept/skip─▶ Advancing(i+1)
//!                  │                                              │
//!                  └──────────── auto-skip ──────────────────────▶┤
//!                                                                 ▼
//!                                        Loaded(i+1) … or Complete
//! ```
//!
//! `Loaded` and `Advancing` are transient: [`ReviewSession::start`],
//! [`accept`](ReviewSession::accept) and [`skip`](ReviewSession::skip) return
//! only once the session rests in `AwaitingDecision`, `Complete` or
//! `Abandoned`. An item is auto-skipped (logged, never shown to the operator)
//! when the local file cannot be probed, its path does not name an
//! artist/album, sourcing fails or finds nothing, or the best candidate is not
//! a decodable image.
//!
//! Loading an item shares one timeout budget between the search and the
//! candidate download. The candidate's URL is reported with the item, and
//! with a preview directory configured its bytes are saved there so the
//! operator can look at them before accepting.
//!
//! Accepting overwrites the original file with the candidate bytes. There is
//! no backup. A failed write leaves the item pending so it can be retried.

use crate::config::CurateConfig;
use crate::imaging::{Dimensions, ImageProber, ProbeError};
use crate::naming::{AlbumIdentity, PathConvention, PathConventionError, album_identity};
use crate::sourcing::{
    ArtworkSource, BoundedSearch, CancelToken, CandidateArt, CandidateData, SourceQuery,
    SourcingError,
};
use crate::types::ArtworkFile;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Review input list contains no paths")]
    EmptyInput,
    #[error("Cannot read review input list {}: {source}", path.display())]
    InputList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot {action} while the session is {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
}

/// Read a newline-delimited path list. Blank lines are ignored; a list with
/// no paths is an error.
pub fn load_path_list(path: &Path) -> Result<Vec<PathBuf>, ReviewError> {
    let content = fs::read_to_string(path).map_err(|source| ReviewError::InputList {
        path: path.to_path_buf(),
        source,
    })?;
    let paths: Vec<PathBuf> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect();
    if paths.is_empty() {
        return Err(ReviewError::EmptyInput);
    }
    Ok(paths)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pending,
    Accepted,
    Skipped,
}

/// The candidate whose bytes have been downloaded and probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedCandidate {
    pub rank: u32,
    pub label: Option<String>,
    /// Where the bytes were downloaded from, when the source gave a URL.
    pub url: Option<String>,
    /// Copy of the bytes saved for the operator to open.
    pub preview: Option<PathBuf>,
    pub bytes: Vec<u8>,
    pub dimensions: Dimensions,
}

/// One local file paired with its sourced replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub index: usize,
    pub local: ArtworkFile,
    pub identity: AlbumIdentity,
    /// All candidates the source returned, best first.
    pub candidates: Vec<CandidateArt>,
    pub replacement: FetchedCandidate,
    pub decision: Decision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewState {
    Idle,
    AwaitingDecision(ReviewItem),
    Complete,
    Abandoned,
}

impl ReviewState {
    fn name(&self) -> &'static str {
        match self {
            ReviewState::Idle => "idle",
            ReviewState::AwaitingDecision(_) => "awaiting a decision",
            ReviewState::Complete => "complete",
            ReviewState::Abandoned => "abandoned",
        }
    }

    /// No further operations are valid.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewState::Complete | ReviewState::Abandoned)
    }
}

/// Why an item was skipped without asking the operator.
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error("local image unreadable: {0}")]
    Unreadable(ProbeError),
    #[error("{0}")]
    PathConvention(PathConventionError),
    #[error("{0}")]
    Sourcing(SourcingError),
    #[error("no replacement found")]
    NoCandidates,
    #[error("replacement is not a usable image: {0}")]
    UndecodableCandidate(ProbeError),
}

/// Progress events emitted by a [`ReviewSession`].
#[derive(Debug)]
pub enum ReviewEvent {
    Loaded {
        index: usize,
        total: usize,
        path: PathBuf,
        identity: AlbumIdentity,
        local: Dimensions,
        replacement: Dimensions,
        label: Option<String>,
        url: Option<String>,
        preview: Option<PathBuf>,
        candidates: usize,
    },
    AutoSkipped {
        index: usize,
        total: usize,
        path: PathBuf,
        reason: SkipReason,
    },
    Accepted {
        index: usize,
        path: PathBuf,
    },
    Skipped {
        index: usize,
        path: PathBuf,
    },
    WriteFailed {
        index: usize,
        path: PathBuf,
        error: String,
    },
    Complete(ReviewSummary),
    Abandoned(ReviewSummary),
}

/// Totals for a review session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub items: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub auto_skipped: usize,
    pub write_failures: usize,
}

#[derive(Debug, Clone)]
pub struct ReviewOptions {
    pub convention: PathConvention,
    /// Deadline for loading one item: search plus download.
    pub timeout: Duration,
    /// Directory for candidate previews; none are written when `None`.
    pub preview_dir: Option<PathBuf>,
}

impl Default for ReviewOptions {
    fn default() -> Self {
        Self {
            convention: PathConvention::default(),
            timeout: Duration::from_secs(20),
            preview_dir: None,
        }
    }
}

impl From<&CurateConfig> for ReviewOptions {
    fn from(config: &CurateConfig) -> Self {
        Self {
            convention: PathConvention::from(&config.review),
            timeout: config.sourcing.timeout(),
            preview_dir: config.review.preview_dir.as_ref().map(PathBuf::from),
        }
    }
}

pub struct ReviewSession {
    paths: Vec<PathBuf>,
    state: ReviewState,
    search: BoundedSearch,
    prober: Box<dyn ImageProber>,
    convention: PathConvention,
    preview_dir: Option<PathBuf>,
    cancel: CancelToken,
    events: Option<Sender<ReviewEvent>>,
    summary: ReviewSummary,
    advances: usize,
}

impl ReviewSession {
    pub fn new(
        paths: Vec<PathBuf>,
        source: Arc<dyn ArtworkSource>,
        prober: Box<dyn ImageProber>,
        options: ReviewOptions,
    ) -> Result<Self, ReviewError> {
        if paths.is_empty() {
            return Err(ReviewError::EmptyInput);
        }
        let summary = ReviewSummary {
            items: paths.len(),
            ..Default::default()
        };
        Ok(Self {
            paths,
            state: ReviewState::Idle,
            search: BoundedSearch::new(source, options.timeout),
            prober,
            convention: options.convention,
            preview_dir: options.preview_dir,
            cancel: CancelToken::new(),
            events: None,
            summary,
            advances: 0,
        })
    }

    pub fn with_events(mut self, events: Sender<ReviewEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> &ReviewState {
        &self.state
    }

    /// The item awaiting a decision, if any.
    pub fn current(&self) -> Option<&ReviewItem> {
        match &self.state {
            ReviewState::AwaitingDecision(item) => Some(item),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn summary(&self) -> ReviewSummary {
        self.summary
    }

    /// Number of items moved past so far, decided or auto-skipped.
    pub fn advances(&self) -> usize {
        self.advances
    }

    /// Token that abandons the session when cancelled, usable from another
    /// thread while a search is in flight.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Load the first item.
    pub fn start(&mut self) -> Result<&ReviewState, ReviewError> {
        if !matches!(self.state, ReviewState::Idle) {
            return Err(self.invalid("start"));
        }
        self.enter(0);
        Ok(&self.state)
    }

    /// Overwrite the local file with the replacement and move on.
    ///
    /// On a write failure the session stays on the same item.
    pub fn accept(&mut self) -> Result<&ReviewState, ReviewError> {
        let ReviewState::AwaitingDecision(item) = &self.state else {
            return Err(self.invalid("accept"));
        };
        let index = item.index;
        let path = item.local.path.clone();

        if let Err(source) = replace_file(&path, &item.replacement.bytes) {
            warn!("Could not replace {}: {}", path.display(), source);
            self.summary.write_failures += 1;
            self.emit(ReviewEvent::WriteFailed {
                index,
                path: path.clone(),
                error: source.to_string(),
            });
            return Err(ReviewError::Write { path, source });
        }

        info!("Replaced {}", path.display());
        self.summary.accepted += 1;
        self.emit(ReviewEvent::Accepted { index, path });
        self.decide(Decision::Accepted);
        Ok(&self.state)
    }

    /// Leave the local file untouched and move on.
    pub fn skip(&mut self) -> Result<&ReviewState, ReviewError> {
        let ReviewState::AwaitingDecision(item) = &self.state else {
            return Err(self.invalid("skip"));
        };
        let index = item.index;
        let path = item.local.path.clone();

        info!("Skipped {}", path.display());
        self.summary.skipped += 1;
        self.emit(ReviewEvent::Skipped { index, path });
        self.decide(Decision::Skipped);
        Ok(&self.state)
    }

    /// Stop the session, cancelling any in-flight search and waiting for its
    /// worker to stop.
    pub fn abandon(&mut self) {
        self.cancel.cancel();
        self.search.shutdown();
        if !self.state.is_terminal() {
            self.state = ReviewState::Abandoned;
            self.emit(ReviewEvent::Abandoned(self.summary));
        }
    }

    fn invalid(&self, action: &'static str) -> ReviewError {
        ReviewError::InvalidState {
            action,
            state: self.state.name(),
        }
    }

    fn emit(&self, event: ReviewEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }

    fn decide(&mut self, decision: Decision) {
        let index = match &mut self.state {
            ReviewState::AwaitingDecision(item) => {
                item.decision = decision;
                item.index
            }
            _ => return,
        };
        self.advances += 1;
        self.enter(index + 1);
    }

    /// Rest on the first loadable item at or after `index`.
    fn enter(&mut self, mut index: usize) {
        let total = self.paths.len();
        loop {
            if self.cancel.is_cancelled() {
                self.state = ReviewState::Abandoned;
                self.emit(ReviewEvent::Abandoned(self.summary));
                return;
            }
            if index >= total {
                info!(
                    "Review complete: {} accepted, {} skipped, {} auto-skipped",
                    self.summary.accepted, self.summary.skipped, self.summary.auto_skipped
                );
                self.state = ReviewState::Complete;
                self.emit(ReviewEvent::Complete(self.summary));
                return;
            }

            match self.load(index) {
                Ok(item) => {
                    self.emit(ReviewEvent::Loaded {
                        index,
                        total,
                        path: item.local.path.clone(),
                        identity: item.identity.clone(),
                        local: item.local.dimensions.unwrap_or(Dimensions::new(0, 0)),
                        replacement: item.replacement.dimensions,
                        label: item.replacement.label.clone(),
                        url: item.replacement.url.clone(),
                        preview: item.replacement.preview.clone(),
                        candidates: item.candidates.len(),
                    });
                    self.state = ReviewState::AwaitingDecision(item);
                    return;
                }
                Err(SkipReason::Sourcing(SourcingError::Cancelled)) if self.cancel.is_cancelled() => {
                    continue;
                }
                Err(reason) => {
                    let path = self.paths[index].clone();
                    warn!("Skipping {}: {}", path.display(), reason);
                    self.summary.auto_skipped += 1;
                    self.emit(ReviewEvent::AutoSkipped {
                        index,
                        total,
                        path,
                        reason,
                    });
                    self.advances += 1;
                    index += 1;
                }
            }
        }
    }

    fn load(&mut self, index: usize) -> Result<ReviewItem, SkipReason> {
        let path = self.paths[index].clone();
        debug!("Loading {} ({}/{})", path.display(), index + 1, self.paths.len());

        let mut local = ArtworkFile::new(path);
        local
            .probe(self.prober.as_ref())
            .map_err(SkipReason::Unreadable)?;
        let identity =
            album_identity(&local.path, &self.convention).map_err(SkipReason::PathConvention)?;

        // One budget for the search and the download together.
        let deadline = self.search.deadline();
        let query = SourceQuery::Album {
            artist: identity.artist.clone(),
            album: identity.album.clone(),
        };
        let mut candidates = self
            .search
            .run_until(&self.cancel, deadline, move |source, cancel| {
                source.search(&query, cancel)
            })
            .map_err(SkipReason::Sourcing)?;
        candidates.sort_by_key(|c| c.estimated_rank);
        let best = candidates.first().cloned().ok_or(SkipReason::NoCandidates)?;
        debug!(
            "{} candidate(s) from {} for {}",
            candidates.len(),
            self.search.source_name(),
            identity
        );

        let rank = best.estimated_rank;
        let label = best.label.clone();
        let url = match &best.data {
            CandidateData::Url(url) => Some(url.clone()),
            CandidateData::Bytes(_) => None,
        };
        let bytes = self
            .search
            .run_until(&self.cancel, deadline, move |source, cancel| {
                source.fetch(&best, cancel)
            })
            .map_err(SkipReason::Sourcing)?;
        let dimensions = self
            .prober
            .probe_bytes(&bytes)
            .map_err(SkipReason::UndecodableCandidate)?;
        let preview = self
            .preview_dir
            .as_deref()
            .and_then(|dir| save_preview(dir, &identity, &local.path, &bytes));

        Ok(ReviewItem {
            index,
            local,
            identity,
            candidates,
            replacement: FetchedCandidate {
                rank,
                label,
                url,
                preview,
                bytes,
                dimensions,
            },
            decision: Decision::Pending,
        })
    }
}

impl Drop for ReviewSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.search.shutdown();
    }
}

/// Save candidate bytes as `<dir>/<artist> - <album>.<ext>`, using the local
/// file's extension. A failure is logged and leaves the item without a
/// preview.
fn save_preview(
    dir: &Path,
    identity: &AlbumIdentity,
    local: &Path,
    bytes: &[u8],
) -> Option<PathBuf> {
    let ext = local
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "jpg".to_string());
    let stem: String = identity
        .to_string()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    let path = dir.join(format!("{stem}.{ext}"));
    match fs::create_dir_all(dir).and_then(|()| fs::write(&path, bytes)) {
        Ok(()) => Some(path),
        Err(e) => {
            warn!("Could not save preview {}: {}", path.display(), e);
            None
        }
    }
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
///
/// The original is never left truncated; the temp file is removed on failure.
/// The original's permission bits are carried over. Ownership and hard links
/// are not: the rename gives `path` a new inode, and the directory must be
/// writable even when the file itself is.
fn replace_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{name}.cover-curator.tmp"));
    let permissions = fs::metadata(path).map(|m| m.permissions()).ok();
    let result = fs::write(&temp, bytes)
        .and_then(|()| match permissions {
            Some(permissions) => fs::set_permissions(&temp, permissions),
            None => Ok(()),
        })
        .and_then(|()| fs::rename(&temp, path));
    if result.is_err() {
        fs::remove_file(&temp).ok();
    }
    result
}
