//! Replacement artwork sourcing.
//!
//! The curator never trusts a search service: results are unverified
//! suggestions, ranked best-first, that an operator confirms before anything
//! is written. This module defines the boundary:
//!
//! - [`ArtworkSource`]: the narrow `search`/`fetch` contract an external
//!   service implements. [`ItunesSource`] is the bundled implementation.
//! - [`BoundedSearch`]: runs one source call on a worker thread with a hard
//!   deadline and a [`CancelToken`], so a hung service can never block the
//!   review workflow. Only one call is in flight at a time.

pub mod itunes;

pub use itunes::ItunesSource;

use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often a waiting caller re-checks cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourcingError {
    #[error("Sourcing unavailable: {0}")]
    Unavailable(String),
    #[error("Sourcing timed out after {}s", .0.as_secs_f32())]
    TimedOut(Duration),
    #[error("Sourcing cancelled")]
    Cancelled,
    #[error("Query not supported by this source")]
    UnsupportedQuery,
}

/// What to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceQuery {
    Album { artist: String, album: String },
    /// Reverse image search by an existing local image.
    ReferenceImage(PathBuf),
}

/// Where a candidate's image data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateData {
    Url(String),
    Bytes(Vec<u8>),
}

/// One suggested replacement. Lower `estimated_rank` is better.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateArt {
    pub data: CandidateData,
    pub estimated_rank: u32,
    /// Human-readable description from the service, e.g. the matched album.
    pub label: Option<String>,
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail fast with [`SourcingError::Cancelled`] once cancelled.
    pub fn check(&self) -> Result<(), SourcingError> {
        if self.is_cancelled() {
            Err(SourcingError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// An external artwork search service.
///
/// Implementations should check `cancel` between network steps and must
/// bound their own blocking I/O; [`BoundedSearch`] stops waiting at its
/// deadline but cannot interrupt a blocking call.
pub trait ArtworkSource: Send + Sync {
    fn name(&self) -> &str;

    /// Candidates for `query`, best first. Empty means no match.
    fn search(
        &self,
        query: &SourceQuery,
        cancel: &CancelToken,
    ) -> Result<Vec<CandidateArt>, SourcingError>;

    /// Image bytes of a candidate.
    fn fetch(&self, candidate: &CandidateArt, cancel: &CancelToken) -> Result<Vec<u8>, SourcingError> {
        cancel.check()?;
        match &candidate.data {
            CandidateData::Bytes(bytes) => Ok(bytes.clone()),
            CandidateData::Url(url) => Err(SourcingError::Unavailable(format!(
                "{} cannot download {url}",
                self.name()
            ))),
        }
    }
}

/// Runs source calls one at a time with a deadline.
pub struct BoundedSearch {
    source: Arc<dyn ArtworkSource>,
    timeout: Duration,
    /// Worker left running after a timeout or cancel; joined before the next
    /// call so calls never overlap.
    straggler: Option<JoinHandle<()>>,
}

impl BoundedSearch {
    pub fn new(source: Arc<dyn ArtworkSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            straggler: None,
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Deadline for a sequence of calls that share one timeout budget.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }

    /// Run `job` against the source on a worker thread with a fresh deadline.
    pub fn run<T, F>(&mut self, cancel: &CancelToken, job: F) -> Result<T, SourcingError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ArtworkSource, &CancelToken) -> Result<T, SourcingError> + Send + 'static,
    {
        let deadline = self.deadline();
        self.run_until(cancel, deadline, job)
    }

    /// Run `job` against the source on a worker thread, giving up at
    /// `deadline`.
    ///
    /// Returns [`SourcingError::TimedOut`] at the deadline and
    /// [`SourcingError::Cancelled`] as soon as `cancel` is set. In both cases
    /// the job's own token is cancelled so the worker stops at its next check.
    /// Time spent waiting for a previous worker counts against the deadline.
    pub fn run_until<T, F>(
        &mut self,
        cancel: &CancelToken,
        deadline: Instant,
        job: F,
    ) -> Result<T, SourcingError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ArtworkSource, &CancelToken) -> Result<T, SourcingError> + Send + 'static,
    {
        self.settle(cancel, deadline)?;
        cancel.check()?;
        if Instant::now() >= deadline {
            return Err(SourcingError::TimedOut(self.timeout));
        }

        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        let job_token = CancelToken::new();
        let worker_token = job_token.clone();
        let handle = std::thread::Builder::new()
            .name("artwork-search".to_string())
            .spawn(move || {
                let result = job(source.as_ref(), &worker_token);
                tx.send(result).ok();
            })
            .map_err(|e| SourcingError::Unavailable(format!("cannot start search: {e}")))?;

        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(result) => {
                    handle.join().ok();
                    return result;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    handle.join().ok();
                    return Err(SourcingError::Unavailable(
                        "search worker stopped without a result".to_string(),
                    ));
                }
                Err(RecvTimeoutError::Timeout) => {
                    let outcome = if cancel.is_cancelled() {
                        Some(SourcingError::Cancelled)
                    } else if Instant::now() >= deadline {
                        Some(SourcingError::TimedOut(self.timeout))
                    } else {
                        None
                    };
                    if let Some(error) = outcome {
                        job_token.cancel();
                        self.straggler = Some(handle);
                        return Err(error);
                    }
                }
            }
        }
    }

    /// Wait for any worker left behind by a timed-out or cancelled call.
    ///
    /// The worker's token is already cancelled, so this returns once the
    /// source's current blocking step ends.
    pub fn shutdown(&mut self) {
        if let Some(previous) = self.straggler.take() {
            debug!("Waiting for the previous {} call to stop", self.source.name());
            previous.join().ok();
        }
    }

    /// Wait for the previous worker without passing `deadline` or ignoring
    /// `cancel`, so calls never overlap.
    fn settle(&mut self, cancel: &CancelToken, deadline: Instant) -> Result<(), SourcingError> {
        let Some(previous) = self.straggler.take() else {
            return Ok(());
        };
        debug!("Waiting for the previous {} call to stop", self.source.name());
        while !previous.is_finished() {
            let outcome = if cancel.is_cancelled() {
                Some(SourcingError::Cancelled)
            } else if Instant::now() >= deadline {
                Some(SourcingError::TimedOut(self.timeout))
            } else {
                None
            };
            if let Some(error) = outcome {
                self.straggler = Some(previous);
                return Err(error);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        previous.join().ok();
        Ok(())
    }
}

impl Drop for BoundedSearch {
    fn drop(&mut self) {
        self.shutdown();
    }
}
