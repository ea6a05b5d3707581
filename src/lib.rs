//! # Cover Curator
//!
//! Album-art quality curation for large local music libraries. The library
//! tree is the data source: every directory is an album folder, and a small
//! set of well-known filenames (`folder.jpg`, `cover.jpg`, `front.jpg`) is the
//! artwork.
//!
//! # Architecture: Two Passes and a Review
//!
//! ```text
//! walk  library/  →  DirectoryGroup per folder
//!        ├─ dedupe   keep the highest-resolution file, delete the rest
//!        └─ audit    flag files below a threshold → paths.txt
//! review paths.txt → search replacement art → operator accepts or skips
//! ```
//!
//! The cleanup and audit passes are independent traversals of the same tree.
//! The audit's report feeds the review session, which is the only step that
//! talks to the network and the only one that needs a human.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`walk`] | Lazy directory traversal yielding candidate artwork per folder |
//! | [`imaging`] | Header-only dimension probing behind the `ImageProber` trait |
//! | [`dedupe`] | Duplicate resolution policy and the cleanup pass |
//! | [`audit`] | Low-resolution scan and the streaming report |
//! | [`naming`] | Artist/album identity from the folder convention |
//! | [`sourcing`] | Artwork search contract, bounded runner, iTunes adapter |
//! | [`review`] | Forward-only accept/skip state machine over a path list |
//! | [`config`] | `config.toml` loading, stock defaults, validation |
//! | [`types`] | Shared types: `CandidateSet`, `ArtworkFile`, `DirectoryGroup` |
//! | [`output`] | CLI output formatting for every pass |
//!
//! # Design Decisions
//!
//! ## Decide, Then Act
//!
//! [`dedupe::resolve`] and [`audit::scan`] are pure functions over a probed
//! group. Deletion and report writing are separate steps, so the policy is
//! tested without touching a filesystem and `dedupe --dry-run` is free.
//!
//! ## Probe Failures Are Their Own Signal
//!
//! A file that cannot be probed is never the "smallest" or the "largest". It
//! is excluded from every comparison, kept on disk, and reported separately.
//! Broken artwork and small artwork are different problems.
//!
//! ## Unverified Suggestions Only
//!
//! Search results are treated as guesses. Nothing is overwritten until the
//! operator has seen the candidate's dimensions and explicitly accepted it,
//! and every search runs under a deadline so a dead service cannot hang the
//! session.

pub mod audit;
pub mod config;
pub mod dedupe;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod review;
pub mod sourcing;
pub mod types;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_helpers;
