//! CLI output formatting for all passes.
//!
//! Output leads with what the operator cares about (the album directory, the
//! decision taken) with file details indented below it.
//!
//! # Output Format
//!
//! ## Dedupe
//!
//! ```text
//! /music/Frank Zappa/Roxy & Elsewhere
//!     Keep: cover.jpg (1000x1000)
//!     Deleted: folder.jpg
//!     Unreadable: front.jpg
//!
//! Visited 120 directories: deleted 3 files in 2 directories, 1 unreadable
//! ```
//!
//! ## Audit
//!
//! ```text
//! Low-res 500x500 /music/Frank Zappa/Roxy & Elsewhere/cover.jpg
//!
//! Probed 240 files in 120 directories: 1 below 800x800, 0 unreadable
//! Report: paths.txt
//! ```
//!
//! ## Review
//!
//! ```text
//! [002/010] Frank Zappa - Roxy & Elsewhere
//!     Local: /music/Frank Zappa/Roxy & Elsewhere/cover.jpg (500x500)
//!     Replacement: 1200x1200, Frank Zappa - Roxy & Elsewhere (1 of 4)
//!     Source: https://is1-ssl.mzstatic.com/image/thumb/.../1200x1200bb.jpg
//!     Preview: album_art/Frank Zappa - Roxy & Elsewhere.jpg
//! ```
//!
//! # Architecture
//!
//! Each pass has `format_*` functions (returning `Vec<String>`) for
//! testability and `print_*` wrappers that write to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::audit::{AuditEvent, AuditSummary, Threshold};
use crate::dedupe::{DedupeEvent, DedupeSummary, RemovalStatus};
use crate::review::{ReviewEvent, ReviewSummary};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based position as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 file`, `2 files`.
fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{} {}", count, if count == 1 { one } else { many })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Review progress marker: `[002/010]` for index 1 of 10.
fn progress(index: usize, total: usize) -> String {
    format!("[{}/{}]", format_index(index + 1), format_index(total))
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Dedupe
// ============================================================================

/// Format one resolved directory: kept file, removals, and probe failures.
pub fn format_dedupe_event(event: &DedupeEvent) -> Vec<String> {
    let DedupeEvent::DirectoryResolved {
        dir,
        keep,
        removals,
        failures,
    } = event;

    let mut lines = vec![dir.display().to_string()];
    if let Some(keep) = keep {
        let dims = keep
            .dimensions
            .map(|d| format!(" ({})", d))
            .unwrap_or_default();
        lines.push(format!("{}Keep: {}{}", indent(1), keep.file_name(), dims));
    }
    for removal in removals {
        let name = file_name(&removal.path);
        lines.push(match &removal.status {
            RemovalStatus::Deleted => format!("{}Deleted: {}", indent(1), name),
            RemovalStatus::Planned => format!("{}Would delete: {}", indent(1), name),
            RemovalStatus::Failed(reason) => {
                format!("{}Delete failed: {} ({})", indent(1), name, reason)
            }
        });
    }
    for failure in failures {
        lines.push(format!("{}Unreadable: {}", indent(1), file_name(&failure.path)));
    }
    lines
}

pub fn format_dedupe_summary(summary: &DedupeSummary, dry_run: bool) -> Vec<String> {
    let (verb, count) = if dry_run {
        ("would delete", summary.planned)
    } else {
        ("deleted", summary.deleted)
    };
    let mut line = format!(
        "Visited {}: {} {} in {}, {} unreadable",
        plural(summary.directories, "directory", "directories"),
        verb,
        plural(count, "file", "files"),
        plural(summary.groups_with_duplicates, "directory", "directories"),
        summary.probe_failures
    );
    if summary.delete_failures > 0 {
        line.push_str(&format!(
            ", {} failed",
            plural(summary.delete_failures, "deletion", "deletions")
        ));
    }
    vec![String::new(), line]
}

pub fn print_dedupe_event(event: &DedupeEvent) {
    print_lines(format_dedupe_event(event));
}

pub fn print_dedupe_summary(summary: &DedupeSummary, dry_run: bool) {
    print_lines(format_dedupe_summary(summary, dry_run));
}

// ============================================================================
// Audit
// ============================================================================

pub fn format_audit_event(event: &AuditEvent) -> Vec<String> {
    match event {
        AuditEvent::Flagged { file } => {
            let dims = file
                .dimensions
                .map(|d| d.to_string())
                .unwrap_or_else(|| "?".to_string());
            vec![format!("Low-res {} {}", dims, file.path.display())]
        }
        AuditEvent::ProbeFailed(failure) => vec![format!("Unreadable {}", failure.error)],
    }
}

pub fn format_audit_summary(
    summary: &AuditSummary,
    threshold: Threshold,
    report: &Path,
) -> Vec<String> {
    vec![
        String::new(),
        format!(
            "Probed {} in {}: {} below {}x{}, {} unreadable",
            plural(summary.files_probed, "file", "files"),
            plural(summary.directories, "directory", "directories"),
            summary.flagged,
            threshold.min_width,
            threshold.min_height,
            summary.probe_failures
        ),
        format!("Report: {}", report.display()),
    ]
}

pub fn print_audit_event(event: &AuditEvent) {
    print_lines(format_audit_event(event));
}

pub fn print_audit_summary(summary: &AuditSummary, threshold: Threshold, report: &Path) {
    print_lines(format_audit_summary(summary, threshold, report));
}

// ============================================================================
// Review
// ============================================================================

pub fn format_review_event(event: &ReviewEvent) -> Vec<String> {
    match event {
        ReviewEvent::Loaded {
            index,
            total,
            path,
            identity,
            local,
            replacement,
            label,
            url,
            preview,
            candidates,
        } => {
            let mut detail = replacement.to_string();
            if let Some(label) = label {
                detail.push_str(&format!(", {}", label));
            }
            detail.push_str(&format!(" (1 of {})", candidates));
            let mut lines = vec![
                format!("{} {}", progress(*index, *total), identity),
                format!("{}Local: {} ({})", indent(1), path.display(), local),
                format!("{}Replacement: {}", indent(1), detail),
            ];
            if let Some(url) = url {
                lines.push(format!("{}Source: {}", indent(1), url));
            }
            if let Some(preview) = preview {
                lines.push(format!("{}Preview: {}", indent(1), preview.display()));
            }
            lines
        }
        ReviewEvent::AutoSkipped {
            index,
            total,
            path,
            reason,
        } => vec![
            format!("{} Skipped {}", progress(*index, *total), path.display()),
            format!("{}{}", indent(1), reason),
        ],
        ReviewEvent::Accepted { path, .. } => {
            vec![format!("{}Replaced {}", indent(1), path.display())]
        }
        ReviewEvent::Skipped { path, .. } => {
            vec![format!("{}Kept {}", indent(1), path.display())]
        }
        ReviewEvent::WriteFailed { path, error, .. } => vec![format!(
            "{}Write failed for {}: {} (retry or skip)",
            indent(1),
            path.display(),
            error
        )],
        ReviewEvent::Complete(summary) => format_review_summary(summary, false),
        ReviewEvent::Abandoned(summary) => format_review_summary(summary, true),
    }
}

pub fn format_review_summary(summary: &ReviewSummary, abandoned: bool) -> Vec<String> {
    let status = if abandoned {
        "Review abandoned"
    } else {
        "Review complete"
    };
    let mut line = format!(
        "{}: {} replaced, {} kept, {} auto-skipped of {}",
        status,
        summary.accepted,
        summary.skipped,
        summary.auto_skipped,
        plural(summary.items, "item", "items")
    );
    if summary.write_failures > 0 {
        line.push_str(&format!(
            ", {}",
            plural(summary.write_failures, "write failure", "write failures")
        ));
    }
    vec![String::new(), line]
}

pub fn print_review_event(event: &ReviewEvent) {
    print_lines(format_review_event(event));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedupe::Removal;
    use crate::imaging::{Dimensions, ProbeError};
    use crate::naming::AlbumIdentity;
    use crate::review::SkipReason;
    use crate::sourcing::SourcingError;
    use crate::types::{ArtworkFile, ProbeFailure};
    use std::path::PathBuf;

    fn album_dir() -> PathBuf {
        PathBuf::from("/music/Frank Zappa/Roxy & Elsewhere")
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "file", "files"), "1 file");
        assert_eq!(plural(0, "file", "files"), "0 files");
        assert_eq!(plural(3, "directory", "directories"), "3 directories");
    }

    #[test]
    fn progress_is_one_based() {
        assert_eq!(progress(0, 10), "[001/010]");
        assert_eq!(progress(9, 10), "[010/010]");
    }

    // =========================================================================
    // Dedupe
    // =========================================================================

    #[test]
    fn format_dedupe_directory() {
        let mut keep = ArtworkFile::new(album_dir().join("cover.jpg"));
        keep.dimensions = Some(Dimensions::new(1000, 1000));
        let event = DedupeEvent::DirectoryResolved {
            dir: album_dir(),
            keep: Some(keep),
            removals: vec![Removal {
                path: album_dir().join("folder.jpg"),
                status: RemovalStatus::Deleted,
            }],
            failures: vec![ProbeFailure {
                path: album_dir().join("front.jpg"),
                error: ProbeError::Missing(album_dir().join("front.jpg")),
            }],
        };

        assert_eq!(
            format_dedupe_event(&event),
            vec![
                "/music/Frank Zappa/Roxy & Elsewhere",
                "    Keep: cover.jpg (1000x1000)",
                "    Deleted: folder.jpg",
                "    Unreadable: front.jpg",
            ]
        );
    }

    #[test]
    fn format_dedupe_dry_run_and_failures() {
        let event = DedupeEvent::DirectoryResolved {
            dir: album_dir(),
            keep: None,
            removals: vec![
                Removal {
                    path: album_dir().join("folder.jpg"),
                    status: RemovalStatus::Planned,
                },
                Removal {
                    path: album_dir().join("front.jpg"),
                    status: RemovalStatus::Failed("permission denied".to_string()),
                },
            ],
            failures: Vec::new(),
        };

        let lines = format_dedupe_event(&event);
        assert_eq!(lines[1], "    Would delete: folder.jpg");
        assert_eq!(lines[2], "    Delete failed: front.jpg (permission denied)");
    }

    #[test]
    fn format_dedupe_summary_counts() {
        let summary = DedupeSummary {
            directories: 120,
            groups_with_duplicates: 2,
            deleted: 3,
            planned: 0,
            delete_failures: 0,
            probe_failures: 1,
        };
        assert_eq!(
            format_dedupe_summary(&summary, false)[1],
            "Visited 120 directories: deleted 3 files in 2 directories, 1 unreadable"
        );
    }

    #[test]
    fn format_dedupe_summary_dry_run() {
        let summary = DedupeSummary {
            directories: 1,
            groups_with_duplicates: 1,
            planned: 1,
            delete_failures: 2,
            ..Default::default()
        };
        assert_eq!(
            format_dedupe_summary(&summary, true)[1],
            "Visited 1 directory: would delete 1 file in 1 directory, 0 unreadable, 2 deletions failed"
        );
    }

    // =========================================================================
    // Audit
    // =========================================================================

    #[test]
    fn format_audit_flagged() {
        let mut file = ArtworkFile::new(album_dir().join("cover.jpg"));
        file.dimensions = Some(Dimensions::new(500, 500));
        assert_eq!(
            format_audit_event(&AuditEvent::Flagged { file }),
            vec!["Low-res 500x500 /music/Frank Zappa/Roxy & Elsewhere/cover.jpg"]
        );
    }

    #[test]
    fn format_audit_probe_failure_includes_reason() {
        let path = album_dir().join("cover.jpg");
        let event = AuditEvent::ProbeFailed(ProbeFailure {
            path: path.clone(),
            error: ProbeError::Corrupt {
                path,
                reason: "truncated".to_string(),
            },
        });
        let line = &format_audit_event(&event)[0];
        assert!(line.starts_with("Unreadable "));
        assert!(line.contains("truncated"));
    }

    #[test]
    fn format_audit_summary_lines() {
        let summary = AuditSummary {
            directories: 120,
            files_probed: 240,
            flagged: 1,
            probe_failures: 0,
        };
        let lines = format_audit_summary(&summary, Threshold::new(800, 800), Path::new("paths.txt"));
        assert_eq!(
            lines[1],
            "Probed 240 files in 120 directories: 1 below 800x800, 0 unreadable"
        );
        assert_eq!(lines[2], "Report: paths.txt");
    }

    // =========================================================================
    // Review
    // =========================================================================

    #[test]
    fn format_review_loaded() {
        let event = ReviewEvent::Loaded {
            index: 1,
            total: 10,
            path: album_dir().join("cover.jpg"),
            identity: AlbumIdentity {
                artist: "Frank Zappa".to_string(),
                album: "Roxy & Elsewhere".to_string(),
            },
            local: Dimensions::new(500, 500),
            replacement: Dimensions::new(1200, 1200),
            label: Some("Frank Zappa - Roxy & Elsewhere".to_string()),
            url: None,
            preview: None,
            candidates: 4,
        };
        assert_eq!(
            format_review_event(&event),
            vec![
                "[002/010] Frank Zappa - Roxy & Elsewhere",
                "    Local: /music/Frank Zappa/Roxy & Elsewhere/cover.jpg (500x500)",
                "    Replacement: 1200x1200, Frank Zappa - Roxy & Elsewhere (1 of 4)",
            ]
        );
    }

    #[test]
    fn format_review_loaded_shows_source_and_preview() {
        let event = ReviewEvent::Loaded {
            index: 0,
            total: 1,
            path: album_dir().join("cover.jpg"),
            identity: AlbumIdentity {
                artist: "Frank Zappa".to_string(),
                album: "Roxy & Elsewhere".to_string(),
            },
            local: Dimensions::new(500, 500),
            replacement: Dimensions::new(1200, 1200),
            label: None,
            url: Some("https://is1-ssl.mzstatic.com/image/thumb/x/1200x1200bb.jpg".to_string()),
            preview: Some(PathBuf::from("album_art/Frank Zappa - Roxy & Elsewhere.jpg")),
            candidates: 1,
        };
        let lines = format_review_event(&event);
        assert_eq!(lines[2], "    Replacement: 1200x1200 (1 of 1)");
        assert_eq!(
            lines[3],
            "    Source: https://is1-ssl.mzstatic.com/image/thumb/x/1200x1200bb.jpg"
        );
        assert_eq!(
            lines[4],
            "    Preview: album_art/Frank Zappa - Roxy & Elsewhere.jpg"
        );
    }

    #[test]
    fn format_review_auto_skip_shows_reason() {
        let event = ReviewEvent::AutoSkipped {
            index: 0,
            total: 3,
            path: album_dir().join("cover.jpg"),
            reason: SkipReason::Sourcing(SourcingError::Unavailable("HTTP 503".to_string())),
        };
        let lines = format_review_event(&event);
        assert_eq!(
            lines[0],
            "[001/003] Skipped /music/Frank Zappa/Roxy & Elsewhere/cover.jpg"
        );
        assert_eq!(lines[1], "    Sourcing unavailable: HTTP 503");
    }

    #[test]
    fn format_review_no_candidates() {
        let event = ReviewEvent::AutoSkipped {
            index: 2,
            total: 3,
            path: album_dir().join("cover.jpg"),
            reason: SkipReason::NoCandidates,
        };
        assert_eq!(format_review_event(&event)[1], "    no replacement found");
    }

    #[test]
    fn format_review_summary_lines() {
        let summary = ReviewSummary {
            items: 5,
            accepted: 2,
            skipped: 1,
            auto_skipped: 2,
            write_failures: 1,
        };
        assert_eq!(
            format_review_summary(&summary, false)[1],
            "Review complete: 2 replaced, 1 kept, 2 auto-skipped of 5 items, 1 write failure"
        );
        assert!(format_review_summary(&summary, true)[1].starts_with("Review abandoned"));
    }

    #[test]
    fn format_review_write_failure() {
        let event = ReviewEvent::WriteFailed {
            index: 0,
            path: album_dir().join("cover.jpg"),
            error: "read-only file system".to_string(),
        };
        assert_eq!(
            format_review_event(&event),
            vec![
                "    Write failed for /music/Frank Zappa/Roxy & Elsewhere/cover.jpg: read-only file system (retry or skip)"
            ]
        );
    }
}
