//! Pure Rust prober built on the `image` crate ecosystem.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Format detection | `ImageReader::with_guessed_format` (magic bytes, then extension) |
//! | Dimensions (JPEG, PNG, TIFF, WebP) | `ImageReader::into_dimensions` |
//! | Dimensions (AVIF) | `avif-parse` primary item metadata |
//!
//! Only headers are read. The file handle lives inside the reader and is
//! released when the reader is consumed or dropped, on success and error alike.

use super::backend::{Dimensions, ImageProber, ProbeError};
use image::{ImageError, ImageReader};
use std::io::{BufReader, Cursor, ErrorKind};
use std::path::Path;

/// Production prober.
pub struct RustProber;

impl RustProber {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustProber {
    fn default() -> Self {
        Self::new()
    }
}

fn is_avif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("avif"))
}

fn io_error(path: &Path, err: std::io::Error) -> ProbeError {
    if err.kind() == ErrorKind::NotFound {
        ProbeError::Missing(path.to_path_buf())
    } else {
        ProbeError::Io {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

fn image_error(path: &Path, err: ImageError) -> ProbeError {
    match err {
        ImageError::IoError(e) => io_error(path, e),
        ImageError::Unsupported(e) => ProbeError::Unsupported {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
        other => ProbeError::Corrupt {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

/// Extract dimensions from an AVIF container (no AV1 decode).
fn probe_avif(path: &Path) -> Result<Dimensions, ProbeError> {
    let file = std::fs::File::open(path).map_err(|e| io_error(path, e))?;
    let avif = avif_parse::read_avif(&mut BufReader::new(file)).map_err(|e| {
        ProbeError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("{e:?}"),
        }
    })?;
    let meta = avif
        .primary_item_metadata()
        .map_err(|e| ProbeError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("{e:?}"),
        })?;
    Ok(Dimensions {
        width: meta.max_frame_width.get(),
        height: meta.max_frame_height.get(),
    })
}

impl ImageProber for RustProber {
    fn probe(&self, path: &Path) -> Result<Dimensions, ProbeError> {
        if is_avif(path) {
            return probe_avif(path);
        }
        let reader = ImageReader::open(path)
            .map_err(|e| io_error(path, e))?
            .with_guessed_format()
            .map_err(|e| io_error(path, e))?;
        if reader.format().is_none() {
            return Err(ProbeError::Unsupported {
                path: path.to_path_buf(),
                reason: "unrecognized image format".to_string(),
            });
        }
        let (width, height) = reader.into_dimensions().map_err(|e| image_error(path, e))?;
        Ok(Dimensions { width, height })
    }

    fn probe_bytes(&self, bytes: &[u8]) -> Result<Dimensions, ProbeError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ProbeError::UndecodableBytes(e.to_string()))?;
        if reader.format().is_none() {
            return Err(ProbeError::UndecodableBytes(
                "unrecognized image format".to_string(),
            ));
        }
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| ProbeError::UndecodableBytes(e.to_string()))?;
        Ok(Dimensions { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_test_jpeg, create_test_png, jpeg_bytes};

    #[test]
    fn probe_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cover.jpg");
        create_test_jpeg(&path, 200, 150);

        let dims = RustProber::new().probe(&path).unwrap();
        assert_eq!(dims, Dimensions::new(200, 150));
    }

    #[test]
    fn probe_png_named_jpg_uses_content() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("folder.jpg");
        create_test_png(&path, 64, 32);

        let dims = RustProber::new().probe(&path).unwrap();
        assert_eq!(dims, Dimensions::new(64, 32));
    }

    #[test]
    fn probe_nonexistent_file_is_missing() {
        let result = RustProber::new().probe(Path::new("/nonexistent/cover.jpg"));
        assert!(matches!(result, Err(ProbeError::Missing(_))));
    }

    #[test]
    fn probe_text_file_is_unsupported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "liner notes").unwrap();

        let result = RustProber::new().probe(&path);
        assert!(matches!(result, Err(ProbeError::Unsupported { .. })));
    }

    #[test]
    fn probe_truncated_jpeg_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cover.jpg");
        // SOI marker followed by garbage: recognized as JPEG, header unreadable.
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0x00, 0x01]).unwrap();

        assert!(RustProber::new().probe(&path).is_err());
    }

    #[test]
    fn probe_garbage_avif_is_corrupt() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cover.avif");
        std::fs::write(&path, b"not an avif container").unwrap();

        let result = RustProber::new().probe(&path);
        assert!(matches!(result, Err(ProbeError::Corrupt { .. })));
    }

    #[test]
    fn probe_bytes_reads_jpeg_header() {
        let bytes = jpeg_bytes(120, 90);
        let dims = RustProber::new().probe_bytes(&bytes).unwrap();
        assert_eq!(dims, Dimensions::new(120, 90));
    }

    #[test]
    fn probe_bytes_rejects_html() {
        let result = RustProber::new().probe_bytes(b"<html>not found</html>");
        assert!(matches!(result, Err(ProbeError::UndecodableBytes(_))));
    }
}
