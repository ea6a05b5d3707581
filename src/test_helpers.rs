//! Shared test utilities for the cover-curator test suite.
//!
//! Builds synthetic artwork files and small library trees inside temporary
//! directories, so tests exercise real headers without shipping fixtures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let lib = Library::new();
//! let cover = lib.jpeg("Frank Zappa/Roxy & Elsewhere/cover.jpg", 500, 500);
//! let group = group_of(&[("folder.jpg", 500, 500), ("cover.jpg", 1000, 1000)]);
//! ```

use image::{ImageEncoder, RgbImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::imaging::Dimensions;
use crate::types::{ArtworkFile, DirectoryGroup};

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Encode a small valid JPEG in memory.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// Write a valid JPEG with the given dimensions, creating parent directories.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, jpeg_bytes(width, height)).unwrap();
}

/// Write a valid PNG with the given dimensions, whatever the extension says.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = gradient(width, height);
    let file = std::fs::File::create(path).unwrap();
    image::codecs::png::PngEncoder::new(std::io::BufWriter::new(file))
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

// =========================================================================
// Library trees
// =========================================================================

/// A temporary music library. Dropping it removes the tree.
pub struct Library {
    pub dir: TempDir,
}

impl Library {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Canonical root, matching the absolute paths the walker yields.
    pub fn root(&self) -> PathBuf {
        self.dir.path().canonicalize().unwrap()
    }

    /// Write a JPEG at `rel` under the root and return its absolute path.
    pub fn jpeg(&self, rel: &str, width: u32, height: u32) -> PathBuf {
        let path = self.root().join(rel);
        create_test_jpeg(&path, width, height);
        path
    }

    /// Write a file that is not a decodable image.
    pub fn corrupt(&self, rel: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, b"definitely not an image").unwrap();
        path
    }

    /// Create an empty directory.
    pub fn dir(&self, rel: &str) -> PathBuf {
        let path = self.root().join(rel);
        std::fs::create_dir_all(&path).unwrap();
        path
    }
}

// =========================================================================
// In-memory groups for pure decision tests
// =========================================================================

/// Build a probed group under `/music/Artist/Album`. A `(name, 0, 0)` entry
/// stands for a file whose probe failed.
pub fn group_of(files: &[(&str, u32, u32)]) -> DirectoryGroup {
    let dir = PathBuf::from("/music/Artist/Album");
    let files = files
        .iter()
        .map(|&(name, w, h)| {
            let mut file = ArtworkFile::new(dir.join(name));
            if w > 0 && h > 0 {
                file.dimensions = Some(Dimensions::new(w, h));
            }
            file
        })
        .collect();
    DirectoryGroup { dir, files }
}

/// File names of a slice of artwork files, in order.
pub fn names(files: &[ArtworkFile]) -> Vec<String> {
    files.iter().map(|f| f.file_name()).collect()
}
