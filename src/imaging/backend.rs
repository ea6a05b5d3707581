//! Prober trait and shared types.
//!
//! The [`ImageProber`] trait is the seam between the curation passes and the
//! pixel-format code. The production implementation is
//! [`RustProber`](super::rust_backend::RustProber); tests use a mock that
//! serves canned dimensions by filename.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("File not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unsupported image format {}: {reason}", path.display())]
    Unsupported { path: PathBuf, reason: String },
    #[error("Corrupt image header {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("Undecodable image data: {0}")]
    UndecodableBytes(String),
}

/// Pixel dimensions of a probed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count, the resolution used for duplicate ranking.
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Reads image dimensions without decoding pixel data.
///
/// Implementations must not keep a file handle open past the call.
pub trait ImageProber: Send + Sync {
    /// Dimensions of the image file at `path`.
    fn probe(&self, path: &Path) -> Result<Dimensions, ProbeError>;

    /// Dimensions of an in-memory image, e.g. downloaded replacement art.
    fn probe_bytes(&self, bytes: &[u8]) -> Result<Dimensions, ProbeError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock prober serving dimensions by file name. Names without an entry
    /// fail as corrupt. Uses Mutex so it is Sync and works with rayon.
    #[derive(Default)]
    pub struct MockProber {
        pub dimensions: HashMap<String, Dimensions>,
        pub bytes_result: Option<Dimensions>,
        pub probed: Mutex<Vec<PathBuf>>,
    }

    impl MockProber {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, name: &str, width: u32, height: u32) -> Self {
            self.dimensions
                .insert(name.to_string(), Dimensions::new(width, height));
            self
        }

        pub fn with_bytes_result(mut self, width: u32, height: u32) -> Self {
            self.bytes_result = Some(Dimensions::new(width, height));
            self
        }

        pub fn probed_paths(&self) -> Vec<PathBuf> {
            self.probed.lock().unwrap().clone()
        }
    }

    impl ImageProber for MockProber {
        fn probe(&self, path: &Path) -> Result<Dimensions, ProbeError> {
            self.probed.lock().unwrap().push(path.to_path_buf());
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.dimensions
                .get(&name)
                .copied()
                .ok_or_else(|| ProbeError::Corrupt {
                    path: path.to_path_buf(),
                    reason: "no mock dimensions".to_string(),
                })
        }

        fn probe_bytes(&self, _bytes: &[u8]) -> Result<Dimensions, ProbeError> {
            self.bytes_result
                .ok_or_else(|| ProbeError::UndecodableBytes("no mock dimensions".to_string()))
        }
    }

    #[test]
    fn mock_serves_dimensions_by_name() {
        let prober = MockProber::new().with("cover.jpg", 800, 600);

        let dims = prober.probe(Path::new("/music/a/b/cover.jpg")).unwrap();
        assert_eq!(dims, Dimensions::new(800, 600));
        assert!(prober.probe(Path::new("/music/a/b/folder.jpg")).is_err());
        assert_eq!(prober.probed_paths().len(), 2);
    }

    #[test]
    fn pixel_count_does_not_overflow_u32() {
        let dims = Dimensions::new(100_000, 100_000);
        assert_eq!(dims.pixel_count(), 10_000_000_000);
    }

    #[test]
    fn dimensions_display() {
        assert_eq!(Dimensions::new(1024, 768).to_string(), "1024x768");
    }
}
