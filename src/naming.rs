//! Artist/album identity from the library's folder convention.
//!
//! Libraries are laid out as `<root>/<artist>/<album>/cover.jpg`. The
//! directory names above an artwork file become the search query for
//! replacement art:
//!
//! - `/music/Frank Zappa/Roxy & Elsewhere/cover.jpg` → artist `Frank Zappa`,
//!   album `Roxy & Elsewhere`
//!
//! Levels are configurable (see [`ReviewConfig`](crate::config::ReviewConfig))
//! for libraries with an extra layer such as `<genre>/<artist>/<album>`.

use crate::config::ReviewConfig;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathConventionError {
    #[error("No directory {level} level(s) above {}", path.display())]
    MissingSegment { path: PathBuf, level: usize },
    #[error("Empty {role} name in {}", path.display())]
    EmptySegment { path: PathBuf, role: &'static str },
}

/// Which directory levels above the artwork file name the artist and album.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathConvention {
    pub artist_level: usize,
    pub album_level: usize,
}

impl Default for PathConvention {
    fn default() -> Self {
        Self {
            artist_level: 2,
            album_level: 1,
        }
    }
}

impl From<&ReviewConfig> for PathConvention {
    fn from(config: &ReviewConfig) -> Self {
        Self {
            artist_level: config.artist_level,
            album_level: config.album_level,
        }
    }
}

/// Artist and album names derived from a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumIdentity {
    pub artist: String,
    pub album: String,
}

impl std::fmt::Display for AlbumIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.artist, self.album)
    }
}

/// Derive the artist/album pair for the artwork file at `path`.
pub fn album_identity(
    path: &Path,
    convention: &PathConvention,
) -> Result<AlbumIdentity, PathConventionError> {
    // Normal components only: root, prefix, `.` and `..` never name an album.
    let segments: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().trim().to_string()),
            _ => None,
        })
        .collect();

    let segment = |level: usize, role: &'static str| -> Result<String, PathConventionError> {
        // The last segment is the file itself; level 1 is its directory.
        let index = segments
            .len()
            .checked_sub(level + 1)
            .ok_or_else(|| PathConventionError::MissingSegment {
                path: path.to_path_buf(),
                level,
            })?;
        let name = segments[index].clone();
        if name.is_empty() {
            return Err(PathConventionError::EmptySegment {
                path: path.to_path_buf(),
                role,
            });
        }
        Ok(name)
    };

    Ok(AlbumIdentity {
        artist: segment(convention.artist_level, "artist")?,
        album: segment(convention.album_level, "album")?,
    })
}
