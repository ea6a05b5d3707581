//! Curator configuration.
//!
//! Handles loading, validating, and merging a TOML config file. Stock
//! defaults are the base layer; a user file passed with `--config` only needs
//! the keys it wants to override. Command-line flags are applied last.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [artwork]
//! filenames = ["folder.jpg", "cover.jpg", "front.jpg"]
//! case_insensitive = true   # Match Folder.JPG as folder.jpg
//! follow_symlinks = false   # Descend into symlinked directories
//!
//! [audit]
//! min_width = 800           # Artwork narrower than this is flagged
//! min_height = 800          # Artwork shorter than this is flagged
//! output = "paths.txt"      # Report file, one absolute path per line
//!
//! [sourcing]
//! endpoint = "https://itunes.apple.com/search"
//! timeout_secs = 20         # Upper bound on one search + download
//! artwork_size = 1200       # Requested edge length of replacement art
//! max_results = 10          # Albums requested per search
//!
//! [review]
//! artist_level = 2          # Directory levels above the file naming the artist
//! album_level = 1           # Directory levels above the file naming the album
//! preview_dir = "album_art" # Save each fetched candidate here (unset = no previews)
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Curator configuration.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CurateConfig {
    /// Which files count as album art and how the tree is walked.
    pub artwork: ArtworkConfig,
    /// Low-resolution audit thresholds and report location.
    pub audit: AuditConfig,
    /// Replacement search service settings.
    pub sourcing: SourcingConfig,
    /// How artist/album are derived from a local path.
    pub review: ReviewConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl CurateConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.artwork.filenames.is_empty() {
            return Err(ConfigError::Validation(
                "artwork.filenames must not be empty".into(),
            ));
        }
        if self.artwork.filenames.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "artwork.filenames must not contain empty names".into(),
            ));
        }
        if self.audit.min_width == 0 || self.audit.min_height == 0 {
            return Err(ConfigError::Validation(
                "audit.min_width and audit.min_height must be non-zero".into(),
            ));
        }
        if self.sourcing.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "sourcing.timeout_secs must be non-zero".into(),
            ));
        }
        if self.sourcing.artwork_size == 0 {
            return Err(ConfigError::Validation(
                "sourcing.artwork_size must be non-zero".into(),
            ));
        }
        if self.review.artist_level == 0 || self.review.album_level == 0 {
            return Err(ConfigError::Validation(
                "review.artist_level and review.album_level must be non-zero".into(),
            ));
        }
        if self.review.artist_level == self.review.album_level {
            return Err(ConfigError::Validation(
                "review.artist_level and review.album_level must differ".into(),
            ));
        }
        if let Some(dir) = &self.review.preview_dir
            && dir.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "review.preview_dir must not be empty when set".into(),
            ));
        }
        Ok(())
    }
}

/// Artwork recognition and traversal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtworkConfig {
    /// Filenames recognized as album art, in priority order.
    pub filenames: Vec<String>,
    /// Compare filenames ignoring ASCII case.
    pub case_insensitive: bool,
    /// Follow directory symlinks. Loops are detected and skipped.
    pub follow_symlinks: bool,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            filenames: vec![
                "folder.jpg".to_string(),
                "cover.jpg".to_string(),
                "front.jpg".to_string(),
            ],
            case_insensitive: true,
            follow_symlinks: false,
        }
    }
}

/// Low-resolution audit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    pub min_width: u32,
    pub min_height: u32,
    /// Report path, relative to the working directory.
    pub output: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            min_width: 800,
            min_height: 800,
            output: "paths.txt".to_string(),
        }
    }
}

/// Replacement search service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcingConfig {
    /// iTunes Search API endpoint.
    pub endpoint: String,
    /// Bound on one search including the candidate download.
    pub timeout_secs: u64,
    /// Edge length requested from the artwork CDN.
    pub artwork_size: u32,
    /// Number of album results requested per search.
    pub max_results: u32,
}

impl SourcingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourcingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://itunes.apple.com/search".to_string(),
            timeout_secs: 20,
            artwork_size: 1200,
            max_results: 10,
        }
    }
}

/// Path convention used to derive the search query from a local path.
///
/// Levels count directories upward from the artwork file: with the defaults,
/// `Music/Frank Zappa/Roxy & Elsewhere/cover.jpg` gives artist
/// `Frank Zappa` (level 2) and album `Roxy & Elsewhere` (level 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReviewConfig {
    pub artist_level: usize,
    pub album_level: usize,
    /// Directory where each fetched candidate is saved as
    /// `<artist> - <album>.<ext>` so the operator can open it before
    /// accepting. No previews are written when unset.
    pub preview_dir: Option<String>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            artist_level: 2,
            album_level: 1,
            preview_dir: None,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel directory workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(CurateConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<CurateConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: CurateConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration.
///
/// With `None`, returns the validated stock defaults. With a path, the file
/// must exist and parse; its values are merged over the defaults.
pub fn load_config(path: Option<&Path>) -> Result<CurateConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match path {
        Some(p) => {
            let content = fs::read_to_string(p)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# cover-curator configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Pass the file with: cover-curator --config curator.toml <command>
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Artwork recognition
# ---------------------------------------------------------------------------
[artwork]
# Filenames recognized as album art. Order matters: when two files have the
# same resolution, the one listed first is kept by `dedupe`.
filenames = ["folder.jpg", "cover.jpg", "front.jpg"]

# Match filenames ignoring ASCII case (Folder.JPG == folder.jpg).
case_insensitive = true

# Descend into symlinked directories. Symlink loops are detected and skipped.
follow_symlinks = false

# ---------------------------------------------------------------------------
# Low-resolution audit
# ---------------------------------------------------------------------------
[audit]
# Artwork is flagged when width < min_width OR height < min_height.
min_width = 800
min_height = 800

# Report file: one absolute path per line, written as paths are found.
output = "paths.txt"

# ---------------------------------------------------------------------------
# Replacement sourcing (iTunes Search API)
# ---------------------------------------------------------------------------
[sourcing]
endpoint = "https://itunes.apple.com/search"

# Upper bound, in seconds, on one search including the artwork download.
timeout_secs = 20

# Edge length in pixels requested for replacement artwork.
artwork_size = 1200

# Number of album results requested per search.
max_results = 10

# ---------------------------------------------------------------------------
# Review
# ---------------------------------------------------------------------------
[review]
# Directory levels above the artwork file that name the artist and album.
# Music/<artist>/<album>/cover.jpg -> artist_level = 2, album_level = 1
artist_level = 2
album_level = 1

# Save each fetched candidate as "<artist> - <album>.<ext>" in this directory
# so it can be opened before accepting. Unset writes no previews.
# preview_dir = "album_art"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel directory workers for dedupe and audit.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_candidate_filenames() {
        let config = CurateConfig::default();
        assert_eq!(
            config.artwork.filenames,
            vec!["folder.jpg", "cover.jpg", "front.jpg"]
        );
        assert!(config.artwork.case_insensitive);
        assert!(!config.artwork.follow_symlinks);
    }

    #[test]
    fn default_config_has_audit_and_sourcing_settings() {
        let config = CurateConfig::default();
        assert_eq!(config.audit.min_width, 800);
        assert_eq!(config.audit.min_height, 800);
        assert_eq!(config.audit.output, "paths.txt");
        assert_eq!(config.sourcing.timeout(), Duration::from_secs(20));
        assert_eq!(config.review.artist_level, 2);
        assert_eq!(config.review.album_level, 1);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[audit]
min_width = 1000
"#;
        let config: CurateConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.audit.min_width, 1000);
        // Defaults preserved
        assert_eq!(config.audit.min_height, 800);
        assert_eq!(config.artwork.filenames.len(), 3);
    }

    #[test]
    fn load_config_without_file_returns_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.audit.min_width, 800);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("curator.toml");
        fs::write(
            &path,
            r#"
[artwork]
filenames = ["cover.png"]
case_insensitive = false

[sourcing]
timeout_secs = 5
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.artwork.filenames, vec!["cover.png"]);
        assert!(!config.artwork.case_insensitive);
        assert_eq!(config.sourcing.timeout_secs, 5);
        // Unspecified values should be defaults
        assert_eq!(config.sourcing.artwork_size, 1200);
    }

    #[test]
    fn load_config_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("curator.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let toml = r#"
[artwork]
filename = ["cover.jpg"]
"#;
        let result: Result<CurateConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let toml = r#"
[browser]
headless = true
"#;
        let result: Result<CurateConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(CurateConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_empty_filenames() {
        let mut config = CurateConfig::default();
        config.artwork.filenames.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_blank_filename() {
        let mut config = CurateConfig::default();
        config.artwork.filenames.push("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_threshold() {
        let mut config = CurateConfig::default();
        config.audit.min_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_timeout() {
        let mut config = CurateConfig::default();
        config.sourcing.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_same_path_levels() {
        let mut config = CurateConfig::default();
        config.review.album_level = 2;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("must differ"));
    }

    #[test]
    fn validate_blank_preview_dir() {
        let mut config = CurateConfig::default();
        config.review.preview_dir = Some(" ".to_string());
        assert!(config.validate().is_err());
        config.review.preview_dir = Some("album_art".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("curator.toml");
        fs::write(&path, "[artwork]\nfilenames = []\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_zero_means_one() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1").unwrap();
        let overlay: toml::Value = toml::from_str("a = 2").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("a").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base: toml::Value = toml::from_str("[audit]\nmin_width = 800\nmin_height = 800").unwrap();
        let overlay: toml::Value = toml::from_str("[audit]\nmin_width = 1000").unwrap();
        let merged = merge_toml(base, overlay);
        let audit = merged.get("audit").unwrap();
        assert_eq!(audit.get("min_width").unwrap().as_integer(), Some(1000));
        assert_eq!(audit.get("min_height").unwrap().as_integer(), Some(800));
    }

    #[test]
    fn merge_toml_array_replaced_not_appended() {
        let base: toml::Value = toml::from_str(r#"names = ["a", "b"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"names = ["c"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("names").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let parsed: CurateConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = CurateConfig::default();
        assert_eq!(parsed.artwork.filenames, defaults.artwork.filenames);
        assert_eq!(parsed.artwork.case_insensitive, defaults.artwork.case_insensitive);
        assert_eq!(parsed.audit.min_width, defaults.audit.min_width);
        assert_eq!(parsed.audit.output, defaults.audit.output);
        assert_eq!(parsed.sourcing.endpoint, defaults.sourcing.endpoint);
        assert_eq!(parsed.sourcing.artwork_size, defaults.sourcing.artwork_size);
        assert_eq!(parsed.review.artist_level, defaults.review.artist_level);
        assert_eq!(parsed.review.preview_dir, None);
        assert_eq!(parsed.processing.max_processes, None);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value().unwrap();
        for section in ["artwork", "audit", "sourcing", "review", "processing"] {
            assert!(value.get(section).is_some(), "missing section {section}");
        }
    }
}
