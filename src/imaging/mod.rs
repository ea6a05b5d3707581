//! Resolution probing: read pixel dimensions without decoding pixel data.
//!
//! | Format | How dimensions are read |
//! |---|---|
//! | JPEG, PNG, TIFF, WebP | `image::ImageReader::into_dimensions` (header only) |
//! | AVIF | `avif-parse` container metadata |
//!
//! The module is split into:
//! - **Backend**: [`ImageProber`] trait, [`Dimensions`], [`ProbeError`]
//! - **Rust backend**: [`RustProber`], the production implementation

pub mod backend;
pub mod rust_backend;

pub use backend::{Dimensions, ImageProber, ProbeError};
pub use rust_backend::RustProber;
