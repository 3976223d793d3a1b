//! Imago Core - Raster image manipulation library
//!
//! This crate provides the core image manipulation functionality for Imago,
//! including decoding and encoding of jpg/png/gif sources, geometric
//! transforms (resize, rotate, crop, ratio-crop), pixel filters, a
//! chainable transform pipeline, and a deterministic identicon generator.

pub mod buffer;
pub mod decode;
pub mod encode;
pub mod error;
pub mod filters;
pub mod format;
pub mod geometry;
pub mod identicon;
pub mod pipeline;

pub use buffer::{PixelBuffer, Rect, BYTES_PER_PIXEL};
pub use decode::{decode, DecodedSource};
pub use encode::encode;
pub use error::{ImagoError, Result};
pub use filters::{apply_filter, FilterKind, LEVEL_MAX, LEVEL_MIN};
pub use format::ImageFormat;
pub use identicon::generate as generate_identicon;
pub use pipeline::{ImageInfo, Pipeline, DEFAULT_QUALITY};
