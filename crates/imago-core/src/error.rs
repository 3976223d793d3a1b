//! Error taxonomy shared by every imago-core operation.
//!
//! All validation happens eagerly at the start of each operation, so an
//! error here always means the owning buffer was left untouched.

use thiserror::Error;

/// Errors surfaced by decoding, encoding, geometry, and pipeline operations.
#[derive(Debug, Error)]
pub enum ImagoError {
    /// Input path does not reference an existing file.
    #[error("source image does not exist: {0}")]
    SourceNotFound(String),

    /// Format outside the supported set (jpg, png, gif).
    #[error("unsupported image format: {0}. Only jpg, png and gif are supported")]
    UnsupportedFormat(String),

    /// Codec-level decode failure on malformed data.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Codec-level encode failure.
    #[error("encode failed: {0}")]
    Encode(String),

    /// Zero or otherwise unusable width/height.
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    /// A coordinate or selection extends past the buffer edges.
    #[error("selection out of bounds: ({x}, {y}) exceeds {width}x{height}")]
    OutOfBounds {
        x: u64,
        y: u64,
        width: u32,
        height: u32,
    },

    /// Rotation angle is not a multiple of 90 degrees.
    #[error("the image can only be rotated at 90 degree intervals, got {0}")]
    UnsupportedAngle(i64),

    /// A ratio term was zero.
    #[error("ratio terms must be greater than zero")]
    InvalidRatio,

    /// Hex color needs more than 6 digits to expand.
    #[error("invalid color specified: {0:#x}")]
    InvalidColor(u32),

    /// Export target exists and overwrite was not requested.
    #[error("destination file already exists: {0}")]
    DestinationExists(String),

    /// Operation attempted on a released pipeline.
    #[error("the pipeline has been released, no image is loaded")]
    InvalidState,

    /// The codec backend lacks a capability needed for this image.
    #[error("codec capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// A filter or quality level falls outside its accepted range.
    #[error("the {name} level is out of bounds, it needs to be between {low} and {high}")]
    LevelOutOfBounds {
        name: &'static str,
        low: i32,
        high: i32,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ImagoError>;
