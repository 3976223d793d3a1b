//! Supported image formats and path handling rules.
//!
//! Format selection is a closed variant over the three supported
//! containers; anything else is rejected at the decode/export boundary
//! with `UnsupportedFormat`.

use std::path::{PathBuf, MAIN_SEPARATOR};

use serde::{Deserialize, Serialize};

use crate::error::{ImagoError, Result};

/// The closed set of formats imago can decode and encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    /// Resolve a format from a file extension (case-insensitive).
    ///
    /// Accepted extensions are exactly `jpg`, `png` and `gif`.
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "gif" => Ok(ImageFormat::Gif),
            other => Err(ImagoError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Resolve a format from the extension of a path: the part of the
    /// final path segment after the last `.`.
    pub fn from_path(path: &str) -> Result<Self> {
        let name = path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(path);
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Self::from_extension(ext),
            _ => Err(ImagoError::UnsupportedFormat(path.to_string())),
        }
    }

    /// The MIME type for this format.
    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
        }
    }

    /// Bridge to the `image` crate's format discriminator.
    pub fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Gif => image::ImageFormat::Gif,
        }
    }

    /// Map a sniffed container format back into the supported set.
    pub fn from_image_format(format: image::ImageFormat) -> Result<Self> {
        match format {
            image::ImageFormat::Jpeg => Ok(ImageFormat::Jpeg),
            image::ImageFormat::Png => Ok(ImageFormat::Png),
            image::ImageFormat::Gif => Ok(ImageFormat::Gif),
            other => Err(ImagoError::UnsupportedFormat(format!("{other:?}"))),
        }
    }
}

/// Normalize a user-supplied path: strip leading separators and convert
/// every separator to the platform one. Pure string transform, no I/O.
pub fn normalize_path(path: &str) -> PathBuf {
    let trimmed = path.trim_start_matches(['/', '\\']);
    let normalized: String = trimmed
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' {
                MAIN_SEPARATOR
            } else {
                c
            }
        })
        .collect();
    PathBuf::from(normalized)
}

/// Check whether a path names an acceptable image format.
pub fn is_acceptable(path: &str) -> bool {
    ImageFormat::from_path(path).is_ok()
}
