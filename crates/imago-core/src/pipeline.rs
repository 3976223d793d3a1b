//! The transform pipeline: one owned buffer, chainable operations.
//!
//! A [`Pipeline`] owns exactly one [`PixelBuffer`] at a time. Every
//! mutating call validates its inputs first, computes a new buffer, then
//! replaces the old one atomically — a failed call leaves the pipeline
//! exactly as it was. Calls return `&mut Self` so transforms compose
//! left to right:
//!
//! ```ignore
//! let mut pipe = Pipeline::open("photos/cat.jpg", 80)?;
//! pipe.resize_width(800)?.ratio(1, 1)?.grayscale()?;
//! pipe.export("out/cat.png", true)?;
//! ```
//!
//! A pipeline is either **Loaded** (buffer present) or **Released**
//! (after `reset` or `dump`); mutating a released pipeline fails with
//! `InvalidState`. A pipeline is not meant for shared-mutable access
//! across threads — clone the buffer instead.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::buffer::{PixelBuffer, Rect};
use crate::decode::{decode, DecodedSource};
use crate::encode::encode;
use crate::error::{ImagoError, Result};
use crate::filters::{apply_filter, level_in_range, FilterKind, LEVEL_MAX, LEVEL_MIN};
use crate::format::{normalize_path, ImageFormat};
use crate::geometry;

/// Default export quality when callers have no preference.
pub const DEFAULT_QUALITY: u8 = 75;

/// Snapshot of a pipeline's current image and metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub path: Option<String>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub exif: BTreeMap<String, String>,
}

/// A stateful wrapper around one pixel buffer plus its metadata.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// `Some` while loaded; `None` once released.
    buffer: Option<PixelBuffer>,
    quality: u8,
    source_path: Option<PathBuf>,
    exif: BTreeMap<String, String>,
}

impl Pipeline {
    /// Open an image file for processing. Supported formats: jpg, png, gif.
    ///
    /// This is a plain factory returning an owned value; callers hold
    /// their own pipeline instances.
    pub fn open(path: &str, quality: u8) -> Result<Self> {
        let normalized = normalize_path(path);
        if !normalized.is_file() {
            return Err(ImagoError::SourceNotFound(
                normalized.display().to_string(),
            ));
        }
        // Reject by extension before touching the bytes.
        ImageFormat::from_path(path)?;

        let bytes = std::fs::read(&normalized)
            .map_err(|e| ImagoError::Decode(format!("{}: {e}", normalized.display())))?;
        let source = decode(&bytes)?;

        let mut pipeline = Self::from_decoded(source, quality)?;
        pipeline.source_path = Some(normalized);
        Ok(pipeline)
    }

    /// Build a pipeline from an already-decoded source.
    pub fn from_decoded(source: DecodedSource, quality: u8) -> Result<Self> {
        let quality = level_in_range(quality as i32, 0, 100, "quality")? as u8;
        Ok(Self {
            buffer: Some(source.buffer),
            quality,
            source_path: None,
            exif: source.exif,
        })
    }

    /// Build a pipeline directly from a pixel buffer (no path, no EXIF).
    pub fn from_buffer(buffer: PixelBuffer, quality: u8) -> Result<Self> {
        let quality = level_in_range(quality as i32, 0, 100, "quality")? as u8;
        Ok(Self {
            buffer: Some(buffer),
            quality,
            source_path: None,
            exif: BTreeMap::new(),
        })
    }

    /// Whether the pipeline still owns a buffer.
    pub fn is_loaded(&self) -> bool {
        self.buffer.is_some()
    }

    /// Current width; 0 once released.
    pub fn width(&self) -> u32 {
        self.buffer.as_ref().map_or(0, PixelBuffer::width)
    }

    /// Current height; 0 once released.
    pub fn height(&self) -> u32 {
        self.buffer.as_ref().map_or(0, PixelBuffer::height)
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// EXIF fields captured at decode time (JPEG sources only).
    pub fn exif(&self) -> &BTreeMap<String, String> {
        &self.exif
    }

    /// Borrow the current buffer.
    pub fn buffer(&self) -> Result<&PixelBuffer> {
        self.buffer.as_ref().ok_or(ImagoError::InvalidState)
    }

    /// Consume the pipeline, handing the final buffer to the caller
    /// (typically for an external encoder).
    pub fn into_buffer(self) -> Result<PixelBuffer> {
        self.buffer.ok_or(ImagoError::InvalidState)
    }

    /// Resize to `target` width, deriving the height from the current
    /// aspect ratio.
    pub fn resize_width(&mut self, target: u32) -> Result<&mut Self> {
        let buf = self.buffer()?;
        let (w, h) = geometry::resize_by_width(buf.width(), buf.height(), target)?;
        let next = buf.resample(w, h, Rect::full(buf.width(), buf.height()))?;
        self.replace(next)
    }

    /// Resize to `target` height, deriving the width from the current
    /// aspect ratio.
    pub fn resize_height(&mut self, target: u32) -> Result<&mut Self> {
        let buf = self.buffer()?;
        let (w, h) = geometry::resize_by_height(buf.width(), buf.height(), target)?;
        let next = buf.resample(w, h, Rect::full(buf.width(), buf.height()))?;
        self.replace(next)
    }

    /// Rotate by a multiple of 90 degrees (counter-clockwise for positive
    /// angles). Width and height are re-derived from the rotated buffer.
    pub fn rotate(&mut self, angle_degrees: i64) -> Result<&mut Self> {
        let turns = geometry::quarter_turns(angle_degrees)?;
        let buf = self.buffer()?;
        let next = buf.rotate_quarter_turns(turns);
        self.replace(next)
    }

    /// Crop the selection into a new `w` x `h` canvas at origin (0, 0).
    pub fn crop(&mut self, left: u32, top: u32, w: u32, h: u32) -> Result<&mut Self> {
        let buf = self.buffer()?;
        let rect = geometry::crop_rect(buf.width(), buf.height(), left, top, w, h)?;
        let next = buf.copy_region(rect)?;
        self.replace(next)
    }

    /// Center-crop to a `rw:rh` aspect ratio without distortion.
    ///
    /// A 500x200 image at 1:1 becomes 200x200; at 3:4 it becomes 150x200.
    /// Matching ratios are a no-op.
    pub fn ratio(&mut self, rw: u32, rh: u32) -> Result<&mut Self> {
        let buf = self.buffer()?;
        match geometry::ratio_rect(buf.width(), buf.height(), rw, rh)? {
            None => Ok(self),
            Some(rect) => {
                let next = buf.copy_region(rect)?;
                self.replace(next)
            }
        }
    }

    /// Apply contrast (level -100 to +100).
    pub fn contrast(&mut self, level: i32) -> Result<&mut Self> {
        let level = level_in_range(level, LEVEL_MIN, LEVEL_MAX, "contrast")?;
        self.filter(FilterKind::Contrast(level))
    }

    /// Apply brightness (level -100 to +100).
    pub fn brightness(&mut self, level: i32) -> Result<&mut Self> {
        let level = level_in_range(level, LEVEL_MIN, LEVEL_MAX, "brightness")?;
        self.filter(FilterKind::Brightness(level))
    }

    /// Apply smoothing (level -100 to +100).
    pub fn smoothness(&mut self, level: i32) -> Result<&mut Self> {
        let level = level_in_range(level, LEVEL_MIN, LEVEL_MAX, "smoothness")?;
        self.filter(FilterKind::Smoothness(level))
    }

    /// Apply gaussian blur, or selective blur when `selective` is true.
    pub fn blur(&mut self, selective: bool) -> Result<&mut Self> {
        self.filter(FilterKind::Blur { selective })
    }

    pub fn grayscale(&mut self) -> Result<&mut Self> {
        self.filter(FilterKind::Grayscale)
    }

    pub fn sepia(&mut self) -> Result<&mut Self> {
        self.filter(FilterKind::Sepia)
    }

    /// Apply the edges-highlight filter.
    pub fn edge(&mut self) -> Result<&mut Self> {
        self.filter(FilterKind::Edge)
    }

    pub fn emboss(&mut self) -> Result<&mut Self> {
        self.filter(FilterKind::Emboss)
    }

    pub fn sketch(&mut self) -> Result<&mut Self> {
        self.filter(FilterKind::Sketch)
    }

    pub fn invert(&mut self) -> Result<&mut Self> {
        self.filter(FilterKind::Invert)
    }

    /// Pixelate with the given block size (validated to -100..=100; the
    /// magnitude is used).
    pub fn pixelate(&mut self, level: i32) -> Result<&mut Self> {
        let level = level_in_range(level, LEVEL_MIN, LEVEL_MAX, "pixelate")?;
        self.filter(FilterKind::Pixelate(level))
    }

    /// Save the current image to disk. The format is derived from the
    /// target path's extension; `DestinationExists` is returned when the
    /// target exists and `overwrite` is false.
    pub fn export(&mut self, path: &str, overwrite: bool) -> Result<()> {
        let buf = self.buffer()?;
        let format = ImageFormat::from_path(path)?;
        let normalized = normalize_path(path);

        if normalized.exists() && !overwrite {
            return Err(ImagoError::DestinationExists(
                normalized.display().to_string(),
            ));
        }

        let bytes = encode(buf, format, self.quality)?;
        std::fs::write(&normalized, bytes)
            .map_err(|e| ImagoError::Encode(format!("{}: {e}", normalized.display())))?;
        self.source_path = Some(normalized);
        Ok(())
    }

    /// Encode the current buffer as PNG bytes and release the pipeline.
    ///
    /// After `dump` the pipeline is inert; further mutating calls fail
    /// with `InvalidState`.
    pub fn dump(&mut self) -> Result<Vec<u8>> {
        let buf = self.buffer()?;
        let bytes = encode(buf, ImageFormat::Png, self.quality)?;
        self.reset();
        Ok(bytes)
    }

    /// Current image information.
    pub fn info(&self) -> Result<ImageInfo> {
        let buf = self.buffer()?;
        Ok(ImageInfo {
            path: self
                .source_path
                .as_ref()
                .map(|p| p.display().to_string()),
            width: buf.width(),
            height: buf.height(),
            quality: self.quality,
            exif: self.exif.clone(),
        })
    }

    /// Release the owned buffer and metadata; the pipeline becomes inert.
    pub fn reset(&mut self) {
        self.buffer = None;
        self.source_path = None;
        self.exif.clear();
    }

    fn filter(&mut self, kind: FilterKind) -> Result<&mut Self> {
        let buf = self.buffer()?;
        let next = apply_filter(buf, kind)?;
        self.replace(next)
    }

    /// Install a new buffer, dropping the old one.
    fn replace(&mut self, next: PixelBuffer) -> Result<&mut Self> {
        self.buffer = Some(next);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pipeline over a buffer where each pixel encodes its position.
    fn test_pipeline(width: u32, height: u32) -> Pipeline {
        let mut buf = PixelBuffer::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                let v = ((y * width + x) % 256) as u8;
                buf.set(x, y, [v, v, v, 255]).unwrap();
            }
        }
        Pipeline::from_buffer(buf, DEFAULT_QUALITY).unwrap()
    }

    #[test]
    fn test_from_buffer_validates_quality() {
        let buf = PixelBuffer::new(4, 4).unwrap();
        assert!(Pipeline::from_buffer(buf.clone(), 100).is_ok());
        assert!(matches!(
            Pipeline::from_buffer(buf, 101),
            Err(ImagoError::LevelOutOfBounds { name: "quality", .. })
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let result = Pipeline::open("definitely/not/here.png", 75);
        assert!(matches!(result, Err(ImagoError::SourceNotFound(_))));
    }

    #[test]
    fn test_resize_width_derives_height() {
        let mut pipe = test_pipeline(500, 200);
        pipe.resize_width(250).unwrap();
        assert_eq!((pipe.width(), pipe.height()), (250, 100));
    }

    #[test]
    fn test_resize_height_derives_width() {
        let mut pipe = test_pipeline(500, 200);
        pipe.resize_height(100).unwrap();
        assert_eq!((pipe.width(), pipe.height()), (250, 100));
    }

    #[test]
    fn test_resize_rejects_zero() {
        let mut pipe = test_pipeline(100, 100);
        assert!(matches!(
            pipe.resize_width(0),
            Err(ImagoError::InvalidDimension(_))
        ));
        // Failed validation leaves dimensions untouched.
        assert_eq!((pipe.width(), pipe.height()), (100, 100));
    }

    #[test]
    fn test_rotate_swaps_dimensions() {
        let mut pipe = test_pipeline(300, 100);
        pipe.rotate(90).unwrap();
        assert_eq!((pipe.width(), pipe.height()), (100, 300));
        pipe.rotate(270).unwrap();
        assert_eq!((pipe.width(), pipe.height()), (300, 100));
    }

    #[test]
    fn test_rotate_360_restores_dimensions() {
        let mut pipe = test_pipeline(300, 100);
        pipe.rotate(360).unwrap();
        assert_eq!((pipe.width(), pipe.height()), (300, 100));
    }

    #[test]
    fn test_rotate_pixels_roundtrip() {
        let mut pipe = test_pipeline(30, 20);
        let before = pipe.buffer().unwrap().clone();
        pipe.rotate(90).unwrap().rotate(90).unwrap().rotate(90).unwrap().rotate(90).unwrap();
        assert_eq!(pipe.buffer().unwrap(), &before);
    }

    #[test]
    fn test_rotate_rejects_non_right_angles() {
        let mut pipe = test_pipeline(10, 10);
        assert!(matches!(
            pipe.rotate(45),
            Err(ImagoError::UnsupportedAngle(45))
        ));
    }

    #[test]
    fn test_crop_content() {
        let mut pipe = test_pipeline(10, 10);
        let before = pipe.buffer().unwrap().clone();
        pipe.crop(3, 2, 4, 5).unwrap();

        assert_eq!((pipe.width(), pipe.height()), (4, 5));
        let buf = pipe.buffer().unwrap();
        for y in 0..5 {
            for x in 0..4 {
                assert_eq!(buf.get(x, y).unwrap(), before.get(3 + x, 2 + y).unwrap());
            }
        }
    }

    #[test]
    fn test_crop_out_of_bounds_no_partial_mutation() {
        let mut pipe = test_pipeline(10, 10);
        let before = pipe.buffer().unwrap().clone();

        let result = pipe.crop(0, 0, 11, 10);
        assert!(matches!(result, Err(ImagoError::OutOfBounds { .. })));
        assert_eq!(pipe.buffer().unwrap(), &before);
    }

    #[test]
    fn test_ratio_square_on_square_is_noop() {
        let mut pipe = test_pipeline(200, 200);
        let before = pipe.buffer().unwrap().clone();
        pipe.ratio(1, 1).unwrap();
        assert_eq!(pipe.buffer().unwrap(), &before);
    }

    #[test]
    fn test_ratio_wide_to_square() {
        let mut pipe = test_pipeline(500, 200);
        pipe.ratio(1, 1).unwrap();
        assert_eq!((pipe.width(), pipe.height()), (200, 200));
    }

    #[test]
    fn test_ratio_3_4() {
        let mut pipe = test_pipeline(500, 200);
        pipe.ratio(3, 4).unwrap();
        assert_eq!((pipe.width(), pipe.height()), (150, 200));
    }

    #[test]
    fn test_ratio_rejects_zero() {
        let mut pipe = test_pipeline(100, 100);
        assert!(matches!(pipe.ratio(0, 1), Err(ImagoError::InvalidRatio)));
    }

    #[test]
    fn test_chaining() {
        let mut pipe = test_pipeline(400, 200);
        pipe.resize_width(200)
            .unwrap()
            .ratio(1, 1)
            .unwrap()
            .rotate(90)
            .unwrap();
        assert_eq!((pipe.width(), pipe.height()), (100, 100));
    }

    #[test]
    fn test_contrast_level_bounds() {
        let mut pipe = test_pipeline(10, 10);
        assert!(pipe.contrast(100).is_ok());
        assert!(pipe.contrast(-100).is_ok());
        assert!(matches!(
            pipe.contrast(101),
            Err(ImagoError::LevelOutOfBounds { name: "contrast", .. })
        ));
        assert!(matches!(
            pipe.contrast(-101),
            Err(ImagoError::LevelOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_filter_levels_validated() {
        let mut pipe = test_pipeline(10, 10);
        assert!(matches!(
            pipe.brightness(101),
            Err(ImagoError::LevelOutOfBounds { name: "brightness", .. })
        ));
        assert!(matches!(
            pipe.smoothness(-101),
            Err(ImagoError::LevelOutOfBounds { name: "smoothness", .. })
        ));
        assert!(matches!(
            pipe.pixelate(101),
            Err(ImagoError::LevelOutOfBounds { name: "pixelate", .. })
        ));
    }

    #[test]
    fn test_filters_preserve_dimensions() {
        let mut pipe = test_pipeline(20, 10);
        pipe.grayscale()
            .unwrap()
            .sepia()
            .unwrap()
            .invert()
            .unwrap()
            .emboss()
            .unwrap()
            .edge()
            .unwrap()
            .sketch()
            .unwrap()
            .blur(true)
            .unwrap()
            .pixelate(2)
            .unwrap();
        assert_eq!((pipe.width(), pipe.height()), (20, 10));
    }

    #[test]
    fn test_dump_releases_pipeline() {
        let mut pipe = test_pipeline(8, 8);
        let bytes = pipe.dump().unwrap();
        assert_eq!(&bytes[1..4], b"PNG");

        assert!(!pipe.is_loaded());
        assert!(matches!(pipe.rotate(90), Err(ImagoError::InvalidState)));
        assert!(matches!(pipe.grayscale(), Err(ImagoError::InvalidState)));
        assert!(matches!(pipe.dump(), Err(ImagoError::InvalidState)));
    }

    #[test]
    fn test_reset_releases_pipeline() {
        let mut pipe = test_pipeline(8, 8);
        pipe.reset();
        assert!(!pipe.is_loaded());
        assert_eq!((pipe.width(), pipe.height()), (0, 0));
        assert!(matches!(pipe.crop(0, 0, 1, 1), Err(ImagoError::InvalidState)));
        assert!(matches!(pipe.info(), Err(ImagoError::InvalidState)));
    }

    #[test]
    fn test_info() {
        let pipe = test_pipeline(12, 8);
        let info = pipe.info().unwrap();
        assert_eq!(info.width, 12);
        assert_eq!(info.height, 8);
        assert_eq!(info.quality, DEFAULT_QUALITY);
        assert!(info.path.is_none());
        assert!(info.exif.is_empty());
    }

    #[test]
    fn test_export_and_reopen() {
        // Paths are normalized to be relative, so exports land under the
        // process working directory.
        let target = "pipeline-test-export.png";
        let _ = std::fs::remove_file(target);

        let mut pipe = test_pipeline(10, 10);
        pipe.export(target, false).unwrap();
        assert!(std::path::Path::new(target).is_file());

        // Existing destination without overwrite fails...
        assert!(matches!(
            pipe.export(target, false),
            Err(ImagoError::DestinationExists(_))
        ));
        // ...and succeeds with overwrite.
        pipe.export(target, true).unwrap();

        let reopened = Pipeline::open(target, 75).unwrap();
        assert_eq!((reopened.width(), reopened.height()), (10, 10));
        assert_eq!(reopened.buffer().unwrap(), pipe.buffer().unwrap());

        let _ = std::fs::remove_file(target);
    }

    #[test]
    fn test_export_unsupported_extension() {
        let mut pipe = test_pipeline(4, 4);
        assert!(matches!(
            pipe.export("out.bmp", true),
            Err(ImagoError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_into_buffer() {
        let pipe = test_pipeline(6, 4);
        let buf = pipe.into_buffer().unwrap();
        assert_eq!((buf.width(), buf.height()), (6, 4));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn pipeline_of(width: u32, height: u32) -> Pipeline {
        let mut buf = PixelBuffer::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                let v = ((y * width + x) % 256) as u8;
                buf.set(x, y, [v, v, v, 255]).unwrap();
            }
        }
        Pipeline::from_buffer(buf, DEFAULT_QUALITY).unwrap()
    }

    proptest! {
        /// Property: valid crops produce exactly the requested dimensions
        /// and copy pixels from the right offsets.
        #[test]
        fn prop_crop_dimensions_and_content(
            (width, height) in (4u32..=40, 4u32..=40),
            fx in 0.0f64..=0.5,
            fy in 0.0f64..=0.5,
        ) {
            let mut pipe = pipeline_of(width, height);
            let before = pipe.buffer().unwrap().clone();

            let left = (fx * width as f64) as u32;
            let top = (fy * height as f64) as u32;
            let w = width - left;
            let h = height - top;

            pipe.crop(left, top, w, h).unwrap();
            prop_assert_eq!((pipe.width(), pipe.height()), (w, h));

            let buf = pipe.buffer().unwrap();
            for y in 0..h {
                for x in 0..w {
                    prop_assert_eq!(
                        buf.get(x, y).unwrap(),
                        before.get(left + x, top + y).unwrap()
                    );
                }
            }
        }

        /// Property: resize-by-width yields round(target/w*h) height.
        #[test]
        fn prop_resize_width_height_formula(
            (width, height) in (1u32..=200, 1u32..=200),
            target in 1u32..=200,
        ) {
            let mut pipe = pipeline_of(width, height);
            pipe.resize_width(target).unwrap();

            let expected = (target as f64 / width as f64 * height as f64)
                .round()
                .max(1.0) as u32;
            prop_assert_eq!((pipe.width(), pipe.height()), (target, expected));
        }

        /// Property: rotate(90) then rotate(270) restores dimensions and
        /// pixels.
        #[test]
        fn prop_rotate_90_270_roundtrip(
            (width, height) in (1u32..=40, 1u32..=40),
        ) {
            let mut pipe = pipeline_of(width, height);
            let before = pipe.buffer().unwrap().clone();
            pipe.rotate(90).unwrap().rotate(270).unwrap();
            prop_assert_eq!(pipe.buffer().unwrap(), &before);
        }

        /// Property: a failed operation never changes the buffer.
        #[test]
        fn prop_failed_ops_leave_buffer_untouched(
            (width, height) in (2u32..=30, 2u32..=30),
        ) {
            let mut pipe = pipeline_of(width, height);
            let before = pipe.buffer().unwrap().clone();

            let _ = pipe.crop(0, 0, width + 1, height);
            let _ = pipe.rotate(45);
            let _ = pipe.contrast(101);
            let _ = pipe.ratio(0, 3);

            prop_assert_eq!(pipe.buffer().unwrap(), &before);
        }

        /// Property: ratio-crop output always matches the requested ratio
        /// within one pixel of rounding.
        #[test]
        fn prop_ratio_output_matches_ratio(
            (width, height) in (8u32..=120, 8u32..=120),
            rw in 1u32..=8,
            rh in 1u32..=8,
        ) {
            let mut pipe = pipeline_of(width, height);
            pipe.ratio(rw, rh).unwrap();

            let got = pipe.width() as f64 / pipe.height() as f64;
            let want = rw as f64 / rh as f64;
            // One full dimension is kept, the other is rounded to pixels.
            let tolerance = want / pipe.height().min(pipe.width()) as f64 + 0.05;
            prop_assert!(
                (got - want).abs() <= tolerance.max(0.2),
                "ratio {rw}:{rh} on {width}x{height} gave {}x{}",
                pipe.width(),
                pipe.height()
            );
        }
    }
}
