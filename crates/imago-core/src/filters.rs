//! Pixel filter collaborator.
//!
//! Filters take a buffer and produce a new one; they never mutate their
//! input, so the pipeline can keep its move-replace discipline. Level
//! parameters are validated by the caller through [`level_in_range`]
//! before a filter runs.
//!
//! Point filters (contrast, brightness, grayscale, sepia, invert) are
//! straight per-pixel math on the RGB channels with alpha passed through.
//! Area filters (smooth, edge, emboss, sketch, selective blur) are 3x3
//! convolutions with edge clamping; gaussian blur delegates to the
//! `image` crate.

use crate::buffer::PixelBuffer;
use crate::error::{ImagoError, Result};

/// Lower bound for filter level parameters.
pub const LEVEL_MIN: i32 = -100;
/// Upper bound for filter level parameters.
pub const LEVEL_MAX: i32 = 100;

/// A filter kind with its integer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Contrast adjustment, level -100..=100.
    Contrast(i32),
    /// Brightness adjustment, level -100..=100.
    Brightness(i32),
    /// Smoothing strength, level -100..=100.
    Smoothness(i32),
    /// Gaussian blur, or a gentler selective blur.
    Blur { selective: bool },
    Grayscale,
    Sepia,
    /// Edge highlight.
    Edge,
    Emboss,
    /// Mean-removal sketch effect.
    Sketch,
    /// Color negation.
    Invert,
    /// Block-average pixelation, block size from |level|.
    Pixelate(i32),
}

/// Validate an integer level into `[low, high]`.
pub fn level_in_range(value: i32, low: i32, high: i32, name: &'static str) -> Result<i32> {
    if value < low || value > high {
        return Err(ImagoError::LevelOutOfBounds { name, low, high });
    }
    Ok(value)
}

/// Apply a filter, returning the filtered buffer.
pub fn apply_filter(buffer: &PixelBuffer, kind: FilterKind) -> Result<PixelBuffer> {
    match kind {
        FilterKind::Contrast(level) => Ok(map_rgb(buffer, |c| {
            let factor = 1.0 + level as f64 / 100.0;
            (c - 127.5) * factor + 127.5
        })),
        FilterKind::Brightness(level) => {
            let shift = level as f64 * 255.0 / 100.0;
            Ok(map_rgb(buffer, |c| c + shift))
        }
        FilterKind::Smoothness(level) => {
            let weight = level as f64;
            let mut divisor = weight + 8.0;
            if divisor == 0.0 {
                divisor = 1.0;
            }
            let kernel = [1.0, 1.0, 1.0, 1.0, weight, 1.0, 1.0, 1.0, 1.0];
            Ok(convolve3x3(buffer, kernel, divisor, 0.0))
        }
        FilterKind::Blur { selective: false } => gaussian_blur(buffer),
        FilterKind::Blur { selective: true } => {
            let kernel = [1.0, 2.0, 1.0, 2.0, 4.0, 2.0, 1.0, 2.0, 1.0];
            Ok(convolve3x3(buffer, kernel, 16.0, 0.0))
        }
        FilterKind::Grayscale => Ok(grayscale(buffer)),
        FilterKind::Sepia => {
            let gray = grayscale(buffer);
            Ok(map_channels(&gray, |r, g, b| {
                (r + 90.0, g + 60.0, b + 45.0)
            }))
        }
        FilterKind::Edge => {
            let kernel = [-1.0, 0.0, -1.0, 0.0, 4.0, 0.0, -1.0, 0.0, -1.0];
            Ok(convolve3x3(buffer, kernel, 1.0, 127.0))
        }
        FilterKind::Emboss => {
            let kernel = [1.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.5];
            Ok(convolve3x3(buffer, kernel, 1.0, 127.0))
        }
        FilterKind::Sketch => {
            let kernel = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];
            Ok(convolve3x3(buffer, kernel, 1.0, 0.0))
        }
        FilterKind::Invert => Ok(map_rgb(buffer, |c| 255.0 - c)),
        FilterKind::Pixelate(level) => pixelate(buffer, level),
    }
}

/// Apply `f` to every RGB channel, clamping to 0..=255; alpha unchanged.
fn map_rgb(buffer: &PixelBuffer, f: impl Fn(f64) -> f64) -> PixelBuffer {
    map_channels(buffer, |r, g, b| (f(r), f(g), f(b)))
}

fn map_channels(
    buffer: &PixelBuffer,
    f: impl Fn(f64, f64, f64) -> (f64, f64, f64),
) -> PixelBuffer {
    let mut out = buffer.clone();
    let width = out.width();
    let height = out.height();
    for y in 0..height {
        for x in 0..width {
            // In-range by construction; errors cannot occur here.
            if let Ok(px) = out.get(x, y) {
                let (r, g, b) = f(px[0] as f64, px[1] as f64, px[2] as f64);
                let _ = out.set(
                    x,
                    y,
                    [
                        r.round().clamp(0.0, 255.0) as u8,
                        g.round().clamp(0.0, 255.0) as u8,
                        b.round().clamp(0.0, 255.0) as u8,
                        px[3],
                    ],
                );
            }
        }
    }
    out
}

/// Luminance-weighted grayscale (ITU-R 601 weights), alpha unchanged.
fn grayscale(buffer: &PixelBuffer) -> PixelBuffer {
    map_channels(buffer, |r, g, b| {
        let luma = r * 0.299 + g * 0.587 + b * 0.114;
        (luma, luma, luma)
    })
}

/// 3x3 convolution over the RGB channels with edge clamping.
///
/// Each output channel is `sum(kernel * neighborhood) / divisor + offset`,
/// clamped to 0..=255. Alpha passes through untouched.
fn convolve3x3(buffer: &PixelBuffer, kernel: [f64; 9], divisor: f64, offset: f64) -> PixelBuffer {
    let width = buffer.width();
    let height = buffer.height();
    let mut out = buffer.clone();

    for y in 0..height {
        for x in 0..width {
            let mut acc = [0.0f64; 3];
            for ky in 0..3i64 {
                for kx in 0..3i64 {
                    let sx = (x as i64 + kx - 1).clamp(0, width as i64 - 1) as u32;
                    let sy = (y as i64 + ky - 1).clamp(0, height as i64 - 1) as u32;
                    let weight = kernel[(ky * 3 + kx) as usize];
                    if let Ok(px) = buffer.get(sx, sy) {
                        acc[0] += px[0] as f64 * weight;
                        acc[1] += px[1] as f64 * weight;
                        acc[2] += px[2] as f64 * weight;
                    }
                }
            }
            if let Ok(px) = buffer.get(x, y) {
                let _ = out.set(
                    x,
                    y,
                    [
                        (acc[0] / divisor + offset).round().clamp(0.0, 255.0) as u8,
                        (acc[1] / divisor + offset).round().clamp(0.0, 255.0) as u8,
                        (acc[2] / divisor + offset).round().clamp(0.0, 255.0) as u8,
                        px[3],
                    ],
                );
            }
        }
    }
    out
}

fn gaussian_blur(buffer: &PixelBuffer) -> Result<PixelBuffer> {
    let img = buffer.to_rgba_image().ok_or_else(|| {
        ImagoError::InvalidDimension("buffer length does not match its dimensions".to_string())
    })?;
    let blurred = image::imageops::blur(&img, 1.0);
    PixelBuffer::from_rgba_image(blurred)
}

/// Average each `block`-sized square and paint it back over the square.
fn pixelate(buffer: &PixelBuffer, level: i32) -> Result<PixelBuffer> {
    let block = level.unsigned_abs();
    if block <= 1 {
        return Ok(buffer.clone());
    }

    let width = buffer.width();
    let height = buffer.height();
    let mut out = buffer.clone();

    let mut by = 0u32;
    while by < height {
        let bh = block.min(height - by);
        let mut bx = 0u32;
        while bx < width {
            let bw = block.min(width - bx);

            let mut sum = [0u64; 4];
            for y in by..by + bh {
                for x in bx..bx + bw {
                    let px = buffer.get(x, y)?;
                    for (c, v) in px.iter().enumerate() {
                        sum[c] += *v as u64;
                    }
                }
            }
            let count = (bw * bh) as u64;
            let avg = [
                (sum[0] / count) as u8,
                (sum[1] / count) as u8,
                (sum[2] / count) as u8,
                (sum[3] / count) as u8,
            ];
            for y in by..by + bh {
                for x in bx..bx + bw {
                    out.set(x, y, avg)?;
                }
            }
            bx += block;
        }
        by += block;
    }
    Ok(out)
}
