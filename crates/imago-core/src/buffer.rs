//! Owned RGBA pixel buffers and the primitive copy/scale/rotate operations
//! every geometric transform is built from.
//!
//! A [`PixelBuffer`] is a row-major grid of RGBA pixels (4 bytes per pixel)
//! with the invariant `pixels.len() == width * height * 4` held at all
//! times. Operations never mutate their source buffer; they validate their
//! arguments eagerly and return a fully-initialized new buffer, which is
//! what lets the pipeline replace its buffer atomically.
//!
//! # Coordinate System
//!
//! - (0, 0) = top-left corner
//! - x grows right, y grows down
//! - rotation is counter-clockwise in quarter turns

use crate::error::{ImagoError, Result};

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// A rectangular region in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a rectangle at the given origin.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The full area of a `width` x `height` buffer.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge, widened to avoid u32 overflow.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge, widened to avoid u32 overflow.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }
}

/// A mutable 2D grid of RGBA pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    /// RGBA pixel data in row-major order (4 bytes per pixel).
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Create a fully transparent buffer of the given dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ImagoError::InvalidDimension(format!(
                "buffer dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        Ok(Self {
            width,
            height,
            pixels: vec![0u8; len],
        })
    }

    /// Create a buffer from existing RGBA pixel data.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ImagoError::InvalidDimension(format!(
                "buffer dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(ImagoError::InvalidDimension(format!(
                "pixel data length {} does not match {width}x{height} (expected {expected})",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Convert an `image::RgbaImage` into a buffer.
    pub fn from_rgba_image(img: image::RgbaImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        Self::from_raw(width, height, img.into_raw())
    }

    /// Convert to an `image::RgbaImage` for codec/filter interop.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consume the buffer, returning the raw RGBA bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Read the RGBA value at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Result<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return Err(ImagoError::OutOfBounds {
                x: x as u64,
                y: y as u64,
                width: self.width,
                height: self.height,
            });
        }
        let i = self.offset(x, y);
        Ok([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Write the RGBA value at (x, y).
    pub fn set(&mut self, x: u32, y: u32, rgba: [u8; 4]) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(ImagoError::OutOfBounds {
                x: x as u64,
                y: y as u64,
                width: self.width,
                height: self.height,
            });
        }
        let i = self.offset(x, y);
        self.pixels[i..i + BYTES_PER_PIXEL].copy_from_slice(&rgba);
        Ok(())
    }

    /// Validate that a rectangle is non-empty and lies within this buffer.
    pub fn check_rect(&self, rect: Rect) -> Result<()> {
        if rect.width == 0 || rect.height == 0 {
            return Err(ImagoError::InvalidDimension(format!(
                "region dimensions must be non-zero, got {}x{}",
                rect.width, rect.height
            )));
        }
        if rect.right() > self.width as u64 || rect.bottom() > self.height as u64 {
            return Err(ImagoError::OutOfBounds {
                x: rect.right(),
                y: rect.bottom(),
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Scaled copy of `src` into a fresh `dst_w` x `dst_h` canvas using
    /// bilinear resampling.
    ///
    /// The source buffer is not modified. Identity resamples (same
    /// dimensions as `src`, which covers the whole buffer) reproduce the
    /// source pixels exactly.
    pub fn resample(&self, dst_w: u32, dst_h: u32, src: Rect) -> Result<PixelBuffer> {
        self.check_rect(src)?;
        let mut out = PixelBuffer::new(dst_w, dst_h)?;

        let x_scale = src.width as f64 / dst_w as f64;
        let y_scale = src.height as f64 / dst_h as f64;

        for dy in 0..dst_h {
            let sy = src.y as f64 + (dy as f64 + 0.5) * y_scale - 0.5;
            for dx in 0..dst_w {
                let sx = src.x as f64 + (dx as f64 + 0.5) * x_scale - 0.5;
                let sample = self.sample_bilinear(sx, sy, src);
                let i = out.offset(dx, dy);
                for (c, v) in sample.iter().enumerate() {
                    out.pixels[i + c] = v.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
        Ok(out)
    }

    /// Unscaled copy of `src` into a new buffer with origin (0, 0).
    ///
    /// This is the crop primitive: rows are copied verbatim, so the output
    /// pixel (x, y) equals the source pixel (src.x + x, src.y + y).
    pub fn copy_region(&self, src: Rect) -> Result<PixelBuffer> {
        self.check_rect(src)?;
        let row_bytes = src.width as usize * BYTES_PER_PIXEL;
        let mut pixels = vec![0u8; src.height as usize * row_bytes];

        for y in 0..src.height {
            let from = self.offset(src.x, src.y + y);
            let to = y as usize * row_bytes;
            pixels[to..to + row_bytes].copy_from_slice(&self.pixels[from..from + row_bytes]);
        }
        PixelBuffer::from_raw(src.width, src.height, pixels)
    }

    /// Rotate by `n` quarter turns counter-clockwise.
    ///
    /// Odd turn counts swap width and height; no pixels are lost and no
    /// corners are exposed, so the result is fully determined by the input.
    pub fn rotate_quarter_turns(&self, n: u32) -> PixelBuffer {
        let turns = n % 4;
        if turns == 0 {
            return self.clone();
        }

        let (dst_w, dst_h) = if turns % 2 == 1 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        };
        let mut pixels = vec![0u8; self.pixels.len()];

        for dy in 0..dst_h {
            for dx in 0..dst_w {
                // Inverse mapping from destination to source coordinates.
                let (sx, sy) = match turns {
                    1 => (self.width - 1 - dy, dx),
                    2 => (self.width - 1 - dx, self.height - 1 - dy),
                    _ => (dy, self.height - 1 - dx),
                };
                let from = self.offset(sx, sy);
                let to = (dy as usize * dst_w as usize + dx as usize) * BYTES_PER_PIXEL;
                pixels[to..to + BYTES_PER_PIXEL]
                    .copy_from_slice(&self.pixels[from..from + BYTES_PER_PIXEL]);
            }
        }

        PixelBuffer {
            width: dst_w,
            height: dst_h,
            pixels,
        }
    }

    /// Scale the whole of `src` into the `dst` rectangle of this buffer,
    /// compositing source-over: fully transparent source pixels leave the
    /// destination untouched.
    pub fn blit_resampled(&mut self, src: &PixelBuffer, dst: Rect) -> Result<()> {
        self.check_rect(dst)?;
        let src_full = Rect::full(src.width, src.height);

        let x_scale = src.width as f64 / dst.width as f64;
        let y_scale = src.height as f64 / dst.height as f64;

        for dy in 0..dst.height {
            let sy = (dy as f64 + 0.5) * y_scale - 0.5;
            for dx in 0..dst.width {
                let sx = (dx as f64 + 0.5) * x_scale - 0.5;
                let s = src.sample_bilinear(sx, sy, src_full);

                let sa = s[3] / 255.0;
                if sa <= 0.0 {
                    continue;
                }

                let i = self.offset(dst.x + dx, dst.y + dy);
                let d = [
                    self.pixels[i] as f64,
                    self.pixels[i + 1] as f64,
                    self.pixels[i + 2] as f64,
                    self.pixels[i + 3] as f64,
                ];
                let da = d[3] / 255.0;
                let out_a = sa + da * (1.0 - sa);

                for c in 0..3 {
                    let v = (s[c] * sa + d[c] * da * (1.0 - sa)) / out_a;
                    self.pixels[i + c] = v.round().clamp(0.0, 255.0) as u8;
                }
                self.pixels[i + 3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        }
        Ok(())
    }

    /// Sample at fractional coordinates with bilinear interpolation,
    /// clamped to the `bounds` rectangle.
    fn sample_bilinear(&self, x: f64, y: f64, bounds: Rect) -> [f64; 4] {
        let min_x = bounds.x as f64;
        let min_y = bounds.y as f64;
        let max_x = (bounds.right() - 1) as f64;
        let max_y = (bounds.bottom() - 1) as f64;

        let x = x.clamp(min_x, max_x);
        let y = y.clamp(min_y, max_y);

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(max_x as u32);
        let y1 = (y0 + 1).min(max_y as u32);

        let fx = x - x0 as f64;
        let fy = y - y0 as f64;

        let p00 = self.pixel_f64(x0, y0);
        let p10 = self.pixel_f64(x1, y0);
        let p01 = self.pixel_f64(x0, y1);
        let p11 = self.pixel_f64(x1, y1);

        let mut out = [0.0f64; 4];
        for (c, v) in out.iter_mut().enumerate() {
            *v = p00[c] * (1.0 - fx) * (1.0 - fy)
                + p10[c] * fx * (1.0 - fy)
                + p01[c] * (1.0 - fx) * fy
                + p11[c] * fx * fy;
        }
        out
    }

    #[inline]
    fn pixel_f64(&self, x: u32, y: u32) -> [f64; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i] as f64,
            self.pixels[i + 1] as f64,
            self.pixels[i + 2] as f64,
            self.pixels[i + 3] as f64,
        ]
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
