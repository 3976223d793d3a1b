//! Deterministic identicon avatars.
//!
//! An identicon is derived entirely from the SHA-1 digest of a seed
//! string: the digest picks a base color and four sprite shapes from a
//! fixed catalog, and the shapes are tiled with 4-fold rotational
//! symmetry. Identical `(seed, size)` inputs always produce pixel-
//! identical buffers, which is what makes golden-image tests possible.

use sha1::{Digest, Sha1};

use crate::buffer::{PixelBuffer, Rect};
use crate::error::{ImagoError, Result};

/// Smallest supported avatar size; smaller requests are clamped up.
pub const MIN_SIZE: u32 = 16;

/// Sprite catalog: 16 polygons in normalized [0, 1] coordinates.
///
/// Read-only and shared by every `generate` call; the table is never
/// mutated after process start.
static SPRITES: [&[[f64; 2]]; 16] = [
    &[[0.5, 1.0], [1.0, 0.0], [1.0, 1.0]],
    &[[0.5, 0.0], [1.0, 0.0], [0.5, 1.0], [0.0, 1.0]],
    &[[0.5, 0.0], [1.0, 0.0], [1.0, 1.0], [0.5, 1.0], [1.0, 0.5]],
    &[[0.0, 0.5], [0.5, 0.0], [1.0, 0.5], [0.5, 1.0], [0.5, 0.5]],
    &[[0.0, 0.5], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [1.0, 0.5]],
    &[[1.0, 0.0], [1.0, 1.0], [0.5, 1.0], [1.0, 0.5], [0.5, 0.5]],
    &[
        [0.0, 0.0],
        [1.0, 0.0],
        [1.0, 0.5],
        [0.0, 0.0],
        [0.5, 1.0],
        [0.0, 1.0],
    ],
    &[
        [0.0, 0.0],
        [0.5, 0.0],
        [1.0, 0.5],
        [0.5, 1.0],
        [0.0, 1.0],
        [0.5, 0.5],
    ],
    &[
        [0.5, 0.0],
        [0.5, 0.5],
        [1.0, 0.5],
        [1.0, 1.0],
        [0.5, 1.0],
        [0.5, 0.5],
        [0.0, 0.5],
    ],
    &[
        [0.0, 0.0],
        [1.0, 0.0],
        [0.5, 0.5],
        [1.0, 0.5],
        [0.5, 1.0],
        [0.5, 0.5],
        [0.0, 1.0],
    ],
    &[
        [0.0, 0.5],
        [0.5, 1.0],
        [1.0, 0.5],
        [0.5, 0.0],
        [1.0, 0.0],
        [1.0, 1.0],
        [0.0, 1.0],
    ],
    &[
        [0.5, 0.0],
        [1.0, 0.0],
        [1.0, 1.0],
        [0.5, 1.0],
        [1.0, 0.75],
        [0.5, 0.5],
        [1.0, 0.25],
    ],
    &[
        [0.0, 0.5],
        [0.5, 0.0],
        [0.5, 0.5],
        [1.0, 0.0],
        [1.0, 0.5],
        [0.5, 1.0],
        [0.5, 0.5],
        [0.0, 1.0],
    ],
    &[
        [0.0, 0.0],
        [1.0, 0.0],
        [1.0, 1.0],
        [0.0, 1.0],
        [1.0, 0.5],
        [0.5, 0.25],
        [0.5, 0.75],
        [0.0, 0.5],
        [0.5, 0.25],
    ],
    &[
        [0.0, 0.5],
        [0.5, 0.5],
        [0.5, 0.0],
        [1.0, 0.0],
        [0.5, 0.5],
        [1.0, 0.5],
        [0.5, 1.0],
        [0.5, 0.5],
        [0.0, 1.0],
    ],
    &[
        [0.0, 0.0],
        [1.0, 0.0],
        [0.5, 0.5],
        [0.5, 0.0],
        [0.0, 0.5],
        [1.0, 0.5],
        [0.5, 1.0],
        [0.5, 0.5],
        [0.0, 1.0],
    ],
];

/// Expand a packed hex color to full 24-bit RGB.
///
/// Values up to `0xFFF` are treated as 3-digit shorthand, each nibble
/// doubled to a byte (the CSS `#abc` -> `#aabbcc` rule); values up to
/// `0xFFFFFF` are already full triplets. Anything wider would need more
/// than 6 hex digits and fails with `InvalidColor`.
pub fn rgb(color: u32) -> Result<[u8; 3]> {
    if color < 0x1000 {
        let expand = |nibble: u32| (nibble * 0x11) as u8;
        return Ok([
            expand((color >> 8) & 0xF),
            expand((color >> 4) & 0xF),
            expand(color & 0xF),
        ]);
    }
    if color <= 0xFF_FFFF {
        return Ok([
            ((color >> 16) & 0xFF) as u8,
            ((color >> 8) & 0xFF) as u8,
            (color & 0xFF) as u8,
        ]);
    }
    Err(ImagoError::InvalidColor(color))
}

/// Generate the identicon for `seed` as a `size` x `size` RGBA buffer.
///
/// Pure function of its inputs: no shared mutable state is touched, so
/// independent calls may run concurrently. `size` is clamped to at least
/// [`MIN_SIZE`].
pub fn generate(seed: &str, size: u32) -> Result<PixelBuffer> {
    let size = size.max(MIN_SIZE);
    let digest = Sha1::digest(seed.as_bytes());

    // Base color from the last 3 hex digits of the digest, expanded with
    // the shorthand rule.
    let packed = ((digest[18] as u32 & 0x0F) << 8) | digest[19] as u32;
    let [r, g, b] = rgb(packed)?;
    let color = [r, g, b, 255];

    // Sub-tile size derived from `size`; the double /4 and /2 divisions
    // keep the later half-dimension placements exact.
    let dimension = 4 * (size / 4) / 2;

    let mut canvas = PixelBuffer::new(size, size)?;

    for j in 0..2u32 {
        for i in j..(3 - j) {
            let digit = hex_digit(&digest, (j * 4 + i) as usize);
            let polygon = SPRITES[digit % SPRITES.len()];
            let scaled: Vec<[f64; 2]> = polygon
                .iter()
                .map(|p| [p[0] * dimension as f64, p[1] * dimension as f64])
                .collect();

            let mut sprite = PixelBuffer::new(dimension, dimension)?;
            fill_polygon(&mut sprite, &scaled, color)?;

            // Stamp the sprite, then rotate the whole canvas a quarter
            // turn, four times over. The fourth rotation restores the
            // original orientation, leaving the sprite in all four
            // rotationally-symmetric positions.
            for _ in 0..4 {
                canvas.blit_resampled(
                    &sprite,
                    Rect::new(
                        i * dimension / 2,
                        j * dimension / 2,
                        dimension / 2,
                        dimension / 2,
                    ),
                )?;
                canvas = canvas.rotate_quarter_turns(1);
            }
        }
    }

    Ok(canvas)
}

/// Hex digit of the digest at string position `pos` (0-based, high nibble
/// first).
fn hex_digit(digest: &[u8], pos: usize) -> usize {
    let byte = digest[pos / 2];
    if pos % 2 == 0 {
        (byte >> 4) as usize
    } else {
        (byte & 0x0F) as usize
    }
}

/// Scan-line fill of a polygon with even-odd crossing rules.
///
/// Pixels whose center lies inside the polygon are set to `color`.
fn fill_polygon(buf: &mut PixelBuffer, points: &[[f64; 2]], color: [u8; 4]) -> Result<()> {
    if points.len() < 3 {
        return Ok(());
    }
    let width = buf.width();

    for y in 0..buf.height() {
        let scan = y as f64 + 0.5;

        let mut crossings: Vec<f64> = Vec::new();
        for k in 0..points.len() {
            let a = points[k];
            let b = points[(k + 1) % points.len()];
            if (a[1] <= scan && b[1] > scan) || (b[1] <= scan && a[1] > scan) {
                let t = (scan - a[1]) / (b[1] - a[1]);
                crossings.push(a[0] + t * (b[0] - a[0]));
            }
        }
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            let start = (span[0] - 0.5).ceil().max(0.0) as u32;
            let end = (span[1] - 0.5).floor().min(width as f64 - 1.0);
            if end < 0.0 {
                continue;
            }
            for x in start..=end as u32 {
                if x < width {
                    buf.set(x, y, color)?;
                }
            }
        }
    }
    Ok(())
}


// ============================================================================
// Property-Based Tests
// ============================================================================
