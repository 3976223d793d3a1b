//! Stateless dimension and offset math for the geometric transforms.
//!
//! Every function here is pure: dimensions in, dimensions (or a crop
//! window) out. The pipeline validates through these before touching its
//! buffer, which is what guarantees no partial mutation on failure.

use crate::buffer::Rect;
use crate::error::{ImagoError, Result};

/// Tolerance when comparing aspect ratios.
const RATIO_EPSILON: f64 = 1e-9;

/// Compute the output dimensions for a resize to `target_w`, preserving
/// aspect ratio: `target_h = round(target_w / cur_w * cur_h)`, minimum 1.
pub fn resize_by_width(cur_w: u32, cur_h: u32, target_w: u32) -> Result<(u32, u32)> {
    if cur_w == 0 || cur_h == 0 {
        return Err(ImagoError::InvalidDimension(format!(
            "cannot resize an empty image ({cur_w}x{cur_h})"
        )));
    }
    if target_w == 0 {
        return Err(ImagoError::InvalidDimension(
            "target width must be greater than zero".to_string(),
        ));
    }
    let target_h = (target_w as f64 / cur_w as f64 * cur_h as f64).round() as u32;
    Ok((target_w, target_h.max(1)))
}

/// Symmetric dual of [`resize_by_width`]: fix the height, derive the width.
pub fn resize_by_height(cur_w: u32, cur_h: u32, target_h: u32) -> Result<(u32, u32)> {
    if cur_w == 0 || cur_h == 0 {
        return Err(ImagoError::InvalidDimension(format!(
            "cannot resize an empty image ({cur_w}x{cur_h})"
        )));
    }
    if target_h == 0 {
        return Err(ImagoError::InvalidDimension(
            "target height must be greater than zero".to_string(),
        ));
    }
    let target_w = (target_h as f64 / cur_h as f64 * cur_w as f64).round() as u32;
    Ok((target_w.max(1), target_h))
}

/// Convert a rotation angle in degrees to counter-clockwise quarter turns.
///
/// Only multiples of 90 are accepted. Negative angles and angles beyond a
/// full revolution normalize into 0..4 turns.
pub fn quarter_turns(angle_degrees: i64) -> Result<u32> {
    if angle_degrees % 90 != 0 {
        return Err(ImagoError::UnsupportedAngle(angle_degrees));
    }
    Ok((angle_degrees / 90).rem_euclid(4) as u32)
}

/// Validate a crop selection against the current dimensions.
///
/// Fails with `OutOfBounds` when `left + w` or `top + h` extends past the
/// image edge. Coordinates are unsigned, so negative values cannot be
/// expressed.
pub fn crop_rect(cur_w: u32, cur_h: u32, left: u32, top: u32, w: u32, h: u32) -> Result<Rect> {
    if w == 0 || h == 0 {
        return Err(ImagoError::InvalidDimension(format!(
            "crop dimensions must be non-zero, got {w}x{h}"
        )));
    }
    let right = left as u64 + w as u64;
    let bottom = top as u64 + h as u64;
    if right > cur_w as u64 || bottom > cur_h as u64 {
        return Err(ImagoError::OutOfBounds {
            x: right,
            y: bottom,
            width: cur_w,
            height: cur_h,
        });
    }
    Ok(Rect::new(left, top, w, h))
}

/// Compute the centered crop window that adjusts a `cur_w` x `cur_h` image
/// to a `rw:rh` aspect ratio without distortion.
///
/// Returns `None` when the target ratio already matches the current ratio
/// (no-op). Otherwise:
/// - target narrower than current: keep full height, center horizontally
/// - target wider than current: keep full width, center vertically
///
/// The three cases are exhaustive; there is no unhandled branch.
pub fn ratio_rect(cur_w: u32, cur_h: u32, rw: u32, rh: u32) -> Result<Option<Rect>> {
    if rw == 0 || rh == 0 {
        return Err(ImagoError::InvalidRatio);
    }
    if cur_w == 0 || cur_h == 0 {
        return Err(ImagoError::InvalidDimension(format!(
            "cannot ratio-crop an empty image ({cur_w}x{cur_h})"
        )));
    }

    let original = cur_w as f64 / cur_h as f64;
    let target = rw as f64 / rh as f64;

    if (target - original).abs() < RATIO_EPSILON {
        return Ok(None);
    }

    let rect = if target < original {
        // Target is taller/narrower: keep full height, shrink the width.
        let new_w = (cur_h as f64 / rh as f64 * rw as f64).round() as u32;
        let new_w = new_w.clamp(1, cur_w);
        Rect::new((cur_w - new_w) / 2, 0, new_w, cur_h)
    } else {
        // Target is wider: keep full width, shrink the height.
        let new_h = (cur_w as f64 / rw as f64 * rh as f64).round() as u32;
        let new_h = new_h.clamp(1, cur_h);
        Rect::new(0, (cur_h - new_h) / 2, cur_w, new_h)
    };
    Ok(Some(rect))
}


// ============================================================================
// Property-Based Tests
// ============================================================================
