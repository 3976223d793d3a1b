//! Encode collaborator: [`PixelBuffer`] into jpeg/png/gif bytes.
//!
//! PNG always carries the alpha channel through to the output — that is a
//! fixed policy, not a knob. JPEG honors the pipeline quality setting;
//! GIF accepts it for interface symmetry but the format has no comparable
//! quality parameter.

use std::io::Cursor;

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, Frame, ImageEncoder, RgbaImage};

use crate::buffer::{PixelBuffer, BYTES_PER_PIXEL};
use crate::error::{ImagoError, Result};
use crate::format::ImageFormat;

/// Encode a buffer into the requested container format.
///
/// `quality` is meaningful for jpeg (0-100, clamped to the encoder's
/// minimum of 1) and ignored for png and gif.
pub fn encode(buffer: &PixelBuffer, format: ImageFormat, quality: u8) -> Result<Vec<u8>> {
    match format {
        ImageFormat::Jpeg => encode_jpeg(buffer, quality),
        ImageFormat::Png => encode_png(buffer),
        ImageFormat::Gif => encode_gif(buffer),
    }
}

/// JPEG has no alpha channel; the alpha byte is dropped.
fn encode_jpeg(buffer: &PixelBuffer, quality: u8) -> Result<Vec<u8>> {
    let rgb: Vec<u8> = buffer
        .pixels()
        .chunks_exact(BYTES_PER_PIXEL)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder
        .write_image(
            &rgb,
            buffer.width(),
            buffer.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(map_image_error)?;
    Ok(out.into_inner())
}

/// PNG keeps the full RGBA data; alpha is preserved unconditionally.
fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    let encoder = PngEncoder::new(&mut out);
    encoder
        .write_image(
            buffer.pixels(),
            buffer.width(),
            buffer.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(map_image_error)?;
    Ok(out.into_inner())
}

fn encode_gif(buffer: &PixelBuffer) -> Result<Vec<u8>> {
    let img = RgbaImage::from_raw(
        buffer.width(),
        buffer.height(),
        buffer.pixels().to_vec(),
    )
    .ok_or_else(|| ImagoError::Encode("pixel data does not match dimensions".to_string()))?;

    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        encoder
            .encode_frame(Frame::new(img))
            .map_err(map_image_error)?;
    }
    Ok(out)
}

fn map_image_error(e: image::ImageError) -> ImagoError {
    match e {
        image::ImageError::Unsupported(u) => ImagoError::CapabilityUnavailable(u.to_string()),
        other => ImagoError::Encode(other.to_string()),
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
