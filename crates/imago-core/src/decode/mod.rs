//! Decode collaborator: raw file bytes into an RGBA [`PixelBuffer`].
//!
//! The container is sniffed from the byte stream, restricted to the
//! supported jpeg/png/gif set, and decoded through the `image` crate.
//! EXIF metadata is extracted for JPEG sources only, mirroring what the
//! format actually carries in practice.

mod exif;

pub use exif::read_exif;

use std::collections::BTreeMap;
use std::io::Cursor;

use image::ImageReader;

use crate::buffer::PixelBuffer;
use crate::error::{ImagoError, Result};
use crate::format::ImageFormat;

/// A decoded source image: pixel data plus everything the pipeline keeps
/// around as metadata.
#[derive(Debug, Clone)]
pub struct DecodedSource {
    /// The decoded RGBA pixels.
    pub buffer: PixelBuffer,
    /// The container format the bytes were decoded from.
    pub format: ImageFormat,
    /// EXIF IFD0 fields (populated for JPEG sources, else empty).
    pub exif: BTreeMap<String, String>,
}

/// Decode raw file bytes into a [`DecodedSource`].
///
/// # Errors
///
/// - `UnsupportedFormat` if the sniffed container is not jpeg/png/gif
/// - `Decode` on malformed or truncated data
/// - `CapabilityUnavailable` if the codec backend lacks a required feature
pub fn decode(bytes: &[u8]) -> Result<DecodedSource> {
    let guessed =
        image::guess_format(bytes).map_err(|e| ImagoError::UnsupportedFormat(e.to_string()))?;
    let format = ImageFormat::from_image_format(guessed)?;

    let reader = ImageReader::with_format(Cursor::new(bytes), guessed);
    let img = reader.decode().map_err(map_image_error)?;

    let rgba = img.into_rgba8();
    let buffer = PixelBuffer::from_rgba_image(rgba)?;

    let exif = if format == ImageFormat::Jpeg {
        read_exif(bytes)
    } else {
        BTreeMap::new()
    };

    Ok(DecodedSource {
        buffer,
        format,
        exif,
    })
}

fn map_image_error(e: image::ImageError) -> ImagoError {
    match e {
        image::ImageError::Unsupported(u) => ImagoError::CapabilityUnavailable(u.to_string()),
        other => ImagoError::Decode(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;

    fn checker_buffer(width: u32, height: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                buf.set(x, y, [v, v, v, 255]).unwrap();
            }
        }
        buf
    }

    #[test]
    fn test_decode_png_roundtrip() {
        let buf = checker_buffer(16, 12);
        let bytes = encode(&buf, ImageFormat::Png, 75).unwrap();

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!(decoded.buffer, buf);
        assert!(decoded.exif.is_empty());
    }

    #[test]
    fn test_decode_jpeg() {
        let buf = checker_buffer(16, 16);
        let bytes = encode(&buf, ImageFormat::Jpeg, 90).unwrap();

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.format, ImageFormat::Jpeg);
        assert_eq!(decoded.buffer.width(), 16);
        assert_eq!(decoded.buffer.height(), 16);
    }

    #[test]
    fn test_decode_gif() {
        let buf = checker_buffer(8, 8);
        let bytes = encode(&buf, ImageFormat::Gif, 75).unwrap();

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.format, ImageFormat::Gif);
        assert_eq!(decoded.buffer.width(), 8);
        assert_eq!(decoded.buffer.height(), 8);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode(&[0x00, 0x01, 0x02, 0x03, 0x04]);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_truncated_png_fails() {
        let buf = checker_buffer(16, 16);
        let bytes = encode(&buf, ImageFormat::Png, 75).unwrap();

        // Keep the signature so sniffing succeeds, then cut the stream.
        let result = decode(&bytes[..24]);
        assert!(matches!(result, Err(ImagoError::Decode(_))));
    }

    #[test]
    fn test_decode_unsupported_container() {
        // A minimal BMP header: sniffs as BMP, which is outside the set.
        let mut bmp = vec![b'B', b'M'];
        bmp.extend_from_slice(&[0u8; 64]);
        let result = decode(&bmp);
        assert!(matches!(result, Err(ImagoError::UnsupportedFormat(_))));
    }
}
