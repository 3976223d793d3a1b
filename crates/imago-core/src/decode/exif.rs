//! Best-effort EXIF extraction for JPEG sources.

use std::collections::BTreeMap;
use std::io::Cursor;

use exif::{In, Reader};

/// Read the primary-image (IFD0) EXIF fields from raw file bytes.
///
/// Extraction is best-effort: files without EXIF, or with EXIF the parser
/// cannot read, yield an empty map rather than an error. Tag names are
/// rendered with their standard EXIF names and values with their units.
pub fn read_exif(bytes: &[u8]) -> BTreeMap<String, String> {
    let mut cursor = Cursor::new(bytes);
    let Ok(data) = Reader::new().read_from_container(&mut cursor) else {
        return BTreeMap::new();
    };

    let mut fields = BTreeMap::new();
    for field in data.fields() {
        if field.ifd_num == In::PRIMARY {
            fields.insert(
                field.tag.to_string(),
                field.display_value().with_unit(&data).to_string(),
            );
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_exif_yields_empty_map() {
        assert!(read_exif(&[]).is_empty());
        assert!(read_exif(&[0xFF, 0xD8, 0xFF, 0xD9]).is_empty());
    }

    #[test]
    fn test_plain_png_yields_empty_map() {
        let buf = crate::buffer::PixelBuffer::new(4, 4).unwrap();
        let bytes = crate::encode::encode(&buf, crate::format::ImageFormat::Png, 75).unwrap();
        assert!(read_exif(&bytes).is_empty());
    }
}
