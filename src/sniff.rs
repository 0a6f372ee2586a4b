//! Image format sniffing
//!
//! Classifies raw artwork bytes by their magic signature and reads pixel
//! dimensions out of JPEG frame headers and the PNG IHDR chunk. Every
//! function here is total: truncated or garbage input yields
//! [`ImageFormat::Unknown`] or `None`, never a panic.

use std::fmt;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Signature + IHDR length/type + width/height.
const PNG_IHDR_END: usize = 24;

/// Up to four leading bytes of an unrecognised buffer, kept for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadingBytes {
    bytes: [u8; 4],
    len: usize,
}

impl LeadingBytes {
    fn from_buffer(data: &[u8]) -> Self {
        let len = data.len().min(4);
        let mut bytes = [0u8; 4];
        bytes[..len].copy_from_slice(&data[..len]);
        Self { bytes, len }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Lowercase hex with no separators, e.g. `00000000`.
    pub fn to_hex(&self) -> String {
        self.as_slice().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Unknown(LeadingBytes),
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Jpeg => write!(f, "JPEG"),
            ImageFormat::Png => write!(f, "PNG"),
            ImageFormat::WebP => write!(f, "WEBP"),
            ImageFormat::Gif => write!(f, "GIF"),
            ImageFormat::Unknown(leading) => {
                write!(f, "UNKNOWN (first 4 bytes: {})", leading.to_hex())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Format plus dimensions, when the format carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub dimensions: Option<Dimensions>,
}

pub fn detect_format(data: &[u8]) -> ImageFormat {
    match data {
        [0xFF, 0xD8, ..] => ImageFormat::Jpeg,
        _ if data.starts_with(&PNG_SIGNATURE) => ImageFormat::Png,
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => ImageFormat::WebP,
        [b'G', b'I', b'F', b'8' | b'9', ..] => ImageFormat::Gif,
        _ => ImageFormat::Unknown(LeadingBytes::from_buffer(data)),
    }
}

/// Start-of-frame markers. C4 (DHT), C8 (JPG) and CC (DAC) share the range
/// but carry no frame header.
fn is_start_of_frame(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn read_u16_be(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at.checked_add(2)?)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_u32_be(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Walks JPEG segments from just past SOI until a start-of-frame header.
///
/// Stops with `None` once fewer than nine bytes remain at the scan position
/// or a segment does not begin with `0xFF`.
pub fn jpeg_dimensions(data: &[u8]) -> Option<Dimensions> {
    let mut pos = 2usize;

    while pos.checked_add(8)? < data.len() {
        if data[pos] != 0xFF {
            break;
        }

        let marker = data[pos + 1];
        if is_start_of_frame(marker) {
            let height = read_u16_be(data, pos + 5)?;
            let width = read_u16_be(data, pos + 7)?;
            return Some(Dimensions {
                width: u32::from(width),
                height: u32::from(height),
            });
        }

        let length = usize::from(read_u16_be(data, pos + 2)?);
        pos = pos.checked_add(2 + length)?;
    }

    None
}

/// Reads width/height from the IHDR chunk, which PNG requires to come first.
pub fn png_dimensions(data: &[u8]) -> Option<Dimensions> {
    if data.len() < PNG_IHDR_END {
        return None;
    }

    Some(Dimensions {
        width: read_u32_be(data, 16)?,
        height: read_u32_be(data, 20)?,
    })
}

pub fn sniff(data: &[u8]) -> ImageInfo {
    let format = detect_format(data);
    let dimensions = match format {
        ImageFormat::Jpeg => jpeg_dimensions(data),
        ImageFormat::Png => png_dimensions(data),
        _ => None,
    };

    ImageInfo { format, dimensions }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_jpeg(marker: u8, width: u16, height: u16) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        // APP0 segment ahead of the frame header
        data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        data.extend_from_slice(b"JFIF\0");
        data.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
        data.extend_from_slice(&[0xFF, marker, 0x00, 0x11, 0x08]);
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
        data
    }

    fn synthetic_png(width: u32, height: u32) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data
    }

    #[test]
    fn test_detect_jpeg_with_any_trailer() {
        assert_eq!(detect_format(&[0xFF, 0xD8]), ImageFormat::Jpeg);
        assert_eq!(detect_format(&[0xFF, 0xD8, 0x00, 0x42]), ImageFormat::Jpeg);
    }

    #[test]
    fn test_detect_png() {
        assert_eq!(detect_format(&PNG_SIGNATURE), ImageFormat::Png);
        assert_eq!(detect_format(&synthetic_png(1, 1)), ImageFormat::Png);
    }

    #[test]
    fn test_truncated_png_signature_is_unknown() {
        assert!(matches!(
            detect_format(&PNG_SIGNATURE[..6]),
            ImageFormat::Unknown(_)
        ));
    }

    #[test]
    fn test_detect_webp() {
        assert_eq!(detect_format(b"RIFF\x10\x20\x30\x40WEBPVP8 "), ImageFormat::WebP);
    }

    #[test]
    fn test_riff_without_webp_is_unknown() {
        assert!(matches!(detect_format(b"RIFF\0\0\0\0WAVE"), ImageFormat::Unknown(_)));
        assert!(matches!(detect_format(b"RIFF\0\0\0\0WEB"), ImageFormat::Unknown(_)));
    }

    #[test]
    fn test_detect_gif() {
        assert_eq!(detect_format(b"GIF89a"), ImageFormat::Gif);
        assert_eq!(detect_format(b"GIF8"), ImageFormat::Gif);
        assert_eq!(detect_format(b"GIF9"), ImageFormat::Gif);
        assert!(matches!(detect_format(b"GIF7"), ImageFormat::Unknown(_)));
    }

    #[test]
    fn test_unknown_reports_leading_bytes() {
        let format = detect_format(&[0x00, 0x00, 0x00, 0x00]);
        assert_eq!(format.to_string(), "UNKNOWN (first 4 bytes: 00000000)");
        match format {
            ImageFormat::Unknown(leading) => assert_eq!(leading.to_hex(), "00000000"),
            other => panic!("expected unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_short_and_empty_buffers() {
        match detect_format(&[0xAB, 0xCD]) {
            ImageFormat::Unknown(leading) => assert_eq!(leading.as_slice(), &[0xAB, 0xCD]),
            other => panic!("expected unknown, got {:?}", other),
        }
        match detect_format(&[]) {
            ImageFormat::Unknown(leading) => assert_eq!(leading.to_hex(), ""),
            other => panic!("expected unknown, got {:?}", other),
        }
        // Lone 0xFF is not a JPEG SOI
        assert!(matches!(detect_format(&[0xFF]), ImageFormat::Unknown(_)));
    }

    #[test]
    fn test_jpeg_sof_directly_after_soi() {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11, 0x08];
        data.extend_from_slice(&1080u16.to_be_bytes());
        data.extend_from_slice(&1920u16.to_be_bytes());
        data.extend_from_slice(&[0x03, 0x01, 0x22, 0x00]);

        assert_eq!(
            jpeg_dimensions(&data),
            Some(Dimensions {
                width: 1920,
                height: 1080
            })
        );
    }

    #[test]
    fn test_jpeg_frame_header_at_exact_scan_boundary() {
        let data = [0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11, 0x08, 0x04, 0x38, 0x07, 0x80];

        assert_eq!(
            jpeg_dimensions(&data),
            Some(Dimensions {
                width: 1920,
                height: 1080
            })
        );
        // One byte short: pos + 8 == len, so the scan never starts.
        assert_eq!(jpeg_dimensions(&data[..10]), None);
    }

    #[test]
    fn test_jpeg_skips_segments_before_frame() {
        let data = synthetic_jpeg(0xC2, 640, 480);
        assert_eq!(
            jpeg_dimensions(&data),
            Some(Dimensions {
                width: 640,
                height: 480
            })
        );
    }

    #[test]
    fn test_jpeg_excluded_markers_are_skipped() {
        for marker in [0xC4, 0xC8, 0xCC] {
            let mut data = vec![0xFF, 0xD8, 0xFF, marker, 0x00, 0x04, 0x00, 0x00];
            data.extend_from_slice(&[0xFF, 0xC1, 0x00, 0x11, 0x08, 0x00, 0x20, 0x00, 0x40]);
            data.extend_from_slice(&[0x00; 8]);
            assert_eq!(
                jpeg_dimensions(&data),
                Some(Dimensions {
                    width: 64,
                    height: 32
                }),
                "marker {:02X} should be skipped",
                marker
            );
        }
    }

    #[test]
    fn test_jpeg_without_frame_is_not_found() {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&[0xFF, 0xE1, 0x00, 0x08, 0, 0, 0, 0, 0, 0]);
        data.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x04, 0, 0]);
        assert_eq!(jpeg_dimensions(&data), None);
    }

    #[test]
    fn test_jpeg_stops_on_missing_marker_prefix() {
        let mut data = vec![0xFF, 0xD8, 0x00, 0xC0];
        data.extend_from_slice(&[0x00; 16]);
        assert_eq!(jpeg_dimensions(&data), None);
    }

    #[test]
    fn test_jpeg_tolerates_short_and_foreign_buffers() {
        assert_eq!(jpeg_dimensions(&[]), None);
        assert_eq!(jpeg_dimensions(&[0xFF, 0xD8]), None);
        assert_eq!(jpeg_dimensions(&[0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11]), None);
        assert_eq!(jpeg_dimensions(&synthetic_png(10, 10)), None);
    }

    #[test]
    fn test_jpeg_segment_length_past_end() {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0xFF, 0xFF];
        data.extend_from_slice(&[0x00; 16]);
        assert_eq!(jpeg_dimensions(&data), None);
    }

    #[test]
    fn test_png_dimensions() {
        let data = synthetic_png(300, 200);
        assert_eq!(data.len(), 24);
        assert_eq!(
            png_dimensions(&data),
            Some(Dimensions {
                width: 300,
                height: 200
            })
        );
    }

    #[test]
    fn test_png_too_short() {
        assert_eq!(png_dimensions(&synthetic_png(300, 200)[..10]), None);
        assert_eq!(png_dimensions(&synthetic_png(300, 200)[..23]), None);
        assert_eq!(png_dimensions(&[]), None);
    }

    #[test]
    fn test_sniff_combines_format_and_dimensions() {
        let info = sniff(&synthetic_jpeg(0xC0, 300, 300));
        assert_eq!(info.format, ImageFormat::Jpeg);
        assert_eq!(info.dimensions.map(|d| d.to_string()).as_deref(), Some("300x300"));

        let info = sniff(b"GIF89a\x01\x00\x01\x00");
        assert_eq!(info.format, ImageFormat::Gif);
        assert_eq!(info.dimensions, None);
    }

    #[test]
    fn test_repeated_calls_agree() {
        let data = synthetic_jpeg(0xC0, 1920, 1080);
        assert_eq!(sniff(&data), sniff(&data));
        assert_eq!(detect_format(&data), detect_format(&data));
        assert_eq!(jpeg_dimensions(&data), jpeg_dimensions(&data));
    }

    #[test]
    fn test_every_prefix_is_handled() {
        let data = synthetic_jpeg(0xC0, 1920, 1080);
        for end in 0..=data.len() {
            let _ = sniff(&data[..end]);
        }
        let png = synthetic_png(300, 200);
        for end in 0..=png.len() {
            let _ = sniff(&png[..end]);
        }
    }
}
