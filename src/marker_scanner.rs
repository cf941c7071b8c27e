//! Start-of-frame precision scanner.
//!
//! Walks the marker segments of a single compressed frame and returns the
//! sample precision (P) declared by its SOF segment. The container's Bits
//! Stored attribute is not always trustworthy for encapsulated data, so the
//! decode path uses this value to pick the codec.

use crate::error::{DicomCodecError, Result};
use crate::jpeg_marker_code::{
    JPEG_MARKER_START_BYTE, JPEG_RESERVED_MARKER_FIRST, JPEG_RESERVED_MARKER_LAST,
    JpegMarkerCode,
};
use tracing::trace;

/// Forward-only big-endian cursor over a compressed frame.
struct MarkerCursor<'a> {
    source: &'a [u8],
    position: usize,
}

impl<'a> MarkerCursor<'a> {
    fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.position >= self.source.len()
    }

    fn truncated(&self, marker: u16) -> DicomCodecError {
        DicomCodecError::Syntax {
            offset: self.position,
            marker,
        }
    }

    fn read_u8(&mut self, marker: u16) -> Result<u8> {
        let value = *self
            .source
            .get(self.position)
            .ok_or_else(|| self.truncated(marker))?;
        self.position += 1;
        Ok(value)
    }

    fn read_u16(&mut self, marker: u16) -> Result<u16> {
        let b1 = self.read_u8(marker)? as u16;
        let b2 = self.read_u8(marker)? as u16;
        Ok((b1 << 8) | b2)
    }

    /// Skips `count` bytes, refusing to move past the end of the buffer.
    fn skip(&mut self, count: usize, marker: u16) -> Result<()> {
        let end = self
            .position
            .checked_add(count)
            .filter(|&end| end <= self.source.len())
            .ok_or_else(|| self.truncated(marker))?;
        self.position = end;
        Ok(())
    }
}

/// Returns the precision byte of the first SOF_n segment in `buffer`.
///
/// Fails with [`DicomCodecError::Syntax`] on an unrecognized marker or a
/// segment that does not fit in the buffer, and with
/// [`DicomCodecError::NotFound`] when the buffer ends without any SOF_n.
pub fn scan_for_precision(buffer: &[u8]) -> Result<u8> {
    let mut cursor = MarkerCursor::new(buffer);

    while !cursor.at_end() {
        let offset = cursor.position;
        let tag = cursor.read_u16(0)?;
        let [b1, b2] = tag.to_be_bytes();

        let marker = if b1 == JPEG_MARKER_START_BYTE {
            JpegMarkerCode::try_from(b2).ok()
        } else {
            None
        };

        match marker {
            Some(marker) if marker.is_start_of_frame() => {
                cursor.skip(2, tag)?;
                let precision = cursor.read_u8(tag)?;
                trace!(offset, ?marker, precision, "start of frame found");
                return Ok(precision);
            }
            Some(marker) if marker.is_standalone() => {}
            Some(_) => {
                let length = cursor.read_u16(tag)? as usize;
                if length < 2 {
                    return Err(DicomCodecError::Syntax {
                        offset,
                        marker: tag,
                    });
                }
                cursor.skip(length - 2, tag)?;
            }
            None => {
                if b1 == JPEG_MARKER_START_BYTE
                    && (JPEG_RESERVED_MARKER_FIRST..=JPEG_RESERVED_MARKER_LAST).contains(&b2)
                {
                    continue;
                }
                return Err(DicomCodecError::Syntax {
                    offset,
                    marker: tag,
                });
            }
        }
    }

    Err(DicomCodecError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jfif_app0() -> Vec<u8> {
        let mut segment = vec![0xFF, 0xE0, 0x00, 0x10];
        segment.extend_from_slice(b"JFIF\0");
        segment.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
        segment
    }

    #[test]
    fn precision_after_app0() {
        let mut data = vec![0xFF, 0xD8];
        data.extend(jfif_app0());
        data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x10, 0x00, 0x10, 0x03]);
        data.extend_from_slice(&[0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
        data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08]);
        assert_eq!(scan_for_precision(&data).unwrap(), 0x08);
    }

    #[test]
    fn lossless_sixteen_bit() {
        let data = [
            0xFF, 0xD8, 0xFF, 0xFE, 0x00, 0x04, b'h', b'i', 0xFF, 0xC3, 0x00, 0x0B, 0x10, 0x00,
            0x01, 0x00, 0x01, 0x01, 0x01, 0x11, 0x00,
        ];
        assert_eq!(scan_for_precision(&data).unwrap(), 16);
    }

    #[test]
    fn stops_at_first_start_of_frame() {
        let data = [
            0xFF, 0xD8, 0xFF, 0xC1, 0x00, 0x08, 0x0C, 0xFF, 0xC0, 0x00, 0x08, 0x08,
        ];
        assert_eq!(scan_for_precision(&data).unwrap(), 12);
    }

    #[test]
    fn only_headers_is_not_found() {
        let mut data = vec![0xFF, 0xD8];
        data.extend(jfif_app0());
        data.extend_from_slice(&[0xFF, 0xFE, 0x00, 0x02, 0xFF, 0xD9]);
        assert!(matches!(
            scan_for_precision(&data),
            Err(DicomCodecError::NotFound)
        ));
    }

    #[test]
    fn empty_buffer_is_not_found() {
        assert!(matches!(scan_for_precision(&[]), Err(DicomCodecError::NotFound)));
    }

    #[test]
    fn segment_longer_than_buffer() {
        let data = [0xFF, 0xD8, 0xFF, 0xE1, 0x01, 0x00, 0x00, 0x00];
        assert!(matches!(
            scan_for_precision(&data),
            Err(DicomCodecError::Syntax { marker: 0xFFE1, .. })
        ));
    }

    #[test]
    fn truncated_start_of_frame() {
        let data = [0xFF, 0xD8, 0xFF, 0xC0, 0x00];
        assert!(matches!(
            scan_for_precision(&data),
            Err(DicomCodecError::Syntax { marker: 0xFFC0, .. })
        ));
    }

    #[test]
    fn length_below_two_is_rejected() {
        let data = [0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x01, 0xFF, 0xC0, 0x00, 0x08, 0x08];
        assert!(matches!(
            scan_for_precision(&data),
            Err(DicomCodecError::Syntax { offset: 2, .. })
        ));
    }

    #[test]
    fn reserved_and_standalone_markers_are_skipped() {
        let data = [
            0xFF, 0xD8, 0xFF, 0x01, 0xFF, 0x10, 0xFF, 0xD3, 0xFF, 0xC3, 0x00, 0x08, 0x0C,
        ];
        assert_eq!(scan_for_precision(&data).unwrap(), 12);
    }

    #[test]
    fn non_marker_bytes_are_a_syntax_error() {
        let data = [0xFF, 0xD8, 0x12, 0x34];
        assert!(matches!(
            scan_for_precision(&data),
            Err(DicomCodecError::Syntax {
                offset: 2,
                marker: 0x1234
            })
        ));
        let fill = [0xFF, 0xD8, 0xFF, 0x02];
        assert!(matches!(
            scan_for_precision(&fill),
            Err(DicomCodecError::Syntax { .. })
        ));
    }

    #[test]
    fn odd_trailing_byte_is_a_syntax_error() {
        let data = [0xFF, 0xD8, 0xFF];
        assert!(matches!(
            scan_for_precision(&data),
            Err(DicomCodecError::Syntax { .. })
        ));
    }
}
