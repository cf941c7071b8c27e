//! Pixel-data container: image description, codec bookkeeping attributes
//! and per-frame byte buffers.

use crate::error::{DicomCodecError, Result};
use crate::photometric::{LossyCompressionMethod, PhotometricInterpretation};
use crate::transfer_syntax::TransferSyntax;

#[derive(Debug, Clone, PartialEq)]
pub struct PixelData {
    pub transfer_syntax: TransferSyntax,
    pub rows: u16,
    pub columns: u16,
    pub bits_allocated: u16,
    pub bits_stored: u16,
    pub high_bit: u16,
    pub samples_per_pixel: u16,
    /// 0 = unsigned, 1 = two's complement
    pub pixel_representation: u16,
    /// 0 = color-by-pixel, 1 = color-by-plane
    pub planar_configuration: u16,
    pub photometric_interpretation: PhotometricInterpretation,
    pub is_lossy: bool,
    pub lossy_compression_method: Option<LossyCompressionMethod>,
    /// Decimal string with three fractional digits, e.g. `"12.345"`.
    pub lossy_compression_ratio: Option<String>,
    frames: Vec<Vec<u8>>,
}

impl PixelData {
    /// Unsigned, color-by-pixel native pixel data without frames.
    pub fn new(
        transfer_syntax: TransferSyntax,
        rows: u16,
        columns: u16,
        bits_allocated: u16,
        bits_stored: u16,
        samples_per_pixel: u16,
        photometric_interpretation: PhotometricInterpretation,
    ) -> Self {
        Self {
            transfer_syntax,
            rows,
            columns,
            bits_allocated,
            bits_stored,
            high_bit: bits_stored.saturating_sub(1),
            samples_per_pixel,
            pixel_representation: 0,
            planar_configuration: 0,
            photometric_interpretation,
            is_lossy: false,
            lossy_compression_method: None,
            lossy_compression_ratio: None,
            frames: Vec::new(),
        }
    }

    /// An empty container in `transfer_syntax` describing the same image as `old`.
    pub fn derived(transfer_syntax: TransferSyntax, old: &PixelData) -> Self {
        Self {
            transfer_syntax,
            frames: Vec::new(),
            ..old.clone()
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, frame: usize) -> Result<&[u8]> {
        self.frames
            .get(frame)
            .map(Vec::as_slice)
            .ok_or(DicomCodecError::FrameOutOfRange {
                frame,
                count: self.frames.len(),
            })
    }

    /// Byte size of a frame as stored: the uncompressed size for native data,
    /// the fragment length for encapsulated data.
    pub fn frame_size(&self, frame: usize) -> Result<usize> {
        if self.transfer_syntax.is_encapsulated() {
            self.frame(frame).map(<[u8]>::len)
        } else {
            self.frame(frame)?;
            Ok(self.uncompressed_frame_size())
        }
    }

    /// Appends a frame. Encapsulated fragments are padded to an even length
    /// (PS3.5 A.4).
    pub fn add_frame(&mut self, mut data: Vec<u8>) {
        if self.transfer_syntax.is_encapsulated() && data.len() % 2 == 1 {
            data.push(0);
        }
        self.frames.push(data);
    }

    pub fn bytes_allocated(&self) -> usize {
        if self.bits_allocated > 8 { 2 } else { 1 }
    }

    pub fn is_signed(&self) -> bool {
        self.pixel_representation == 1
    }

    pub fn is_planar(&self) -> bool {
        self.planar_configuration == 1
    }

    pub fn pixel_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    pub fn uncompressed_frame_size(&self) -> usize {
        self.pixel_count() * self.samples_per_pixel as usize * self.bytes_allocated()
    }

    fn sample_mask(&self) -> u16 {
        match self.bits_stored {
            0 | 16.. => u16::MAX,
            bits => (1u16 << bits) - 1,
        }
    }

    /// Splits a native frame into one plane of samples per component,
    /// each masked to Bits Stored.
    pub fn frame_planes(&self, frame: usize) -> Result<Vec<Vec<u16>>> {
        let data = self.frame(frame)?;
        let expected = self.uncompressed_frame_size();
        if data.len() < expected {
            return Err(DicomCodecError::InvalidFrameSize {
                frame,
                expected,
                actual: data.len(),
            });
        }

        let pixels = self.pixel_count();
        let components = self.samples_per_pixel as usize;
        let bytes = self.bytes_allocated();
        let mask = self.sample_mask();
        let read_sample = |index: usize| -> u16 {
            let value = if bytes == 2 {
                u16::from_le_bytes([data[index * 2], data[index * 2 + 1]])
            } else {
                data[index] as u16
            };
            value & mask
        };

        let planes = (0..components)
            .map(|c| {
                (0..pixels)
                    .map(|p| {
                        if self.is_planar() {
                            read_sample(c * pixels + p)
                        } else {
                            read_sample(p * components + c)
                        }
                    })
                    .collect()
            })
            .collect();
        Ok(planes)
    }

    /// Packs component planes into a native frame using this container's
    /// allocation, planar configuration and pixel representation.
    pub fn pack_planes(&self, planes: &[Vec<u16>]) -> Vec<u8> {
        let pixels = self.pixel_count();
        let components = planes.len();
        let bytes = self.bytes_allocated();
        let mut data = vec![0u8; pixels * components * bytes];

        for (c, plane) in planes.iter().enumerate() {
            for (p, &sample) in plane.iter().take(pixels).enumerate() {
                let index = if self.is_planar() {
                    c * pixels + p
                } else {
                    p * components + c
                };
                let value = self.extend_sign(sample);
                if bytes == 2 {
                    data[index * 2..index * 2 + 2].copy_from_slice(&value.to_le_bytes());
                } else {
                    data[index] = value as u8;
                }
            }
        }
        data
    }

    fn extend_sign(&self, sample: u16) -> u16 {
        let bits = self.bits_stored;
        let allocated = (self.bytes_allocated() * 8) as u16;
        if !self.is_signed() || bits == 0 || bits >= allocated {
            return sample;
        }
        let sign_bit = 1u16 << (bits - 1);
        if sample & sign_bit != 0 {
            let fill = if allocated == 16 { u16::MAX } else { 0x00FF };
            sample | (fill & !self.sample_mask())
        } else {
            sample
        }
    }

    pub(crate) fn set_frames(&mut self, frames: Vec<Vec<u8>>) {
        self.frames.clear();
        for frame in frames {
            self.add_frame(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_2x1() -> PixelData {
        let mut pixel_data = PixelData::new(
            TransferSyntax::ExplicitVrLittleEndian,
            1,
            2,
            8,
            8,
            3,
            PhotometricInterpretation::Rgb,
        );
        pixel_data.add_frame(vec![1, 2, 3, 4, 5, 6]);
        pixel_data
    }

    #[test]
    fn interleaved_planes() {
        let pixel_data = rgb_2x1();
        let planes = pixel_data.frame_planes(0).unwrap();
        assert_eq!(planes, vec![vec![1, 4], vec![2, 5], vec![3, 6]]);
        assert_eq!(pixel_data.pack_planes(&planes), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn planar_configuration_one() {
        let mut pixel_data = rgb_2x1();
        pixel_data.planar_configuration = 1;
        let planes = pixel_data.frame_planes(0).unwrap();
        assert_eq!(planes, vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
    }

    #[test]
    fn sixteen_bit_masked_and_sign_extended() {
        let mut pixel_data = PixelData::new(
            TransferSyntax::ExplicitVrLittleEndian,
            1,
            2,
            16,
            12,
            1,
            PhotometricInterpretation::Monochrome2,
        );
        pixel_data.pixel_representation = 1;
        // -1 and 0x0123 as 16-bit words
        pixel_data.add_frame(vec![0xFF, 0xFF, 0x23, 0x01]);
        let planes = pixel_data.frame_planes(0).unwrap();
        assert_eq!(planes, vec![vec![0x0FFF, 0x0123]]);
        assert_eq!(pixel_data.pack_planes(&planes), vec![0xFF, 0xFF, 0x23, 0x01]);
    }

    #[test]
    fn short_frame_is_rejected() {
        let mut pixel_data = rgb_2x1();
        pixel_data.add_frame(vec![0; 5]);
        assert!(matches!(
            pixel_data.frame_planes(1),
            Err(DicomCodecError::InvalidFrameSize {
                frame: 1,
                expected: 6,
                actual: 5
            })
        ));
    }

    #[test]
    fn frame_sizes() {
        let native = rgb_2x1();
        assert_eq!(native.frame_size(0).unwrap(), 6);
        assert!(matches!(
            native.frame_size(3),
            Err(DicomCodecError::FrameOutOfRange { frame: 3, count: 1 })
        ));

        let mut encapsulated = PixelData::derived(TransferSyntax::JpegProcess1, &native);
        assert_eq!(encapsulated.frame_count(), 0);
        encapsulated.add_frame(vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(encapsulated.frame_size(0).unwrap(), 4);
    }
}
