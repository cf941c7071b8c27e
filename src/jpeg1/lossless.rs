//! JPEG Lossless (Process 14) implementation (ISO/IEC 10918-1 Annex H).
//!
//! Differences are coded modulo 2^16 with a DC-class Huffman table; the
//! encoder writes one scan per component, each with its own optimized table.

use crate::error::{DicomCodecError, Result};
use crate::jpeg_marker_code::JpegMarkerCode;
use crate::jpeg_stream_reader::{JpegComponent, JpegStreamReader};
use crate::jpeg_stream_writer::{JpegStreamWriter, TableClass};
use crate::jpeg1::huffman::{
    EntropyToken, HuffmanEncoder, HuffmanTable, JpegBitReader, count_frequencies, write_entropy_tokens,
};
use crate::FrameInfo;
use tracing::{debug, trace};

/// JPEG Lossless predictor functions (Table H.1).
/// Ra is the sample to the left, Rb is the sample above, Rc is the sample to the upper-left.
pub struct LosslessPredictor;

impl LosslessPredictor {
    /// Predicts the value based on the selection value (SV/Predictor ID).
    pub fn predict(sv: u8, ra: i32, rb: i32, rc: i32) -> i32 {
        match sv {
            1 => ra,                    // A
            2 => rb,                    // B
            3 => rc,                    // C
            4 => ra + rb - rc,          // A + B - C
            5 => ra + ((rb - rc) >> 1), // A + (B - C) / 2
            6 => rb + ((ra - rc) >> 1), // B + (A - C) / 2
            7 => (ra + rb) >> 1,        // (A + B) / 2
            _ => 0,
        }
    }
}

/// Prediction context for one component plane.
struct Predictor<'a> {
    samples: &'a [i32],
    width: usize,
    selection_value: u8,
    initial: i32,
}

impl Predictor<'_> {
    /// Px for the sample at (x, y). `first_line` marks the first line of the
    /// scan or of a restart interval (H.1.2.1).
    fn predict(&self, x: usize, y: usize, first_line: bool) -> i32 {
        let index = y * self.width + x;
        match (x, first_line) {
            (0, true) => self.initial,
            (_, true) => self.samples[index - 1],
            (0, false) => self.samples[index - self.width],
            _ => LosslessPredictor::predict(
                self.selection_value,
                self.samples[index - 1],
                self.samples[index - self.width],
                self.samples[index - self.width - 1],
            ),
        }
    }
}

/// Reduces a difference modulo 2^16 into -32767..=32768.
fn wrap_difference(difference: i32) -> i32 {
    let wrapped = difference.rem_euclid(1 << 16);
    if wrapped > 32768 { wrapped - (1 << 16) } else { wrapped }
}

fn is_first_line(y: usize, width: usize, restart_interval: usize) -> bool {
    y == 0 || (restart_interval > 0 && (y * width) % restart_interval == 0)
}

pub struct Jpeg1LosslessEncoder {
    precision: u8,
    predictor: u8,
    point_transform: u8,
    restart_interval: u16,
}

impl Jpeg1LosslessEncoder {
    pub fn new(precision: u8, predictor: u8) -> Self {
        Self {
            precision,
            predictor,
            point_transform: 0,
            restart_interval: 0,
        }
    }

    pub fn set_point_transform(&mut self, point_transform: u8) {
        self.point_transform = point_transform;
    }

    /// Interval in samples; rounded up to whole lines when encoding.
    pub fn set_restart_interval(&mut self, interval: u16) {
        self.restart_interval = interval;
    }

    fn line_aligned_restart_interval(&self, width: usize) -> usize {
        let requested = self.restart_interval as usize;
        if requested == 0 {
            return 0;
        }
        let max_lines = (u16::MAX as usize / width).max(1);
        let lines = requested.div_ceil(width).min(max_lines);
        if lines * width != requested {
            debug!(requested, aligned = lines * width, "restart interval aligned to lines");
        }
        lines * width
    }

    pub fn encode(&self, planes: &[Vec<u16>], width: usize, height: usize) -> Result<Vec<u8>> {
        if !(2..=16).contains(&self.precision) {
            return Err(DicomCodecError::ParameterValueNotSupported("lossless sample precision"));
        }
        if !(1..=7).contains(&self.predictor) {
            return Err(DicomCodecError::ParameterValueNotSupported("lossless predictor"));
        }
        if self.point_transform >= self.precision {
            return Err(DicomCodecError::ParameterValueNotSupported("point transform"));
        }
        if planes.is_empty() || planes.len() > 4 {
            return Err(DicomCodecError::ParameterValueNotSupported("lossless component count"));
        }
        if width == 0 || height == 0 || planes.iter().any(|p| p.len() < width * height) {
            return Err(DicomCodecError::InvalidData("plane smaller than image"));
        }

        let restart_interval = self.line_aligned_restart_interval(width);
        let components: Vec<JpegComponent> = (0..planes.len())
            .map(|i| JpegComponent {
                id: (i + 1) as u8,
                h_samp_factor: 1,
                v_samp_factor: 1,
                ..Default::default()
            })
            .collect();
        let frame_info = FrameInfo {
            width: width as u32,
            height: height as u32,
            bits_per_sample: self.precision,
            component_count: planes.len() as u8,
        };

        let mut writer = JpegStreamWriter::new();
        writer.write_start_of_image();
        writer.write_start_of_frame(JpegMarkerCode::StartOfFrameLossless, &frame_info, &components)?;
        if restart_interval > 0 {
            writer.write_dri(restart_interval as u16)?;
        }

        for (component, plane) in components.iter().zip(planes) {
            let tokens = self.tokenize(plane, width, height, restart_interval);
            let table = HuffmanTable::optimized(&count_frequencies(&tokens, TableClass::Dc, 0))?;
            writer.write_dht(TableClass::Dc, 0, &table)?;
            writer.write_start_of_scan(&[component], self.predictor, 0, self.point_transform)?;
            write_entropy_tokens(&mut writer, &tokens, std::slice::from_ref(&table), &[])?;
        }
        writer.write_end_of_image();
        Ok(writer.into_inner())
    }

    fn tokenize(&self, plane: &[u16], width: usize, height: usize, restart_interval: usize) -> Vec<EntropyToken> {
        let samples: Vec<i32> = plane[..width * height]
            .iter()
            .map(|&s| (s >> self.point_transform) as i32)
            .collect();
        let predictor = Predictor {
            samples: &samples,
            width,
            selection_value: self.predictor,
            initial: 1 << (self.precision - self.point_transform - 1),
        };

        let mut tokens = Vec::with_capacity(samples.len());
        for y in 0..height {
            let first_line = is_first_line(y, width, restart_interval);
            if y > 0 && first_line {
                tokens.push(EntropyToken::Restart(JpegMarkerCode::restart(y * width / restart_interval - 1)));
            }
            for x in 0..width {
                let prediction = predictor.predict(x, y, first_line);
                let difference = wrap_difference(samples[y * width + x] - prediction);
                tokens.push(EntropyToken::difference(0, difference));
            }
        }
        tokens
    }
}

pub struct Jpeg1LosslessDecoder;

impl Jpeg1LosslessDecoder {
    /// Decodes all scans of a lossless frame whose header has been read.
    pub fn decode(reader: &mut JpegStreamReader) -> Result<Vec<Vec<u16>>> {
        let frame_info = reader.frame_info();
        let precision = frame_info.bits_per_sample;
        if !(2..=16).contains(&precision) {
            return Err(DicomCodecError::InvalidData("lossless sample precision"));
        }
        if reader.components.iter().any(|c| c.h_samp_factor != 1 || c.v_samp_factor != 1) {
            return Err(DicomCodecError::ParameterValueNotSupported("subsampled lossless frame"));
        }
        let width = frame_info.width as usize;
        let height = frame_info.height as usize;
        let mut planes = vec![vec![0i32; width * height]; reader.components.len()];
        let mut output = vec![vec![0u16; width * height]; reader.components.len()];

        loop {
            let scan = reader.scan.clone();
            let predictor = scan.spectral_start;
            let point_transform = scan.successive_low;
            if !(1..=7).contains(&predictor) || point_transform >= precision {
                return Err(DicomCodecError::InvalidData("bad lossless scan parameters"));
            }
            let restart_interval = reader.restart_interval as usize;
            if restart_interval % width != 0 {
                return Err(DicomCodecError::ParameterValueNotSupported("restart interval not aligned to lines"));
            }
            trace!(components = ?scan.component_indices, predictor, point_transform, "lossless scan");

            let tables = scan
                .component_indices
                .iter()
                .map(|&index| {
                    let destination = reader.components[index].dc_table_dest as usize;
                    reader.huffman_tables_dc[destination]
                        .clone()
                        .ok_or(DicomCodecError::InvalidData("Huffman table missing"))
                })
                .collect::<Result<Vec<_>>>()?;

            let mut bit_reader = JpegBitReader::new(reader.remaining_data());
            let initial = 1 << (precision - point_transform - 1);
            let mask = ((1u32 << precision) - 1) as u16;

            for y in 0..height {
                let first_line = is_first_line(y, width, restart_interval);
                if y > 0 && first_line {
                    bit_reader.restart(JpegMarkerCode::restart(y * width / restart_interval - 1))?;
                }
                for x in 0..width {
                    for (&index, table) in scan.component_indices.iter().zip(&tables) {
                        let category = table.decode(&mut bit_reader)?;
                        if category > 16 {
                            return Err(DicomCodecError::InvalidData("bad difference category"));
                        }
                        let difference = HuffmanEncoder::receive_extend(&mut bit_reader, category)?;
                        let prediction = Predictor {
                            samples: &planes[index],
                            width,
                            selection_value: predictor,
                            initial,
                        }
                        .predict(x, y, first_line);

                        let value = (prediction + difference).rem_euclid(1 << 16);
                        planes[index][y * width + x] = value;
                        output[index][y * width + x] = ((value as u32) << point_transform) as u16 & mask;
                    }
                }
            }

            reader.advance(bit_reader.position());
            if !reader.read_next_scan()? {
                break;
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg1::decoder::Jpeg1Decoder;

    fn decode(encoded: &[u8]) -> Vec<Vec<u16>> {
        let mut decoder = Jpeg1Decoder::new(encoded);
        decoder.read_header().unwrap();
        assert!(decoder.is_lossless());
        decoder.decode().unwrap()
    }

    fn noise(len: usize, max: u16) -> Vec<u16> {
        let mut state = 0x1234_5678u32;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                ((state >> 8) % (max as u32 + 1)) as u16
            })
            .collect()
    }

    #[test]
    fn test_lossless_predictors() {
        assert_eq!(LosslessPredictor::predict(1, 100, 200, 50), 100); // Ra
        assert_eq!(LosslessPredictor::predict(2, 100, 200, 50), 200); // Rb
        assert_eq!(LosslessPredictor::predict(3, 100, 200, 50), 50); // Rc
        assert_eq!(LosslessPredictor::predict(4, 100, 200, 50), 250); // Ra + Rb - Rc
        assert_eq!(LosslessPredictor::predict(5, 100, 200, 50), 175);
        assert_eq!(LosslessPredictor::predict(6, 100, 200, 50), 225);
        assert_eq!(LosslessPredictor::predict(7, 100, 200, 50), 150); // (Ra + Rb) / 2
    }

    #[test]
    fn test_decode_component_lossless() -> Result<()> {
        // 2x2 image, 8 bits, predictor 1. Pixels [128, 130] / [128, 132].
        // Differences 0, 2, 0, 4 with categories 0, 2, 0, 3.
        let mut lengths = [0u8; 16];
        lengths[0] = 1; // code 0 for cat 0
        lengths[1] = 1; // code 10 for cat 2
        lengths[2] = 1; // code 110 for cat 3
        let table = HuffmanTable::build_from_dht(&lengths, &[0, 2, 3])?;

        let mut data = vec![
            0xFF, 0xD8, // SOI
            0xFF, 0xC3, 0x00, 0x0B, 0x08, 0x00, 0x02, 0x00, 0x02, 0x01, 0x01, 0x11, 0x00, // SOF3
            0xFF, 0xC4, 0x00, 0x16, 0x00, // DHT
        ];
        data.extend_from_slice(&table.lengths);
        data.extend_from_slice(&table.values);
        data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x01, 0x00, 0x00]); // SOS
        // Bits: 0 10 10 0 110 100 -> 0101 0011 0100 -> 0x53 0x40 (padded with ones)
        data.extend_from_slice(&[0x53, 0x4F, 0xFF, 0xD9]);

        assert_eq!(decode(&data), vec![vec![128, 130, 128, 132]]);
        Ok(())
    }

    #[test]
    fn sixteen_bit_roundtrip_all_predictors() {
        let (width, height) = (13, 7);
        let source = noise(width * height, u16::MAX);
        for predictor in 1..=7 {
            let encoder = Jpeg1LosslessEncoder::new(16, predictor);
            let encoded = encoder.encode(&[source.clone()], width, height).unwrap();
            assert_eq!(decode(&encoded), vec![source.clone()], "predictor {predictor}");
        }
    }

    #[test]
    fn extreme_differences_use_category_16() {
        // 0 -> 32768 -> 0 hits the 32768 difference both ways.
        let source = vec![0u16, 32768, 0, 65535, 1, 32767];
        let encoder = Jpeg1LosslessEncoder::new(16, 1);
        let encoded = encoder.encode(&[source.clone()], 6, 1).unwrap();
        assert_eq!(decode(&encoded), vec![source]);
    }

    #[test]
    fn three_components_with_restarts() {
        let (width, height) = (9, 10);
        let planes: Vec<Vec<u16>> = (0..3).map(|c| noise(width * height, 255 >> c)).collect();
        let mut encoder = Jpeg1LosslessEncoder::new(8, 4);
        encoder.set_restart_interval(20);
        let encoded = encoder.encode(&planes, width, height).unwrap();

        // 20 samples round up to 3 lines of 9
        assert!(encoded.windows(6).any(|w| w == [0xFF, 0xDD, 0x00, 0x04, 0x00, 27]));
        assert_eq!(encoded.windows(2).filter(|w| *w == [0xFF, 0xDA]).count(), 3);
        assert_eq!(decode(&encoded), planes);
    }

    #[test]
    fn point_transform_drops_low_bits() {
        let source = vec![0x0FFFu16, 0x0123, 0x0800, 0x0001];
        let mut encoder = Jpeg1LosslessEncoder::new(12, 1);
        encoder.set_point_transform(2);
        let encoded = encoder.encode(&[source], 2, 2).unwrap();
        assert_eq!(decode(&encoded), vec![vec![0x0FFC, 0x0120, 0x0800, 0x0000]]);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(Jpeg1LosslessEncoder::new(1, 1).encode(&[vec![0; 4]], 2, 2).is_err());
        assert!(Jpeg1LosslessEncoder::new(8, 0).encode(&[vec![0; 4]], 2, 2).is_err());
        assert!(Jpeg1LosslessEncoder::new(8, 8).encode(&[vec![0; 4]], 2, 2).is_err());
    }
}
