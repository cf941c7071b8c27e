//! Sequential DCT-based encoder (Huffman coded, 8-bit baseline or 8/12-bit extended).

use crate::error::{DicomCodecError, Result};
use crate::jpeg_marker_code::JpegMarkerCode;
use crate::jpeg_stream_reader::JpegComponent;
use crate::jpeg_stream_writer::{JpegStreamWriter, TableClass};
use crate::jpeg1::dct::{BLOCK_DIM, BLOCK_SIZE, fdct_8x8};
use crate::jpeg1::huffman::{EntropyToken, HuffmanTable, count_frequencies, write_entropy_tokens};
use crate::jpeg1::quantization::{
    QuantizationTable, STD_CHROMINANCE_QUANT_TABLE, STD_LUMINANCE_QUANT_TABLE, ZIGZAG_ORDER,
    get_scaled_quant_table, quantize_block,
};
use crate::FrameInfo;

pub struct Jpeg1Encoder {
    precision: u8,
    quality: u8,
    luma_horizontal: u8,
    restart_interval: u16,
    extended: bool,
}

/// Image geometry shared by the block walkers.
struct ComponentGrid<'a> {
    plane: &'a [u16],
    width: usize,
    height: usize,
    /// Horizontal subsampling ratio against the widest component.
    ratio: usize,
}

impl ComponentGrid<'_> {
    fn component_width(&self) -> usize {
        self.width.div_ceil(self.ratio)
    }

    /// Sample at component coordinates, replicating the right and bottom edges.
    fn sample(&self, x: usize, y: usize) -> f32 {
        let x = x.min(self.component_width() - 1);
        let y = y.min(self.height - 1);
        let row = &self.plane[y * self.width..(y + 1) * self.width];
        let first = x * self.ratio;
        let last = (first + self.ratio).min(self.width);
        let sum: u32 = row[first..last].iter().map(|&s| s as u32).sum();
        sum as f32 / (last - first) as f32
    }
}

impl Jpeg1Encoder {
    pub fn new(precision: u8) -> Self {
        Self {
            precision,
            quality: 90,
            luma_horizontal: 1,
            restart_interval: 0,
            extended: precision != 8,
        }
    }

    pub fn set_quality(&mut self, quality: u8) {
        self.quality = quality;
    }

    /// 2 selects 4:2:2 for three-component images.
    pub fn set_luma_horizontal_sampling(&mut self, factor: u8) {
        self.luma_horizontal = factor;
    }

    pub fn set_restart_interval(&mut self, interval: u16) {
        self.restart_interval = interval;
    }

    /// Extended frames (SOF1) use optimized Huffman tables; baseline frames
    /// (SOF0) use the tables of Annex K.
    pub fn set_extended(&mut self, extended: bool) {
        self.extended = extended;
    }

    pub fn frame_marker(&self) -> JpegMarkerCode {
        if self.extended {
            JpegMarkerCode::StartOfFrameExtendedSequential
        } else {
            JpegMarkerCode::StartOfFrameBaseline
        }
    }

    fn components(&self, count: usize) -> Vec<JpegComponent> {
        (0..count)
            .map(|i| {
                let table = if i == 0 { 0 } else { 1 };
                JpegComponent {
                    id: (i + 1) as u8,
                    h_samp_factor: if i == 0 && count == 3 { self.luma_horizontal } else { 1 },
                    v_samp_factor: 1,
                    quant_table_dest: table,
                    dc_table_dest: table,
                    ac_table_dest: table,
                }
            })
            .collect()
    }

    /// Encodes component planes (unsigned samples of `precision` bits) into a
    /// complete JPEG stream.
    pub fn encode(&self, planes: &[Vec<u16>], width: usize, height: usize) -> Result<Vec<u8>> {
        if self.precision != 8 && (self.precision != 12 || !self.extended) {
            return Err(DicomCodecError::ParameterValueNotSupported("sequential sample precision"));
        }
        if planes.len() != 1 && planes.len() != 3 {
            return Err(DicomCodecError::ParameterValueNotSupported("sequential component count"));
        }
        if !(1..=2).contains(&self.luma_horizontal) {
            return Err(DicomCodecError::ParameterValueNotSupported("sampling factor"));
        }
        if width == 0 || height == 0 || planes.iter().any(|p| p.len() < width * height) {
            return Err(DicomCodecError::InvalidData("plane smaller than image"));
        }

        let components = self.components(planes.len());
        let quantization_tables = [
            get_scaled_quant_table(&STD_LUMINANCE_QUANT_TABLE, self.quality),
            get_scaled_quant_table(&STD_CHROMINANCE_QUANT_TABLE, self.quality),
        ];
        let table_count = if planes.len() == 1 { 1 } else { 2 };

        let tokens = self.tokenize(planes, width, height, &components, &quantization_tables);

        let (dc_tables, ac_tables) = if self.extended {
            let mut dc = Vec::with_capacity(table_count);
            let mut ac = Vec::with_capacity(table_count);
            for table in 0..table_count as u8 {
                dc.push(HuffmanTable::optimized(&count_frequencies(&tokens, TableClass::Dc, table))?);
                ac.push(HuffmanTable::optimized(&count_frequencies(&tokens, TableClass::Ac, table))?);
            }
            (dc, ac)
        } else {
            (
                vec![HuffmanTable::standard_luminance_dc(), HuffmanTable::standard_chrominance_dc()],
                vec![HuffmanTable::standard_luminance_ac(), HuffmanTable::standard_chrominance_ac()],
            )
        };

        let frame_info = FrameInfo {
            width: width as u32,
            height: height as u32,
            bits_per_sample: self.precision,
            component_count: planes.len() as u8,
        };

        let mut writer = JpegStreamWriter::new();
        writer.write_start_of_image();
        for (id, table) in quantization_tables.iter().enumerate().take(table_count) {
            writer.write_dqt(id as u8, table)?;
        }
        writer.write_start_of_frame(self.frame_marker(), &frame_info, &components)?;
        for id in 0..table_count {
            writer.write_dht(TableClass::Dc, id as u8, &dc_tables[id])?;
            writer.write_dht(TableClass::Ac, id as u8, &ac_tables[id])?;
        }
        if self.restart_interval > 0 {
            writer.write_dri(self.restart_interval)?;
        }
        let scan_components: Vec<&JpegComponent> = components.iter().collect();
        writer.write_start_of_scan(&scan_components, 0, 63, 0)?;
        write_entropy_tokens(&mut writer, &tokens, &dc_tables, &ac_tables)?;
        writer.write_end_of_image();

        Ok(writer.into_inner())
    }

    /// Walks the MCUs of a single interleaved scan (or, for one component,
    /// its blocks) and turns every block into entropy tokens.
    fn tokenize(
        &self,
        planes: &[Vec<u16>],
        width: usize,
        height: usize,
        components: &[JpegComponent],
        quantization_tables: &[QuantizationTable; 2],
    ) -> Vec<EntropyToken> {
        let h_max = components.iter().map(|c| c.h_samp_factor as usize).max().unwrap_or(1);
        let mcus_x = width.div_ceil(BLOCK_SIZE * h_max);
        let mcus_y = height.div_ceil(BLOCK_SIZE);
        let center = (1i32 << (self.precision - 1)) as f32;

        let grids: Vec<ComponentGrid> = components
            .iter()
            .zip(planes)
            .map(|(component, plane)| ComponentGrid {
                plane,
                width,
                height,
                ratio: h_max / component.h_samp_factor as usize,
            })
            .collect();

        let mut tokens = Vec::new();
        let mut dc_predictions = vec![0i32; components.len()];
        let restart_interval = self.restart_interval as usize;

        for mcu in 0..mcus_x * mcus_y {
            if restart_interval > 0 && mcu > 0 && mcu % restart_interval == 0 {
                tokens.push(EntropyToken::Restart(JpegMarkerCode::restart(mcu / restart_interval - 1)));
                dc_predictions.fill(0);
            }
            let (mcu_x, mcu_y) = (mcu % mcus_x, mcu / mcus_x);

            for (index, component) in components.iter().enumerate() {
                let h = component.h_samp_factor as usize;
                for block_h in 0..h {
                    let block_x = (mcu_x * h + block_h) * BLOCK_SIZE;
                    let block_y = mcu_y * BLOCK_SIZE;

                    let mut block = [0.0f32; BLOCK_DIM];
                    for y in 0..BLOCK_SIZE {
                        for x in 0..BLOCK_SIZE {
                            block[y * BLOCK_SIZE + x] = grids[index].sample(block_x + x, block_y + y) - center;
                        }
                    }
                    let table = component.quant_table_dest;
                    Self::tokenize_block(
                        &block,
                        &quantization_tables[table as usize],
                        table,
                        &mut dc_predictions[index],
                        &mut tokens,
                    );
                }
            }
        }
        tokens
    }

    fn tokenize_block(
        block: &[f32; BLOCK_DIM],
        quant_table: &QuantizationTable,
        table: u8,
        dc_prediction: &mut i32,
        tokens: &mut Vec<EntropyToken>,
    ) {
        let mut dct_coeffs = [0.0f32; BLOCK_DIM];
        fdct_8x8(block, &mut dct_coeffs);

        let mut quant_coeffs = [0i32; BLOCK_DIM];
        quantize_block(&dct_coeffs, quant_table, &mut quant_coeffs);

        // DC
        let dc_val = quant_coeffs[0];
        tokens.push(EntropyToken::difference(table, dc_val - *dc_prediction));
        *dc_prediction = dc_val;

        // AC
        let mut run = 0u8;
        for &natural in &ZIGZAG_ORDER[1..] {
            let ac_val = quant_coeffs[natural];
            if ac_val == 0 {
                run += 1;
                continue;
            }
            while run > 15 {
                tokens.push(EntropyToken::ac(table, 15, 0)); // ZRL
                run -= 16;
            }
            tokens.push(EntropyToken::ac(table, run, ac_val));
            run = 0;
        }
        if run > 0 {
            tokens.push(EntropyToken::ac(table, 0, 0)); // EOB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg1::decoder::Jpeg1Decoder;

    fn gradient(width: usize, height: usize, max: u16) -> Vec<u16> {
        (0..width * height)
            .map(|i| ((i % width + i / width) * max as usize / (width + height)) as u16)
            .collect()
    }

    fn assert_close(decoded: &[u16], source: &[u16], tolerance: i32) {
        assert_eq!(decoded.len(), source.len());
        for (i, (a, b)) in decoded.iter().zip(source).enumerate() {
            let diff = (*a as i32 - *b as i32).abs();
            assert!(diff <= tolerance, "Mismatch at index {i}: src={b} dec={a} diff={diff}");
        }
    }

    fn decode(encoded: &[u8]) -> Vec<Vec<u16>> {
        let mut decoder = Jpeg1Decoder::new(encoded);
        decoder.read_header().expect("Read header failed");
        decoder.decode().expect("Decode failed")
    }

    #[test]
    fn test_encode_decode_roundtrip_grayscale() {
        let (width, height) = (19, 13);
        let source = gradient(width, height, 255);

        let encoder = Jpeg1Encoder::new(8);
        let encoded = encoder.encode(&[source.clone()], width, height).expect("Encode failed");
        assert_eq!(&encoded[..2], &[0xFF, 0xD8]);
        assert!(encoded.windows(2).any(|w| w == [0xFF, 0xC0]));
        assert_eq!(&encoded[encoded.len() - 2..], &[0xFF, 0xD9]);

        let planes = decode(&encoded);
        assert_close(&planes[0], &source, 12);
    }

    #[test]
    fn test_encode_decode_roundtrip_color_422() {
        let (width, height) = (24, 16);
        let y = gradient(width, height, 255);
        let flat = vec![128u16; width * height];

        let mut encoder = Jpeg1Encoder::new(8);
        encoder.set_luma_horizontal_sampling(2);
        let encoded = encoder
            .encode(&[y.clone(), flat.clone(), flat.clone()], width, height)
            .expect("Encode failed");

        let planes = decode(&encoded);
        assert_eq!(planes.len(), 3);
        assert_close(&planes[0], &y, 12);
        assert_close(&planes[1], &flat, 2);
        assert_close(&planes[2], &flat, 2);
    }

    #[test]
    fn test_encode_decode_roundtrip_restart() {
        let (width, height) = (32, 16);
        let source = gradient(width, height, 255);

        let mut encoder = Jpeg1Encoder::new(8);
        encoder.set_restart_interval(3);
        let encoded = encoder.encode(&[source.clone()], width, height).expect("Encode failed");

        assert!(encoded.windows(2).any(|w| w == [0xFF, 0xD0]));
        assert!(encoded.windows(2).any(|w| w == [0xFF, 0xD1]));
        assert!(encoded.windows(2).any(|w| w == [0xFF, 0xDD]));

        let planes = decode(&encoded);
        assert_close(&planes[0], &source, 12);
    }

    #[test]
    fn twelve_bit_extended() {
        let (width, height) = (16, 9);
        let source = gradient(width, height, 4095);

        let encoder = Jpeg1Encoder::new(12);
        assert_eq!(encoder.frame_marker(), JpegMarkerCode::StartOfFrameExtendedSequential);
        let encoded = encoder.encode(&[source.clone()], width, height).expect("Encode failed");
        assert!(encoded.windows(2).any(|w| w == [0xFF, 0xC1]));

        let planes = decode(&encoded);
        assert_close(&planes[0], &source, 160);
    }

    #[test]
    fn twelve_bit_baseline_is_rejected() {
        let mut encoder = Jpeg1Encoder::new(12);
        encoder.set_extended(false);
        assert!(encoder.encode(&[vec![0; 64]], 8, 8).is_err());
    }

    #[test]
    fn two_components_are_rejected() {
        let encoder = Jpeg1Encoder::new(8);
        assert!(matches!(
            encoder.encode(&[vec![0; 64], vec![0; 64]], 8, 8),
            Err(DicomCodecError::ParameterValueNotSupported(_))
        ));
    }
}
