//! Sequential and lossless JPEG decoder producing component planes.

use crate::error::{DicomCodecError, Result};
use crate::jpeg_marker_code::JpegMarkerCode;
use crate::jpeg_stream_reader::{JpegComponent, JpegStreamReader};
use crate::jpeg1::dct::{BLOCK_DIM, BLOCK_SIZE, idct_8x8};
use crate::jpeg1::huffman::{HuffmanEncoder, HuffmanTable, JpegBitReader};
use crate::jpeg1::lossless::Jpeg1LosslessDecoder;
use crate::jpeg1::quantization::{ZIGZAG_ORDER, dequantize_block};
use crate::FrameInfo;
use tracing::trace;

pub struct Jpeg1Decoder<'a> {
    reader: JpegStreamReader<'a>,
}

/// Per-component sample buffer covering whole MCUs.
struct ComponentBuffer {
    samples: Vec<u16>,
    stride: usize,
}

impl<'a> Jpeg1Decoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            reader: JpegStreamReader::new(source),
        }
    }

    pub fn read_header(&mut self) -> Result<()> {
        self.reader.read_header()
    }

    pub fn frame_info(&self) -> FrameInfo {
        self.reader.frame_info()
    }

    pub fn is_lossless(&self) -> bool {
        self.reader.frame_marker() == Some(JpegMarkerCode::StartOfFrameLossless)
    }

    /// Decodes every scan of the frame. Returns one full-resolution plane per
    /// frame component, without any color transform.
    pub fn decode(&mut self) -> Result<Vec<Vec<u16>>> {
        if self.is_lossless() {
            return Jpeg1LosslessDecoder::decode(&mut self.reader);
        }

        let frame_info = self.reader.frame_info();
        let precision = frame_info.bits_per_sample;
        if precision != 8 && precision != 12 {
            return Err(DicomCodecError::ParameterValueNotSupported("sequential sample precision"));
        }
        let width = frame_info.width as usize;
        let height = frame_info.height as usize;
        let components = self.reader.components.clone();
        let h_max = components.iter().map(|c| c.h_samp_factor as usize).max().unwrap_or(1);
        let v_max = components.iter().map(|c| c.v_samp_factor as usize).max().unwrap_or(1);
        let mcus_x = width.div_ceil(BLOCK_SIZE * h_max);
        let mcus_y = height.div_ceil(BLOCK_SIZE * v_max);

        let mut buffers: Vec<ComponentBuffer> = components
            .iter()
            .map(|c| {
                let stride = mcus_x * c.h_samp_factor as usize * BLOCK_SIZE;
                let rows = mcus_y * c.v_samp_factor as usize * BLOCK_SIZE;
                ComponentBuffer {
                    samples: vec![0; stride * rows],
                    stride,
                }
            })
            .collect();

        loop {
            let scan_components = self.reader.scan.component_indices.clone();
            trace!(components = ?scan_components, "sequential scan");
            let mut bit_reader = JpegBitReader::new(self.reader.remaining_data());
            let mut dc_predictions = vec![0i32; components.len()];
            let restart_interval = self.reader.restart_interval as usize;

            // Non-interleaved scans walk the blocks of one component; the MCU is a single block.
            let (scan_mcus_x, scan_mcus_y) = if let [index] = scan_components.as_slice() {
                let c = &components[*index];
                let component_width = (width * c.h_samp_factor as usize).div_ceil(h_max);
                let component_height = (height * c.v_samp_factor as usize).div_ceil(v_max);
                (component_width.div_ceil(BLOCK_SIZE), component_height.div_ceil(BLOCK_SIZE))
            } else {
                (mcus_x, mcus_y)
            };

            for mcu in 0..scan_mcus_x * scan_mcus_y {
                if restart_interval > 0 && mcu > 0 && mcu % restart_interval == 0 {
                    bit_reader.restart(JpegMarkerCode::restart(mcu / restart_interval - 1))?;
                    dc_predictions.fill(0);
                }
                let (mcu_x, mcu_y) = (mcu % scan_mcus_x, mcu / scan_mcus_x);

                for &index in &scan_components {
                    let component = &components[index];
                    let (h, v) = if scan_components.len() == 1 {
                        (1, 1)
                    } else {
                        (component.h_samp_factor as usize, component.v_samp_factor as usize)
                    };
                    for block_v in 0..v {
                        for block_h in 0..h {
                            let coefficients = self.decode_block(
                                &mut bit_reader,
                                component,
                                &mut dc_predictions[index],
                            )?;
                            Self::store_block(
                                &coefficients,
                                &mut buffers[index],
                                (mcu_x * h + block_h) * BLOCK_SIZE,
                                (mcu_y * v + block_v) * BLOCK_SIZE,
                                precision,
                            );
                        }
                    }
                }
            }

            self.reader.advance(bit_reader.position());
            if !self.reader.read_next_scan()? {
                break;
            }
        }

        let planes = components
            .iter()
            .zip(&buffers)
            .map(|(component, buffer)| {
                let h = component.h_samp_factor as usize;
                let v = component.v_samp_factor as usize;
                (0..height)
                    .flat_map(|y| {
                        let row = y * v / v_max * buffer.stride;
                        (0..width).map(move |x| buffer.samples[row + x * h / h_max])
                    })
                    .collect()
            })
            .collect();
        Ok(planes)
    }

    /// Decodes the Huffman-coded coefficients of one block into natural order.
    fn decode_block(
        &self,
        bit_reader: &mut JpegBitReader,
        component: &JpegComponent,
        dc_prediction: &mut i32,
    ) -> Result<[i32; BLOCK_DIM]> {
        let dc_table = table(&self.reader.huffman_tables_dc, component.dc_table_dest)?;
        let ac_table = table(&self.reader.huffman_tables_ac, component.ac_table_dest)?;
        let quant_table = self.reader.quantization_tables[component.quant_table_dest as usize]
            .as_ref()
            .ok_or(DicomCodecError::InvalidData("quantization table missing"))?;

        let mut block = [0i32; BLOCK_DIM];

        // 1. Decode DC
        let dc_category = dc_table.decode(bit_reader)?;
        *dc_prediction += HuffmanEncoder::receive_extend(bit_reader, dc_category)?;
        block[0] = *dc_prediction;

        // 2. Decode AC
        let mut k = 1;
        while k < BLOCK_DIM {
            let symbol = ac_table.decode(bit_reader)?;
            let run = (symbol >> 4) as usize;
            let category = symbol & 0x0F;
            if category == 0 {
                if run == 15 {
                    k += 16; // ZRL
                    continue;
                }
                break; // EOB
            }
            k += run;
            if k >= BLOCK_DIM {
                return Err(DicomCodecError::InvalidData("AC run beyond end of block"));
            }
            block[ZIGZAG_ORDER[k]] = HuffmanEncoder::receive_extend(bit_reader, category)?;
            k += 1;
        }

        let mut dequantized = [0.0f32; BLOCK_DIM];
        dequantize_block(&block, quant_table, &mut dequantized);
        let mut output = [0.0f32; BLOCK_DIM];
        idct_8x8(&dequantized, &mut output);

        let mut samples = [0i32; BLOCK_DIM];
        for (sample, value) in samples.iter_mut().zip(output) {
            *sample = value.round() as i32;
        }
        Ok(samples)
    }

    fn store_block(samples: &[i32; BLOCK_DIM], buffer: &mut ComponentBuffer, x0: usize, y0: usize, precision: u8) {
        let center = 1i32 << (precision - 1);
        let max = (1i32 << precision) - 1;
        for y in 0..BLOCK_SIZE {
            let row = (y0 + y) * buffer.stride + x0;
            if row + BLOCK_SIZE > buffer.samples.len() {
                return;
            }
            for x in 0..BLOCK_SIZE {
                buffer.samples[row + x] = (samples[y * BLOCK_SIZE + x] + center).clamp(0, max) as u16;
            }
        }
    }
}

fn table(tables: &[Option<HuffmanTable>; 4], destination: u8) -> Result<&HuffmanTable> {
    tables[destination as usize & 3]
        .as_ref()
        .ok_or(DicomCodecError::InvalidData("Huffman table missing"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg1::encoder::Jpeg1Encoder;

    #[test]
    fn flat_block_decodes_exactly() {
        let encoder = Jpeg1Encoder::new(8);
        let encoded = encoder.encode(&[vec![77u16; 64]], 8, 8).unwrap();

        let mut decoder = Jpeg1Decoder::new(&encoded);
        decoder.read_header().unwrap();
        assert!(!decoder.is_lossless());
        assert_eq!(decoder.frame_info().width, 8);
        let planes = decoder.decode().unwrap();
        assert_eq!(planes, vec![vec![77u16; 64]]);
    }

    #[test]
    fn truncated_scan_is_an_error() {
        let encoder = Jpeg1Encoder::new(8);
        let source: Vec<u16> = (0..256).map(|i| (i * 13 % 256) as u16).collect();
        let encoded = encoder.encode(&[source], 16, 16).unwrap();
        let truncated = &encoded[..encoded.len() - 40];

        let mut decoder = Jpeg1Decoder::new(truncated);
        decoder.read_header().unwrap();
        assert!(decoder.decode().is_err());
    }
}
