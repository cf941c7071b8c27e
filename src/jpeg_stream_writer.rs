//! JPEG Codestream Writer utilities.
//!
//! This module provides the `JpegStreamWriter` which handles the generation
//! of JPEG markers and segments (SOI, EOI, SOF, DQT, DHT, SOS, ...) for
//! the sequential and lossless processes.

use crate::error::{DicomCodecError, Result};
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::jpeg_stream_reader::JpegComponent;
use crate::jpeg1::huffman::{HuffmanTable, JpegBitWriter};
use crate::jpeg1::quantization::{QuantizationTable, ZIGZAG_ORDER};
use crate::FrameInfo;

/// Huffman table class (Tc) of a DHT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableClass {
    Dc = 0,
    Ac = 1,
}

/// A writer for JPEG codestreams that manages marker and segment emission.
#[derive(Default)]
pub struct JpegStreamWriter {
    destination: Vec<u8>,
}

impl JpegStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.destination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destination.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.destination
    }

    /// Bit writer appending entropy-coded data after the last segment.
    pub fn bit_writer(&mut self) -> JpegBitWriter<'_> {
        JpegBitWriter::new(&mut self.destination)
    }

    pub fn write_byte(&mut self, value: u8) {
        self.destination.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.destination.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_marker(&mut self, marker: JpegMarkerCode) {
        self.write_byte(JPEG_MARKER_START_BYTE);
        self.write_byte(marker.into());
    }

    /// Writes a marker followed by the length field for `payload` bytes.
    fn write_segment_header(&mut self, marker: JpegMarkerCode, payload: usize) -> Result<()> {
        let length = u16::try_from(payload + 2)
            .map_err(|_| DicomCodecError::ParameterValueNotSupported("segment exceeds 65535 bytes"))?;
        self.write_marker(marker);
        self.write_u16(length);
        Ok(())
    }

    pub fn write_start_of_image(&mut self) {
        self.write_marker(JpegMarkerCode::StartOfImage);
    }

    pub fn write_end_of_image(&mut self) {
        self.write_marker(JpegMarkerCode::EndOfImage);
    }

    /// Writes a DQT segment, using 16-bit elements only when an entry needs them.
    pub fn write_dqt(&mut self, table_id: u8, table: &QuantizationTable) -> Result<()> {
        let sixteen_bit = table.iter().any(|&q| q > 255);
        let element_size = if sixteen_bit { 2 } else { 1 };
        self.write_segment_header(JpegMarkerCode::DefineQuantizationTable, 1 + 64 * element_size)?;
        self.write_byte(((sixteen_bit as u8) << 4) | (table_id & 0x0F));
        for &natural in &ZIGZAG_ORDER {
            if sixteen_bit {
                self.write_u16(table[natural]);
            } else {
                self.write_byte(table[natural] as u8);
            }
        }
        Ok(())
    }

    pub fn write_dht(&mut self, table_class: TableClass, table_id: u8, table: &HuffmanTable) -> Result<()> {
        self.write_segment_header(JpegMarkerCode::DefineHuffmanTable, 1 + 16 + table.values.len())?;
        self.write_byte(((table_class as u8) << 4) | (table_id & 0x0F));
        self.destination.extend_from_slice(&table.lengths);
        self.destination.extend_from_slice(&table.values);
        Ok(())
    }

    /// Writes an SOFn segment for any of the frame markers.
    pub fn write_start_of_frame(
        &mut self,
        marker: JpegMarkerCode,
        frame_info: &FrameInfo,
        components: &[JpegComponent],
    ) -> Result<()> {
        if !marker.is_start_of_frame() {
            return Err(DicomCodecError::ParameterValueNotSupported("not a start of frame marker"));
        }
        let height = u16::try_from(frame_info.height)
            .map_err(|_| DicomCodecError::ParameterValueNotSupported("image height"))?;
        let width = u16::try_from(frame_info.width)
            .map_err(|_| DicomCodecError::ParameterValueNotSupported("image width"))?;

        self.write_segment_header(marker, 6 + components.len() * 3)?;
        self.write_byte(frame_info.bits_per_sample);
        self.write_u16(height);
        self.write_u16(width);
        self.write_byte(components.len() as u8);
        for component in components {
            self.write_byte(component.id);
            self.write_byte((component.h_samp_factor << 4) | component.v_samp_factor);
            self.write_byte(component.quant_table_dest);
        }
        Ok(())
    }

    /// Writes an SOS segment. For lossless scans `spectral_start` carries the
    /// predictor and `successive_low` the point transform.
    pub fn write_start_of_scan(
        &mut self,
        components: &[&JpegComponent],
        spectral_start: u8,
        spectral_end: u8,
        successive_low: u8,
    ) -> Result<()> {
        self.write_segment_header(JpegMarkerCode::StartOfScan, 1 + components.len() * 2 + 3)?;
        self.write_byte(components.len() as u8);
        for component in components {
            self.write_byte(component.id);
            self.write_byte((component.dc_table_dest << 4) | component.ac_table_dest);
        }
        self.write_byte(spectral_start);
        self.write_byte(spectral_end);
        self.write_byte(successive_low & 0x0F);
        Ok(())
    }

    pub fn write_dri(&mut self, restart_interval: u16) -> Result<()> {
        self.write_segment_header(JpegMarkerCode::DefineRestartInterval, 2)?;
        self.write_u16(restart_interval);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg1::quantization::STD_LUMINANCE_QUANT_TABLE;

    #[test]
    fn dqt_is_written_in_zigzag_order() {
        let mut writer = JpegStreamWriter::new();
        writer.write_dqt(0, &STD_LUMINANCE_QUANT_TABLE).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(&bytes[..5], &[0xFF, 0xDB, 0x00, 67, 0x00]);
        // natural index 8 comes third in zigzag order
        assert_eq!(bytes[5..8], [16, 11, 12]);
    }

    #[test]
    fn sixteen_bit_dqt() {
        let mut table = [1u16; 64];
        table[0] = 300;
        let mut writer = JpegStreamWriter::new();
        writer.write_dqt(1, &table).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(&bytes[2..4], &[0x00, 131]);
        assert_eq!(bytes[4], 0x11);
        assert_eq!(&bytes[5..7], &[0x01, 0x2C]);
    }

    #[test]
    fn frame_segment_layout() {
        let frame_info = FrameInfo {
            width: 3,
            height: 2,
            bits_per_sample: 16,
            component_count: 1,
        };
        let component = JpegComponent {
            id: 1,
            h_samp_factor: 1,
            v_samp_factor: 1,
            ..Default::default()
        };
        let mut writer = JpegStreamWriter::new();
        writer
            .write_start_of_frame(JpegMarkerCode::StartOfFrameLossless, &frame_info, &[component])
            .unwrap();
        assert_eq!(
            writer.into_inner(),
            vec![0xFF, 0xC3, 0, 11, 16, 0, 2, 0, 3, 1, 1, 0x11, 0]
        );
    }

    #[test]
    fn rejects_non_frame_marker() {
        let mut writer = JpegStreamWriter::new();
        let result = writer.write_start_of_frame(JpegMarkerCode::Comment, &FrameInfo::default(), &[]);
        assert!(result.is_err());
    }
}
