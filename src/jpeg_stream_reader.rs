//! JPEG Codestream Reader.
//!
//! Parses the table-specification and miscellaneous segments of a sequential
//! or lossless JPEG frame and positions itself at the entropy-coded data of
//! each scan.

use crate::error::{DicomCodecError, Result};
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::jpeg1::huffman::HuffmanTable;
use crate::jpeg1::quantization::{QuantizationTable, ZIGZAG_ORDER};
use crate::FrameInfo;
use std::convert::TryFrom;
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct JpegComponent {
    pub id: u8,
    pub h_samp_factor: u8,
    pub v_samp_factor: u8,
    pub quant_table_dest: u8,
    pub dc_table_dest: u8,
    pub ac_table_dest: u8,
}

/// Parameters of the scan whose header was read last.
#[derive(Debug, Clone, Default)]
pub struct ScanHeader {
    /// Indices into [`JpegStreamReader::components`].
    pub component_indices: Vec<usize>,
    /// Ss; the predictor selection value in lossless scans.
    pub spectral_start: u8,
    pub spectral_end: u8,
    /// Al; the point transform in lossless scans.
    pub successive_low: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegStreamReaderState {
    BeforeStartOfImage,
    HeaderSection,
    ScanSection,
    EndOfImage,
}

pub struct JpegStreamReader<'a> {
    source: &'a [u8],
    position: usize,
    state: JpegStreamReaderState,
    frame_info: FrameInfo,
    frame_marker: Option<JpegMarkerCode>,
    pub quantization_tables: [Option<QuantizationTable>; 4],
    pub huffman_tables_dc: [Option<HuffmanTable>; 4],
    pub huffman_tables_ac: [Option<HuffmanTable>; 4],
    pub components: Vec<JpegComponent>,
    pub restart_interval: u16,
    pub scan: ScanHeader,
}

fn unknown_marker(_: impl std::fmt::Debug) -> DicomCodecError {
    DicomCodecError::InvalidData("unknown JPEG marker")
}

impl<'a> JpegStreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            state: JpegStreamReaderState::BeforeStartOfImage,
            frame_info: FrameInfo::default(),
            frame_marker: None,
            quantization_tables: [None; 4],
            huffman_tables_dc: [const { None }; 4],
            huffman_tables_ac: [const { None }; 4],
            components: Vec::new(),
            restart_interval: 0,
            scan: ScanHeader::default(),
        }
    }

    pub fn frame_info(&self) -> FrameInfo {
        self.frame_info
    }

    /// The SOF_n marker of the frame, once the header has been read.
    pub fn frame_marker(&self) -> Option<JpegMarkerCode> {
        self.frame_marker
    }

    pub fn state(&self) -> JpegStreamReaderState {
        self.state
    }

    pub fn remaining_data(&self) -> &'a [u8] {
        self.source.get(self.position..).unwrap_or_default()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn advance(&mut self, count: usize) {
        self.position = (self.position + count).min(self.source.len());
    }

    /// Reads SOI and every segment up to and including the first SOS.
    pub fn read_header(&mut self) -> Result<()> {
        if self.read_marker()? != JpegMarkerCode::StartOfImage {
            return Err(DicomCodecError::InvalidData("missing start of image"));
        }
        self.state = JpegStreamReaderState::HeaderSection;

        if !self.read_next_scan()? {
            return Err(DicomCodecError::InvalidData("no scan in JPEG stream"));
        }
        if self.frame_marker.is_none() {
            return Err(DicomCodecError::InvalidData("scan before start of frame"));
        }
        Ok(())
    }

    /// Consumes segments until the next SOS header (returns true) or EOI
    /// (returns false). Padding left behind by the previous scan is skipped.
    pub fn read_next_scan(&mut self) -> Result<bool> {
        loop {
            if self.state == JpegStreamReaderState::ScanSection {
                self.seek_marker();
            }
            let marker = match self.read_marker() {
                Ok(marker) => marker,
                // Tolerate a missing EOI once at least one scan was decoded
                Err(_) if self.state == JpegStreamReaderState::ScanSection && self.remaining_data().is_empty() => {
                    self.state = JpegStreamReaderState::EndOfImage;
                    return Ok(false);
                }
                Err(e) => return Err(e),
            };
            trace!(?marker, position = self.position, "segment");

            match marker {
                JpegMarkerCode::StartOfFrameBaseline
                | JpegMarkerCode::StartOfFrameExtendedSequential
                | JpegMarkerCode::StartOfFrameLossless => {
                    self.read_start_of_frame_segment(marker)?;
                }
                marker if marker.is_start_of_frame() => {
                    return Err(DicomCodecError::ParameterValueNotSupported(
                        "JPEG process other than baseline, extended sequential or lossless",
                    ));
                }
                JpegMarkerCode::DefineQuantizationTable => self.read_dqt_segment()?,
                JpegMarkerCode::DefineHuffmanTable => self.read_dht_segment()?,
                JpegMarkerCode::DefineRestartInterval => self.read_dri_segment()?,
                JpegMarkerCode::StartOfScan => {
                    self.read_start_of_scan_segment()?;
                    return Ok(true);
                }
                JpegMarkerCode::EndOfImage => {
                    self.state = JpegStreamReaderState::EndOfImage;
                    return Ok(false);
                }
                marker if marker.is_standalone() => {}
                _ => self.skip_segment()?,
            }
        }
    }

    /// Moves to the next marker that is neither stuffing nor fill.
    fn seek_marker(&mut self) {
        while self.position + 1 < self.source.len() {
            let next = self.source[self.position + 1];
            if self.source[self.position] == JPEG_MARKER_START_BYTE && next != 0x00 && next != JPEG_MARKER_START_BYTE {
                return;
            }
            self.position += 1;
        }
        self.position = self.source.len();
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let value = *self
            .source
            .get(self.position)
            .ok_or(DicomCodecError::InvalidData("unexpected end of JPEG stream"))?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b1 = self.read_u8()? as u16;
        let b2 = self.read_u8()? as u16;
        Ok((b1 << 8) | b2)
    }

    pub fn peek_marker(&self) -> Result<JpegMarkerCode> {
        match self.source.get(self.position..self.position + 2) {
            Some(&[JPEG_MARKER_START_BYTE, code]) => JpegMarkerCode::try_from(code).map_err(unknown_marker),
            _ => Err(DicomCodecError::InvalidData("expected a JPEG marker")),
        }
    }

    pub fn read_marker(&mut self) -> Result<JpegMarkerCode> {
        if self.read_u8()? != JPEG_MARKER_START_BYTE {
            return Err(DicomCodecError::InvalidData("expected a JPEG marker"));
        }
        let mut code = self.read_u8()?;
        // Any number of fill bytes may precede a marker (B.1.1.2)
        while code == JPEG_MARKER_START_BYTE {
            code = self.read_u8()?;
        }
        JpegMarkerCode::try_from(code).map_err(unknown_marker)
    }

    /// Reads the segment length and returns the number of payload bytes,
    /// checking that they are present.
    fn read_segment_length(&mut self) -> Result<usize> {
        let length = self.read_u16()? as usize;
        if length < 2 {
            return Err(DicomCodecError::InvalidData("segment length below 2"));
        }
        let payload = length - 2;
        if self.position + payload > self.source.len() {
            return Err(DicomCodecError::InvalidData("segment exceeds JPEG stream"));
        }
        Ok(payload)
    }

    pub fn skip_segment(&mut self) -> Result<()> {
        let payload = self.read_segment_length()?;
        self.position += payload;
        Ok(())
    }

    fn read_start_of_frame_segment(&mut self, marker: JpegMarkerCode) -> Result<()> {
        if self.frame_marker.is_some() {
            return Err(DicomCodecError::InvalidData("more than one start of frame"));
        }
        let payload = self.read_segment_length()?;
        let end = self.position + payload;

        self.frame_info.bits_per_sample = self.read_u8()?;
        self.frame_info.height = self.read_u16()? as u32;
        self.frame_info.width = self.read_u16()? as u32;
        self.frame_info.component_count = self.read_u8()?;
        if self.frame_info.height == 0 {
            return Err(DicomCodecError::ParameterValueNotSupported("number of lines defined by DNL"));
        }
        if self.frame_info.width == 0 || self.frame_info.component_count == 0 {
            return Err(DicomCodecError::InvalidData("empty frame"));
        }

        self.components.clear();
        for _ in 0..self.frame_info.component_count {
            let id = self.read_u8()?;
            let sampling = self.read_u8()?;
            let quant_table_dest = self.read_u8()?;
            let (h_samp_factor, v_samp_factor) = (sampling >> 4, sampling & 0x0F);
            if !(1..=4).contains(&h_samp_factor) || !(1..=4).contains(&v_samp_factor) || quant_table_dest > 3 {
                return Err(DicomCodecError::InvalidData("bad frame component specification"));
            }
            self.components.push(JpegComponent {
                id,
                h_samp_factor,
                v_samp_factor,
                quant_table_dest,
                ..Default::default()
            });
        }
        if self.position != end {
            return Err(DicomCodecError::InvalidData("start of frame length mismatch"));
        }
        self.frame_marker = Some(marker);
        Ok(())
    }

    /// Reads 8-bit (Pq = 0) and 16-bit (Pq = 1) tables into natural order.
    pub fn read_dqt_segment(&mut self) -> Result<()> {
        let payload = self.read_segment_length()?;
        let end = self.position + payload;

        while self.position < end {
            let pq_tq = self.read_u8()?;
            let precision = pq_tq >> 4;
            let id = (pq_tq & 0x0F) as usize;
            if id >= 4 || precision > 1 {
                return Err(DicomCodecError::InvalidData("bad quantization table specification"));
            }
            let mut table = [0u16; 64];
            for &natural in &ZIGZAG_ORDER {
                table[natural] = if precision == 1 {
                    self.read_u16()?
                } else {
                    self.read_u8()? as u16
                };
            }
            self.quantization_tables[id] = Some(table);
        }
        if self.position != end {
            return Err(DicomCodecError::InvalidData("quantization table length mismatch"));
        }
        Ok(())
    }

    pub fn read_dht_segment(&mut self) -> Result<()> {
        let payload = self.read_segment_length()?;
        let end = self.position + payload;

        while self.position < end {
            let tc_th = self.read_u8()?;
            let class = tc_th >> 4;
            let id = (tc_th & 0x0F) as usize;
            if id >= 4 || class > 1 {
                return Err(DicomCodecError::InvalidData("bad Huffman table specification"));
            }

            let mut lengths = [0u8; 16];
            for length in lengths.iter_mut() {
                *length = self.read_u8()?;
            }
            let total_values: usize = lengths.iter().map(|&n| n as usize).sum();
            if self.position + total_values > end {
                return Err(DicomCodecError::InvalidData("Huffman table exceeds segment"));
            }
            let values = &self.source[self.position..self.position + total_values];
            self.position += total_values;

            let table = HuffmanTable::build_from_dht(&lengths, values)?;
            if class == 0 {
                self.huffman_tables_dc[id] = Some(table);
            } else {
                self.huffman_tables_ac[id] = Some(table);
            }
        }
        if self.position != end {
            return Err(DicomCodecError::InvalidData("Huffman table length mismatch"));
        }
        Ok(())
    }

    pub fn read_dri_segment(&mut self) -> Result<()> {
        let payload = self.read_segment_length()?;
        if payload != 2 {
            return Err(DicomCodecError::InvalidData("bad restart interval segment"));
        }
        self.restart_interval = self.read_u16()?;
        Ok(())
    }

    fn read_start_of_scan_segment(&mut self) -> Result<()> {
        if self.frame_marker.is_none() {
            return Err(DicomCodecError::InvalidData("scan before start of frame"));
        }
        let payload = self.read_segment_length()?;
        let end = self.position + payload;

        let components_in_scan = self.read_u8()? as usize;
        if !(1..=4).contains(&components_in_scan) {
            return Err(DicomCodecError::InvalidData("bad number of scan components"));
        }
        self.scan.component_indices.clear();
        for _ in 0..components_in_scan {
            let id = self.read_u8()?;
            let selector = self.read_u8()?;
            let (dc_dest, ac_dest) = (selector >> 4, selector & 0x0F);
            if dc_dest > 3 || ac_dest > 3 {
                return Err(DicomCodecError::InvalidData("bad entropy table selector"));
            }
            let index = self
                .components
                .iter()
                .position(|c| c.id == id)
                .ok_or(DicomCodecError::InvalidData("scan references unknown component"))?;
            let component = &mut self.components[index];
            component.dc_table_dest = dc_dest;
            component.ac_table_dest = ac_dest;
            self.scan.component_indices.push(index);
        }
        self.scan.spectral_start = self.read_u8()?;
        self.scan.spectral_end = self.read_u8()?;
        self.scan.successive_low = self.read_u8()? & 0x0F;
        if self.position != end {
            return Err(DicomCodecError::InvalidData("start of scan length mismatch"));
        }
        self.state = JpegStreamReaderState::ScanSection;
        Ok(())
    }
}
