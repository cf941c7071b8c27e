//! Huffman coding for the sequential and lossless JPEG processes.
//! Handles standard and optimized Huffman tables and bit-stream packing.

use crate::error::{DicomCodecError, Result};
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::jpeg_stream_writer::{JpegStreamWriter, TableClass};

/// Represents a Huffman code with its bit value and length.
#[derive(Debug, Clone, Copy, Default)]
pub struct HuffmanCode {
    pub value: u16,
    pub length: u8,
}

/// Standard JPEG DC luminance Huffman table lengths (Table K.3).
pub const STD_LUMINANCE_DC_LENGTHS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];

/// Standard JPEG DC luminance/chrominance Huffman table values (Tables K.3 and K.4).
pub const STD_DC_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Standard JPEG DC chrominance Huffman table lengths (Table K.4).
pub const STD_CHROMINANCE_DC_LENGTHS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];

/// Standard JPEG AC luminance Huffman table lengths (Table K.5).
pub const STD_LUMINANCE_AC_LENGTHS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 125];

#[rustfmt::skip]
pub const STD_LUMINANCE_AC_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12,
    0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xa1, 0x08,
    0x23, 0x42, 0xb1, 0xc1, 0x15, 0x52, 0xd1, 0xf0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0a, 0x16,
    0x17, 0x18, 0x19, 0x1a, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2a, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39,
    0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59,
    0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79,
    0x7a, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98,
    0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7,
    0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6,
    0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, 0xc4, 0xc5,
    0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4,
    0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xe1, 0xe2,
    0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea,
    0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

/// Standard JPEG AC chrominance Huffman table lengths (Table K.6).
pub const STD_CHROMINANCE_AC_LENGTHS: [u8; 16] = [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 119];

#[rustfmt::skip]
pub const STD_CHROMINANCE_AC_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21,
    0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91,
    0xa1, 0xb1, 0xc1, 0x09, 0x23, 0x33, 0x52, 0xf0,
    0x15, 0x62, 0x72, 0xd1, 0x0a, 0x16, 0x24, 0x34,
    0xe1, 0x25, 0xf1, 0x17, 0x18, 0x19, 0x1a, 0x26,
    0x27, 0x28, 0x29, 0x2a, 0x35, 0x36, 0x37, 0x38,
    0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58,
    0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78,
    0x79, 0x7a, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8a, 0x92, 0x93, 0x94, 0x95, 0x96,
    0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5,
    0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4,
    0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3,
    0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2,
    0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda,
    0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9,
    0xea, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

const MAX_CODE_LENGTH: usize = 16;

/// Symbol frequencies for one table; index 256 is reserved for the pseudo-symbol of K.2.
pub type SymbolFrequencies = [u32; 257];

/// Encapsulates MSB-aligned Huffman table for encoding and decoding.
#[derive(Clone)]
pub struct HuffmanTable {
    pub codes: [HuffmanCode; 256],
    pub lengths: [u8; 16],
    pub values: Vec<u8>,

    // Decoding fields
    pub min_code: [i32; 16],
    pub max_code: [i32; 16],
    pub val_ptr: [i32; 16],
}

impl Default for HuffmanTable {
    fn default() -> Self {
        Self {
            codes: [HuffmanCode::default(); 256],
            lengths: [0; 16],
            values: Vec::new(),
            min_code: [0; 16],
            max_code: [-1; 16],
            val_ptr: [0; 16],
        }
    }
}

impl HuffmanTable {
    /// Builds a table from JPEG DHT lengths and values (Annex C).
    pub fn build_from_dht(lengths: &[u8; 16], values: &[u8]) -> Result<Self> {
        let total: usize = lengths.iter().map(|&n| n as usize).sum();
        if total != values.len() || total > 256 {
            return Err(DicomCodecError::InvalidData("Huffman table size mismatch"));
        }

        let mut table = Self::default();
        table.lengths.copy_from_slice(lengths);
        table.values = values.to_vec();

        let mut code = 0u32;
        let mut val_idx = 0;

        for i in 0..MAX_CODE_LENGTH {
            let n_codes = lengths[i] as usize;
            if n_codes == 0 {
                table.max_code[i] = -1;
            } else {
                table.val_ptr[i] = val_idx as i32;
                table.min_code[i] = code as i32;
                for _ in 0..n_codes {
                    if code >= (1u32 << (i + 1)) {
                        return Err(DicomCodecError::InvalidData("Huffman code space overflow"));
                    }
                    table.codes[values[val_idx] as usize] = HuffmanCode {
                        value: code as u16,
                        length: (i + 1) as u8,
                    };
                    code += 1;
                    val_idx += 1;
                }
                table.max_code[i] = code as i32 - 1;
            }
            code <<= 1;
        }
        Ok(table)
    }

    fn from_standard(lengths: &[u8; 16], values: &[u8]) -> Self {
        // Annex K tables are well formed, the size checks cannot fail.
        Self::build_from_dht(lengths, values).unwrap_or_default()
    }

    pub fn standard_luminance_dc() -> Self {
        Self::from_standard(&STD_LUMINANCE_DC_LENGTHS, &STD_DC_VALUES)
    }

    pub fn standard_chrominance_dc() -> Self {
        Self::from_standard(&STD_CHROMINANCE_DC_LENGTHS, &STD_DC_VALUES)
    }

    pub fn standard_luminance_ac() -> Self {
        Self::from_standard(&STD_LUMINANCE_AC_LENGTHS, &STD_LUMINANCE_AC_VALUES)
    }

    pub fn standard_chrominance_ac() -> Self {
        Self::from_standard(&STD_CHROMINANCE_AC_LENGTHS, &STD_CHROMINANCE_AC_VALUES)
    }

    /// Generates an optimal table for the counted symbols (Section K.2),
    /// limiting code lengths to 16 bits and reserving the all-ones code.
    pub fn optimized(frequencies: &SymbolFrequencies) -> Result<Self> {
        let mut freq: Vec<u64> = frequencies.iter().map(|&f| f as u64).collect();
        freq[256] = 1;

        let mut code_size = [0usize; 257];
        let mut others = [usize::MAX; 257];

        loop {
            // Least frequent symbol, ties broken towards the larger index
            let mut v1 = usize::MAX;
            let mut v2 = usize::MAX;
            for i in 0..257 {
                if freq[i] == 0 {
                    continue;
                }
                if v1 == usize::MAX || freq[i] <= freq[v1] {
                    v2 = v1;
                    v1 = i;
                } else if v2 == usize::MAX || freq[i] <= freq[v2] {
                    v2 = i;
                }
            }
            if v2 == usize::MAX {
                break;
            }

            freq[v1] += freq[v2];
            freq[v2] = 0;

            code_size[v1] += 1;
            let mut node = v1;
            while others[node] != usize::MAX {
                node = others[node];
                code_size[node] += 1;
            }
            others[node] = v2;

            code_size[v2] += 1;
            let mut node = v2;
            while others[node] != usize::MAX {
                node = others[node];
                code_size[node] += 1;
            }
        }

        let mut bits = [0usize; 33];
        for &size in code_size.iter().filter(|&&size| size > 0) {
            if size > 32 {
                return Err(DicomCodecError::InvalidData("Huffman code length overflow"));
            }
            bits[size] += 1;
        }

        // Adjust_BITS (Figure K.3)
        for i in (MAX_CODE_LENGTH + 1..=32).rev() {
            while bits[i] > 0 {
                let mut j = i - 2;
                while j > 0 && bits[j] == 0 {
                    j -= 1;
                }
                if j == 0 {
                    return Err(DicomCodecError::InvalidData("Huffman code length overflow"));
                }
                bits[i] -= 2;
                bits[i - 1] += 1;
                bits[j + 1] += 2;
                bits[j] -= 1;
            }
        }

        // Drop the pseudo-symbol from the longest code length
        let mut i = MAX_CODE_LENGTH;
        while i > 0 && bits[i] == 0 {
            i -= 1;
        }
        if i > 0 {
            bits[i] -= 1;
        }

        // Sort_input (Figure K.4)
        let mut values = Vec::new();
        for size in 1..=32 {
            for (symbol, &symbol_size) in code_size.iter().enumerate().take(256) {
                if symbol_size == size {
                    values.push(symbol as u8);
                }
            }
        }

        let mut lengths = [0u8; 16];
        for (length, &count) in lengths.iter_mut().zip(bits[1..=MAX_CODE_LENGTH].iter()) {
            *length = count as u8;
        }
        Self::build_from_dht(&lengths, &values)
    }

    /// Code for `symbol`, or an error when the table has none.
    pub fn code(&self, symbol: u8) -> Result<HuffmanCode> {
        let code = self.codes[symbol as usize];
        if code.length == 0 {
            return Err(DicomCodecError::InvalidData("symbol missing from Huffman table"));
        }
        Ok(code)
    }

    /// Decodes the next symbol from the given JpegBitReader.
    pub fn decode(&self, reader: &mut JpegBitReader) -> Result<u8> {
        let mut code = 0i32;
        for i in 0..MAX_CODE_LENGTH {
            let bit = reader.read_bits(1)? as i32;
            code = (code << 1) | bit;
            if code <= self.max_code[i] {
                let idx = self.val_ptr[i] + (code - self.min_code[i]);
                return self
                    .values
                    .get(idx as usize)
                    .copied()
                    .ok_or(DicomCodecError::InvalidData("bad Huffman code"));
            }
        }
        Err(DicomCodecError::InvalidData("bad Huffman code"))
    }
}

/// Helper for reading bits from entropy-coded data with JPEG un-stuffing (skipping FF00).
pub struct JpegBitReader<'a> {
    source: &'a [u8],
    position: usize,
    bit_buffer: u32,
    bits_in_buffer: i32,
    marker_reached: bool,
}

impl<'a> JpegBitReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            bit_buffer: 0,
            bits_in_buffer: 0,
            marker_reached: false,
        }
    }

    pub fn read_bits(&mut self, count: u8) -> Result<u16> {
        if count == 0 {
            return Ok(0);
        }
        let count = count as i32;
        while self.bits_in_buffer < count {
            let byte = self.read_byte_unstuffed()?;
            self.bit_buffer = (self.bit_buffer << 8) | (byte as u32);
            self.bits_in_buffer += 8;
        }

        let shift = self.bits_in_buffer - count;
        let value = (self.bit_buffer >> shift) & ((1 << count) - 1);
        self.bits_in_buffer -= count;
        Ok(value as u16)
    }

    /// Once a marker is reached the decoder is fed zero bits (F.2.2.5).
    fn read_byte_unstuffed(&mut self) -> Result<u8> {
        if self.marker_reached {
            return Ok(0);
        }
        let byte = *self
            .source
            .get(self.position)
            .ok_or(DicomCodecError::InvalidData("entropy-coded data truncated"))?;

        if byte == JPEG_MARKER_START_BYTE {
            match self.source.get(self.position + 1) {
                Some(0x00) => self.position += 2,
                _ => {
                    self.marker_reached = true;
                    return Ok(0);
                }
            }
        } else {
            self.position += 1;
        }
        Ok(byte)
    }

    /// Drops the remaining bits of the current byte and consumes the expected RST_m marker.
    pub fn restart(&mut self, expected: JpegMarkerCode) -> Result<()> {
        self.bit_buffer = 0;
        self.bits_in_buffer = 0;
        self.marker_reached = false;

        let found = self.source.get(self.position..self.position + 2);
        if found != Some(&[JPEG_MARKER_START_BYTE, u8::from(expected)][..]) {
            return Err(DicomCodecError::InvalidData("restart marker not found"));
        }
        self.position += 2;
        Ok(())
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Helper for packing bits into bytes with JPEG bit-stuffing (FF00).
pub struct JpegBitWriter<'a> {
    destination: &'a mut Vec<u8>,
    bit_buffer: u32,
    bits_in_buffer: i32,
}

impl<'a> JpegBitWriter<'a> {
    pub fn new(destination: &'a mut Vec<u8>) -> Self {
        Self {
            destination,
            bit_buffer: 0,
            bits_in_buffer: 0,
        }
    }

    pub fn write_bits(&mut self, value: u16, length: u8) {
        if length == 0 {
            return;
        }
        let length = length as i32;
        let mask = (1u32 << length) - 1;
        self.bit_buffer = (self.bit_buffer << length) | (value as u32 & mask);
        self.bits_in_buffer += length;

        while self.bits_in_buffer >= 8 {
            let shift = self.bits_in_buffer - 8;
            let byte = ((self.bit_buffer >> shift) & 0xFF) as u8;
            self.emit_byte(byte);
            self.bits_in_buffer = shift;
            self.bit_buffer &= (1u32 << shift) - 1;
        }
    }

    pub fn write_code(&mut self, code: HuffmanCode) {
        self.write_bits(code.value, code.length);
    }

    fn emit_byte(&mut self, byte: u8) {
        self.destination.push(byte);
        if byte == JPEG_MARKER_START_BYTE {
            self.destination.push(0x00);
        }
    }

    /// Pads the final byte with ones.
    pub fn flush(&mut self) {
        if self.bits_in_buffer > 0 {
            let pad_bits = 8 - self.bits_in_buffer;
            let value = (1u32 << pad_bits) - 1;
            self.write_bits(value as u16, pad_bits as u8);
        }
    }

    /// Flushes and emits a marker without stuffing.
    pub fn write_marker(&mut self, marker: JpegMarkerCode) {
        self.flush();
        self.destination.push(JPEG_MARKER_START_BYTE);
        self.destination.push(marker.into());
    }
}

/// One unit of entropy-coded output. Scans are tokenized first so that
/// optimal tables can be derived before anything is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyToken {
    Symbol {
        class: TableClass,
        table: u8,
        symbol: u8,
        bits: u16,
        length: u8,
    },
    Restart(JpegMarkerCode),
}

impl EntropyToken {
    /// A DC (or lossless) difference coded with its magnitude category.
    pub fn difference(table: u8, value: i32) -> Self {
        let category = HuffmanEncoder::get_category(value);
        let (bits, length) = HuffmanEncoder::get_diff_bits(value, category);
        Self::Symbol {
            class: TableClass::Dc,
            table,
            symbol: category,
            bits,
            length,
        }
    }

    /// An AC coefficient preceded by `run` zeros; `value == 0` gives EOB or ZRL.
    pub fn ac(table: u8, run: u8, value: i32) -> Self {
        let category = HuffmanEncoder::get_category(value);
        let (bits, length) = HuffmanEncoder::get_diff_bits(value, category);
        Self::Symbol {
            class: TableClass::Ac,
            table,
            symbol: (run << 4) | category,
            bits,
            length,
        }
    }
}

/// Counts symbol occurrences for one table.
pub fn count_frequencies(tokens: &[EntropyToken], class: TableClass, table: u8) -> SymbolFrequencies {
    let mut frequencies = [0u32; 257];
    for token in tokens {
        match *token {
            EntropyToken::Symbol {
                class: token_class,
                table: token_table,
                symbol,
                ..
            } if token_class == class && token_table == table => {
                frequencies[symbol as usize] += 1;
            }
            _ => {}
        }
    }
    frequencies
}

/// Emits tokens as entropy-coded data; tables are indexed by destination.
pub fn write_entropy_tokens(
    writer: &mut JpegStreamWriter,
    tokens: &[EntropyToken],
    dc_tables: &[HuffmanTable],
    ac_tables: &[HuffmanTable],
) -> Result<()> {
    let mut bit_writer = writer.bit_writer();
    for token in tokens {
        match *token {
            EntropyToken::Symbol {
                class,
                table,
                symbol,
                bits,
                length,
            } => {
                let tables = match class {
                    TableClass::Dc => dc_tables,
                    TableClass::Ac => ac_tables,
                };
                let table = tables
                    .get(table as usize)
                    .ok_or(DicomCodecError::InvalidData("Huffman table missing"))?;
                bit_writer.write_code(table.code(symbol)?);
                bit_writer.write_bits(bits, length);
            }
            EntropyToken::Restart(marker) => bit_writer.write_marker(marker),
        }
    }
    bit_writer.flush();
    Ok(())
}

/// Magnitude categories and additional bits (F.1.2.1, H.1.2.2).
pub struct HuffmanEncoder;

impl HuffmanEncoder {
    /// Computes the magnitude category (SSSS) of a difference or coefficient.
    pub fn get_category(value: i32) -> u8 {
        if value == 0 {
            return 0;
        }
        (32 - value.unsigned_abs().leading_zeros()) as u8
    }

    /// Additional bits appended after the Huffman code for `value`.
    pub fn get_diff_bits(value: i32, category: u8) -> (u16, u8) {
        if category == 0 || category >= 16 {
            return (0, 0);
        }
        if value >= 0 {
            (value as u16, category)
        } else {
            ((value + (1 << category) - 1) as u16, category)
        }
    }

    /// Reads the additional bits of a category and extends them to a signed value (F.2.2.1).
    pub fn receive_extend(reader: &mut JpegBitReader, category: u8) -> Result<i32> {
        if category >= 16 {
            return Ok(32768);
        }
        let bits = reader.read_bits(category)?;
        Ok(Self::decode_value_bits(bits, category))
    }

    /// Decodes the value from bits given its category.
    pub fn decode_value_bits(bits: u16, category: u8) -> i32 {
        if category == 0 {
            return 0;
        }
        if category >= 16 {
            return 32768;
        }
        let threshold = 1u16 << (category - 1);
        if bits >= threshold {
            bits as i32
        } else {
            bits as i32 - (1 << category) + 1
        }
    }
}
