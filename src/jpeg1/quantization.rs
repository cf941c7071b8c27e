//! Quantization tables and the quantization of DCT coefficients.
//! Tables are held in natural (row-major) order.

use crate::jpeg1::dct::BLOCK_DIM;

/// Zigzag scan pattern for 8x8 blocks (Figure A.6): zigzag index to natural index.
#[rustfmt::skip]
pub const ZIGZAG_ORDER: [usize; BLOCK_DIM] = [
    0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

pub type QuantizationTable = [u16; BLOCK_DIM];

/// Standard JPEG luminance quantization table (Table K.1).
#[rustfmt::skip]
pub const STD_LUMINANCE_QUANT_TABLE: QuantizationTable = [
    16, 11, 10, 16, 24, 40, 51, 61,
    12, 12, 14, 19, 26, 58, 60, 55,
    14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62,
    18, 22, 37, 56, 68, 109, 103, 77,
    24, 35, 55, 64, 81, 104, 113, 92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Standard JPEG chrominance quantization table (Table K.2).
#[rustfmt::skip]
pub const STD_CHROMINANCE_QUANT_TABLE: QuantizationTable = [
    17, 18, 24, 47, 99, 99, 99, 99,
    18, 21, 26, 66, 99, 99, 99, 99,
    24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
];

/// Quantizes DCT coefficients using a quantization table.
pub fn quantize_block(dct_block: &[f32; BLOCK_DIM], quant_table: &QuantizationTable, output: &mut [i32; BLOCK_DIM]) {
    for i in 0..BLOCK_DIM {
        output[i] = (dct_block[i] / quant_table[i] as f32).round() as i32;
    }
}

/// De-quantizes DCT coefficients.
pub fn dequantize_block(quant_block: &[i32; BLOCK_DIM], quant_table: &QuantizationTable, output: &mut [f32; BLOCK_DIM]) {
    for i in 0..BLOCK_DIM {
        output[i] = quant_block[i] as f32 * quant_table[i] as f32;
    }
}

/// Scales a quantization table by a quality factor (1-100), IJG style.
/// Entries stay within 1..=255 so the table fits an 8-bit DQT.
pub fn get_scaled_quant_table(base_table: &QuantizationTable, quality: u8) -> QuantizationTable {
    let quality = quality.clamp(1, 100) as u32;
    let s = if quality < 50 { 5000 / quality } else { 200 - 2 * quality };

    let mut scaled_table = [0u16; BLOCK_DIM];
    for (scaled, &base) in scaled_table.iter_mut().zip(base_table) {
        *scaled = ((base as u32 * s + 50) / 100).clamp(1, 255) as u16;
    }
    scaled_table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_50_is_identity() {
        assert_eq!(
            get_scaled_quant_table(&STD_LUMINANCE_QUANT_TABLE, 50),
            STD_LUMINANCE_QUANT_TABLE
        );
    }

    #[test]
    fn quality_extremes_are_clamped() {
        assert!(get_scaled_quant_table(&STD_CHROMINANCE_QUANT_TABLE, 100).iter().all(|&q| q == 1));
        assert!(get_scaled_quant_table(&STD_LUMINANCE_QUANT_TABLE, 0).iter().all(|&q| q <= 255));
    }

    #[test]
    fn zigzag_is_a_permutation() {
        let mut seen = [false; BLOCK_DIM];
        for &natural in &ZIGZAG_ORDER {
            seen[natural] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
