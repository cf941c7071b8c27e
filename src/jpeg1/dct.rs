//! Discrete Cosine Transform (A.3.3) on 8x8 blocks, computed separably.

use std::f32::consts::PI;
use std::sync::LazyLock;

pub const BLOCK_SIZE: usize = 8;
pub const BLOCK_DIM: usize = BLOCK_SIZE * BLOCK_SIZE;

/// `BASIS[u][x] = C(u) / 2 * cos((2x + 1) u PI / 16)`
static BASIS: LazyLock<[[f32; BLOCK_SIZE]; BLOCK_SIZE]> = LazyLock::new(|| {
    let mut basis = [[0.0f32; BLOCK_SIZE]; BLOCK_SIZE];
    for (u, row) in basis.iter_mut().enumerate() {
        let scale = if u == 0 { 0.5 / 2.0f32.sqrt() } else { 0.5 };
        for (x, value) in row.iter_mut().enumerate() {
            *value = scale * (((2 * x + 1) * u) as f32 * PI / 16.0).cos();
        }
    }
    basis
});

/// Forward DCT of a level-shifted block in row-major order.
pub fn fdct_8x8(input: &[f32; BLOCK_DIM], output: &mut [f32; BLOCK_DIM]) {
    let basis = &*BASIS;
    let mut rows = [0.0f32; BLOCK_DIM];
    for y in 0..BLOCK_SIZE {
        for v in 0..BLOCK_SIZE {
            rows[y * BLOCK_SIZE + v] = (0..BLOCK_SIZE)
                .map(|x| input[y * BLOCK_SIZE + x] * basis[v][x])
                .sum();
        }
    }
    for u in 0..BLOCK_SIZE {
        for v in 0..BLOCK_SIZE {
            output[u * BLOCK_SIZE + v] = (0..BLOCK_SIZE)
                .map(|y| rows[y * BLOCK_SIZE + v] * basis[u][y])
                .sum();
        }
    }
}

/// Inverse DCT; the result still carries the level shift.
pub fn idct_8x8(input: &[f32; BLOCK_DIM], output: &mut [f32; BLOCK_DIM]) {
    let basis = &*BASIS;
    let mut columns = [0.0f32; BLOCK_DIM];
    for u in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            columns[u * BLOCK_SIZE + x] = (0..BLOCK_SIZE)
                .map(|v| input[u * BLOCK_SIZE + v] * basis[v][x])
                .sum();
        }
    }
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            output[y * BLOCK_SIZE + x] = (0..BLOCK_SIZE)
                .map(|u| columns[u * BLOCK_SIZE + x] * basis[u][y])
                .sum();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fdct_idct_dc_only() {
        let input = [-128.0f32; 64];
        let mut dct_coeffs = [0.0f32; 64];
        fdct_8x8(&input, &mut dct_coeffs);
        assert!((dct_coeffs[0] + 1024.0).abs() < 0.01);
        assert!(dct_coeffs[1..].iter().all(|c| c.abs() < 0.01));

        let mut output = [0.0f32; 64];
        idct_8x8(&dct_coeffs, &mut output);
        for i in 0..64 {
            assert!((input[i] - output[i]).abs() < 0.1, "Mismatch at {i}: {} vs {}", input[i], output[i]);
        }
    }

    #[test]
    fn test_fdct_idct_gradient() {
        let mut input = [0.0f32; 64];
        for (i, value) in input.iter_mut().enumerate() {
            *value = ((i * 37) % 255) as f32 - 128.0;
        }
        let mut coeffs = [0.0f32; 64];
        let mut output = [0.0f32; 64];
        fdct_8x8(&input, &mut coeffs);
        idct_8x8(&coeffs, &mut output);
        for i in 0..64 {
            assert!((input[i] - output[i]).abs() < 0.05);
        }
    }
}
