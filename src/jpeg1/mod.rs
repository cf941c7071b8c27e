//! JPEG 1 (ISO/IEC 10918-1 / ITU-T T.81) Huffman-coded processes.
//!
//! Features:
//! - Baseline sequential (SOF0) and extended sequential (SOF1) at 8 and 12 bits.
//! - Lossless (SOF3) at 2 to 16 bits with predictors 1-7 and point transform.
//! - Standard and optimized Huffman tables.
//! - Restart markers (DRI/RSTm) and 4:4:4 / 4:2:2 sampling.

pub mod color;
pub mod dct;
pub mod decoder;
pub mod encoder;
pub mod huffman;
pub mod lossless;
pub mod quantization;

pub use decoder::Jpeg1Decoder;
pub use encoder::Jpeg1Encoder;
pub use lossless::Jpeg1LosslessEncoder;
