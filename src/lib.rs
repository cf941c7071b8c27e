//! JPEG pixel-data transcoding for DICOM.
//!
//! Covers the four JPEG transfer syntaxes of ISO/IEC 10918-1:
//! - JPEG Baseline (Process 1), 8-bit.
//! - JPEG Extended (Process 2 & 4), 8 and 12-bit.
//! - JPEG Lossless (Process 14), 2 to 16-bit, predictors 1-7.
//! - JPEG Lossless SV1 (Process 14, first-order prediction).
//!
//! Call [`JpegTranscoder::register`] once, then use [`JpegTranscoder::encode`]
//! and [`JpegTranscoder::decode`] to move frames between native and
//! encapsulated [`PixelData`].

pub mod codec;
pub mod error;
pub mod jpeg1;
pub mod jpeg_marker_code;
pub mod jpeg_stream_reader;
pub mod jpeg_stream_writer;
pub mod logger;
pub mod marker_scanner;
pub mod parameters;
pub mod photometric;
pub mod pixel_data;
pub mod registry;
pub mod transcoder;
pub mod transfer_syntax;

pub use codec::{CodecMode, JpegMode, JpegProcessCodec, SelectedCodec};
pub use error::{DicomCodecError, Result};
pub use marker_scanner::scan_for_precision;
pub use parameters::{CodecParameters, JpegParameters, PrecisionPolicy, RleParameters, SampleFactor};
pub use photometric::{LossyCompressionMethod, PhotometricInterpretation};
pub use pixel_data::PixelData;
pub use registry::{CodecRegistry, register_codecs};
pub use transcoder::JpegTranscoder;
pub use transfer_syntax::TransferSyntax;

/// Geometry and precision carried by a SOF segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: u8,
    pub component_count: u8,
}
