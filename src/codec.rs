//! JPEG process codecs and per-precision codec selection.
//!
//! Each of the four registered transfer syntaxes maps to a
//! [`JpegProcessCodec`]. Selecting with a sample precision yields a
//! [`SelectedCodec`], which transcodes single frames.

use crate::error::{DicomCodecError, Result};
use crate::jpeg1::color::{rgb_to_ycbcr, ycbcr_to_rgb};
use crate::jpeg1::{Jpeg1Decoder, Jpeg1Encoder, Jpeg1LosslessEncoder};
use crate::parameters::{JpegParameters, SampleFactor};
use crate::photometric::PhotometricInterpretation;
use crate::pixel_data::PixelData;
use crate::transfer_syntax::TransferSyntax;
use std::fmt;
use tracing::{debug, trace};

/// Whether a codec preserves samples exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecMode {
    Lossless,
    Lossy,
}

/// Coding process written into (or expected in) the SOF marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegMode {
    /// SOF0
    Baseline,
    /// SOF1
    Sequential,
    /// SOF3
    Lossless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JpegProcessCodec {
    Process1,
    Process2_4,
    Process14,
    Process14Sv1,
}

impl JpegProcessCodec {
    pub const ALL: [JpegProcessCodec; 4] = [
        Self::Process1,
        Self::Process2_4,
        Self::Process14,
        Self::Process14Sv1,
    ];

    pub fn transfer_syntax(self) -> TransferSyntax {
        match self {
            Self::Process1 => TransferSyntax::JpegProcess1,
            Self::Process2_4 => TransferSyntax::JpegProcess2_4,
            Self::Process14 => TransferSyntax::JpegProcess14,
            Self::Process14Sv1 => TransferSyntax::JpegProcess14Sv1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Process1 => "JPEG Process 1",
            Self::Process2_4 => "JPEG Process 2/4",
            Self::Process14 => "JPEG Process 14",
            Self::Process14Sv1 => "JPEG Process 14 SV1",
        }
    }

    /// Picks the implementation handling `precision` bits per sample.
    ///
    /// Process 1 covers up to 8 bits, Process 2/4 up to 12 (8-bit or
    /// 12-bit coding), the lossless processes 2 to 16 bits. Anything else
    /// fails with [`DicomCodecError::UnsupportedPrecision`].
    pub fn select(self, precision: u8, parameters: &JpegParameters) -> Result<SelectedCodec> {
        let (jpeg_mode, coded_precision) = match (self, precision) {
            (Self::Process1, 1..=8) => (JpegMode::Baseline, 8),
            (Self::Process2_4, 1..=8) => (JpegMode::Sequential, 8),
            (Self::Process2_4, 9..=12) => (JpegMode::Sequential, 12),
            (Self::Process14 | Self::Process14Sv1, 2..=16) => (JpegMode::Lossless, precision),
            _ => {
                return Err(DicomCodecError::UnsupportedPrecision {
                    precision,
                    codec: self.name(),
                });
            }
        };
        let predictor = match self {
            Self::Process14Sv1 => 1,
            _ => parameters.predictor,
        };

        let selected = SelectedCodec {
            process: self,
            jpeg_mode,
            precision: coded_precision,
            predictor,
            point_transform: parameters.point_transform,
        };
        debug!(requested = precision, codec = %selected, "selected codec");
        Ok(selected)
    }
}

impl fmt::Display for JpegProcessCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A codec bound to one sample precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedCodec {
    process: JpegProcessCodec,
    jpeg_mode: JpegMode,
    precision: u8,
    predictor: u8,
    point_transform: u8,
}

impl SelectedCodec {
    pub fn mode(&self) -> CodecMode {
        match self.jpeg_mode {
            JpegMode::Lossless => CodecMode::Lossless,
            JpegMode::Baseline | JpegMode::Sequential => CodecMode::Lossy,
        }
    }

    pub fn jpeg_mode(&self) -> JpegMode {
        self.jpeg_mode
    }

    pub fn process(&self) -> JpegProcessCodec {
        self.process
    }

    /// Sample precision written to the SOF segment.
    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn predictor(&self) -> u8 {
        self.predictor
    }

    /// RGB input is coded as YCbCr by the lossy processes whenever the
    /// chroma layout is known.
    fn converts_rgb(&self, old: &PixelData, parameters: &JpegParameters) -> bool {
        self.mode() == CodecMode::Lossy
            && old.photometric_interpretation == PhotometricInterpretation::Rgb
            && parameters.sample_factor != SampleFactor::Unknown
    }

    /// Compresses native frame `frame` of `old` into a complete JPEG stream.
    pub fn encode(&self, old: &PixelData, parameters: &JpegParameters, frame: usize) -> Result<Vec<u8>> {
        let mut planes = old.frame_planes(frame)?;
        let width = old.columns as usize;
        let height = old.rows as usize;
        trace!(frame, width, height, components = planes.len(), "encoding frame");

        match self.jpeg_mode {
            JpegMode::Lossless => {
                let mut encoder = Jpeg1LosslessEncoder::new(self.precision, self.predictor);
                encoder.set_point_transform(self.point_transform);
                encoder.set_restart_interval(parameters.restart_interval);
                encoder.encode(&planes, width, height)
            }
            JpegMode::Baseline | JpegMode::Sequential => {
                if self.converts_rgb(old, parameters) && planes.len() == 3 {
                    rgb_to_ycbcr(&mut planes, self.precision);
                }
                let mut encoder = Jpeg1Encoder::new(self.precision);
                encoder.set_extended(self.jpeg_mode == JpegMode::Sequential);
                encoder.set_quality(parameters.quality);
                encoder.set_restart_interval(parameters.restart_interval);
                if planes.len() == 3 {
                    encoder.set_luma_horizontal_sampling(parameters.sample_factor.luma_horizontal());
                }
                encoder.encode(&planes, width, height)
            }
        }
    }

    /// Decompresses frame `frame` of `old` into native bytes laid out as
    /// described by `new`.
    pub fn decode(
        &self,
        old: &PixelData,
        new: &PixelData,
        parameters: &JpegParameters,
        frame: usize,
    ) -> Result<Vec<u8>> {
        let mut decoder = Jpeg1Decoder::new(old.frame(frame)?);
        decoder.read_header()?;
        let frame_info = decoder.frame_info();
        if frame_info.width != old.columns as u32
            || frame_info.height != old.rows as u32
            || frame_info.component_count as u16 != old.samples_per_pixel
        {
            return Err(DicomCodecError::InvalidData("JPEG frame does not match the pixel data description"));
        }
        if decoder.is_lossless() != (self.jpeg_mode == JpegMode::Lossless) {
            return Err(DicomCodecError::InvalidData("JPEG frame coded with another process"));
        }
        trace!(frame, precision = frame_info.bits_per_sample, "decoding frame");

        let mut planes = decoder.decode()?;
        if self.mode() == CodecMode::Lossy
            && parameters.convert_colorspace_to_rgb
            && old.photometric_interpretation.is_ybr()
            && planes.len() == 3
        {
            ycbcr_to_rgb(&mut planes, frame_info.bits_per_sample);
        }

        // Lossy reconstruction may overshoot a Bits Stored below the coded precision
        if new.bits_stored < frame_info.bits_per_sample as u16 {
            let max = ((1u32 << new.bits_stored) - 1) as u16;
            for sample in planes.iter_mut().flatten() {
                *sample = (*sample).min(max);
            }
        }
        Ok(new.pack_planes(&planes))
    }
}

impl fmt::Display for SelectedCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}-bit {:?})", self.process, self.precision, self.jpeg_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(codec: JpegProcessCodec, precision: u8) -> Result<SelectedCodec> {
        codec.select(precision, &JpegParameters::default())
    }

    #[test]
    fn process_1_is_8_bit_baseline() {
        let codec = select(JpegProcessCodec::Process1, 8).unwrap();
        assert_eq!(codec.jpeg_mode(), JpegMode::Baseline);
        assert_eq!(codec.mode(), CodecMode::Lossy);
        assert_eq!(select(JpegProcessCodec::Process1, 6).unwrap().precision(), 8);
        assert!(matches!(
            select(JpegProcessCodec::Process1, 12),
            Err(DicomCodecError::UnsupportedPrecision { precision: 12, .. })
        ));
    }

    #[test]
    fn process_2_4_widths() {
        assert_eq!(select(JpegProcessCodec::Process2_4, 8).unwrap().precision(), 8);
        assert_eq!(select(JpegProcessCodec::Process2_4, 10).unwrap().precision(), 12);
        assert_eq!(select(JpegProcessCodec::Process2_4, 12).unwrap().jpeg_mode(), JpegMode::Sequential);
        assert!(select(JpegProcessCodec::Process2_4, 16).is_err());
    }

    #[test]
    fn lossless_precisions() {
        for precision in 2..=16 {
            let codec = select(JpegProcessCodec::Process14, precision).unwrap();
            assert_eq!(codec.mode(), CodecMode::Lossless);
            assert_eq!(codec.precision(), precision);
        }
        assert!(select(JpegProcessCodec::Process14, 0).is_err());
        assert!(select(JpegProcessCodec::Process14Sv1, 17).is_err());
    }

    #[test]
    fn sv1_forces_first_order_prediction() {
        let parameters = JpegParameters {
            predictor: 6,
            ..Default::default()
        };
        assert_eq!(JpegProcessCodec::Process14.select(16, &parameters).unwrap().predictor(), 6);
        assert_eq!(JpegProcessCodec::Process14Sv1.select(16, &parameters).unwrap().predictor(), 1);
    }

    #[test]
    fn unsupported_precision_message() {
        let err = select(JpegProcessCodec::Process1, 16).unwrap_err();
        assert_eq!(err.to_string(), "Unable to create JPEG Process 1 codec for bits stored == 16");
    }

    #[test]
    fn codec_transfer_syntaxes_are_distinct() {
        let mut syntaxes: Vec<_> = JpegProcessCodec::ALL.iter().map(|c| c.transfer_syntax().uid()).collect();
        syntaxes.dedup();
        assert_eq!(syntaxes.len(), 4);
    }
}
