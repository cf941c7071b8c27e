//! Frame-by-frame JPEG transcoding of pixel data and the metadata
//! bookkeeping that follows it.

use crate::codec::{CodecMode, SelectedCodec};
use crate::error::{DicomCodecError, Result};
use crate::marker_scanner::scan_for_precision;
use crate::parameters::{CodecParameters, JpegParameters, PrecisionPolicy, SampleFactor};
use crate::photometric::{LossyCompressionMethod, PhotometricInterpretation};
use crate::pixel_data::PixelData;
use crate::registry;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Encodes native pixel data into, and decodes it out of, the registered
/// JPEG transfer syntaxes.
pub struct JpegTranscoder;

impl JpegTranscoder {
    /// Registers the four JPEG process codecs. Safe to call repeatedly.
    pub fn register() {
        registry::register_codecs();
    }

    /// Compresses every frame of `old` into `new`, whose transfer syntax
    /// selects the JPEG process.
    #[instrument(skip_all, fields(transfer_syntax = %new.transfer_syntax, frames = old.frame_count()))]
    pub fn encode(old: &PixelData, new: &mut PixelData, parameters: Option<&CodecParameters>) -> Result<()> {
        let parameters = JpegParameters::normalize(parameters);
        let process = registry::lookup(new.transfer_syntax)?;
        let precision = match parameters.target_bit_depth {
            Some(bits) => bits,
            None => declared_precision(old),
        };
        let codec = process.select(precision, &parameters)?;

        let frames = transcode_frames(old.frame_count(), |frame| {
            let data = codec.encode(old, &parameters, frame)?;
            debug!(frame, bytes = data.len(), "frame encoded");
            Ok(data)
        })?;
        new.set_frames(frames);

        if codec.mode() != CodecMode::Lossless {
            new.is_lossy = true;
            new.lossy_compression_method = Some(LossyCompressionMethod::Iso10918_1);
            if new.frame_count() > 0 {
                let ratio = old.frame_size(0)? as f64 / new.frame_size(0)? as f64;
                new.lossy_compression_ratio = Some(format!("{ratio:.3}"));
            }

            if old.photometric_interpretation == PhotometricInterpretation::Rgb {
                match parameters.sample_factor {
                    SampleFactor::Sf422 => new.photometric_interpretation = PhotometricInterpretation::YbrFull422,
                    SampleFactor::Sf444 => new.photometric_interpretation = PhotometricInterpretation::YbrFull,
                    SampleFactor::Unknown => {}
                }
            }
        }

        info!(
            codec = %codec,
            frames = new.frame_count(),
            ratio = new.lossy_compression_ratio.as_deref().unwrap_or("lossless"),
            photometric = %new.photometric_interpretation,
            "encode complete"
        );
        Ok(())
    }

    /// Decompresses every frame of `old`, whose transfer syntax selects the
    /// JPEG process, into native frames of `new`.
    #[instrument(skip_all, fields(transfer_syntax = %old.transfer_syntax, frames = old.frame_count()))]
    pub fn decode(old: &PixelData, new: &mut PixelData, parameters: Option<&CodecParameters>) -> Result<()> {
        let parameters = JpegParameters::normalize(parameters);
        let codec = select_decoder(old, &parameters)?;

        let layout: &PixelData = new;
        let frames = transcode_frames(old.frame_count(), |frame| {
            let data = codec.decode(old, layout, &parameters, frame)?;
            debug!(frame, bytes = data.len(), "frame decoded");
            Ok(data)
        })?;
        new.set_frames(frames);

        if old.photometric_interpretation.is_ybr()
            && parameters.convert_colorspace_to_rgb
            && codec.mode() != CodecMode::Lossless
        {
            new.photometric_interpretation = PhotometricInterpretation::Rgb;
        }

        info!(
            codec = %codec,
            frames = new.frame_count(),
            photometric = %new.photometric_interpretation,
            "decode complete"
        );
        Ok(())
    }
}

fn declared_precision(pixel_data: &PixelData) -> u8 {
    u8::try_from(pixel_data.bits_stored).unwrap_or(u8::MAX)
}

/// Precision used to pick the decoder, following `policy`.
fn decode_precision(old: &PixelData, policy: PrecisionPolicy) -> Result<u8> {
    let scanned = || old.frame(0).and_then(scan_for_precision);
    match policy {
        PrecisionPolicy::Declared => Ok(declared_precision(old)),
        PrecisionPolicy::Scanned => scanned(),
        PrecisionPolicy::PreferScanned => match scanned() {
            Ok(precision) => {
                if precision as u16 != old.bits_stored {
                    debug!(scanned = precision, declared = old.bits_stored, "scanned precision differs from Bits Stored");
                }
                Ok(precision)
            }
            Err(error) => {
                warn!(%error, declared = old.bits_stored, "precision scan failed, using Bits Stored");
                Ok(declared_precision(old))
            }
        },
    }
}

/// Runs `transcode` for every frame index, stopping at the first failure.
/// Results land in their own slots; nothing is shared between frames.
fn transcode_frames<F>(count: usize, transcode: F) -> Result<Vec<Vec<u8>>>
where
    F: Fn(usize) -> Result<Vec<u8>> + Send + Sync,
{
    #[cfg(feature = "parallel")]
    {
        (0..count).into_par_iter().map(transcode).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..count).map(transcode).collect()
    }
}

fn select_decoder(old: &PixelData, parameters: &JpegParameters) -> Result<SelectedCodec> {
    let process = registry::lookup(old.transfer_syntax)?;
    let precision = decode_precision(old, parameters.precision_policy)?;
    process.select(precision, parameters)
}

/// Codec a decode of `old` would use, without decoding anything.
pub fn decode_codec(old: &PixelData, parameters: Option<&CodecParameters>) -> Result<SelectedCodec> {
    select_decoder(old, &JpegParameters::normalize(parameters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer_syntax::TransferSyntax;

    fn encapsulated(bits_stored: u16, frame: Vec<u8>) -> PixelData {
        let mut pixel_data = PixelData::new(
            TransferSyntax::JpegProcess14,
            1,
            1,
            16,
            bits_stored,
            1,
            PhotometricInterpretation::Monochrome2,
        );
        pixel_data.add_frame(frame);
        pixel_data
    }

    const SOF3_12_BIT: [u8; 10] = [0xFF, 0xD8, 0xFF, 0xC3, 0x00, 0x0B, 0x0C, 0x00, 0x01, 0x00];

    #[test]
    fn prefer_scanned_uses_stream_precision() {
        let old = encapsulated(16, SOF3_12_BIT.to_vec());
        assert_eq!(decode_precision(&old, PrecisionPolicy::PreferScanned).unwrap(), 12);
        assert_eq!(decode_precision(&old, PrecisionPolicy::Declared).unwrap(), 16);
    }

    #[test]
    fn prefer_scanned_falls_back_to_bits_stored() {
        let old = encapsulated(10, vec![0xFF, 0xD8, 0xFF, 0xD9]);
        assert_eq!(decode_precision(&old, PrecisionPolicy::PreferScanned).unwrap(), 10);
        assert!(matches!(
            decode_precision(&old, PrecisionPolicy::Scanned),
            Err(DicomCodecError::NotFound)
        ));
    }

    #[test]
    fn scanned_without_frames() {
        let mut old = encapsulated(8, Vec::new());
        old.set_frames(Vec::new());
        assert!(matches!(
            decode_precision(&old, PrecisionPolicy::Scanned),
            Err(DicomCodecError::FrameOutOfRange { frame: 0, count: 0 })
        ));
        assert_eq!(decode_precision(&old, PrecisionPolicy::PreferScanned).unwrap(), 8);
    }

    #[test]
    fn frame_loop_stops_at_first_error() {
        let result = transcode_frames(4, |frame| {
            if frame == 2 {
                Err(DicomCodecError::InvalidData("broken frame"))
            } else {
                Ok(vec![frame as u8])
            }
        });
        assert!(matches!(result, Err(DicomCodecError::InvalidData("broken frame"))));
        assert_eq!(transcode_frames(3, |frame| Ok(vec![frame as u8])).unwrap(), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn decode_codec_follows_scanned_precision() {
        JpegTranscoder::register();
        let old = encapsulated(16, SOF3_12_BIT.to_vec());
        let codec = decode_codec(&old, None).unwrap();
        assert_eq!(codec.precision(), 12);
        assert_eq!(codec.mode(), CodecMode::Lossless);
    }
}
