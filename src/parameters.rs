use tracing::warn;

/// Chroma subsampling used when encoding 3-component images with a lossy process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFactor {
    #[default]
    Sf444,
    Sf422,
    Unknown,
}

impl SampleFactor {
    /// Horizontal sampling factor of the luminance component.
    pub fn luma_horizontal(self) -> u8 {
        match self {
            Self::Sf422 => 2,
            Self::Sf444 | Self::Unknown => 1,
        }
    }
}

/// Where the decode path takes the precision used to select a codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecisionPolicy {
    /// Bits Stored of the compressed pixel data.
    Declared,
    /// The SOF precision of frame 0; scan failures are fatal.
    Scanned,
    /// The SOF precision of frame 0, falling back to Bits Stored when the scan fails.
    #[default]
    PreferScanned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegParameters {
    /// 1..=100, scales the standard quantization tables.
    pub quality: u8,
    pub sample_factor: SampleFactor,
    pub convert_colorspace_to_rgb: bool,
    /// Lossless selection value, 1..=7.
    pub predictor: u8,
    pub point_transform: u8,
    /// MCUs (or samples, for lossless) between restart markers; 0 disables them.
    pub restart_interval: u16,
    /// Overrides Bits Stored as the precision used to select the encoder.
    pub target_bit_depth: Option<u8>,
    pub precision_policy: PrecisionPolicy,
}

impl Default for JpegParameters {
    fn default() -> Self {
        Self {
            quality: 90,
            sample_factor: SampleFactor::Sf444,
            convert_colorspace_to_rgb: false,
            predictor: 1,
            point_transform: 0,
            restart_interval: 0,
            target_bit_depth: None,
            precision_policy: PrecisionPolicy::PreferScanned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RleParameters {
    pub reverse_byte_order: bool,
}

/// Codec configuration as handed over by the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecParameters {
    Jpeg(JpegParameters),
    Rle(RleParameters),
}

impl From<JpegParameters> for CodecParameters {
    fn from(parameters: JpegParameters) -> Self {
        Self::Jpeg(parameters)
    }
}

impl JpegParameters {
    /// JPEG parameters to use for a call, substituting the defaults when none
    /// were given or they belong to another codec.
    pub fn normalize(parameters: Option<&CodecParameters>) -> JpegParameters {
        match parameters {
            Some(CodecParameters::Jpeg(jpeg)) => jpeg.clone(),
            Some(other) => {
                warn!(?other, "non-JPEG codec parameters supplied, using defaults");
                JpegParameters::default()
            }
            None => JpegParameters::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_parameters_use_defaults() {
        assert_eq!(JpegParameters::normalize(None), JpegParameters::default());
    }

    #[test]
    fn foreign_parameters_use_defaults() {
        let rle = CodecParameters::Rle(RleParameters {
            reverse_byte_order: true,
        });
        assert_eq!(
            JpegParameters::normalize(Some(&rle)),
            JpegParameters::default()
        );
    }

    #[test]
    fn jpeg_parameters_are_kept() {
        let custom = JpegParameters {
            quality: 50,
            sample_factor: SampleFactor::Sf422,
            ..Default::default()
        };
        let normalized = JpegParameters::normalize(Some(&custom.clone().into()));
        assert_eq!(normalized, custom);
    }
}
