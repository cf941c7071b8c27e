//! Closed enumerations for the string-valued attributes the codec rewrites.
//! They are turned into DICOM code strings only at the container boundary.

use crate::error::{DicomCodecError, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhotometricInterpretation {
    Monochrome1,
    Monochrome2,
    PaletteColor,
    Rgb,
    YbrFull,
    YbrFull422,
    YbrPartial422,
    YbrPartial420,
    YbrIct,
    YbrRct,
}

impl PhotometricInterpretation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monochrome1 => "MONOCHROME1",
            Self::Monochrome2 => "MONOCHROME2",
            Self::PaletteColor => "PALETTE COLOR",
            Self::Rgb => "RGB",
            Self::YbrFull => "YBR_FULL",
            Self::YbrFull422 => "YBR_FULL_422",
            Self::YbrPartial422 => "YBR_PARTIAL_422",
            Self::YbrPartial420 => "YBR_PARTIAL_420",
            Self::YbrIct => "YBR_ICT",
            Self::YbrRct => "YBR_RCT",
        }
    }

    /// Any of the `YBR_*` color models.
    pub fn is_ybr(self) -> bool {
        self.as_str().starts_with("YBR_")
    }

    pub fn is_monochrome(self) -> bool {
        matches!(self, Self::Monochrome1 | Self::Monochrome2)
    }
}

impl FromStr for PhotometricInterpretation {
    type Err = DicomCodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_end_matches(['\0', ' ']) {
            "MONOCHROME1" => Ok(Self::Monochrome1),
            "MONOCHROME2" => Ok(Self::Monochrome2),
            "PALETTE COLOR" => Ok(Self::PaletteColor),
            "RGB" => Ok(Self::Rgb),
            "YBR_FULL" => Ok(Self::YbrFull),
            "YBR_FULL_422" => Ok(Self::YbrFull422),
            "YBR_PARTIAL_422" => Ok(Self::YbrPartial422),
            "YBR_PARTIAL_420" => Ok(Self::YbrPartial420),
            "YBR_ICT" => Ok(Self::YbrIct),
            "YBR_RCT" => Ok(Self::YbrRct),
            other => Err(DicomCodecError::UnknownPhotometricInterpretation(
                other.to_string(),
            )),
        }
    }
}

impl fmt::Display for PhotometricInterpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defined terms of Lossy Image Compression Method (0028,2114).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LossyCompressionMethod {
    /// JPEG Lossy Compression
    Iso10918_1,
    /// JPEG-LS Near-lossless Compression
    Iso14495_1,
    /// JPEG 2000 Irreversible Compression
    Iso15444_1,
}

impl LossyCompressionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Iso10918_1 => "ISO_10918_1",
            Self::Iso14495_1 => "ISO_14495_1",
            Self::Iso15444_1 => "ISO_15444_1",
        }
    }
}

impl fmt::Display for LossyCompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_print() {
        let pi: PhotometricInterpretation = "YBR_FULL_422 ".parse().unwrap();
        assert_eq!(pi, PhotometricInterpretation::YbrFull422);
        assert_eq!(pi.to_string(), "YBR_FULL_422");
        assert!(pi.is_ybr());
        assert!(!PhotometricInterpretation::Rgb.is_ybr());
    }

    #[test]
    fn unknown_string() {
        assert!(matches!(
            "HSV".parse::<PhotometricInterpretation>(),
            Err(DicomCodecError::UnknownPhotometricInterpretation(s)) if s == "HSV"
        ));
    }

    #[test]
    fn jpeg_method_token() {
        assert_eq!(LossyCompressionMethod::Iso10918_1.as_str(), "ISO_10918_1");
    }
}
