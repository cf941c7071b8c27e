use crate::error::{DicomCodecError, Result};
use std::fmt;
use std::str::FromStr;

/// Transfer syntaxes this crate reads or produces pixel data for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferSyntax {
    ImplicitVrLittleEndian,
    ExplicitVrLittleEndian,
    /// JPEG Baseline (Process 1)
    JpegProcess1,
    /// JPEG Extended (Process 2 & 4)
    JpegProcess2_4,
    /// JPEG Lossless, Non-Hierarchical (Process 14)
    JpegProcess14,
    /// JPEG Lossless, Non-Hierarchical, First-Order Prediction (Process 14 [Selection Value 1])
    JpegProcess14Sv1,
}

impl TransferSyntax {
    pub const ALL: [TransferSyntax; 6] = [
        Self::ImplicitVrLittleEndian,
        Self::ExplicitVrLittleEndian,
        Self::JpegProcess1,
        Self::JpegProcess2_4,
        Self::JpegProcess14,
        Self::JpegProcess14Sv1,
    ];

    pub fn uid(self) -> &'static str {
        match self {
            Self::ImplicitVrLittleEndian => "1.2.840.10008.1.2",
            Self::ExplicitVrLittleEndian => "1.2.840.10008.1.2.1",
            Self::JpegProcess1 => "1.2.840.10008.1.2.4.50",
            Self::JpegProcess2_4 => "1.2.840.10008.1.2.4.51",
            Self::JpegProcess14 => "1.2.840.10008.1.2.4.57",
            Self::JpegProcess14Sv1 => "1.2.840.10008.1.2.4.70",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ImplicitVrLittleEndian => "Implicit VR Little Endian",
            Self::ExplicitVrLittleEndian => "Explicit VR Little Endian",
            Self::JpegProcess1 => "JPEG Baseline (Process 1)",
            Self::JpegProcess2_4 => "JPEG Extended (Process 2 & 4)",
            Self::JpegProcess14 => "JPEG Lossless, Non-Hierarchical (Process 14)",
            Self::JpegProcess14Sv1 => {
                "JPEG Lossless, Non-Hierarchical, First-Order Prediction (Process 14 [Selection Value 1])"
            }
        }
    }

    /// Pixel data is stored as fragments of compressed frames.
    pub fn is_encapsulated(self) -> bool {
        !matches!(
            self,
            Self::ImplicitVrLittleEndian | Self::ExplicitVrLittleEndian
        )
    }

    pub fn is_lossy(self) -> bool {
        matches!(self, Self::JpegProcess1 | Self::JpegProcess2_4)
    }
}

impl FromStr for TransferSyntax {
    type Err = DicomCodecError;

    fn from_str(uid: &str) -> Result<Self> {
        // UI values may carry a trailing NUL pad
        let uid = uid.trim_end_matches(['\0', ' ']);
        Self::ALL
            .into_iter()
            .find(|ts| ts.uid() == uid)
            .ok_or_else(|| DicomCodecError::UnknownTransferSyntax(uid.to_string()))
    }
}

impl fmt::Display for TransferSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_lookup() {
        assert_eq!(
            "1.2.840.10008.1.2.4.70".parse::<TransferSyntax>().unwrap(),
            TransferSyntax::JpegProcess14Sv1
        );
        assert_eq!(
            "1.2.840.10008.1.2.4.50\0".parse::<TransferSyntax>().unwrap(),
            TransferSyntax::JpegProcess1
        );
    }

    #[test]
    fn unknown_uid() {
        let err = "1.2.840.10008.1.2.5".parse::<TransferSyntax>().unwrap_err();
        assert!(matches!(err, DicomCodecError::UnknownTransferSyntax(uid) if uid == "1.2.840.10008.1.2.5"));
    }

    #[test]
    fn encapsulation() {
        assert!(!TransferSyntax::ExplicitVrLittleEndian.is_encapsulated());
        assert!(TransferSyntax::JpegProcess14.is_encapsulated());
        assert!(TransferSyntax::JpegProcess2_4.is_lossy());
        assert!(!TransferSyntax::JpegProcess14Sv1.is_lossy());
    }
}
