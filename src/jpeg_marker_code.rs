use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The second byte of every JPEG marker defined in ISO/IEC 10918-1, Table B.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum JpegMarkerCode {
    /// TEM: For temporary private use in arithmetic coding.
    Temporary = 0x01,

    /// SOF_0: Baseline DCT, Huffman coding.
    StartOfFrameBaseline = 0xC0,
    /// SOF_1: Extended sequential DCT, Huffman coding.
    StartOfFrameExtendedSequential = 0xC1,
    /// SOF_2: Progressive DCT, Huffman coding.
    StartOfFrameProgressive = 0xC2,
    /// SOF_3: Lossless (sequential), Huffman coding.
    StartOfFrameLossless = 0xC3,

    /// DHT: Defines one or more Huffman tables.
    DefineHuffmanTable = 0xC4,

    /// SOF_5: Differential sequential DCT, Huffman coding.
    StartOfFrameDifferentialSequential = 0xC5,
    /// SOF_6: Differential progressive DCT, Huffman coding.
    StartOfFrameDifferentialProgressive = 0xC6,
    /// SOF_7: Differential lossless, Huffman coding.
    StartOfFrameDifferentialLossless = 0xC7,

    /// JPG: Reserved for JPEG extensions.
    JpegExtension = 0xC8,

    /// SOF_9: Extended sequential DCT, arithmetic coding.
    StartOfFrameExtendedSequentialArithmetic = 0xC9,
    /// SOF_10: Progressive DCT, arithmetic coding.
    StartOfFrameProgressiveArithmetic = 0xCA,
    /// SOF_11: Lossless (sequential), arithmetic coding.
    StartOfFrameLosslessArithmetic = 0xCB,

    /// DAC: Defines arithmetic coding conditioning.
    DefineArithmeticConditioning = 0xCC,

    /// SOF_13: Differential sequential DCT, arithmetic coding.
    StartOfFrameDifferentialSequentialArithmetic = 0xCD,
    /// SOF_14: Differential progressive DCT, arithmetic coding.
    StartOfFrameDifferentialProgressiveArithmetic = 0xCE,
    /// SOF_15: Differential lossless, arithmetic coding.
    StartOfFrameDifferentialLosslessArithmetic = 0xCF,

    /// RST_m: Restart with modulo 8 count m.
    Restart0 = 0xD0,
    Restart1 = 0xD1,
    Restart2 = 0xD2,
    Restart3 = 0xD3,
    Restart4 = 0xD4,
    Restart5 = 0xD5,
    Restart6 = 0xD6,
    Restart7 = 0xD7,

    /// SOI: Marks the start of an image.
    StartOfImage = 0xD8,

    /// EOI: Marks the end of an image.
    EndOfImage = 0xD9,

    /// SOS: Marks the start of scan.
    StartOfScan = 0xDA,

    /// DQT: Defines one or more quantization tables.
    DefineQuantizationTable = 0xDB,

    /// DNL: Defines the number of lines in a scan.
    DefineNumberOfLines = 0xDC,

    /// DRI: Defines the restart interval used in succeeding scans.
    DefineRestartInterval = 0xDD,

    /// DHP: Defines hierarchical progression.
    DefineHierarchicalProgression = 0xDE,

    /// EXP: Expands reference components.
    ExpandReferenceComponents = 0xDF,

    /// APP0: Application data 0: used for JFIF header.
    ApplicationData0 = 0xE0,
    /// APP1: Application data 1: used for EXIF or XMP header.
    ApplicationData1 = 0xE1,
    /// APP2: Application data 2: used for ICC profile.
    ApplicationData2 = 0xE2,
    ApplicationData3 = 0xE3,
    ApplicationData4 = 0xE4,
    ApplicationData5 = 0xE5,
    ApplicationData6 = 0xE6,
    ApplicationData7 = 0xE7,
    ApplicationData8 = 0xE8,
    ApplicationData9 = 0xE9,
    ApplicationData10 = 0xEA,
    ApplicationData11 = 0xEB,
    ApplicationData12 = 0xEC,
    ApplicationData13 = 0xED,
    /// APP14: Application data 14: used by Adobe
    ApplicationData14 = 0xEE,
    ApplicationData15 = 0xEF,

    /// JPG_n: Reserved for JPEG extensions.
    JpegExtension0 = 0xF0,
    JpegExtension1 = 0xF1,
    JpegExtension2 = 0xF2,
    JpegExtension3 = 0xF3,
    JpegExtension4 = 0xF4,
    JpegExtension5 = 0xF5,
    JpegExtension6 = 0xF6,
    JpegExtension7 = 0xF7,
    JpegExtension8 = 0xF8,
    JpegExtension9 = 0xF9,
    JpegExtension10 = 0xFA,
    JpegExtension11 = 0xFB,
    JpegExtension12 = 0xFC,
    JpegExtension13 = 0xFD,

    /// COM: Comment block.
    Comment = 0xFE,
}

impl JpegMarkerCode {
    /// True for the thirteen SOF_n markers (every 0xC0..=0xCF code except DHT, JPG and DAC).
    pub fn is_start_of_frame(self) -> bool {
        matches!(
            self,
            Self::StartOfFrameBaseline
                | Self::StartOfFrameExtendedSequential
                | Self::StartOfFrameProgressive
                | Self::StartOfFrameLossless
                | Self::StartOfFrameDifferentialSequential
                | Self::StartOfFrameDifferentialProgressive
                | Self::StartOfFrameDifferentialLossless
                | Self::StartOfFrameExtendedSequentialArithmetic
                | Self::StartOfFrameProgressiveArithmetic
                | Self::StartOfFrameLosslessArithmetic
                | Self::StartOfFrameDifferentialSequentialArithmetic
                | Self::StartOfFrameDifferentialProgressiveArithmetic
                | Self::StartOfFrameDifferentialLosslessArithmetic
        )
    }

    pub fn is_restart(self) -> bool {
        (JPEG_RESTART_MARKER_BASE..JPEG_RESTART_MARKER_BASE + JPEG_RESTART_MARKER_RANGE)
            .contains(&u8::from(self))
    }

    /// Markers that stand alone, without a 2-byte segment length after them.
    pub fn is_standalone(self) -> bool {
        self.is_restart()
            || matches!(self, Self::StartOfImage | Self::EndOfImage | Self::Temporary)
    }

    /// Restart marker for the given interval count (modulo 8).
    pub fn restart(index: usize) -> Self {
        match index % JPEG_RESTART_MARKER_RANGE as usize {
            0 => Self::Restart0,
            1 => Self::Restart1,
            2 => Self::Restart2,
            3 => Self::Restart3,
            4 => Self::Restart4,
            5 => Self::Restart5,
            6 => Self::Restart6,
            _ => Self::Restart7,
        }
    }
}

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;
pub const JPEG_RESTART_MARKER_BASE: u8 = 0xD0;
pub const JPEG_RESTART_MARKER_RANGE: u8 = 8;

/// Second bytes 0x02..=0xBF are reserved (RES) and carry no segment in this scanner's reading.
pub const JPEG_RESERVED_MARKER_FIRST: u8 = 0x03;
pub const JPEG_RESERVED_MARKER_LAST: u8 = 0xBF;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_of_frame_set_has_thirteen_members() {
        let count = (0xC0u8..=0xCF)
            .filter_map(|b| JpegMarkerCode::try_from(b).ok())
            .filter(|m| m.is_start_of_frame())
            .count();
        assert_eq!(count, 13);
        assert!(!JpegMarkerCode::DefineHuffmanTable.is_start_of_frame());
        assert!(!JpegMarkerCode::JpegExtension.is_start_of_frame());
        assert!(!JpegMarkerCode::DefineArithmeticConditioning.is_start_of_frame());
    }

    #[test]
    fn standalone_markers() {
        for b in 0xD0u8..=0xD9 {
            assert!(JpegMarkerCode::try_from(b).unwrap().is_standalone());
        }
        assert!(JpegMarkerCode::Temporary.is_standalone());
        assert!(!JpegMarkerCode::StartOfScan.is_standalone());
        assert!(!JpegMarkerCode::Comment.is_standalone());
    }

    #[test]
    fn restart_wraps_modulo_eight() {
        assert_eq!(JpegMarkerCode::restart(0), JpegMarkerCode::Restart0);
        assert_eq!(JpegMarkerCode::restart(9), JpegMarkerCode::Restart1);
        assert_eq!(u8::from(JpegMarkerCode::restart(15)), 0xD7);
    }

    #[test]
    fn unassigned_codes_are_rejected() {
        assert!(JpegMarkerCode::try_from(0x00u8).is_err());
        assert!(JpegMarkerCode::try_from(0x02u8).is_err());
        assert!(JpegMarkerCode::try_from(0xFFu8).is_err());
    }
}
