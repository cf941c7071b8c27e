use thiserror::Error;

#[derive(Error, Debug)]
pub enum DicomCodecError {
    /// The marker stream holds a tag that is not a JPEG marker, or a segment
    /// whose declared length runs past the end of the buffer.
    #[error("Not a recognized JPEG marker sequence at offset {offset} (marker 0x{marker:04X})")]
    Syntax { offset: usize, marker: u16 },

    #[error("No start of frame marker present")]
    NotFound,

    #[error("Unable to create {codec} codec for bits stored == {precision}")]
    UnsupportedPrecision { precision: u8, codec: &'static str },

    #[error("Unknown transfer syntax: {0}")]
    UnknownTransferSyntax(String),

    #[error("Unknown photometric interpretation: {0}")]
    UnknownPhotometricInterpretation(String),

    #[error("Invalid data: {0}")]
    InvalidData(&'static str),

    #[error("Destination too small")]
    DestinationTooSmall,

    #[error("Parameter value not supported: {0}")]
    ParameterValueNotSupported(&'static str),

    #[error("Requested frame {frame} out of range (frame count {count})")]
    FrameOutOfRange { frame: usize, count: usize },

    #[error("Frame {frame} holds {actual} bytes, expected {expected}")]
    InvalidFrameSize {
        frame: usize,
        expected: usize,
        actual: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DicomCodecError>;
