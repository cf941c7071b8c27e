//! Runs in its own process so the global registry starts empty.

use dcmjpeg_rs::registry::{global, lookup};
use dcmjpeg_rs::{DicomCodecError, JpegProcessCodec, JpegTranscoder, TransferSyntax};

#[test]
fn lookups_miss_until_registered() {
    assert!(global().is_none());
    assert!(matches!(
        lookup(TransferSyntax::JpegProcess1),
        Err(DicomCodecError::UnknownTransferSyntax(uid)) if uid == "1.2.840.10008.1.2.4.50"
    ));

    JpegTranscoder::register();
    JpegTranscoder::register();

    assert_eq!(lookup(TransferSyntax::JpegProcess1).unwrap(), JpegProcessCodec::Process1);
    assert_eq!(lookup(TransferSyntax::JpegProcess14Sv1).unwrap(), JpegProcessCodec::Process14Sv1);
    assert!(lookup(TransferSyntax::ImplicitVrLittleEndian).is_err());
}
