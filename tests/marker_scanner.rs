use dcmjpeg_rs::{DicomCodecError, scan_for_precision};

/// SOI, a JFIF APP0 segment, then a baseline SOF with precision 8.
fn jfif_frame() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    data.extend_from_slice(b"JFIF\0");
    data.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
    data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x01, 0x00, 0x01, 0x01]);
    data.extend_from_slice(&[0x01, 0x11, 0x00]);
    data
}

#[test]
fn precision_follows_app0() {
    assert_eq!(scan_for_precision(&jfif_frame()).unwrap(), 8);
}

#[test]
fn extended_and_lossless_precisions() {
    for (marker, precision) in [(0xC1u8, 12u8), (0xC3, 16), (0xC3, 2)] {
        let data = [0xFF, 0xD8, 0xFF, marker, 0x00, 0x0B, precision, 0x00, 0x01];
        assert_eq!(scan_for_precision(&data).unwrap(), precision);
    }
}

#[test]
fn headers_without_frame_are_not_found() {
    let data = [
        0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x04, 0x00, 0x01, 0xFF, 0xDD, 0x00, 0x04, 0x00, 0x10,
        0xFF, 0xD9,
    ];
    assert!(matches!(scan_for_precision(&data), Err(DicomCodecError::NotFound)));
}

#[test]
fn truncation_inside_app0_is_a_syntax_error() {
    let data = jfif_frame();
    let err = scan_for_precision(&data[..10]).unwrap_err();
    assert!(matches!(err, DicomCodecError::Syntax { marker: 0xFFE0, .. }));
}

#[test]
fn truncation_before_precision_byte() {
    let data = jfif_frame();
    let sof = data.len() - 13;
    assert!(matches!(
        scan_for_precision(&data[..sof + 4]),
        Err(DicomCodecError::Syntax { marker: 0xFFC0, .. })
    ));
}

#[test]
fn garbage_is_a_syntax_error_at_its_offset() {
    let mut data = jfif_frame();
    data.splice(20..20, [0x00, 0x00]);
    assert!(matches!(
        scan_for_precision(&data),
        Err(DicomCodecError::Syntax { offset: 20, marker: 0x0000 })
    ));
}
