//! Tests for HEADERS + CONTINUATION reassembly

use h2_window_probe::{flags, Frame, H2Codec, ProtocolError, H2Error, MAX_HEADER_BLOCK_SIZE};

#[test]
fn test_continuation_multiple_frames() {
    let mut codec = H2Codec::without_preface();

    let mut data = vec![0, 0, 2, 1, 0, 0, 0, 0, 3];
    data.extend_from_slice(&[0x82, 0x86]);
    data.extend_from_slice(&[0, 0, 2, 9, 0, 0, 0, 0, 3]);
    data.extend_from_slice(&[0x84, 0x41]);
    data.extend_from_slice(&[0, 0, 1, 9, flags::END_HEADERS, 0, 0, 0, 3]);
    data.extend_from_slice(&[0x8a]);

    let frames = codec.process(&data).unwrap();
    assert_eq!(
        frames,
        vec![Frame::headers(3, vec![0x82, 0x86, 0x84, 0x41, 0x8a], false)]
    );
}

#[test]
fn test_continuation_preserves_end_stream() {
    let mut codec = H2Codec::without_preface();

    let mut data = vec![0, 0, 2, 1, flags::END_STREAM, 0, 0, 0, 1];
    data.extend_from_slice(&[0x82, 0x86]);
    data.extend_from_slice(&[0, 0, 1, 9, flags::END_HEADERS, 0, 0, 0, 1]);
    data.extend_from_slice(&[0x84]);

    let frames = codec.process(&data).unwrap();
    assert_eq!(frames, vec![Frame::headers(1, vec![0x82, 0x86, 0x84], true)]);
}

#[test]
fn test_interleaved_frame_during_header_block_is_rejected() {
    let mut codec = H2Codec::without_preface();

    let mut data = vec![0, 0, 1, 1, 0, 0, 0, 0, 1, 0x82];
    data.extend_from_slice(&Frame::settings(Vec::new()).encode().unwrap());

    let err = codec.process(&data).unwrap_err();
    assert!(matches!(err, H2Error::Protocol(ProtocolError::ExpectedContinuation { expected: 1, .. })));
}

#[test]
fn test_continuation_size_bound_rejects_oversized_block() {
    let mut codec = H2Codec::without_preface();

    let chunk = vec![0u8; 64 * 1024];
    let mut data = Frame::Headers(h2_window_probe::HeadersFrame {
        stream_id: 1,
        end_stream: false,
        end_headers: false,
        priority: None,
        pad_length: None,
        header_block: chunk.clone(),
    })
    .encode()
    .unwrap();
    for _ in 0..4 {
        data.extend_from_slice(&[0x01, 0x00, 0x00, 9, 0, 0, 0, 0, 1]);
        data.extend_from_slice(&chunk);
    }

    let err = codec.process(&data).unwrap_err();
    assert_eq!(
        err,
        H2Error::Protocol(ProtocolError::HeaderBlockTooLarge {
            len: 5 * 64 * 1024,
            max: MAX_HEADER_BLOCK_SIZE,
        })
    );
}
