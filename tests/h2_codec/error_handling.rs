//! Tests for codec error reporting

use h2_window_probe::{
    decode_frame, ErrorKind, Frame, FrameSizeError, FrameType, H2Codec, H2Error, ProtocolError,
};

#[test]
fn test_settings_ack_with_payload_is_frame_size_error() {
    let frame = [0, 0, 6, 4, 1, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0];
    assert_eq!(
        decode_frame(&frame).unwrap_err(),
        H2Error::FrameSize(FrameSizeError::SettingsAckWithPayload { len: 6 })
    );
}

#[test]
fn test_settings_bad_length_is_frame_size_error() {
    let frame = [0, 0, 5, 4, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0];
    assert_eq!(decode_frame(&frame).unwrap_err().kind(), ErrorKind::FrameSize);
}

#[test]
fn test_window_update_zero_increment_is_protocol_error() {
    let frame = [0, 0, 4, 8, 0, 0, 0, 0, 3, 0, 0, 0, 0];
    assert_eq!(
        decode_frame(&frame).unwrap_err(),
        H2Error::Protocol(ProtocolError::ZeroWindowIncrement { stream_id: 3 })
    );
}

#[test]
fn test_window_update_too_short_returns_error() {
    let frame = [0, 0, 2, 8, 0, 0, 0, 0, 1, 0, 0];
    assert_eq!(
        decode_frame(&frame).unwrap_err(),
        H2Error::FrameSize(FrameSizeError::FixedLength {
            frame_type: FrameType::WindowUpdate,
            expected: 4,
            len: 2,
        })
    );
}

#[test]
fn test_goaway_too_short_returns_error() {
    let frame = [0, 0, 4, 7, 0, 0, 0, 0, 0, 0, 0, 0, 5];
    assert_eq!(decode_frame(&frame).unwrap_err().kind(), ErrorKind::FrameSize);
}

#[test]
fn test_rst_stream_too_short_returns_error() {
    let frame = [0, 0, 2, 3, 0, 0, 0, 0, 1, 0, 0];
    assert_eq!(decode_frame(&frame).unwrap_err().kind(), ErrorKind::FrameSize);
}

#[test]
fn test_rst_stream_on_connection_is_protocol_error() {
    let frame = [0, 0, 4, 3, 0, 0, 0, 0, 0, 0, 0, 0, 8];
    assert_eq!(
        decode_frame(&frame).unwrap_err(),
        H2Error::Protocol(ProtocolError::ExpectedStream {
            frame_type: FrameType::RstStream,
        })
    );
}

#[test]
fn test_data_on_connection_is_protocol_error() {
    let frame = [0, 0, 1, 0, 0, 0, 0, 0, 0, b'x'];
    assert_eq!(decode_frame(&frame).unwrap_err().kind(), ErrorKind::Protocol);
}

#[test]
fn test_goaway_on_stream_is_protocol_error() {
    let frame = [0, 0, 8, 7, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0];
    assert_eq!(decode_frame(&frame).unwrap_err().kind(), ErrorKind::Protocol);
}

#[test]
fn test_codec_surfaces_decode_errors() {
    let mut codec = H2Codec::without_preface();
    let err = codec.process(&[0, 0, 4, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(!err.is_recoverable());
}

#[test]
fn test_truncated_is_recoverable() {
    let err = decode_frame(&[0, 0, 4, 8, 0, 0, 0, 0, 0, 0]).unwrap_err();
    assert_eq!(err, H2Error::Truncated { needed: 13, available: 10 });
    assert!(err.is_recoverable());
}

#[test]
fn test_decode_error_after_data_keeps_the_data() {
    let mut codec = H2Codec::without_preface();

    let mut data = Frame::data(1, vec![1, 2, 3], false).encode().unwrap();
    data.extend_from_slice(&[0, 0, 4, 8, 0, 0, 0, 0, 1, 0, 0, 0, 0]);
    data.extend(Frame::settings_ack().encode().unwrap());

    let frames = codec.process(&data).unwrap();
    assert_eq!(frames, vec![Frame::data(1, vec![1, 2, 3], false)]);
    assert_eq!(
        codec.take_error(),
        Some(H2Error::Protocol(ProtocolError::ZeroWindowIncrement { stream_id: 1 }))
    );
    assert_eq!(codec.take_error(), None);
}
