//! Tests for HTTP/2 frame building

use h2_window_probe::{
    encode_header, error_code, flags, frame_type, Frame, FrameType, H2Error, Setting, SettingsFrame,
    SettingsParameter,
};

#[test]
fn test_create_rst_stream() {
    let frame = Frame::rst_stream(1, error_code::HTTP_1_1_REQUIRED).encode().unwrap();
    assert_eq!(frame.len(), 13);
    assert_eq!(&frame[0..3], &[0, 0, 4]);
    assert_eq!(frame[3], frame_type::RST_STREAM);
    assert_eq!(&frame[5..9], &[0, 0, 0, 1]);
    assert_eq!(&frame[9..13], &[0, 0, 0, 0xd]);
}

#[test]
fn test_create_settings_ack() {
    let frame = Frame::settings_ack().encode().unwrap();
    assert_eq!(frame, vec![0, 0, 0, frame_type::SETTINGS, flags::ACK, 0, 0, 0, 0]);
}

#[test]
fn test_create_settings_empty() {
    let frame = Frame::settings(Vec::new()).encode().unwrap();
    assert_eq!(frame, vec![0, 0, 0, 4, 0, 0, 0, 0, 0]);
}

#[test]
fn test_create_settings_with_repeated_window_size() {
    let frame = Frame::Settings(SettingsFrame::initial_window_sizes([0, 65536])).encode().unwrap();
    assert_eq!(frame.len(), 21);
    assert_eq!(&frame[0..3], &[0, 0, 12]);
    assert_eq!(&frame[9..15], &[0, 4, 0, 0, 0, 0]);
    assert_eq!(&frame[15..21], &[0, 4, 0, 1, 0, 0]);
}

#[test]
fn test_create_settings_keeps_parameter_order() {
    let frame = Frame::settings(vec![
        SettingsParameter::new(Setting::MaxFrameSize, 16384),
        SettingsParameter::new(Setting::EnablePush, 0),
    ])
    .encode()
    .unwrap();
    assert_eq!(&frame[9..11], &[0, 5]);
    assert_eq!(&frame[15..17], &[0, 2]);
}

#[test]
fn test_create_window_update() {
    let frame = Frame::window_update(7, 32768).encode().unwrap();
    assert_eq!(frame, vec![0, 0, 4, 8, 0, 0, 0, 0, 7, 0, 0, 0x80, 0]);
}

#[test]
fn test_create_goaway_with_debug_data() {
    let frame = Frame::goaway(5, error_code::NO_ERROR, b"bye".to_vec()).encode().unwrap();
    assert_eq!(frame.len(), 9 + 8 + 3);
    assert_eq!(frame[3], frame_type::GOAWAY);
    assert_eq!(&frame[17..], b"bye");
}

#[test]
fn test_create_headers_matches_probe_bytes() {
    // :method GET, :scheme https, :path /, :authority ""
    let block = vec![0x82, 0x87, 0x84, 0x41, 0x00];
    let frame = Frame::headers(1, block, true).encode().unwrap();
    assert_eq!(&frame[..9], &[0, 0, 5, 1, flags::END_STREAM | flags::END_HEADERS, 0, 0, 0, 1]);
}

#[test]
fn test_encode_header_limits() {
    assert_eq!(
        encode_header(FrameType::Data, 0, 0x8000_0000, 0),
        Err(H2Error::InvalidStreamId { stream_id: 0x8000_0000 })
    );
    assert_eq!(
        encode_header(FrameType::Data, 0, 1, 1 << 24),
        Err(H2Error::PayloadTooLarge { len: 1 << 24 })
    );
    assert!(encode_header(FrameType::Data, 0, 0x7FFF_FFFF, (1 << 24) - 1).is_ok());
}

#[test]
fn test_oversized_data_frame_rejected() {
    let frame = Frame::data(1, vec![0u8; 1 << 24], false);
    assert_eq!(frame.encode(), Err(H2Error::PayloadTooLarge { len: 1 << 24 }));
}
