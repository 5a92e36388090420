//! Tests for H2Codec processing (bytes -> frames)

use h2_window_probe::{flags, Frame, H2Codec, CONNECTION_PREFACE};

#[test]
fn test_codec_parse_data() {
    let mut codec = H2Codec::without_preface();

    let mut frame = vec![0, 0, 5, 0, flags::END_STREAM, 0, 0, 0, 1];
    frame.extend_from_slice(b"hello");

    let frames = codec.process(&frame).unwrap();
    assert_eq!(frames, vec![Frame::data(1, b"hello".to_vec(), true)]);
}

#[test]
fn test_codec_byte_at_a_time() {
    let mut codec = H2Codec::new();
    let mut data = CONNECTION_PREFACE.to_vec();
    data.extend_from_slice(&Frame::settings(Vec::new()).encode().unwrap());
    data.extend_from_slice(&Frame::headers(1, vec![0x82], true).encode().unwrap());

    let mut frames = Vec::new();
    for byte in &data {
        frames.extend(codec.process(std::slice::from_ref(byte)).unwrap());
    }

    assert_eq!(
        frames,
        vec![Frame::settings(Vec::new()), Frame::headers(1, vec![0x82], true)]
    );
    assert_eq!(codec.buffered(), 0);
}

#[test]
fn test_multiple_frames_in_single_process() {
    let mut codec = H2Codec::without_preface();

    let mut data = Frame::settings_ack().encode().unwrap();
    data.extend_from_slice(&Frame::window_update(0, 100).encode().unwrap());
    data.extend_from_slice(&Frame::data(1, b"x".to_vec(), false).encode().unwrap());

    let frames = codec.process(&data).unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[2], Frame::data(1, b"x".to_vec(), false));
}

#[test]
fn test_buffer_preserves_remaining_data() {
    let mut codec = H2Codec::without_preface();

    let first = Frame::data(1, b"abc".to_vec(), false).encode().unwrap();
    let second = Frame::data(1, b"defgh".to_vec(), true).encode().unwrap();
    let mut data = first.clone();
    data.extend_from_slice(&second[..4]);

    assert_eq!(codec.process(&data).unwrap().len(), 1);
    assert_eq!(codec.buffered(), 4);
    let frames = codec.process(&second[4..]).unwrap();
    assert_eq!(frames, vec![Frame::data(1, b"defgh".to_vec(), true)]);
}

#[test]
fn test_unknown_frame_type_passed_through() {
    let mut codec = H2Codec::without_preface();
    let frames = codec.process(&[0, 0, 1, 0xFA, 0, 0, 0, 0, 1, 0xEE]).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].frame_type().to_string(), "TYPE_250");
}

#[test]
fn test_codec_reset_allows_new_preface() {
    let mut codec = H2Codec::new();
    let mut data = CONNECTION_PREFACE.to_vec();
    data.extend_from_slice(&[0, 0, 0, 4, 0, 0, 0, 0, 0]);
    codec.process(&data).unwrap();

    codec.reset();
    assert!(!codec.preface_received());
    assert_eq!(codec.process(&data).unwrap().len(), 1);
}
