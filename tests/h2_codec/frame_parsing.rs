//! Tests for HTTP/2 frame header parsing and round-trips

use h2_window_probe::{
    decode_frame, decode_header, error_code, DataFrame, Frame, FrameType, H2Error, HeadersFrame, PrioritySpec,
    SettingsFrame, SettingsParameter,
};
use pretty_assertions::assert_eq;

#[test]
fn test_decode_header_fields() {
    let header = decode_header(&[0, 1, 0, 8, 0, 0, 0, 0, 3]).unwrap();
    assert_eq!(header.length, 256);
    assert_eq!(header.frame_type, FrameType::WindowUpdate);
    assert_eq!(header.flags, 0);
    assert_eq!(header.stream_id, 3);
}

#[test]
fn test_decode_header_ignores_reserved_bit() {
    let header = decode_header(&[0, 0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
    assert_eq!(header.stream_id, 0x7FFF_FFFF);
}

#[test]
fn test_decode_header_truncated() {
    assert_eq!(
        decode_header(&[0, 0, 0]),
        Err(H2Error::Truncated { needed: 9, available: 3 })
    );
}

#[test]
fn test_roundtrip_all_frame_types() {
    let frames = vec![
        Frame::data(1, b"payload".to_vec(), false),
        Frame::Data(DataFrame {
            stream_id: 1,
            end_stream: true,
            data: Vec::new(),
            pad_length: Some(7),
        }),
        Frame::headers(3, vec![0x82, 0x87, 0x84, 0x41, 0x00], true),
        Frame::Headers(HeadersFrame {
            stream_id: 3,
            end_stream: false,
            end_headers: true,
            priority: Some(PrioritySpec {
                exclusive: false,
                stream_dependency: 1,
                weight: 255,
            }),
            pad_length: None,
            header_block: vec![0x88],
        }),
        Frame::Settings(SettingsFrame::new(vec![
            SettingsParameter { id: 4, value: 100 },
            SettingsParameter { id: 4, value: 1 },
            SettingsParameter { id: 0xF0, value: 9 },
        ])),
        Frame::settings_ack(),
        Frame::window_update(1, 0x7FFF_FFFF),
        Frame::rst_stream(1, error_code::FLOW_CONTROL_ERROR),
        Frame::goaway(0, error_code::PROTOCOL_ERROR, Vec::new()),
    ];

    for frame in frames {
        let bytes = frame.encode().unwrap();
        let (decoded, consumed) = decode_frame(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, frame);
    }
}

#[test]
fn test_decode_frame_leaves_trailing_bytes() {
    let mut bytes = Frame::settings_ack().encode().unwrap();
    bytes.extend_from_slice(&Frame::window_update(0, 1).encode().unwrap());

    let (first, consumed) = decode_frame(&bytes).unwrap();
    assert_eq!(first, Frame::settings_ack());
    let (second, _) = decode_frame(&bytes[consumed..]).unwrap();
    assert_eq!(second, Frame::window_update(0, 1));
}
