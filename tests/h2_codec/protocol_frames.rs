//! Tests for SETTINGS and WINDOW_UPDATE payload decoding

use h2_window_probe::{decode_frame, settings_id, Frame, Setting, SettingsFrame};

fn settings_bytes(params: &[(u16, u32)], flags: u8) -> Vec<u8> {
    let mut frame = vec![0, 0, (params.len() * 6) as u8, 4, flags, 0, 0, 0, 0];
    for (id, value) in params {
        frame.extend_from_slice(&id.to_be_bytes());
        frame.extend_from_slice(&value.to_be_bytes());
    }
    frame
}

fn decode_settings(bytes: &[u8]) -> SettingsFrame {
    match decode_frame(bytes).unwrap().0 {
        Frame::Settings(settings) => settings,
        other => panic!("Expected Settings frame, got {other:?}"),
    }
}

#[test]
fn test_settings_ack_parsing() {
    let settings = decode_settings(&settings_bytes(&[], 1));
    assert!(settings.ack);
    assert!(settings.parameters.is_empty());
}

#[test]
fn test_settings_parsing_initial_window_size() {
    let settings = decode_settings(&settings_bytes(&[(settings_id::INITIAL_WINDOW_SIZE, 1_048_576)], 0));
    assert!(!settings.ack);
    assert_eq!(settings.parameters.len(), 1);
    assert_eq!(settings.parameters[0].setting(), Some(Setting::InitialWindowSize));
    assert_eq!(settings.parameters[0].value, 1_048_576);
}

#[test]
fn test_settings_parsing_multiple_settings() {
    let settings = decode_settings(&settings_bytes(
        &[
            (settings_id::HEADER_TABLE_SIZE, 4096),
            (settings_id::MAX_CONCURRENT_STREAMS, 100),
            (settings_id::MAX_HEADER_LIST_SIZE, 8192),
        ],
        0,
    ));
    let ids: Vec<u16> = settings.parameters.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 3, 6]);
}

#[test]
fn test_settings_same_id_is_not_deduplicated() {
    let settings = decode_settings(&settings_bytes(&[(4, 0), (4, 65536), (4, 0)], 0));
    let values: Vec<u32> = settings.parameters.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![0, 65536, 0]);
}

#[test]
fn test_settings_parsing_unknown_setting_kept_and_flagged() {
    let settings = decode_settings(&settings_bytes(&[(0xFF, 42), (settings_id::ENABLE_PUSH, 0)], 0));
    assert_eq!(settings.parameters.len(), 2);
    assert!(!settings.parameters[0].is_known());
    assert_eq!(settings.parameters[0].value, 42);
    assert!(settings.parameters[1].is_known());
}

#[test]
fn test_window_update_parsing() {
    let mut frame = vec![0, 0, 4, 8, 0, 0, 0, 0, 5];
    frame.extend_from_slice(&0x00010000u32.to_be_bytes());

    let (decoded, _) = decode_frame(&frame).unwrap();
    assert_eq!(decoded, Frame::window_update(5, 65536));
}

#[test]
fn test_window_update_connection_level() {
    let mut frame = vec![0, 0, 4, 8, 0, 0, 0, 0, 0];
    frame.extend_from_slice(&0x00100000u32.to_be_bytes());

    let (decoded, _) = decode_frame(&frame).unwrap();
    assert_eq!(decoded.stream_id(), 0);
    assert_eq!(decoded, Frame::window_update(0, 0x100000));
}
