//! Tests for HPACK encoding of probe requests

use h2_window_probe::hpack::get_request_headers;
use h2_window_probe::{H2Header, HpackDecoder, HpackEncoder};

#[test]
fn test_encode_probe_request_roundtrip() {
    let mut encoder = HpackEncoder::new();
    let mut decoder = HpackDecoder::new();

    let headers = get_request_headers("https", "", "/");
    let encoded = encoder.encode(&headers);
    assert_eq!(decoder.decode(&encoded).unwrap(), headers);
}

#[test]
fn test_encode_indexed_header() {
    let mut encoder = HpackEncoder::new();
    let mut decoder = HpackDecoder::new();
    let headers = vec![H2Header::new(":method", "GET")];
    let encoded = encoder.encode(&headers);
    assert_eq!(decoder.decode(&encoded).unwrap()[0].value, "GET");
}

#[test]
fn test_encode_decode_response_roundtrip() {
    let mut encoder = HpackEncoder::new();
    let mut decoder = HpackDecoder::new();

    let headers = vec![
        H2Header::new(":status", "200"),
        H2Header::new("content-type", "text/plain"),
        H2Header::new("content-length", "100000"),
    ];

    let encoded = encoder.encode(&headers);
    assert_eq!(decoder.decode(&encoded).unwrap(), headers);
}

#[test]
fn test_shared_state_across_blocks() {
    let mut encoder = HpackEncoder::new();
    let mut decoder = HpackDecoder::new();

    let headers = get_request_headers("https", "localhost:8443", "/");
    let first = encoder.encode(&headers);
    let second = encoder.encode(&headers);

    assert_eq!(decoder.decode(&first).unwrap(), headers);
    assert_eq!(decoder.decode(&second).unwrap(), headers);
    assert!(second.len() <= first.len());
}
