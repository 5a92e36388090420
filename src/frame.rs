//! HTTP/2 generic frame header (RFC 7540 Section 4.1) and wire constants.
//!
//! ```text
//! +-----------------------------------------------+
//! |                 Length (24)                   |
//! +---------------+---------------+---------------+
//! |   Type (8)    |   Flags (8)   |
//! +-+-------------+---------------+-------------------------------+
//! |R|                 Stream Identifier (31)                      |
//! +=+=============================================================+
//! ```

use std::fmt;

use crate::error::H2Error;

/// HTTP/2 frame types (RFC 7540 Section 6)
#[allow(dead_code)]
pub mod frame_type {
    pub const DATA: u8 = 0x0;
    pub const HEADERS: u8 = 0x1;
    pub const PRIORITY: u8 = 0x2;
    pub const RST_STREAM: u8 = 0x3;
    pub const SETTINGS: u8 = 0x4;
    pub const PUSH_PROMISE: u8 = 0x5;
    pub const PING: u8 = 0x6;
    pub const GOAWAY: u8 = 0x7;
    pub const WINDOW_UPDATE: u8 = 0x8;
    pub const CONTINUATION: u8 = 0x9;
}

/// HTTP/2 frame flags
pub mod flags {
    pub const END_STREAM: u8 = 0x1;
    /// Same bit as END_STREAM, used on SETTINGS and PING.
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

/// HTTP/2 SETTINGS identifiers (RFC 7540 Section 6.5.2)
pub mod settings_id {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;
}

/// HTTP/2 error codes (RFC 7540 Section 7)
#[allow(dead_code)]
pub mod error_code {
    pub const NO_ERROR: u32 = 0x0;
    pub const PROTOCOL_ERROR: u32 = 0x1;
    pub const INTERNAL_ERROR: u32 = 0x2;
    pub const FLOW_CONTROL_ERROR: u32 = 0x3;
    pub const SETTINGS_TIMEOUT: u32 = 0x4;
    pub const STREAM_CLOSED: u32 = 0x5;
    pub const FRAME_SIZE_ERROR: u32 = 0x6;
    pub const REFUSED_STREAM: u32 = 0x7;
    pub const CANCEL: u32 = 0x8;
    pub const COMPRESSION_ERROR: u32 = 0x9;
    pub const CONNECT_ERROR: u32 = 0xa;
    pub const ENHANCE_YOUR_CALM: u32 = 0xb;
    pub const INADEQUATE_SECURITY: u32 = 0xc;
    pub const HTTP_1_1_REQUIRED: u32 = 0xd;
}

/// The HTTP/2 connection preface (24 bytes)
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

pub const FRAME_HEADER_LEN: usize = 9;

/// Largest stream id (and window-update increment) expressible in 31 bits.
pub const MAX_STREAM_ID: u32 = 0x7FFF_FFFF;

/// Largest payload a 24-bit length field can declare.
pub const MAX_PAYLOAD_LEN: usize = 0x00FF_FFFF;

/// Upper bound of any flow-control window: 2^31-1.
pub const MAX_WINDOW_SIZE: i64 = MAX_STREAM_ID as i64;

pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65_535;
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16_384;

const RESERVED_BIT: u32 = 1 << 31;

/// Check if data starts with HTTP/2 connection preface (h2c detection)
pub fn is_h2c_preface(data: &[u8]) -> bool {
    data.len() >= CONNECTION_PREFACE.len() && &data[..CONNECTION_PREFACE.len()] == CONNECTION_PREFACE
}

/// Frame types this crate decodes into typed payloads. Every other code is
/// carried as [`FrameType::Other`] and decoded as an opaque frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Data,
    Headers,
    RstStream,
    Settings,
    GoAway,
    WindowUpdate,
    Other(u8),
}

impl FrameType {
    pub fn code(self) -> u8 {
        match self {
            FrameType::Data => frame_type::DATA,
            FrameType::Headers => frame_type::HEADERS,
            FrameType::RstStream => frame_type::RST_STREAM,
            FrameType::Settings => frame_type::SETTINGS,
            FrameType::GoAway => frame_type::GOAWAY,
            FrameType::WindowUpdate => frame_type::WINDOW_UPDATE,
            FrameType::Other(code) => code,
        }
    }
}

impl From<u8> for FrameType {
    fn from(code: u8) -> Self {
        match code {
            frame_type::DATA => FrameType::Data,
            frame_type::HEADERS => FrameType::Headers,
            frame_type::RST_STREAM => FrameType::RstStream,
            frame_type::SETTINGS => FrameType::Settings,
            frame_type::GOAWAY => FrameType::GoAway,
            frame_type::WINDOW_UPDATE => FrameType::WindowUpdate,
            other => FrameType::Other(other),
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            FrameType::Data => "DATA",
            FrameType::Headers => "HEADERS",
            FrameType::RstStream => "RST_STREAM",
            FrameType::Settings => "SETTINGS",
            FrameType::GoAway => "GOAWAY",
            FrameType::WindowUpdate => "WINDOW_UPDATE",
            FrameType::Other(frame_type::PRIORITY) => "PRIORITY",
            FrameType::Other(frame_type::PUSH_PROMISE) => "PUSH_PROMISE",
            FrameType::Other(frame_type::PING) => "PING",
            FrameType::Other(frame_type::CONTINUATION) => "CONTINUATION",
            FrameType::Other(code) => return write!(f, "TYPE_{code}"),
        };
        f.write_str(name)
    }
}

/// A parsed HTTP/2 frame header (9 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u32, // 24 bits
    pub frame_type: FrameType,
    pub flags: u8,
    pub stream_id: u32, // 31 bits (high bit reserved)
}

impl FrameHeader {
    pub fn new(frame_type: FrameType, flags: u8, stream_id: u32, length: u32) -> Self {
        Self {
            length,
            frame_type,
            flags,
            stream_id,
        }
    }

    /// Parse the first 9 bytes of `data`. The reserved stream-id bit is
    /// cleared rather than rejected.
    pub fn parse(data: &[u8]) -> Result<Self, H2Error> {
        if data.len() < FRAME_HEADER_LEN {
            return Err(H2Error::Truncated {
                needed: FRAME_HEADER_LEN,
                available: data.len(),
            });
        }

        let length = u32::from_be_bytes([0, data[0], data[1], data[2]]);
        let stream_id = u32::from_be_bytes([data[5], data[6], data[7], data[8]]) & !RESERVED_BIT;

        Ok(Self {
            length,
            frame_type: FrameType::from(data[3]),
            flags: data[4],
            stream_id,
        })
    }

    pub fn encode(&self) -> Result<[u8; FRAME_HEADER_LEN], H2Error> {
        if self.stream_id > MAX_STREAM_ID {
            return Err(H2Error::InvalidStreamId {
                stream_id: self.stream_id,
            });
        }
        if self.length as usize > MAX_PAYLOAD_LEN {
            return Err(H2Error::PayloadTooLarge {
                len: self.length as usize,
            });
        }

        let len = self.length.to_be_bytes();
        let id = self.stream_id.to_be_bytes();
        Ok([
            len[1],
            len[2],
            len[3],
            self.frame_type.code(),
            self.flags,
            id[0],
            id[1],
            id[2],
            id[3],
        ])
    }

    /// Total frame size including header
    pub fn total_size(&self) -> usize {
        FRAME_HEADER_LEN + self.length as usize
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// Check if END_STREAM flag is set
    pub fn is_end_stream(&self) -> bool {
        self.has_flag(flags::END_STREAM)
    }

    /// Check if END_HEADERS flag is set
    pub fn is_end_headers(&self) -> bool {
        self.has_flag(flags::END_HEADERS)
    }
}

/// Encode a 9-byte frame header.
pub fn encode_header(
    frame_type: FrameType,
    flags: u8,
    stream_id: u32,
    payload_length: usize,
) -> Result<[u8; FRAME_HEADER_LEN], H2Error> {
    if payload_length > MAX_PAYLOAD_LEN {
        return Err(H2Error::PayloadTooLarge {
            len: payload_length,
        });
    }
    FrameHeader::new(frame_type, flags, stream_id, payload_length as u32).encode()
}

/// Decode a 9-byte frame header from the front of `data`.
pub fn decode_header(data: &[u8]) -> Result<FrameHeader, H2Error> {
    FrameHeader::parse(data)
}
