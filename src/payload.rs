//! Type-specific frame payloads (RFC 7540 Section 6).
//!
//! Encoding and decoding are pure transforms: nothing here touches connection
//! state. HEADERS blocks are carried as opaque bytes; HPACK is not
//! interpreted by the codec.

use tracing::trace;

use crate::error::{FrameSizeError, H2Error, ProtocolError};
use crate::frame::{flags, settings_id, FrameHeader, FrameType, FRAME_HEADER_LEN, MAX_STREAM_ID};

const SETTING_LEN: usize = 6;
const PRIORITY_LEN: usize = 5;

/// DATA frame (type 0x0). Only DATA counts against flow-control windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub stream_id: u32,
    pub end_stream: bool,
    /// Logical content with padding stripped.
    pub data: Vec<u8>,
    /// Present when the frame carried the PADDED flag.
    pub pad_length: Option<u8>,
}

impl DataFrame {
    /// Bytes counted against flow control: the whole payload, padding and
    /// the pad-length octet included.
    pub fn flow_controlled_len(&self) -> u32 {
        let padding = self.pad_length.map_or(0, |p| p as usize + 1);
        (self.data.len() + padding) as u32
    }
}

/// Stream dependency prefix carried by a HEADERS frame with the PRIORITY
/// flag. Surfaced for inspection; the core does not build priority trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioritySpec {
    pub exclusive: bool,
    pub stream_dependency: u32,
    pub weight: u8,
}

/// HEADERS frame (type 0x1), reassembled with its CONTINUATION frames when
/// it comes out of [`crate::H2Codec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadersFrame {
    pub stream_id: u32,
    pub end_stream: bool,
    pub end_headers: bool,
    pub priority: Option<PrioritySpec>,
    pub pad_length: Option<u8>,
    /// HPACK-encoded header block fragment, untouched.
    pub header_block: Vec<u8>,
}

/// Settings defined by RFC 7540 Section 6.5.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    HeaderTableSize,
    EnablePush,
    MaxConcurrentStreams,
    InitialWindowSize,
    MaxFrameSize,
    MaxHeaderListSize,
}

impl Setting {
    pub fn from_id(id: u16) -> Option<Setting> {
        match id {
            settings_id::HEADER_TABLE_SIZE => Some(Setting::HeaderTableSize),
            settings_id::ENABLE_PUSH => Some(Setting::EnablePush),
            settings_id::MAX_CONCURRENT_STREAMS => Some(Setting::MaxConcurrentStreams),
            settings_id::INITIAL_WINDOW_SIZE => Some(Setting::InitialWindowSize),
            settings_id::MAX_FRAME_SIZE => Some(Setting::MaxFrameSize),
            settings_id::MAX_HEADER_LIST_SIZE => Some(Setting::MaxHeaderListSize),
            _ => None,
        }
    }

    pub fn id(self) -> u16 {
        match self {
            Setting::HeaderTableSize => settings_id::HEADER_TABLE_SIZE,
            Setting::EnablePush => settings_id::ENABLE_PUSH,
            Setting::MaxConcurrentStreams => settings_id::MAX_CONCURRENT_STREAMS,
            Setting::InitialWindowSize => settings_id::INITIAL_WINDOW_SIZE,
            Setting::MaxFrameSize => settings_id::MAX_FRAME_SIZE,
            Setting::MaxHeaderListSize => settings_id::MAX_HEADER_LIST_SIZE,
        }
    }
}

/// One `(id, value)` occurrence. Repeated ids are distinct occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsParameter {
    pub id: u16,
    pub value: u32,
}

impl SettingsParameter {
    pub fn new(setting: Setting, value: u32) -> Self {
        Self {
            id: setting.id(),
            value,
        }
    }

    pub fn setting(&self) -> Option<Setting> {
        Setting::from_id(self.id)
    }

    /// Unknown ids are decoded anyway; receivers ignore them.
    pub fn is_known(&self) -> bool {
        self.setting().is_some()
    }
}

/// SETTINGS frame (type 0x4), always on stream 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsFrame {
    pub ack: bool,
    /// Wire order is significant and preserved.
    pub parameters: Vec<SettingsParameter>,
}

impl SettingsFrame {
    pub fn new(parameters: Vec<SettingsParameter>) -> Self {
        Self {
            ack: false,
            parameters,
        }
    }

    pub fn ack() -> Self {
        Self {
            ack: true,
            parameters: Vec::new(),
        }
    }

    pub fn initial_window_sizes<I: IntoIterator<Item = u32>>(values: I) -> Self {
        Self::new(
            values
                .into_iter()
                .map(|v| SettingsParameter::new(Setting::InitialWindowSize, v))
                .collect(),
        )
    }
}

/// WINDOW_UPDATE frame (type 0x8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowUpdateFrame {
    /// 0 targets the connection window.
    pub stream_id: u32,
    pub increment: u32,
}

/// RST_STREAM frame (type 0x3). Closes the stream in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RstStreamFrame {
    pub stream_id: u32,
    pub error_code: u32,
}

/// GOAWAY frame (type 0x7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoAwayFrame {
    /// Highest stream id the sender may have processed.
    pub last_stream_id: u32,
    pub error_code: u32,
    pub debug_data: Vec<u8>,
}

/// A decoded HTTP/2 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data(DataFrame),
    Headers(HeadersFrame),
    Settings(SettingsFrame),
    WindowUpdate(WindowUpdateFrame),
    RstStream(RstStreamFrame),
    GoAway(GoAwayFrame),
    /// PRIORITY, PING, PUSH_PROMISE, CONTINUATION and unassigned types,
    /// passed through untouched.
    Unknown { header: FrameHeader, payload: Vec<u8> },
}

impl Frame {
    pub fn data(stream_id: u32, data: impl Into<Vec<u8>>, end_stream: bool) -> Self {
        Frame::Data(DataFrame {
            stream_id,
            end_stream,
            data: data.into(),
            pad_length: None,
        })
    }

    /// A complete (END_HEADERS) header block on `stream_id`.
    pub fn headers(stream_id: u32, header_block: impl Into<Vec<u8>>, end_stream: bool) -> Self {
        Frame::Headers(HeadersFrame {
            stream_id,
            end_stream,
            end_headers: true,
            priority: None,
            pad_length: None,
            header_block: header_block.into(),
        })
    }

    pub fn settings(parameters: Vec<SettingsParameter>) -> Self {
        Frame::Settings(SettingsFrame::new(parameters))
    }

    pub fn settings_ack() -> Self {
        Frame::Settings(SettingsFrame::ack())
    }

    pub fn window_update(stream_id: u32, increment: u32) -> Self {
        Frame::WindowUpdate(WindowUpdateFrame {
            stream_id,
            increment,
        })
    }

    pub fn rst_stream(stream_id: u32, error_code: u32) -> Self {
        Frame::RstStream(RstStreamFrame {
            stream_id,
            error_code,
        })
    }

    pub fn goaway(last_stream_id: u32, error_code: u32, debug_data: impl Into<Vec<u8>>) -> Self {
        Frame::GoAway(GoAwayFrame {
            last_stream_id,
            error_code,
            debug_data: debug_data.into(),
        })
    }

    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::Data(_) => FrameType::Data,
            Frame::Headers(_) => FrameType::Headers,
            Frame::Settings(_) => FrameType::Settings,
            Frame::WindowUpdate(_) => FrameType::WindowUpdate,
            Frame::RstStream(_) => FrameType::RstStream,
            Frame::GoAway(_) => FrameType::GoAway,
            Frame::Unknown { header, .. } => header.frame_type,
        }
    }

    pub fn stream_id(&self) -> u32 {
        match self {
            Frame::Data(f) => f.stream_id,
            Frame::Headers(f) => f.stream_id,
            Frame::WindowUpdate(f) => f.stream_id,
            Frame::RstStream(f) => f.stream_id,
            Frame::Settings(_) | Frame::GoAway(_) => 0,
            Frame::Unknown { header, .. } => header.stream_id,
        }
    }

    /// True for DATA and HEADERS frames carrying END_STREAM.
    pub fn is_end_stream(&self) -> bool {
        match self {
            Frame::Data(f) => f.end_stream,
            Frame::Headers(f) => f.end_stream,
            _ => false,
        }
    }

    /// Decode a payload whose header has already been parsed.
    pub fn decode(header: &FrameHeader, payload: &[u8]) -> Result<Frame, H2Error> {
        match header.frame_type {
            FrameType::Data => decode_data(header, payload).map(Frame::Data),
            FrameType::Headers => decode_headers(header, payload).map(Frame::Headers),
            FrameType::Settings => decode_settings(header, payload).map(Frame::Settings),
            FrameType::WindowUpdate => decode_window_update(header, payload).map(Frame::WindowUpdate),
            FrameType::RstStream => decode_rst_stream(header, payload).map(Frame::RstStream),
            FrameType::GoAway => decode_goaway(header, payload).map(Frame::GoAway),
            FrameType::Other(_) => {
                trace!(frame_type = %header.frame_type, len = payload.len(), "passing through frame");
                Ok(Frame::Unknown {
                    header: *header,
                    payload: payload.to_vec(),
                })
            }
        }
    }

    /// Serialize header and payload.
    pub fn encode(&self) -> Result<Vec<u8>, H2Error> {
        let (frame_type, flags_byte, stream_id, payload) = self.wire_parts()?;
        let head = crate::frame::encode_header(frame_type, flags_byte, stream_id, payload.len())?;
        let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
        out.extend_from_slice(&head);
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// The header [`Frame::encode`] would write. A reassembled HEADERS frame
    /// reports its whole block with END_HEADERS set.
    pub fn header(&self) -> Result<FrameHeader, H2Error> {
        let (frame_type, flags_byte, stream_id, payload) = self.wire_parts()?;
        let head = crate::frame::encode_header(frame_type, flags_byte, stream_id, payload.len())?;
        FrameHeader::parse(&head)
    }

    fn wire_parts(&self) -> Result<(FrameType, u8, u32, Vec<u8>), H2Error> {
        Ok(match self {
            Frame::Data(f) => {
                let mut flags_byte = 0;
                if f.end_stream {
                    flags_byte |= flags::END_STREAM;
                }
                let payload = pad(&f.data, f.pad_length, &mut flags_byte);
                (FrameType::Data, flags_byte, f.stream_id, payload)
            }
            Frame::Headers(f) => {
                let mut flags_byte = 0;
                if f.end_stream {
                    flags_byte |= flags::END_STREAM;
                }
                if f.end_headers {
                    flags_byte |= flags::END_HEADERS;
                }
                let mut block = Vec::with_capacity(PRIORITY_LEN + f.header_block.len());
                if let Some(priority) = f.priority {
                    flags_byte |= flags::PRIORITY;
                    let mut dependency = priority.stream_dependency & MAX_STREAM_ID;
                    if priority.exclusive {
                        dependency |= 1 << 31;
                    }
                    block.extend_from_slice(&dependency.to_be_bytes());
                    block.push(priority.weight);
                }
                block.extend_from_slice(&f.header_block);
                let payload = pad(&block, f.pad_length, &mut flags_byte);
                (FrameType::Headers, flags_byte, f.stream_id, payload)
            }
            Frame::Settings(f) => {
                if f.ack && !f.parameters.is_empty() {
                    return Err(FrameSizeError::SettingsAckWithPayload {
                        len: f.parameters.len() * SETTING_LEN,
                    }
                    .into());
                }
                let mut payload = Vec::with_capacity(f.parameters.len() * SETTING_LEN);
                for param in &f.parameters {
                    payload.extend_from_slice(&param.id.to_be_bytes());
                    payload.extend_from_slice(&param.value.to_be_bytes());
                }
                let flags_byte = if f.ack { flags::ACK } else { 0 };
                (FrameType::Settings, flags_byte, 0, payload)
            }
            Frame::WindowUpdate(f) => {
                // Clear reserved bit
                let increment = f.increment & MAX_STREAM_ID;
                (FrameType::WindowUpdate, 0, f.stream_id, increment.to_be_bytes().to_vec())
            }
            Frame::RstStream(f) => (FrameType::RstStream, 0, f.stream_id, f.error_code.to_be_bytes().to_vec()),
            Frame::GoAway(f) => {
                let mut payload = Vec::with_capacity(8 + f.debug_data.len());
                payload.extend_from_slice(&(f.last_stream_id & MAX_STREAM_ID).to_be_bytes());
                payload.extend_from_slice(&f.error_code.to_be_bytes());
                payload.extend_from_slice(&f.debug_data);
                (FrameType::GoAway, 0, 0, payload)
            }
            Frame::Unknown { header, payload } => (header.frame_type, header.flags, header.stream_id, payload.clone()),
        })
    }
}

/// Encode a frame to wire bytes.
pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>, H2Error> {
    frame.encode()
}

/// Decode one frame from the front of `data`, returning it with the number
/// of bytes consumed. Yields [`H2Error::Truncated`] until the header and the
/// whole declared payload are available.
pub fn decode_frame(data: &[u8]) -> Result<(Frame, usize), H2Error> {
    let header = FrameHeader::parse(data)?;
    let total = header.total_size();
    if data.len() < total {
        return Err(H2Error::Truncated {
            needed: total,
            available: data.len(),
        });
    }
    let frame = Frame::decode(&header, &data[FRAME_HEADER_LEN..total])?;
    Ok((frame, total))
}

fn pad(content: &[u8], pad_length: Option<u8>, flags_byte: &mut u8) -> Vec<u8> {
    match pad_length {
        Some(pad_len) => {
            *flags_byte |= flags::PADDED;
            let mut payload = Vec::with_capacity(1 + content.len() + pad_len as usize);
            payload.push(pad_len);
            payload.extend_from_slice(content);
            payload.resize(payload.len() + pad_len as usize, 0);
            payload
        }
        None => content.to_vec(),
    }
}

/// Strip the pad-length octet and trailing padding when PADDED is set.
fn strip_padding<'a>(header: &FrameHeader, payload: &'a [u8]) -> Result<(&'a [u8], Option<u8>), H2Error> {
    if !header.has_flag(flags::PADDED) {
        return Ok((payload, None));
    }
    let (&pad_len, rest) = payload.split_first().ok_or(FrameSizeError::TooShort {
        frame_type: header.frame_type,
        min: 1,
        len: 0,
    })?;
    if pad_len as usize > rest.len() {
        return Err(ProtocolError::PaddingExceedsPayload {
            frame_type: header.frame_type,
            pad_length: pad_len as usize,
            len: payload.len(),
        }
        .into());
    }
    Ok((&rest[..rest.len() - pad_len as usize], Some(pad_len)))
}

fn require_stream(header: &FrameHeader) -> Result<(), H2Error> {
    if header.stream_id == 0 {
        return Err(ProtocolError::ExpectedStream {
            frame_type: header.frame_type,
        }
        .into());
    }
    Ok(())
}

fn require_connection(header: &FrameHeader) -> Result<(), H2Error> {
    if header.stream_id != 0 {
        return Err(ProtocolError::ExpectedConnectionStream {
            frame_type: header.frame_type,
            stream_id: header.stream_id,
        }
        .into());
    }
    Ok(())
}

fn fixed_length(header: &FrameHeader, payload: &[u8], expected: usize) -> Result<(), H2Error> {
    if payload.len() != expected {
        return Err(FrameSizeError::FixedLength {
            frame_type: header.frame_type,
            expected,
            len: payload.len(),
        }
        .into());
    }
    Ok(())
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn decode_data(header: &FrameHeader, payload: &[u8]) -> Result<DataFrame, H2Error> {
    require_stream(header)?;
    let (data, pad_length) = strip_padding(header, payload)?;
    Ok(DataFrame {
        stream_id: header.stream_id,
        end_stream: header.is_end_stream(),
        data: data.to_vec(),
        pad_length,
    })
}

fn decode_headers(header: &FrameHeader, payload: &[u8]) -> Result<HeadersFrame, H2Error> {
    require_stream(header)?;
    let (mut block, pad_length) = strip_padding(header, payload)?;

    let mut priority = None;
    if header.has_flag(flags::PRIORITY) {
        if block.len() < PRIORITY_LEN {
            return Err(FrameSizeError::TooShort {
                frame_type: header.frame_type,
                min: PRIORITY_LEN + pad_length.map_or(0, |p| p as usize + 1),
                len: payload.len(),
            }
            .into());
        }
        let dependency = read_u32(block);
        priority = Some(PrioritySpec {
            exclusive: dependency & (1 << 31) != 0,
            stream_dependency: dependency & MAX_STREAM_ID,
            weight: block[4],
        });
        block = &block[PRIORITY_LEN..];
    }

    Ok(HeadersFrame {
        stream_id: header.stream_id,
        end_stream: header.is_end_stream(),
        end_headers: header.is_end_headers(),
        priority,
        pad_length,
        header_block: block.to_vec(),
    })
}

fn decode_settings(header: &FrameHeader, payload: &[u8]) -> Result<SettingsFrame, H2Error> {
    require_connection(header)?;

    if header.has_flag(flags::ACK) {
        if !payload.is_empty() {
            return Err(FrameSizeError::SettingsAckWithPayload { len: payload.len() }.into());
        }
        return Ok(SettingsFrame::ack());
    }

    if payload.len() % SETTING_LEN != 0 {
        return Err(FrameSizeError::SettingsLength { len: payload.len() }.into());
    }

    let parameters = payload
        .chunks_exact(SETTING_LEN)
        .map(|chunk| SettingsParameter {
            id: u16::from_be_bytes([chunk[0], chunk[1]]),
            value: read_u32(&chunk[2..]),
        })
        .collect();

    Ok(SettingsFrame::new(parameters))
}

fn decode_window_update(header: &FrameHeader, payload: &[u8]) -> Result<WindowUpdateFrame, H2Error> {
    fixed_length(header, payload, 4)?;
    // Clear reserved bit
    let increment = read_u32(payload) & MAX_STREAM_ID;
    if increment == 0 {
        return Err(ProtocolError::ZeroWindowIncrement {
            stream_id: header.stream_id,
        }
        .into());
    }
    Ok(WindowUpdateFrame {
        stream_id: header.stream_id,
        increment,
    })
}

fn decode_rst_stream(header: &FrameHeader, payload: &[u8]) -> Result<RstStreamFrame, H2Error> {
    require_stream(header)?;
    fixed_length(header, payload, 4)?;
    Ok(RstStreamFrame {
        stream_id: header.stream_id,
        error_code: read_u32(payload),
    })
}

fn decode_goaway(header: &FrameHeader, payload: &[u8]) -> Result<GoAwayFrame, H2Error> {
    require_connection(header)?;
    if payload.len() < 8 {
        return Err(FrameSizeError::TooShort {
            frame_type: header.frame_type,
            min: 8,
            len: payload.len(),
        }
        .into());
    }
    Ok(GoAwayFrame {
        last_stream_id: read_u32(payload) & MAX_STREAM_ID,
        error_code: read_u32(&payload[4..]),
        debug_data: payload[8..].to_vec(),
    })
}

// ============================================================================
// Tests
// ============================================================================
