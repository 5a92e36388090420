//! Error types for the frame codec, the settings processor and the window
//! tracker.
//!
//! Every rejection names the rule that fired, so callers (and tests) can match
//! on the exact condition instead of parsing a message.

use crate::frame::{error_code, FrameType};

/// Coarse classification of an [`H2Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Not enough bytes buffered yet. Buffer more and retry.
    Truncated,
    /// Caller asked the encoder for a stream id above 2^31-1.
    InvalidStreamId,
    /// Caller asked the encoder for a payload above 2^24-1 bytes.
    PayloadTooLarge,
    /// Payload length inconsistent with the frame type's structure.
    FrameSize,
    /// Semantically invalid field.
    Protocol,
    /// A window would leave its legal range.
    FlowControl,
    /// Caller misuse; never triggered by untrusted input alone.
    Logic,
}

/// Every failure the codec, the settings processor and the window tracker
/// can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum H2Error {
    /// Fewer bytes than the header or its declared payload needs.
    #[error("truncated input: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// Encoding only: the id uses the reserved bit.
    #[error("stream id {stream_id} does not fit in 31 bits")]
    InvalidStreamId { stream_id: u32 },

    /// Encoding only.
    #[error("payload of {len} bytes does not fit in a 24-bit length")]
    PayloadTooLarge { len: usize },

    /// FRAME_SIZE_ERROR (0x6).
    #[error("frame size error: {0}")]
    FrameSize(#[from] FrameSizeError),

    /// PROTOCOL_ERROR (0x1).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// FLOW_CONTROL_ERROR (0x3).
    #[error("flow control error: {0}")]
    FlowControl(#[from] FlowControlError),

    /// The caller broke a precondition.
    #[error("logic error: {0}")]
    Logic(#[from] LogicError),
}

/// Payload lengths that do not fit the frame type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameSizeError {
    #[error("SETTINGS payload of {len} bytes is not a multiple of 6")]
    SettingsLength { len: usize },

    #[error("SETTINGS ACK carries a {len}-byte payload")]
    SettingsAckWithPayload { len: usize },

    #[error("{frame_type} payload must be exactly {expected} bytes, got {len}")]
    FixedLength {
        frame_type: FrameType,
        expected: usize,
        len: usize,
    },

    #[error("{frame_type} payload must be at least {min} bytes, got {len}")]
    TooShort {
        frame_type: FrameType,
        min: usize,
        len: usize,
    },
}

/// Fields with illegal values, and frames on the wrong stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("WINDOW_UPDATE with a zero increment on stream {stream_id}")]
    ZeroWindowIncrement { stream_id: u32 },

    #[error("SETTINGS_ENABLE_PUSH must be 0 or 1, got {value}")]
    InvalidEnablePush { value: u32 },

    #[error("SETTINGS_MAX_FRAME_SIZE must be within [16384, 16777215], got {value}")]
    InvalidMaxFrameSize { value: u32 },

    #[error("{frame_type} pad length {pad_length} leaves no room in a {len}-byte payload")]
    PaddingExceedsPayload {
        frame_type: FrameType,
        pad_length: usize,
        len: usize,
    },

    #[error("{frame_type} frame must be sent on stream 0, got stream {stream_id}")]
    ExpectedConnectionStream { frame_type: FrameType, stream_id: u32 },

    #[error("{frame_type} frame must not be sent on stream 0")]
    ExpectedStream { frame_type: FrameType },

    #[error("CONTINUATION on stream {stream_id} without a pending header block")]
    UnexpectedContinuation { stream_id: u32 },

    #[error("expected CONTINUATION for stream {expected}, got {frame_type} on stream {stream_id}")]
    ExpectedContinuation {
        expected: u32,
        frame_type: FrameType,
        stream_id: u32,
    },

    #[error("header block of {len} bytes exceeds the {max}-byte limit")]
    HeaderBlockTooLarge { len: usize, max: usize },
}

/// Windows pushed above 2^31-1.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowControlError {
    #[error("SETTINGS_INITIAL_WINDOW_SIZE {value} exceeds 2^31-1")]
    InitialWindowSizeTooLarge { value: u32 },

    #[error("window of stream {stream_id} would grow to {window}, above 2^31-1")]
    StreamWindowOverflow { stream_id: u32, window: i64 },

    #[error("connection window would grow to {window}, above 2^31-1")]
    ConnectionWindowOverflow { window: i64 },
}

/// Misuse of the window tracker or the settings processor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogicError {
    #[error("cannot send {requested} bytes on stream {stream_id}: only {available} available")]
    StreamWindowExceeded {
        stream_id: u32,
        requested: u32,
        available: i64,
    },

    #[error("cannot send {requested} bytes: connection window only has {available}")]
    ConnectionWindowExceeded { requested: u32, available: i64 },

    #[error("stream {stream_id} is not open")]
    StreamNotOpen { stream_id: u32 },

    #[error("SETTINGS ACK frames are not applied as parameter updates")]
    SettingsAckNotApplicable,
}

impl H2Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            H2Error::Truncated { .. } => ErrorKind::Truncated,
            H2Error::InvalidStreamId { .. } => ErrorKind::InvalidStreamId,
            H2Error::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            H2Error::FrameSize(_) => ErrorKind::FrameSize,
            H2Error::Protocol(_) => ErrorKind::Protocol,
            H2Error::FlowControl(_) => ErrorKind::FlowControl,
            H2Error::Logic(_) => ErrorKind::Logic,
        }
    }

    /// Only truncation can be cured by reading more bytes.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, H2Error::Truncated { .. })
    }

    /// The RFC 7540 §7 error code a peer would put in RST_STREAM or GOAWAY.
    pub fn error_code(&self) -> u32 {
        match self.kind() {
            ErrorKind::FrameSize => error_code::FRAME_SIZE_ERROR,
            ErrorKind::Protocol => error_code::PROTOCOL_ERROR,
            ErrorKind::FlowControl => error_code::FLOW_CONTROL_ERROR,
            ErrorKind::Truncated
            | ErrorKind::InvalidStreamId
            | ErrorKind::PayloadTooLarge
            | ErrorKind::Logic => error_code::INTERNAL_ERROR,
        }
    }
}
