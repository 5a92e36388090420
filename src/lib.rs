//! h2-window-probe: a sans-I/O HTTP/2 frame codec and flow-control tracker
//!
//! This crate encodes and decodes HTTP/2 frames and tracks send windows
//! exactly as RFC 7540 prescribes for `SETTINGS_INITIAL_WINDOW_SIZE`
//! changes: every occurrence of the parameter, including repeats inside a
//! single SETTINGS frame, shifts each open stream's window by the signed
//! difference between the previous and the new value, in wire order.
//!
//! # Features
//!
//! - **Sans-I/O Design**: Frames in, frames out; no async runtime
//! - **Frame Codec**: DATA, HEADERS, RST_STREAM, SETTINGS, GOAWAY and
//!   WINDOW_UPDATE, with padding and priority prefixes stripped on decode
//! - **Ordered Settings**: Per-occurrence effect log for every parameter
//! - **Flow Control**: Negative windows allowed, overflow past 2^31-1 rejected
//! - **Probe Driver**: Scripted scenarios against a live server over any
//!   caller-supplied transport
//!
//! # Quick Start
//!
//! ```rust
//! use h2_window_probe::{apply_settings, ConnectionState, SettingsFrame};
//!
//! let mut state = ConnectionState::new();
//! state.open_stream(1);
//!
//! // INITIAL_WINDOW_SIZE = 0, then 65536, in one frame
//! let frame = SettingsFrame::initial_window_sizes([0, 65536]);
//! let log = apply_settings(&frame, &mut state).unwrap();
//!
//! assert_eq!(log.len(), 2);
//! assert_eq!(state.send_window(1), Some(65536));
//! ```
//!
//! # Architecture
//!
//! - [`frame`]: 9-byte frame header and wire constants
//! - [`payload`]: typed frame payloads
//! - [`settings`]: ordered SETTINGS application
//! - [`flow`]: connection and stream send windows
//! - [`h2_codec`]: buffered deframer for byte streams
//! - [`hpack`]: header block helpers used by the probe
//! - [`probe`]: scripted client driving a server under test
//!
//! It does NOT provide TCP or TLS; you provide the bytes.

pub mod error;
pub mod flow;
pub mod frame;
pub mod h2_codec;
pub mod hpack;
pub mod payload;
pub mod probe;
pub mod settings;

pub use error::{ErrorKind, FlowControlError, FrameSizeError, H2Error, LogicError, ProtocolError};
pub use flow::{
    ConnectionState, Direction, Observation, StreamPhase, StreamState, WindowShift, WindowTarget,
    WindowUpdateOutcome,
};
pub use frame::{
    decode_header, encode_header, error_code, flags, frame_type, is_h2c_preface, settings_id, FrameHeader,
    FrameType, CONNECTION_PREFACE, DEFAULT_INITIAL_WINDOW_SIZE, DEFAULT_MAX_FRAME_SIZE, MAX_WINDOW_SIZE,
};
pub use h2_codec::{H2Codec, MAX_HEADER_BLOCK_SIZE};
pub use hpack::{H2Header, HpackDecoder, HpackEncoder, HpackError};
pub use payload::{
    decode_frame, encode_frame, DataFrame, Frame, GoAwayFrame, HeadersFrame, PrioritySpec, RstStreamFrame, Setting,
    SettingsFrame, SettingsParameter, WindowUpdateFrame,
};
pub use probe::{
    Finding, IoTransport, Probe, ProbeConfig, ProbeError, ProbeReport, ReceivedFrame, RunError, Scenario, Step, Transport,
    WindowSnapshot,
};
pub use settings::{apply_settings, Effect, PeerSettings, SettingEffect};
