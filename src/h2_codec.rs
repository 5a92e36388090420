//! Buffered HTTP/2 deframer.
//!
//! Feeds arbitrary chunks of a byte stream into whole decoded [`Frame`]s:
//! 1. Strips the client connection preface once, when present
//! 2. Waits for the 9-byte header and the full declared payload
//! 3. Reassembles HEADERS + CONTINUATION into a single HEADERS frame
//!
//! Reference: RFC 7540 (HTTP/2)

use tracing::trace;

use crate::error::{H2Error, ProtocolError};
use crate::frame::{frame_type, FrameHeader, FrameType, CONNECTION_PREFACE, FRAME_HEADER_LEN};
use crate::payload::{Frame, HeadersFrame};

/// Maximum accumulated header block size (256 KB).
/// Prevents unbounded memory growth from malicious/buggy CONTINUATION floods.
pub const MAX_HEADER_BLOCK_SIZE: usize = 256 * 1024;

/// Streaming frame parser. Holds only the bytes of the frame still being
/// received and any header block waiting for CONTINUATION frames.
#[derive(Debug, Default)]
pub struct H2Codec {
    /// Buffer for incomplete frames
    buffer: Vec<u8>,
    /// Connection preface received (for servers)
    preface_received: bool,
    /// HEADERS frame whose block is still waiting for END_HEADERS
    pending_headers: Option<HeadersFrame>,
    /// Decode error held back so frames ahead of it could be returned
    deferred_error: Option<H2Error>,
}

impl H2Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A codec for the server-to-client direction, which never carries a
    /// preface.
    pub fn without_preface() -> Self {
        Self {
            preface_received: true,
            ..Self::default()
        }
    }

    pub fn preface_received(&self) -> bool {
        self.preface_received
    }

    pub fn set_preface_received(&mut self, received: bool) {
        self.preface_received = received;
    }

    /// Bytes waiting for the rest of their frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Process incoming data and return the frames it completes.
    ///
    /// This is the main entry point - feed raw bytes and get back frames.
    /// When a frame fails to decode after others in the same call have
    /// succeeded, those frames are returned and the error is held for
    /// [`H2Codec::take_error`] or the next call.
    pub fn process(&mut self, data: &[u8]) -> Result<Vec<Frame>, H2Error> {
        if let Some(error) = self.deferred_error.take() {
            return Err(error);
        }
        self.buffer.extend_from_slice(data);
        let mut frames = Vec::new();

        // Check for connection preface (client sends this first)
        if !self.preface_received {
            let n = self.buffer.len().min(CONNECTION_PREFACE.len());
            if self.buffer[..n] == CONNECTION_PREFACE[..n] {
                if n < CONNECTION_PREFACE.len() {
                    return Ok(frames);
                }
                self.buffer.drain(..CONNECTION_PREFACE.len());
                trace!("connection preface received");
            }
            self.preface_received = true;
        }

        loop {
            let header = match FrameHeader::parse(&self.buffer) {
                Ok(h) => h,
                Err(H2Error::Truncated { .. }) => break,
                Err(e) => return self.fail(frames, e),
            };

            let total_size = header.total_size();
            if self.buffer.len() < total_size {
                trace!(needed = total_size, buffered = self.buffer.len(), "waiting for frame payload");
                break;
            }

            let remainder = self.buffer.split_off(total_size);
            let frame_data = std::mem::replace(&mut self.buffer, remainder);
            let payload = &frame_data[FRAME_HEADER_LEN..];

            match self.parse_frame(&header, payload) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => {}
                Err(e) => return self.fail(frames, e),
            }
        }

        Ok(frames)
    }

    /// The error held back by the last [`H2Codec::process`] call, if any.
    pub fn take_error(&mut self) -> Option<H2Error> {
        self.deferred_error.take()
    }

    fn fail(&mut self, frames: Vec<Frame>, error: H2Error) -> Result<Vec<Frame>, H2Error> {
        if frames.is_empty() {
            return Err(error);
        }
        trace!(decoded = frames.len(), %error, "holding back decode error");
        self.deferred_error = Some(error);
        Ok(frames)
    }

    fn parse_frame(&mut self, header: &FrameHeader, payload: &[u8]) -> Result<Option<Frame>, H2Error> {
        if let Some(pending) = self.pending_headers.as_mut() {
            if header.frame_type != FrameType::Other(frame_type::CONTINUATION) || header.stream_id != pending.stream_id {
                let expected = pending.stream_id;
                self.pending_headers = None;
                return Err(ProtocolError::ExpectedContinuation {
                    expected,
                    frame_type: header.frame_type,
                    stream_id: header.stream_id,
                }
                .into());
            }

            // Guard against unbounded header block accumulation
            let new_size = pending.header_block.len() + payload.len();
            if new_size > MAX_HEADER_BLOCK_SIZE {
                self.pending_headers = None;
                return Err(ProtocolError::HeaderBlockTooLarge {
                    len: new_size,
                    max: MAX_HEADER_BLOCK_SIZE,
                }
                .into());
            }
            pending.header_block.extend_from_slice(payload);

            if !header.is_end_headers() {
                return Ok(None);
            }
            return Ok(self.pending_headers.take().map(|mut headers| {
                headers.end_headers = true;
                Frame::Headers(headers)
            }));
        }

        if header.frame_type == FrameType::Other(frame_type::CONTINUATION) {
            return Err(ProtocolError::UnexpectedContinuation {
                stream_id: header.stream_id,
            }
            .into());
        }

        match Frame::decode(header, payload)? {
            Frame::Headers(headers) if !headers.end_headers => {
                // Headers span multiple frames - accumulate and wait for CONTINUATION
                if headers.header_block.len() > MAX_HEADER_BLOCK_SIZE {
                    return Err(ProtocolError::HeaderBlockTooLarge {
                        len: headers.header_block.len(),
                        max: MAX_HEADER_BLOCK_SIZE,
                    }
                    .into());
                }
                self.pending_headers = Some(headers);
                Ok(None)
            }
            frame => Ok(Some(frame)),
        }
    }

    /// Reset codec state (e.g., after upstream reconnect)
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.preface_received = false;
        self.pending_headers = None;
        self.deferred_error = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
