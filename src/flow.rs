//! Send-side flow-control bookkeeping (RFC 7540 Section 6.9).
//!
//! [`ConnectionState`] holds the connection window and one send window per
//! open stream. Windows are `i64` because a shrinking
//! SETTINGS_INITIAL_WINDOW_SIZE may legally drive them negative; only growth
//! past 2^31-1 is an error.
//!
//! Stream lifecycle is `Idle -> Open -> Closed`. Closed streams are dropped
//! from the map; any id at or below the highest opened id that is no longer
//! tracked reads as [`StreamPhase::Closed`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{FlowControlError, H2Error, LogicError, ProtocolError};
use crate::frame::{DEFAULT_INITIAL_WINDOW_SIZE, MAX_WINDOW_SIZE};
use crate::payload::Frame;
use crate::settings::{apply_settings, PeerSettings, SettingEffect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Open,
    Closed,
}

/// Per-stream window bookkeeping. Richer per-stream state belongs in a
/// wrapper keyed by the same id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamState {
    pub id: u32,
    pub send_window: i64,
    pub end_stream_sent: bool,
    pub end_stream_received: bool,
}

/// Which way a frame travelled, from the point of view of the endpoint
/// whose send windows this state tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The endpoint received the frame: SETTINGS and WINDOW_UPDATE adjust
    /// its send windows.
    Received,
    /// The endpoint sent the frame: DATA consumes its send windows.
    Sent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowTarget {
    Connection,
    Stream(u32),
}

impl WindowTarget {
    /// Stream id 0 addresses the connection window.
    pub fn from_stream_id(stream_id: u32) -> Self {
        if stream_id == 0 {
            WindowTarget::Connection
        } else {
            WindowTarget::Stream(stream_id)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUpdateOutcome {
    Applied { target: WindowTarget, before: i64, after: i64 },
    /// The stream is unknown or already closed; the update is dropped.
    IgnoredUnknownStream { stream_id: u32 },
}

/// What observing a frame changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    StreamOpened { stream_id: u32, send_window: i64 },
    StreamClosed { stream_id: u32 },
    Settings(Vec<SettingEffect>),
    SettingsAck,
    WindowUpdate(WindowUpdateOutcome),
    Consumed { stream_id: u32, len: u32 },
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub(crate) settings: PeerSettings,
    connection_window: i64,
    pub(crate) streams: BTreeMap<u32, StreamState>,
    highest_stream_id: u32,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            settings: PeerSettings::default(),
            connection_window: DEFAULT_INITIAL_WINDOW_SIZE as i64,
            streams: BTreeMap::new(),
            highest_stream_id: 0,
        }
    }

    /// Start from a non-default SETTINGS_INITIAL_WINDOW_SIZE, as if it had
    /// been negotiated before any stream opened. Values above 2^31-1 are
    /// rejected like any other settings update.
    pub fn with_initial_window_size(initial_window_size: u32) -> Result<Self, H2Error> {
        if initial_window_size as i64 > MAX_WINDOW_SIZE {
            return Err(FlowControlError::InitialWindowSizeTooLarge {
                value: initial_window_size,
            }
            .into());
        }
        let mut state = Self::new();
        state.settings.initial_window_size = initial_window_size;
        Ok(state)
    }

    pub fn initial_window_size(&self) -> u32 {
        self.settings.initial_window_size
    }

    pub fn settings(&self) -> &PeerSettings {
        &self.settings
    }

    pub fn connection_window(&self) -> i64 {
        self.connection_window
    }

    pub fn stream(&self, stream_id: u32) -> Option<&StreamState> {
        self.streams.get(&stream_id)
    }

    pub fn send_window(&self, stream_id: u32) -> Option<i64> {
        self.streams.get(&stream_id).map(|s| s.send_window)
    }

    /// Open streams in ascending id order.
    pub fn open_streams(&self) -> impl Iterator<Item = &StreamState> {
        self.streams.values()
    }

    pub fn phase(&self, stream_id: u32) -> StreamPhase {
        if self.streams.contains_key(&stream_id) {
            StreamPhase::Open
        } else if stream_id != 0 && stream_id <= self.highest_stream_id {
            StreamPhase::Closed
        } else {
            StreamPhase::Idle
        }
    }

    /// Idle -> Open, with the window set to the current initial window size.
    /// Open and Closed streams are left as they are.
    pub fn open_stream(&mut self, stream_id: u32) -> StreamPhase {
        match self.phase(stream_id) {
            StreamPhase::Idle if stream_id != 0 => {
                let send_window = self.settings.initial_window_size as i64;
                debug!(%stream_id, %send_window, "stream opened");
                self.streams.insert(
                    stream_id,
                    StreamState {
                        id: stream_id,
                        send_window,
                        end_stream_sent: false,
                        end_stream_received: false,
                    },
                );
                self.highest_stream_id = stream_id;
                StreamPhase::Open
            }
            phase => phase,
        }
    }

    /// Move a stream to Closed. Closing an unknown stream is a no-op.
    pub fn close_stream(&mut self, stream_id: u32) {
        if self.streams.remove(&stream_id).is_some() {
            debug!(%stream_id, "stream closed");
        }
        self.highest_stream_id = self.highest_stream_id.max(stream_id);
    }

    /// Add `increment` to the connection window or a stream window.
    pub fn apply_window_update(&mut self, target: WindowTarget, increment: u32) -> Result<WindowUpdateOutcome, H2Error> {
        if increment == 0 {
            let stream_id = match target {
                WindowTarget::Connection => 0,
                WindowTarget::Stream(id) => id,
            };
            return Err(ProtocolError::ZeroWindowIncrement { stream_id }.into());
        }

        let window = match target {
            WindowTarget::Connection => &mut self.connection_window,
            WindowTarget::Stream(stream_id) => match self.streams.get_mut(&stream_id) {
                Some(stream) => &mut stream.send_window,
                None => {
                    debug!(%stream_id, %increment, "ignoring window update for unknown or closed stream");
                    return Ok(WindowUpdateOutcome::IgnoredUnknownStream { stream_id });
                }
            },
        };

        let before = *window;
        let after = before + increment as i64;
        if after > MAX_WINDOW_SIZE {
            return Err(match target {
                WindowTarget::Connection => FlowControlError::ConnectionWindowOverflow { window: after },
                WindowTarget::Stream(stream_id) => FlowControlError::StreamWindowOverflow { stream_id, window: after },
            }
            .into());
        }
        *window = after;
        debug!(?target, %before, %after, "window update applied");

        Ok(WindowUpdateOutcome::Applied { target, before, after })
    }

    /// Bytes a DATA sender may emit on `stream_id` right now.
    pub fn sendable(&self, stream_id: u32) -> u32 {
        match self.streams.get(&stream_id) {
            Some(stream) => stream.send_window.min(self.connection_window).max(0) as u32,
            None => 0,
        }
    }

    /// Charge `len` bytes of DATA against the stream and connection windows.
    /// The caller must check [`ConnectionState::sendable`] first.
    pub fn consume(&mut self, stream_id: u32, len: u32) -> Result<(), H2Error> {
        let connection_window = self.connection_window;
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(LogicError::StreamNotOpen { stream_id })?;

        if len as i64 > stream.send_window {
            return Err(LogicError::StreamWindowExceeded {
                stream_id,
                requested: len,
                available: stream.send_window,
            }
            .into());
        }
        if len as i64 > connection_window {
            return Err(LogicError::ConnectionWindowExceeded {
                requested: len,
                available: connection_window,
            }
            .into());
        }

        stream.send_window -= len as i64;
        self.connection_window -= len as i64;
        debug!(%stream_id, %len, stream_window = %stream.send_window, connection_window = %self.connection_window, "window consumed");
        Ok(())
    }

    /// Shift every open stream window by `delta`. Nothing changes when any
    /// stream would overflow.
    pub(crate) fn shift_stream_windows(&mut self, delta: i64) -> Result<Vec<WindowShift>, H2Error> {
        if let Some(stream) = self.streams.values().find(|s| s.send_window + delta > MAX_WINDOW_SIZE) {
            return Err(FlowControlError::StreamWindowOverflow {
                stream_id: stream.id,
                window: stream.send_window + delta,
            }
            .into());
        }

        Ok(self
            .streams
            .values_mut()
            .map(|stream| {
                let before = stream.send_window;
                stream.send_window += delta;
                WindowShift {
                    stream_id: stream.id,
                    before,
                    after: stream.send_window,
                }
            })
            .collect())
    }

    /// Fold one frame into the state. Settings ACKs are reported but not
    /// applied; all other frames follow the stream lifecycle rules.
    pub fn observe(&mut self, frame: &Frame, direction: Direction) -> Result<Observation, H2Error> {
        match (frame, direction) {
            (Frame::Settings(settings), Direction::Received) if settings.ack => Ok(Observation::SettingsAck),
            (Frame::Settings(settings), Direction::Received) => {
                apply_settings(settings, self).map(Observation::Settings)
            }
            (Frame::WindowUpdate(update), Direction::Received) => self
                .apply_window_update(WindowTarget::from_stream_id(update.stream_id), update.increment)
                .map(Observation::WindowUpdate),
            (Frame::Headers(headers), _) => {
                let stream_id = headers.stream_id;
                let opened = self.phase(stream_id) == StreamPhase::Idle && self.open_stream(stream_id) == StreamPhase::Open;
                let observation = if headers.end_stream {
                    self.mark_end_stream(stream_id, direction)
                } else {
                    Observation::Unchanged
                };
                // A fresh stream cannot close on its first END_STREAM.
                match self.send_window(stream_id) {
                    Some(send_window) if opened => Ok(Observation::StreamOpened { stream_id, send_window }),
                    _ => Ok(observation),
                }
            }
            (Frame::Data(data), Direction::Sent) => {
                let len = data.flow_controlled_len();
                self.consume(data.stream_id, len)?;
                if data.end_stream {
                    self.mark_end_stream(data.stream_id, direction);
                }
                Ok(Observation::Consumed {
                    stream_id: data.stream_id,
                    len,
                })
            }
            (Frame::Data(data), Direction::Received) if data.end_stream => {
                Ok(self.mark_end_stream(data.stream_id, direction))
            }
            (Frame::RstStream(rst), _) => {
                self.close_stream(rst.stream_id);
                Ok(Observation::StreamClosed { stream_id: rst.stream_id })
            }
            _ => Ok(Observation::Unchanged),
        }
    }

    fn mark_end_stream(&mut self, stream_id: u32, direction: Direction) -> Observation {
        let Some(stream) = self.streams.get_mut(&stream_id) else {
            return Observation::Unchanged;
        };
        match direction {
            Direction::Sent => stream.end_stream_sent = true,
            Direction::Received => stream.end_stream_received = true,
        }
        if stream.end_stream_sent && stream.end_stream_received {
            self.close_stream(stream_id);
            Observation::StreamClosed { stream_id }
        } else {
            Observation::Unchanged
        }
    }
}

/// One stream's window before and after an INITIAL_WINDOW_SIZE change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowShift {
    pub stream_id: u32,
    pub before: i64,
    pub after: i64,
}

// ============================================================================
// Tests
// ============================================================================
