//! Client-side probe driver.
//!
//! Sends the connection preface and a scripted sequence of frames over a
//! caller-supplied [`Transport`], parses whatever the server sends back, and
//! keeps a [`ConnectionState`] modelling the server's send windows: every
//! SETTINGS and WINDOW_UPDATE the probe sends is applied to the model as the
//! server should apply it, and every DATA frame the server sends is charged
//! against it. The report puts what arrived next to what the model allows.
//!
//! Whether a server resumes sending once a window turns positive again is the
//! server's own policy; the probe only records what it observes.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Write};

use tracing::debug;

use crate::error::H2Error;
use crate::flow::{ConnectionState, Direction};
use crate::frame::{FrameHeader, FrameType, CONNECTION_PREFACE};
use crate::h2_codec::H2Codec;
use crate::hpack::{get_request_headers, H2Header, HpackDecoder, HpackEncoder, HpackError};
use crate::payload::{Frame, SettingsParameter};

/// Byte transport to the server under test. TLS, sockets and timing are the
/// caller's concern.
pub trait Transport {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read whatever is available. `Ok(0)` means the peer closed the
    /// connection; `WouldBlock` or `TimedOut` means nothing arrived in time.
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).send(bytes)
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).receive(buf)
    }
}

/// [`Transport`] over any blocking `Read + Write` stream, such as a
/// `TcpStream` with a read timeout or a TLS stream wrapping one.
#[derive(Debug)]
pub struct IoTransport<T> {
    inner: T,
}

impl<T> IoTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write> Transport for IoTransport<T> {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)?;
        self.inner.flush()
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Why a single step failed.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    #[error("peer sent an invalid frame: {0}")]
    H2(#[from] H2Error),

    #[error(transparent)]
    Hpack(#[from] HpackError),

    #[error("peer closed the connection")]
    PeerClosed,

    #[error("no SETTINGS ACK after {reads} reads")]
    SettingsAckTimeout { reads: usize },
}

/// A run that stopped early, with the partial report.
#[derive(Debug, thiserror::Error)]
#[error("step {step} failed: {error}")]
pub struct RunError {
    pub step: usize,
    #[source]
    pub error: ProbeError,
    pub report: ProbeReport,
}

/// Request target and read limits for a [`Probe`].
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub scheme: String,
    pub authority: String,
    pub path: String,
    pub read_buffer_size: usize,
    /// Upper bound on reads while waiting for an ACK or draining.
    pub max_reads: usize,
    /// Acknowledge SETTINGS frames sent by the server.
    pub ack_peer_settings: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            authority: String::new(),
            path: "/".to_string(),
            read_buffer_size: 4096,
            max_reads: 64,
            ack_peer_settings: true,
        }
    }
}

impl ProbeConfig {
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn with_max_reads(mut self, max_reads: usize) -> Self {
        self.max_reads = max_reads;
        self
    }

    pub fn with_ack_peer_settings(mut self, ack: bool) -> Self {
        self.ack_peer_settings = ack;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A non-ACK SETTINGS frame with these parameters, in this order.
    Settings(Vec<SettingsParameter>),
    /// A bodiless GET opening `stream_id` (END_STREAM | END_HEADERS).
    Request { stream_id: u32 },
    /// Any other frame, sent as is.
    Frame(Frame),
    /// Read until every SETTINGS frame sent so far is acknowledged.
    AwaitSettingsAck,
    /// Read until the server goes quiet, closes, or `max_reads` is reached.
    Drain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: &'static str,
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Open a stream at the default window, then shrink INITIAL_WINDOW_SIZE
    /// to 100.
    pub fn window_after_headers() -> Self {
        Self {
            name: "window_after_headers",
            steps: vec![
                Step::Settings(Vec::new()),
                Step::Request { stream_id: 1 },
                Step::Settings(vec![SettingsParameter { id: 4, value: 100 }]),
                Step::Drain,
            ],
        }
    }

    /// Two INITIAL_WINDOW_SIZE occurrences (0 then 65536) in one frame,
    /// before the stream opens.
    pub fn multiple_settings_one_frame() -> Self {
        Self {
            name: "multiple_settings_one_frame",
            steps: vec![
                Step::Settings(Vec::new()),
                Step::AwaitSettingsAck,
                Step::Settings(vec![
                    SettingsParameter { id: 4, value: 0 },
                    SettingsParameter { id: 4, value: 65536 },
                ]),
                Step::Request { stream_id: 1 },
                Step::Drain,
            ],
        }
    }

    /// Open a stream at window 0, then send 100 and 1 in one frame: the
    /// server may send exactly one byte.
    pub fn shrink_then_grow() -> Self {
        Self {
            name: "shrink_then_grow",
            steps: vec![
                Step::Settings(vec![SettingsParameter { id: 4, value: 0 }]),
                Step::AwaitSettingsAck,
                Step::Request { stream_id: 1 },
                Step::Settings(vec![
                    SettingsParameter { id: 4, value: 100 },
                    SettingsParameter { id: 4, value: 1 },
                ]),
                Step::Drain,
            ],
        }
    }

    /// Open a stream, drop its window to 0 and raise it to 65536 in two
    /// separate frames.
    pub fn stepwise_window_change() -> Self {
        Self {
            name: "stepwise_window_change",
            steps: vec![
                Step::Settings(Vec::new()),
                Step::AwaitSettingsAck,
                Step::Request { stream_id: 1 },
                Step::Settings(vec![SettingsParameter { id: 4, value: 0 }]),
                Step::AwaitSettingsAck,
                Step::Settings(vec![SettingsParameter { id: 4, value: 65536 }]),
                Step::AwaitSettingsAck,
                Step::Drain,
            ],
        }
    }
}

/// Modelled server send windows after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub step: usize,
    pub initial_window_size: u32,
    pub connection_window: i64,
    pub streams: Vec<(u32, i64)>,
}

impl WindowSnapshot {
    fn capture(step: usize, model: &ConnectionState) -> Self {
        Self {
            step,
            initial_window_size: model.initial_window_size(),
            connection_window: model.connection_window(),
            streams: model.open_streams().map(|s| (s.id, s.send_window)).collect(),
        }
    }

    pub fn stream_window(&self, stream_id: u32) -> Option<i64> {
        self.streams.iter().find(|(id, _)| *id == stream_id).map(|(_, w)| *w)
    }
}

/// Something the server did (or should have done) that departs from the
/// modelled protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// The server sent more DATA than the modelled window allowed.
    WindowExceeded { stream_id: u32, error: H2Error },
    /// A frame the probe sent should have been rejected by the server.
    ExpectedRejection { frame_type: FrameType, error: H2Error },
    GoAway { last_stream_id: u32, error_code: u32, debug_data: Vec<u8> },
    StreamReset { stream_id: u32, error_code: u32 },
}

/// A frame read from the server, with the header it is logged under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    /// Header as the frame re-encodes; padding is kept, CONTINUATION
    /// fragments are folded into their HEADERS frame.
    pub header: FrameHeader,
    pub frame: Frame,
}

impl ReceivedFrame {
    pub fn new(frame: Frame) -> Result<Self, H2Error> {
        Ok(Self {
            header: frame.header()?,
            frame,
        })
    }
}

impl fmt::Display for ReceivedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = &self.frame;
        write!(
            f,
            "Frame: {} length={}, flags={:#04x}, stream_id={}",
            self.header.frame_type, self.header.length, self.header.flags, self.header.stream_id
        )?;
        match frame {
            Frame::Data(data) => write!(f, " data_len={} end_stream={}", data.data.len(), data.end_stream),
            Frame::Headers(headers) => write!(f, " block_len={} end_stream={}", headers.header_block.len(), headers.end_stream),
            Frame::Settings(settings) => write!(f, " ack={} params={}", settings.ack, settings.parameters.len()),
            Frame::WindowUpdate(update) => write!(f, " increment={}", update.increment),
            Frame::RstStream(rst) => write!(f, " error_code={:#x}", rst.error_code),
            Frame::GoAway(goaway) => write!(f, " last_stream_id={} error_code={:#x}", goaway.last_stream_id, goaway.error_code),
            Frame::Unknown { payload, .. } => write!(f, " len={}", payload.len()),
        }
    }
}

/// Everything a run observed, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub frames: Vec<ReceivedFrame>,
    pub data_bytes: BTreeMap<u32, usize>,
    pub response_headers: BTreeMap<u32, Vec<H2Header>>,
    pub windows: Vec<WindowSnapshot>,
    pub findings: Vec<Finding>,
    pub settings_acks_received: usize,
    pub peer_closed: bool,
}

impl ProbeReport {
    pub fn data_received(&self, stream_id: u32) -> usize {
        self.data_bytes.get(&stream_id).copied().unwrap_or(0)
    }

    pub fn last_window(&self) -> Option<&WindowSnapshot> {
        self.windows.last()
    }
}

/// Drives one connection: sends scripted frames, reads the server's
/// replies and checks them against a modelled [`ConnectionState`].
#[derive(Debug)]
pub struct Probe<T> {
    transport: T,
    config: ProbeConfig,
    codec: H2Codec,
    encoder: HpackEncoder,
    decoder: HpackDecoder,
    model: ConnectionState,
    preface_sent: bool,
    pending_acks: usize,
    report: ProbeReport,
}

impl<T: Transport> Probe<T> {
    pub fn new(transport: T, config: ProbeConfig) -> Self {
        Self {
            transport,
            config,
            codec: H2Codec::without_preface(),
            encoder: HpackEncoder::new(),
            decoder: HpackDecoder::new(),
            model: ConnectionState::new(),
            preface_sent: false,
            pending_acks: 0,
            report: ProbeReport::default(),
        }
    }

    /// The modelled server send windows.
    pub fn model(&self) -> &ConnectionState {
        &self.model
    }

    pub fn report(&self) -> &ProbeReport {
        &self.report
    }

    pub fn into_report(self) -> ProbeReport {
        self.report
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run every step of `scenario`, sending the preface first.
    ///
    /// A failing step stops the run. The error comes back together with
    /// everything recorded up to that point, including a snapshot taken
    /// after the failed step.
    pub fn run(mut self, scenario: &Scenario) -> Result<ProbeReport, RunError> {
        debug!(scenario = scenario.name, steps = scenario.steps.len(), "running probe");
        for (index, step) in scenario.steps.iter().enumerate() {
            let outcome = self.step(step);
            self.report.windows.push(WindowSnapshot::capture(index, &self.model));
            if let Err(error) = outcome {
                debug!(step = index, %error, "scenario aborted");
                return Err(RunError {
                    step: index,
                    error,
                    report: self.report,
                });
            }
        }
        Ok(self.report)
    }

    pub fn step(&mut self, step: &Step) -> Result<(), ProbeError> {
        match step {
            Step::Settings(parameters) => self.send_frame(&Frame::settings(parameters.clone())),
            Step::Request { stream_id } => self.send_request(*stream_id),
            Step::Frame(frame) => self.send_frame(frame),
            Step::AwaitSettingsAck => self.await_settings_ack(),
            Step::Drain => self.drain(),
        }
    }

    /// Send the 24-byte preface. Later calls do nothing.
    pub fn send_preface(&mut self) -> Result<(), ProbeError> {
        if !self.preface_sent {
            self.transport.send(CONNECTION_PREFACE)?;
            self.preface_sent = true;
            debug!("sent connection preface");
        }
        Ok(())
    }

    pub fn send_request(&mut self, stream_id: u32) -> Result<(), ProbeError> {
        let headers = get_request_headers(&self.config.scheme, &self.config.authority, &self.config.path);
        let block = self.encoder.encode(&headers);
        self.send_frame(&Frame::headers(stream_id, block, true))
    }

    /// Encode and send `frame`, then apply it to the model as the server
    /// should.
    pub fn send_frame(&mut self, frame: &Frame) -> Result<(), ProbeError> {
        self.send_preface()?;
        let bytes = frame.encode()?;
        self.transport.send(&bytes)?;
        debug!(?frame, ">");

        if let Frame::Settings(settings) = frame {
            if !settings.ack {
                self.pending_acks += 1;
            }
        }

        if let Err(error) = self.model.observe(frame, Direction::Received) {
            debug!(%error, "server should reject this frame");
            self.report.findings.push(Finding::ExpectedRejection {
                frame_type: frame.frame_type(),
                error,
            });
        }
        Ok(())
    }

    /// Read until every SETTINGS frame sent so far has been acknowledged.
    pub fn await_settings_ack(&mut self) -> Result<(), ProbeError> {
        let mut reads = 0;
        while self.pending_acks > 0 {
            if reads == self.config.max_reads {
                return Err(ProbeError::SettingsAckTimeout { reads });
            }
            reads += 1;
            match self.receive_once() {
                Ok(true) => {}
                Ok(false) => return Err(ProbeError::PeerClosed),
                Err(ProbeError::Io(e)) if is_timeout(&e) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Read until the server goes quiet, hangs up, or `max_reads` is hit.
    pub fn drain(&mut self) -> Result<(), ProbeError> {
        for _ in 0..self.config.max_reads {
            match self.receive_once() {
                Ok(true) => {}
                Ok(false) => break,
                Err(ProbeError::Io(e)) if is_timeout(&e) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// One read from the transport. Returns `false` once the peer has closed.
    fn receive_once(&mut self) -> Result<bool, ProbeError> {
        if self.report.peer_closed {
            return Ok(false);
        }
        let mut buf = vec![0u8; self.config.read_buffer_size];
        let n = self.transport.receive(&mut buf)?;
        if n == 0 {
            debug!("peer hung up");
            self.report.peer_closed = true;
            return Ok(false);
        }

        for frame in self.codec.process(&buf[..n])? {
            self.handle_frame(frame)?;
        }
        if let Some(error) = self.codec.take_error() {
            return Err(error.into());
        }
        Ok(true)
    }

    fn handle_frame(&mut self, frame: Frame) -> Result<(), ProbeError> {
        debug!(?frame, "<");
        match &frame {
            Frame::Settings(settings) if settings.ack => {
                self.pending_acks = self.pending_acks.saturating_sub(1);
                self.report.settings_acks_received += 1;
            }
            Frame::Settings(_) => {
                if self.config.ack_peer_settings {
                    let ack = Frame::settings_ack().encode()?;
                    self.transport.send(&ack)?;
                    debug!("acknowledged peer settings");
                }
            }
            Frame::Headers(headers) => {
                let decoded = self.decoder.decode(&headers.header_block)?;
                self.report
                    .response_headers
                    .entry(headers.stream_id)
                    .or_default()
                    .extend(decoded);
                self.observe_sent(&frame);
            }
            Frame::Data(data) => {
                *self.report.data_bytes.entry(data.stream_id).or_default() += data.data.len();
                self.observe_sent(&frame);
            }
            Frame::RstStream(rst) => {
                self.report.findings.push(Finding::StreamReset {
                    stream_id: rst.stream_id,
                    error_code: rst.error_code,
                });
                self.observe_sent(&frame);
            }
            Frame::GoAway(goaway) => {
                self.report.findings.push(Finding::GoAway {
                    last_stream_id: goaway.last_stream_id,
                    error_code: goaway.error_code,
                    debug_data: goaway.debug_data.clone(),
                });
            }
            Frame::WindowUpdate(_) | Frame::Unknown { .. } => {}
        }
        self.report.frames.push(ReceivedFrame::new(frame)?);
        Ok(())
    }

    /// Charge a server-sent frame against the modelled windows.
    fn observe_sent(&mut self, frame: &Frame) {
        if let Err(error) = self.model.observe(frame, Direction::Sent) {
            debug!(%error, "server exceeded its window");
            self.report.findings.push(Finding::WindowExceeded {
                stream_id: frame.stream_id(),
                error,
            });
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

// ============================================================================
// Tests
// ============================================================================
