//! Ordered application of SETTINGS parameters (RFC 7540 Sections 6.5 and
//! 6.9.2).
//!
//! A single SETTINGS frame may carry the same id several times. Each
//! occurrence is its own event: an INITIAL_WINDOW_SIZE occurrence shifts
//! every open stream window by `new - current`, and the next occurrence
//! measures its delta against the value just written. Folding the frame into
//! a map first would keep only the last value and lose the intermediate
//! shifts.

use tracing::debug;

use crate::error::{FlowControlError, H2Error, LogicError, ProtocolError};
use crate::flow::{ConnectionState, WindowShift};
use crate::frame::{DEFAULT_INITIAL_WINDOW_SIZE, DEFAULT_MAX_FRAME_SIZE, MAX_PAYLOAD_LEN, MAX_WINDOW_SIZE};
use crate::payload::{Setting, SettingsFrame, SettingsParameter};

/// Settings announced by the peer, at their RFC 7540 defaults until changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSettings {
    pub(crate) header_table_size: u32,
    pub(crate) enable_push: bool,
    pub(crate) max_concurrent_streams: Option<u32>,
    pub(crate) initial_window_size: u32,
    pub(crate) max_frame_size: u32,
    pub(crate) max_header_list_size: Option<u32>,
}

impl Default for PeerSettings {
    fn default() -> Self {
        Self {
            header_table_size: 4096,
            enable_push: true,
            max_concurrent_streams: None,
            initial_window_size: DEFAULT_INITIAL_WINDOW_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_header_list_size: None,
        }
    }
}

impl PeerSettings {
    /// Current value, `None` when the setting is still unlimited.
    pub fn get(&self, setting: Setting) -> Option<u32> {
        match setting {
            Setting::HeaderTableSize => Some(self.header_table_size),
            Setting::EnablePush => Some(self.enable_push as u32),
            Setting::MaxConcurrentStreams => self.max_concurrent_streams,
            Setting::InitialWindowSize => Some(self.initial_window_size),
            Setting::MaxFrameSize => Some(self.max_frame_size),
            Setting::MaxHeaderListSize => self.max_header_list_size,
        }
    }

    pub fn header_table_size(&self) -> u32 {
        self.header_table_size
    }

    pub fn enable_push(&self) -> bool {
        self.enable_push
    }

    pub fn max_concurrent_streams(&self) -> Option<u32> {
        self.max_concurrent_streams
    }

    pub fn initial_window_size(&self) -> u32 {
        self.initial_window_size
    }

    pub fn max_frame_size(&self) -> u32 {
        self.max_frame_size
    }

    pub fn max_header_list_size(&self) -> Option<u32> {
        self.max_header_list_size
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// INITIAL_WINDOW_SIZE changed; every open stream moved by `delta`.
    InitialWindowSize {
        old: u32,
        new: u32,
        delta: i64,
        shifts: Vec<WindowShift>,
    },
    /// A setting without window side effects was recorded.
    Recorded { setting: Setting, old: Option<u32>, new: u32 },
    /// Unknown id; no state change.
    Ignored,
}

/// One entry of the log returned by [`apply_settings`], in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingEffect {
    pub parameter: SettingsParameter,
    pub effect: Effect,
}

/// Apply every parameter of a non-ACK SETTINGS frame, in order.
///
/// On error, the parameters before the failing one stay applied; the caller
/// decides whether to tear the connection down.
pub fn apply_settings(frame: &SettingsFrame, state: &mut ConnectionState) -> Result<Vec<SettingEffect>, H2Error> {
    if frame.ack {
        return Err(LogicError::SettingsAckNotApplicable.into());
    }

    let mut log = Vec::with_capacity(frame.parameters.len());
    for parameter in &frame.parameters {
        let effect = apply_parameter(*parameter, state)?;
        log.push(SettingEffect {
            parameter: *parameter,
            effect,
        });
    }
    Ok(log)
}

fn apply_parameter(parameter: SettingsParameter, state: &mut ConnectionState) -> Result<Effect, H2Error> {
    let Some(setting) = parameter.setting() else {
        debug!(id = %parameter.id, value = %parameter.value, "ignoring unknown setting");
        return Ok(Effect::Ignored);
    };
    let value = parameter.value;
    let old = state.settings.get(setting);

    match setting {
        Setting::InitialWindowSize => return apply_initial_window_size(value, state),
        Setting::EnablePush => {
            if value > 1 {
                return Err(ProtocolError::InvalidEnablePush { value }.into());
            }
            state.settings.enable_push = value == 1;
        }
        Setting::MaxFrameSize => {
            if value < DEFAULT_MAX_FRAME_SIZE || value as usize > MAX_PAYLOAD_LEN {
                return Err(ProtocolError::InvalidMaxFrameSize { value }.into());
            }
            state.settings.max_frame_size = value;
        }
        Setting::HeaderTableSize => state.settings.header_table_size = value,
        Setting::MaxConcurrentStreams => state.settings.max_concurrent_streams = Some(value),
        Setting::MaxHeaderListSize => state.settings.max_header_list_size = Some(value),
    }

    debug!(?setting, ?old, new = %value, "setting recorded");
    Ok(Effect::Recorded {
        setting,
        old,
        new: value,
    })
}

fn apply_initial_window_size(new: u32, state: &mut ConnectionState) -> Result<Effect, H2Error> {
    if new as i64 > MAX_WINDOW_SIZE {
        return Err(FlowControlError::InitialWindowSizeTooLarge { value: new }.into());
    }

    let old = state.settings.initial_window_size;
    let delta = new as i64 - old as i64;
    let shifts = state.shift_stream_windows(delta)?;
    state.settings.initial_window_size = new;

    debug!(%old, %new, %delta, streams = shifts.len(), "initial window size changed");
    Ok(Effect::InitialWindowSize { old, new, delta, shifts })
}
