//! Device operational state shared by the device controller and the master.
//!
//! `#[repr(u8)]` so the value travels as a single byte in both process-data
//! directions: the device publishes its current state, the master writes
//! the state it wants the device to be in.

use serde::{Deserialize, Serialize};

/// Operational state of a device controller.
///
/// Exactly one state is current at any instant. Only `Run` energizes
/// outputs; `Error` exits only through `Reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeviceState {
    /// Outputs disabled, waiting for a Run command.
    Idle = 0,
    /// Pre-run checks; outputs are enabled on success.
    Init = 1,
    /// Outputs live.
    Run = 2,
    /// Cooperative stop, one-shot back to Idle.
    Stop = 3,
    /// Device-specific graceful stop controller active.
    Halt = 4,
    /// Clears faults after an Error, one-shot back to Idle.
    Reset = 5,
    /// Fault latched; stop line asserted every cycle.
    Error = 6,
}

impl DeviceState {
    /// Every state in tick evaluation order.
    pub const ALL: [Self; 7] = [
        Self::Idle,
        Self::Init,
        Self::Run,
        Self::Stop,
        Self::Halt,
        Self::Reset,
        Self::Error,
    ];

    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Init),
            2 => Some(Self::Run),
            3 => Some(Self::Stop),
            4 => Some(Self::Halt),
            5 => Some(Self::Reset),
            6 => Some(Self::Error),
            _ => None,
        }
    }

    /// Decode a raw state value, folding anything unknown into `Error`.
    #[inline]
    pub const fn from_raw(value: u8) -> Self {
        match Self::from_u8(value) {
            Some(state) => state,
            None => Self::Error,
        }
    }

    /// Whether device outputs may be energized in this state.
    #[inline]
    pub const fn outputs_live(&self) -> bool {
        matches!(self, Self::Run | Self::Halt)
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::Idle
    }
}

/// The master's requested state as read from inbound process data.
///
/// `None` when the raw byte is outside the enumeration; such a command
/// matches no transition.
pub type CommandedState = Option<DeviceState>;
