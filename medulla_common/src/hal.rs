//! Hardware capability traits and error types.
//!
//! The device controller never touches registers. Everything it needs from
//! the board is expressed as a small set of capabilities:
//!
//! - [`SyncTrigger`] - blocking wait for the fieldbus cycle edge
//! - [`LocalWatchdog`] - feedable countdown with autonomous expiry
//! - [`StopLine`] - the shared emergency-stop line (read, assert, deassert)
//! - [`FieldbusPort`] - the synchronized process-data memory
//! - [`SensorIo`] - device-specific sensors and actuators
//!
//! A [`Board`] is anything offering all five. Simulation and real hardware
//! backends implement the same traits.
//!
//! # Timing Contracts
//!
//! | Operation | Max Duration | RT Constraint |
//! |-----------|--------------|---------------|
//! | `wait_for_edge()` | timeout | Blocks; the only suspension point |
//! | `SensorIo` calls | a few µs | **HARD**, called inside a tick |
//! | `feed()` / stop line | O(1) | **HARD** |

use std::time::Duration;
use thiserror::Error;

/// Error types for hardware operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// The board does not provide this capability.
    #[error("capability not supported: {0}")]
    Unsupported(&'static str),

    /// Sensor read failed or returned invalid data.
    #[error("sensor read failed: {0}")]
    SensorFault(String),

    /// Actuator rejected a command or reported a fault.
    #[error("actuator fault: {0}")]
    ActuatorFault(String),

    /// Hardware initialization failed.
    #[error("initialization failed: {0}")]
    InitFailed(String),
}

/// One observed cycle-trigger edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Monotonic edge sequence number assigned by the hardware.
    pub sequence: u64,
    /// Monotonic timestamp of the edge since board start.
    pub timestamp: Duration,
}

/// Cycle trigger: the periodic edge marking the start of a fieldbus cycle.
pub trait SyncTrigger {
    /// Block until the next edge or until `timeout` elapses.
    ///
    /// Returns the edge (and clears it) or `None` on timeout. An edge is
    /// returned exactly once.
    fn wait_for_edge(&mut self, timeout: Duration) -> Option<EdgeEvent>;

    /// Time elapsed since the most recent edge (the per-cycle timestamp
    /// counter, cleared on every edge).
    fn since_edge(&self) -> Duration;
}

/// Local hardware watchdog.
///
/// When not fed within its timeout the hardware escalates on its own; the
/// software can only observe the expiry afterwards.
pub trait LocalWatchdog {
    /// Reset the countdown.
    fn feed(&mut self);

    /// Whether the countdown ran out.
    fn expired(&self) -> bool;
}

/// The shared emergency-stop line.
pub trait StopLine {
    /// Whether the line currently reads asserted (by anyone on the bus).
    fn is_estopped(&self) -> bool;

    /// Drive the line asserted from this device.
    fn assert_stop(&mut self);

    /// Release this device's assertion. Idempotent.
    fn deassert_stop(&mut self);
}

/// The synchronized process-data memory shared with the fieldbus master.
pub trait FieldbusPort {
    /// Copy the outbound record into the transport.
    fn write_tx(&mut self, data: &[u8]);

    /// Copy the inbound record out of the transport.
    fn read_rx(&mut self, buf: &mut [u8]);
}

/// Encoder channels a board may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderChannel {
    /// Motor-side encoder (before the spring/transmission).
    Motor,
    /// Output-side encoder (after the spring/transmission).
    Output,
    /// Boom pitch.
    BoomPitch,
    /// Boom pan (yaw around the center post).
    BoomPan,
    /// Boom tilt (height).
    BoomTilt,
}

impl EncoderChannel {
    /// Index into per-channel tables.
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Number of encoder channels.
    pub const COUNT: usize = 5;
}

/// Analog channels a board may expose (raw ADC counts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogChannel {
    /// Motor thermistor `n` (0..3).
    Thermistor(u8),
    /// Motor supply voltage.
    MotorVoltage,
    /// Logic supply voltage.
    LogicVoltage,
}

/// Device-specific sensor and actuator access.
///
/// Boards implement the capabilities they physically have; the rest keep
/// the default `Unsupported` implementation.
pub trait SensorIo {
    /// Read an absolute encoder position [counts].
    fn read_encoder(&mut self, _channel: EncoderChannel) -> Result<u32, HalError> {
        Err(HalError::Unsupported("encoder"))
    }

    /// Read an analog channel [ADC counts].
    fn read_analog(&mut self, _channel: AnalogChannel) -> Result<u16, HalError> {
        Err(HalError::Unsupported("analog"))
    }

    /// Raw limit-switch bank (bit set = switch pressed).
    fn limit_switches(&mut self) -> Result<u8, HalError> {
        Err(HalError::Unsupported("limit switches"))
    }

    /// Enable or disable the motor amplifier.
    fn set_amplifier_enabled(&mut self, _enabled: bool) -> Result<(), HalError> {
        Err(HalError::Unsupported("amplifier"))
    }

    /// Command motor current [amplifier counts].
    fn set_motor_current(&mut self, _current: i32) -> Result<(), HalError> {
        Err(HalError::Unsupported("amplifier"))
    }

    /// Whether the amplifier latched a fault.
    fn amplifier_fault(&mut self) -> Result<bool, HalError> {
        Err(HalError::Unsupported("amplifier"))
    }

    /// Pulse the IMU master-sync input so it emits one frame.
    fn trigger_imu_sync(&mut self) -> Result<(), HalError> {
        Err(HalError::Unsupported("imu"))
    }

    /// Drain received IMU bytes into `buf`, returning the count.
    fn read_imu_frame(&mut self, _buf: &mut [u8]) -> Result<usize, HalError> {
        Err(HalError::Unsupported("imu"))
    }
}

/// Everything a device controller needs from its board.
pub trait Board: SyncTrigger + LocalWatchdog + StopLine + FieldbusPort + SensorIo {}

impl<T> Board for T where T: SyncTrigger + LocalWatchdog + StopLine + FieldbusPort + SensorIo {}
