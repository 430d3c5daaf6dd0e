//! Device-Type strategies.
//!
//! One [`DeviceType`] is chosen at startup from the DIP-switch identity and
//! held for the life of the process. The state machine and the cycle
//! driver only talk to the device through these hooks.
//!
//! | Kind | Prefix | Outputs | Halt |
//! |------|--------|---------|------|
//! | Leg  | 0x10   | amplifier | damping controller |
//! | Hip  | 0x20   | amplifier | damping controller |
//! | Boom | 0x30   | none | trivial |
//! | Imu  | 0x40   | none | trivial |

pub mod actuator;
pub mod boom;
pub mod hip;
pub mod imu;
pub mod leg;

use medulla_common::config::LimitsConfig;
use medulla_common::error::ErrorFlags;
use medulla_common::hal::{EdgeEvent, SensorIo};
use medulla_common::identity::{DeviceId, DeviceKind};
use medulla_common::pdo::PdoLayout;
use std::time::Duration;
use tracing::info;

use crate::error::DeviceError;
use crate::pdo::ProcessData;

pub use self::boom::BoomDevice;
pub use self::hip::HipDevice;
pub use self::imu::ImuDevice;
pub use self::leg::LegDevice;

/// Per-cycle timing handed to `update_inputs()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncContext {
    /// The edge that started this cycle.
    pub edge: EdgeEvent,
    /// Time from the edge to the start of sampling.
    pub since_edge: Duration,
    /// Synchronized cycles completed before this one.
    pub cycle: u64,
}

impl SyncContext {
    /// Sampling offset from the edge in µs, saturated to 16 bits.
    #[inline]
    pub fn timestep_us(&self) -> u16 {
        u16::try_from(self.since_edge.as_micros()).unwrap_or(u16::MAX)
    }
}

/// Hooks a device kind supplies to the state machine and the cycle driver.
///
/// `check_error()` and `check_halt()` are pure predicates over state
/// sampled in `update_inputs()`. `estop()` and `disable_outputs()` are safe
/// to call at any time, any number of times. Hardware failures inside
/// hooks latch [`ErrorFlags`] instead of returning errors.
pub trait DeviceType: Send {
    /// Device kind.
    fn kind(&self) -> DeviceKind;

    /// Process-data record sizes.
    fn layout(&self) -> PdoLayout;

    /// One-time hardware setup. Leaves outputs disabled.
    fn initialize(&mut self, io: &mut dyn SensorIo, pdo: &mut ProcessData)
    -> Result<(), DeviceError>;

    /// Energize outputs (entering Run).
    fn enable_outputs(&mut self, io: &mut dyn SensorIo);

    /// De-energize outputs.
    fn disable_outputs(&mut self, io: &mut dyn SensorIo);

    /// Sample sensors and write telemetry into the outbound record.
    fn update_inputs(&mut self, io: &mut dyn SensorIo, sync: &SyncContext, pdo: &mut ProcessData);

    /// Apply inbound commands to the actuators (Run only).
    fn update_outputs(&mut self, io: &mut dyn SensorIo, pdo: &ProcessData);

    /// Work after the process-data exchange.
    fn post_sync(&mut self, _io: &mut dyn SensorIo, _pdo: &mut ProcessData) {}

    /// Device-specific emergency stop: outputs off, `ESTOP` flag set.
    fn estop(&mut self, io: &mut dyn SensorIo);

    /// Whether sampled state shows a hardware fault.
    fn check_error(&self) -> bool;

    /// Whether sampled state asks for the graceful Halt controller.
    fn check_halt(&self) -> bool;

    /// Clear every latched flag. Idempotent.
    fn reset_error(&mut self);

    /// One step of the Halt controller. `false` escalates to Error.
    fn run_halt(&mut self, _io: &mut dyn SensorIo) -> bool {
        true
    }

    /// Flags published in the outbound header.
    fn error_flags(&self) -> ErrorFlags;
}

/// Build the strategy named by the identity prefix.
pub fn create(id: DeviceId, limits: &LimitsConfig) -> Result<Box<dyn DeviceType>, DeviceError> {
    let device: Box<dyn DeviceType> = match id.kind() {
        Some(DeviceKind::Leg) => Box::new(LegDevice::new(*limits)),
        Some(DeviceKind::Hip) => Box::new(HipDevice::new(*limits)),
        Some(DeviceKind::Boom) => Box::new(BoomDevice::new(*limits)),
        Some(DeviceKind::Imu) => Box::new(ImuDevice::new()),
        None => return Err(DeviceError::UnknownDevice(id)),
    };
    info!(
        %id,
        kind = device.kind().name(),
        position = id.position(),
        "device type selected"
    );
    Ok(device)
}
