//! Error types for the device controller.
//!
//! Faults observed while running never surface here: they latch
//! `ErrorFlags` and drive the state machine into Error. These types cover
//! startup failures and the one unrecoverable runtime event, local
//! watchdog expiry.

use medulla_common::hal::HalError;
use medulla_common::identity::DeviceId;
use medulla_common::state::DeviceState;
use thiserror::Error;

use crate::pdo::PdoError;

/// Device strategy construction and initialization errors.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Identity prefix does not name a known device kind.
    #[error("unknown device identity {0}")]
    UnknownDevice(DeviceId),

    /// Process-data layout rejected.
    #[error(transparent)]
    Pdo(#[from] PdoError),

    /// Hardware refused initialization.
    #[error("hardware: {0}")]
    Hal(#[from] HalError),
}

/// Errors during RT setup or cycle execution.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// Device could not be created or initialized.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Local watchdog ran out. Outputs were stopped and the stop line
    /// asserted; only a hard reset recovers.
    #[error("local watchdog expired in {state:?} after {cycles} cycles")]
    WatchdogExpired {
        /// State at the moment of expiry.
        state: DeviceState,
        /// Synchronized cycles completed before expiry.
        cycles: u64,
    },
}
