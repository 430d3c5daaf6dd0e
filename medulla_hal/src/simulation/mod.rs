//! Software simulation of a medulla board and its fieldbus master.
//!
//! All parts share one [`SimHandle`]. Tests hold a handle to inject faults
//! (stop line, sensor values, encoder failures, corrupt IMU frames) while
//! the controller owns the [`SimBoard`].

mod board;
mod imu;
mod master;
mod state;

pub use board::SimBoard;
pub use imu::ImuFault;
pub use master::SimMaster;
pub use state::{SimHandle, TimeMode};

use medulla_common::config::SafetyConfig;
use std::time::Duration;

/// Create a connected board, master and handle in virtual time.
pub fn virtual_rig(safety: &SafetyConfig, cycle: Duration) -> (SimBoard, SimMaster, SimHandle) {
    let handle = SimHandle::new(
        TimeMode::Virtual,
        Duration::from_micros(safety.local_watchdog_timeout_us as u64),
    );
    (
        SimBoard::new(handle.clone()),
        SimMaster::new(handle.clone(), cycle),
        handle,
    )
}
