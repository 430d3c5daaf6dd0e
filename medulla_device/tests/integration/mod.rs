//! Shared rig for the integration tests.

mod actuators;
mod debounce;
mod imu_checksum;
mod local_watchdog;
mod master_watchdog;
mod reset_dwell;
mod state_machine;

use std::time::Duration;

use medulla_common::config::{NodeConfig, SafetyConfig};
use medulla_common::state::DeviceState;
use medulla_device::cycle::{CycleDriver, CycleOutcome};
use medulla_device::state::Transition;
use medulla_hal::{SimBoard, SimHandle, SimMaster, virtual_rig};

pub const CYCLE: Duration = Duration::from_millis(1);

/// Dwell used by the rig so recovery tests stay short.
pub const DWELL: u32 = 20;

pub fn safety() -> SafetyConfig {
    SafetyConfig {
        estop_debounce_limit: 5,
        estop_timeout_length: DWELL,
        local_watchdog_timeout_us: 8192,
    }
}

pub fn node_config(id: u8, safety: SafetyConfig) -> NodeConfig {
    let mut config: NodeConfig = toml::from_str(&format!(
        "[shared]\nservice_name = \"integration\"\n\n[device]\nid = {id}\n"
    ))
    .unwrap();
    config.safety = safety;
    config.validate().unwrap();
    config
}

/// A controller wired to a simulated master and board.
pub struct Node {
    pub driver: CycleDriver<SimBoard>,
    pub master: SimMaster,
    pub sim: SimHandle,
}

impl Node {
    pub fn new(id: u8) -> Self {
        Self::with_safety(id, safety())
    }

    pub fn with_safety(id: u8, safety: SafetyConfig) -> Self {
        let config = node_config(id, safety);
        let (board, master, sim) = virtual_rig(&config.safety, CYCLE);
        let driver = CycleDriver::new(board, &config).unwrap();
        Self {
            driver,
            master,
            sim,
        }
    }

    /// A node already in Run.
    pub fn running(id: u8) -> Self {
        let mut node = Self::new(id);
        node.command(DeviceState::Run);
        assert_eq!(node.cycle().to, DeviceState::Run);
        node
    }

    pub fn command(&mut self, state: DeviceState) {
        self.master.set_command(state);
    }

    pub fn state(&self) -> DeviceState {
        self.driver.state()
    }

    /// One master cycle followed by one controller pass.
    pub fn cycle(&mut self) -> Transition {
        self.master.step();
        match self.driver.poll_once().unwrap() {
            CycleOutcome::Synced(t) => t,
            CycleOutcome::Idle => panic!("edge not observed"),
        }
    }

    pub fn cycles(&mut self, n: usize) -> Transition {
        let mut last = self.cycle();
        for _ in 1..n {
            last = self.cycle();
        }
        last
    }

    pub fn dwell(&self) -> u32 {
        self.driver.machine().supervisor().estop_timeout()
    }
}
