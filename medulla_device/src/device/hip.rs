//! Hip actuator: direct-drive motor with an output-side encoder only.

use medulla_common::config::LimitsConfig;
use medulla_common::error::ErrorFlags;
use medulla_common::hal::SensorIo;
use medulla_common::identity::DeviceKind;
use medulla_common::pdo::{PdoLayout, TX_ERROR_FLAGS, TxField};
use static_assertions::const_assert;

use super::actuator::{ActuatorMonitor, RX_MOTOR_CURRENT};
use super::{DeviceType, SyncContext};
use crate::error::DeviceError;
use crate::pdo::ProcessData;

pub const TX_LIMIT_SWITCHES: TxField = TX_ERROR_FLAGS.then(1);
pub const TX_OUTPUT_ENCODER: TxField = TX_LIMIT_SWITCHES.then(4);
pub const TX_TIMESTEP: TxField = TX_OUTPUT_ENCODER.then(2);
pub const TX_THERMISTOR_0: TxField = TX_TIMESTEP.then(2);
pub const TX_THERMISTOR_1: TxField = TX_THERMISTOR_0.then(2);
pub const TX_THERMISTOR_2: TxField = TX_THERMISTOR_1.then(2);
pub const TX_MOTOR_VOLTAGE: TxField = TX_THERMISTOR_2.then(2);
pub const TX_LOGIC_VOLTAGE: TxField = TX_MOTOR_VOLTAGE.then(2);

pub const HIP_LAYOUT: PdoLayout = PdoLayout {
    name: "hip",
    rx_size: RX_MOTOR_CURRENT.end(),
    tx_size: TX_LOGIC_VOLTAGE.end(),
};

const_assert!(HIP_LAYOUT.rx_size == 7);
const_assert!(HIP_LAYOUT.tx_size == 21);

/// Hip device.
#[derive(Debug, Clone)]
pub struct HipDevice {
    monitor: ActuatorMonitor,
}

impl HipDevice {
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            monitor: ActuatorMonitor::new(limits, false),
        }
    }
}

impl DeviceType for HipDevice {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Hip
    }

    fn layout(&self) -> PdoLayout {
        HIP_LAYOUT
    }

    fn initialize(
        &mut self,
        io: &mut dyn SensorIo,
        _pdo: &mut ProcessData,
    ) -> Result<(), DeviceError> {
        io.set_amplifier_enabled(false)?;
        io.set_motor_current(0)?;
        Ok(())
    }

    fn enable_outputs(&mut self, io: &mut dyn SensorIo) {
        self.monitor.enable(io);
    }

    fn disable_outputs(&mut self, io: &mut dyn SensorIo) {
        self.monitor.disable(io);
    }

    fn update_inputs(&mut self, io: &mut dyn SensorIo, sync: &SyncContext, pdo: &mut ProcessData) {
        let s = self.monitor.sample(io);
        pdo.set_tx(TX_LIMIT_SWITCHES, s.limit_switches);
        pdo.set_tx(TX_OUTPUT_ENCODER, s.output_position.unwrap_or(0));
        pdo.set_tx(TX_TIMESTEP, sync.timestep_us());
        pdo.set_tx(TX_THERMISTOR_0, s.thermistors[0]);
        pdo.set_tx(TX_THERMISTOR_1, s.thermistors[1]);
        pdo.set_tx(TX_THERMISTOR_2, s.thermistors[2]);
        pdo.set_tx(TX_MOTOR_VOLTAGE, s.motor_voltage);
        pdo.set_tx(TX_LOGIC_VOLTAGE, s.logic_voltage);
    }

    fn update_outputs(&mut self, io: &mut dyn SensorIo, pdo: &ProcessData) {
        self.monitor.command_current(io, pdo.rx(RX_MOTOR_CURRENT));
    }

    fn estop(&mut self, io: &mut dyn SensorIo) {
        self.monitor.estop(io);
    }

    fn check_error(&self) -> bool {
        self.monitor.check_error()
    }

    fn check_halt(&self) -> bool {
        self.monitor.check_halt()
    }

    fn reset_error(&mut self) {
        self.monitor.reset();
    }

    fn run_halt(&mut self, io: &mut dyn SensorIo) -> bool {
        self.monitor.halt_step(io)
    }

    fn error_flags(&self) -> ErrorFlags {
        self.monitor.flags()
    }
}
