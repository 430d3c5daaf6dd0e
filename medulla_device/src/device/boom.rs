//! Boom: three read-only encoders on the support boom, no outputs.

use medulla_common::config::LimitsConfig;
use medulla_common::error::ErrorFlags;
use medulla_common::hal::{AnalogChannel, EncoderChannel, SensorIo};
use medulla_common::identity::DeviceKind;
use medulla_common::pdo::{PdoLayout, RX_HEADER_END, TX_ERROR_FLAGS, TxField};
use static_assertions::const_assert;
use tracing::error;

use super::{DeviceType, SyncContext};
use crate::error::DeviceError;
use crate::pdo::ProcessData;

pub const TX_PITCH_ENCODER: TxField = TX_ERROR_FLAGS.then(4);
pub const TX_PAN_ENCODER: TxField = TX_PITCH_ENCODER.then(4);
pub const TX_TILT_ENCODER: TxField = TX_PAN_ENCODER.then(4);
pub const TX_TIMESTEP: TxField = TX_TILT_ENCODER.then(2);
pub const TX_LOGIC_VOLTAGE: TxField = TX_TIMESTEP.then(2);

pub const BOOM_LAYOUT: PdoLayout = PdoLayout {
    name: "boom",
    rx_size: RX_HEADER_END,
    tx_size: TX_LOGIC_VOLTAGE.end(),
};

const_assert!(BOOM_LAYOUT.tx_size == 20);

const CHANNELS: [(EncoderChannel, TxField); 3] = [
    (EncoderChannel::BoomPitch, TX_PITCH_ENCODER),
    (EncoderChannel::BoomPan, TX_PAN_ENCODER),
    (EncoderChannel::BoomTilt, TX_TILT_ENCODER),
];

/// Boom device.
#[derive(Debug, Clone)]
pub struct BoomDevice {
    limits: LimitsConfig,
    flags: ErrorFlags,
    logic_voltage: Option<u16>,
}

impl BoomDevice {
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            limits,
            flags: ErrorFlags::empty(),
            logic_voltage: None,
        }
    }

    fn logic_out_of_window(&self) -> bool {
        self.logic_voltage.is_some_and(|v| {
            v < self.limits.logic_voltage_min || v > self.limits.logic_voltage_max
        })
    }
}

impl DeviceType for BoomDevice {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Boom
    }

    fn layout(&self) -> PdoLayout {
        BOOM_LAYOUT
    }

    fn initialize(
        &mut self,
        _io: &mut dyn SensorIo,
        _pdo: &mut ProcessData,
    ) -> Result<(), DeviceError> {
        Ok(())
    }

    fn enable_outputs(&mut self, _io: &mut dyn SensorIo) {}

    fn disable_outputs(&mut self, _io: &mut dyn SensorIo) {}

    fn update_inputs(&mut self, io: &mut dyn SensorIo, sync: &SyncContext, pdo: &mut ProcessData) {
        for (channel, field) in CHANNELS {
            match io.read_encoder(channel) {
                Ok(count) => pdo.set_tx(field, count),
                Err(err) => {
                    if !self.flags.contains(ErrorFlags::SENSOR) {
                        error!(?channel, %err, "boom encoder read failed");
                    }
                    self.flags |= ErrorFlags::SENSOR;
                }
            }
        }
        pdo.set_tx(TX_TIMESTEP, sync.timestep_us());

        match io.read_analog(AnalogChannel::LogicVoltage) {
            Ok(v) => {
                self.logic_voltage = Some(v);
                pdo.set_tx(TX_LOGIC_VOLTAGE, v);
            }
            Err(err) => {
                error!(%err, "boom logic voltage read failed");
                self.flags |= ErrorFlags::SENSOR;
            }
        }
        if self.logic_out_of_window() {
            self.flags |= ErrorFlags::LOGIC_VOLTAGE;
        }
    }

    fn update_outputs(&mut self, _io: &mut dyn SensorIo, _pdo: &ProcessData) {}

    fn estop(&mut self, _io: &mut dyn SensorIo) {
        self.flags |= ErrorFlags::ESTOP;
    }

    fn check_error(&self) -> bool {
        self.flags.has_fault() || self.logic_out_of_window()
    }

    fn check_halt(&self) -> bool {
        false
    }

    fn reset_error(&mut self) {
        self.flags = ErrorFlags::empty();
    }

    fn error_flags(&self) -> ErrorFlags {
        self.flags
    }
}
