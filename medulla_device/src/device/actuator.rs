//! Shared supervision for amplifier-driven actuators (Leg, Hip).
//!
//! Each cycle [`ActuatorMonitor::sample`] reads every supervised input once
//! into an [`ActuatorSample`]. Fault predicates are evaluated over that
//! sample only; faults seen at sampling time are also latched into the
//! flags until `reset()`.

use medulla_common::config::LimitsConfig;
use medulla_common::error::ErrorFlags;
use medulla_common::hal::{AnalogChannel, EncoderChannel, HalError, SensorIo};
use medulla_common::pdo::{RX_MASTER_COUNTER, RxField};
use tracing::{debug, error};

use crate::safety::debounce::Debounce;

/// Commanded motor current [amplifier counts], shared by Leg and Hip.
pub const RX_MOTOR_CURRENT: RxField = RX_MASTER_COUNTER.then(4);

/// Thermistors per motor.
pub const THERMISTOR_COUNT: usize = 3;

/// Inputs sampled once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorSample {
    /// Output-side encoder, `None` when the read failed.
    pub output_position: Option<u32>,
    /// Motor-side encoder, `None` when absent or the read failed.
    pub motor_position: Option<u32>,
    /// Thermistor readings [ADC counts].
    pub thermistors: [u16; THERMISTOR_COUNT],
    /// Motor supply [ADC counts].
    pub motor_voltage: u16,
    /// Logic supply [ADC counts].
    pub logic_voltage: u16,
    /// Raw limit-switch bank.
    pub limit_switches: u8,
    /// Amplifier fault output.
    pub amplifier_fault: bool,
}

/// Fault detection, halt window and amplifier handling for one actuator.
#[derive(Debug, Clone)]
pub struct ActuatorMonitor {
    limits: LimitsConfig,
    has_motor_encoder: bool,
    flags: ErrorFlags,
    limit_switch: Debounce,
    sample: Option<ActuatorSample>,
    previous_position: Option<u32>,
    outputs_enabled: bool,
}

impl ActuatorMonitor {
    /// Create a monitor. `has_motor_encoder` selects whether a missing
    /// motor-side reading is a fault.
    pub fn new(limits: LimitsConfig, has_motor_encoder: bool) -> Self {
        Self {
            limits,
            has_motor_encoder,
            flags: ErrorFlags::empty(),
            limit_switch: Debounce::new(limits.limit_switch_debounce),
            sample: None,
            previous_position: None,
            outputs_enabled: false,
        }
    }

    /// Latched flags.
    #[inline]
    pub fn flags(&self) -> ErrorFlags {
        self.flags
    }

    /// Most recent sample.
    #[inline]
    pub fn last_sample(&self) -> Option<&ActuatorSample> {
        self.sample.as_ref()
    }

    /// Whether the amplifier is enabled.
    #[inline]
    pub fn outputs_enabled(&self) -> bool {
        self.outputs_enabled
    }

    fn latch(&mut self, flag: ErrorFlags, err: &HalError) {
        if !self.flags.contains(flag) {
            error!(?flag, %err, "actuator hardware fault");
        }
        self.flags |= flag;
    }

    fn read_or_latch<T>(&mut self, flag: ErrorFlags, read: Result<T, HalError>) -> Option<T> {
        match read {
            Ok(value) => Some(value),
            Err(err) => {
                self.latch(flag, &err);
                None
            }
        }
    }

    // ─── Sampling ───────────────────────────────────────────────────

    /// Read every supervised input once and latch what it shows.
    pub fn sample(&mut self, io: &mut dyn SensorIo) -> ActuatorSample {
        let output_position =
            self.read_or_latch(ErrorFlags::SENSOR, io.read_encoder(EncoderChannel::Output));
        let motor_position = if self.has_motor_encoder {
            self.read_or_latch(ErrorFlags::SENSOR, io.read_encoder(EncoderChannel::Motor))
        } else {
            None
        };

        let mut thermistors = [0u16; THERMISTOR_COUNT];
        for (i, slot) in thermistors.iter_mut().enumerate() {
            let read = io.read_analog(AnalogChannel::Thermistor(i as u8));
            *slot = self.read_or_latch(ErrorFlags::SENSOR, read).unwrap_or(u16::MAX);
        }
        let motor_voltage = self
            .read_or_latch(ErrorFlags::SENSOR, io.read_analog(AnalogChannel::MotorVoltage))
            .unwrap_or(0);
        let logic_voltage = self
            .read_or_latch(ErrorFlags::SENSOR, io.read_analog(AnalogChannel::LogicVoltage))
            .unwrap_or(0);
        let limit_switches = self
            .read_or_latch(ErrorFlags::SENSOR, io.limit_switches())
            .unwrap_or(0);
        let amplifier_fault = self
            .read_or_latch(ErrorFlags::AMPLIFIER, io.amplifier_fault())
            .unwrap_or(true);

        self.limit_switch.sample(limit_switches != 0);

        self.previous_position = self.sample.and_then(|s| s.output_position);
        let sample = ActuatorSample {
            output_position,
            motor_position,
            thermistors,
            motor_voltage,
            logic_voltage,
            limit_switches,
            amplifier_fault,
        };
        self.sample = Some(sample);

        let faults = self.evaluate();
        if !faults.is_empty() && !self.flags.contains(faults) {
            debug!(?faults, "sampled faults latched");
        }
        self.flags |= faults;
        sample
    }

    /// Fault and halt flags shown by the current sample alone.
    pub fn evaluate(&self) -> ErrorFlags {
        let Some(s) = self.sample else {
            return ErrorFlags::empty();
        };
        let l = &self.limits;
        let mut flags = ErrorFlags::empty();

        if s.thermistors.iter().any(|&t| t > l.thermistor_max) {
            flags |= ErrorFlags::THERMISTOR;
        }
        if s.motor_voltage < l.motor_voltage_min || s.motor_voltage > l.motor_voltage_max {
            flags |= ErrorFlags::MOTOR_VOLTAGE;
        }
        if s.logic_voltage < l.logic_voltage_min || s.logic_voltage > l.logic_voltage_max {
            flags |= ErrorFlags::LOGIC_VOLTAGE;
        }
        if s.output_position.is_none() || (self.has_motor_encoder && s.motor_position.is_none()) {
            flags |= ErrorFlags::SENSOR;
        }
        if s.amplifier_fault {
            flags |= ErrorFlags::AMPLIFIER;
        }
        if self.limit_switch.tripped() {
            flags |= ErrorFlags::LIMIT_SWITCH;
        }
        if self.in_halt_zone() {
            flags |= ErrorFlags::HALT;
        }
        flags
    }

    fn in_halt_zone(&self) -> bool {
        match self.sample.and_then(|s| s.output_position) {
            Some(p) => p < self.limits.halt_position_min || p > self.limits.halt_position_max,
            None => false,
        }
    }

    // ─── Predicates ─────────────────────────────────────────────────

    /// Hardware fault in the latched flags or the current sample.
    pub fn check_error(&self) -> bool {
        (self.flags | self.evaluate()).has_fault()
    }

    /// Output position outside the safe window.
    pub fn check_halt(&self) -> bool {
        self.in_halt_zone()
    }

    // ─── Outputs ────────────────────────────────────────────────────

    /// Enable the amplifier.
    pub fn enable(&mut self, io: &mut dyn SensorIo) {
        match io.set_amplifier_enabled(true) {
            Ok(()) => self.outputs_enabled = true,
            Err(err) => self.latch(ErrorFlags::AMPLIFIER, &err),
        }
    }

    /// Disable the amplifier. Safe to repeat.
    pub fn disable(&mut self, io: &mut dyn SensorIo) {
        self.outputs_enabled = false;
        if let Err(err) = io.set_amplifier_enabled(false) {
            self.latch(ErrorFlags::AMPLIFIER, &err);
        }
    }

    /// Disable outputs and mark the emergency stop.
    pub fn estop(&mut self, io: &mut dyn SensorIo) {
        self.disable(io);
        self.flags |= ErrorFlags::ESTOP;
    }

    /// Command a motor current, clamped to the configured maximum.
    /// Returns false when the amplifier rejected it.
    pub fn command_current(&mut self, io: &mut dyn SensorIo, current: i32) -> bool {
        if !self.outputs_enabled {
            return true;
        }
        let max = self.limits.max_motor_current;
        match io.set_motor_current(current.clamp(-max, max)) {
            Ok(()) => true,
            Err(err) => {
                self.latch(ErrorFlags::AMPLIFIER, &err);
                false
            }
        }
    }

    /// One step of the velocity-damping halt controller.
    pub fn halt_step(&mut self, io: &mut dyn SensorIo) -> bool {
        if self.flags.has_fault() {
            return false;
        }
        let (Some(now), Some(before)) = (
            self.sample.and_then(|s| s.output_position),
            self.previous_position,
        ) else {
            return self.command_current(io, 0);
        };

        let velocity = now as i64 - before as i64;
        let max = self.limits.halt_max_current as f32;
        let current = (-(self.limits.halt_damping * velocity as f32)).clamp(-max, max);
        self.command_current(io, current as i32)
    }

    /// Clear every latched flag and the limit-switch debounce.
    pub fn reset(&mut self) {
        self.flags = ErrorFlags::empty();
        self.limit_switch.reset();
    }
}
