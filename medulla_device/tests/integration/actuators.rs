//! Integration test: actuator and boom devices on the simulated board.
//!
//! 1. Telemetry lands at the device's outbound offsets
//! 2. Commanded current reaches the amplifier, clamped
//! 3. Hardware faults disable outputs within the same tick
//! 4. Halt controller failure escalates to Error

use medulla_common::config::LimitsConfig;
use medulla_common::error::ErrorFlags;
use medulla_common::hal::EncoderChannel;
use medulla_common::state::DeviceState;
use medulla_device::device::actuator::RX_MOTOR_CURRENT;
use medulla_device::device::{boom, hip, leg};
use medulla_device::state::TransitionReason;

use super::Node;

#[test]
fn leg_telemetry_offsets() {
    let mut node = Node::new(0x11);
    node.sim.set_encoder(EncoderChannel::Motor, 1234);
    node.sim.set_encoder(EncoderChannel::Output, 0x00AB_CDEF);
    node.sim.set_thermistor(2, 1777);
    node.sim.set_logic_voltage(3100);
    node.cycle();

    assert_eq!(node.master.tx_value::<u32>(leg::TX_MOTOR_ENCODER), 1234);
    assert_eq!(node.master.tx_value::<u32>(leg::TX_OUTPUT_ENCODER), 0x00AB_CDEF);
    assert_eq!(node.master.tx_value::<u16>(leg::TX_THERMISTOR_2), 1777);
    assert_eq!(node.master.tx_value::<u16>(leg::TX_LOGIC_VOLTAGE), 3100);
    assert_eq!(node.driver.pdo().tx_bytes().len(), 25);
}

#[test]
fn hip_telemetry_offsets() {
    let mut node = Node::new(0x21);
    node.sim.set_encoder(EncoderChannel::Output, 4321);
    node.sim.set_motor_voltage(2900);
    node.cycle();

    assert_eq!(node.master.tx_value::<u32>(hip::TX_OUTPUT_ENCODER), 4321);
    assert_eq!(node.master.tx_value::<u16>(hip::TX_MOTOR_VOLTAGE), 2900);
    assert_eq!(node.driver.pdo().tx_bytes().len(), 21);
}

#[test]
fn commanded_current_is_applied_and_clamped() {
    let mut node = Node::running(0x10);
    node.master.set_rx(RX_MOTOR_CURRENT, -1500i32);
    node.cycle();
    assert_eq!(node.sim.motor_current(), -1500);

    node.master.set_rx(RX_MOTOR_CURRENT, 1_000_000i32);
    node.cycle();
    assert_eq!(node.sim.motor_current(), LimitsConfig::default().max_motor_current);
}

#[test]
fn current_ignored_outside_run() {
    let mut node = Node::new(0x10);
    node.master.set_rx(RX_MOTOR_CURRENT, 2000i32);
    node.cycles(3);
    assert_eq!(node.sim.motor_current(), 0);
}

#[test]
fn over_temperature_disables_same_tick() {
    let mut node = Node::running(0x10);
    node.sim.set_thermistor(1, 4000);
    let t = node.cycle();
    assert_eq!(t.to, DeviceState::Error);
    assert!(!node.sim.amplifier_enabled());
    assert_eq!(node.dwell(), 0);
    assert!(node.driver.device().error_flags().contains(ErrorFlags::THERMISTOR));

    node.cycle();
    assert!(node.master.error_flags().contains(ErrorFlags::THERMISTOR));
    assert_eq!(node.master.device_state(), DeviceState::Error);
}

#[test]
fn encoder_failure_is_sensor_fault() {
    let mut node = Node::running(0x21);
    node.sim.set_encoder_fault(EncoderChannel::Output, true);
    assert_eq!(node.cycle().to, DeviceState::Error);
    assert!(node.driver.device().error_flags().contains(ErrorFlags::SENSOR));
}

#[test]
fn limit_switch_debounced() {
    let debounce = LimitsConfig::default().limit_switch_debounce as usize;
    let mut node = Node::running(0x10);
    node.sim.set_limit_switches(0b01);
    assert_eq!(node.cycles(debounce).to, DeviceState::Run);
    assert_eq!(node.cycle().to, DeviceState::Error);
    assert!(node.driver.device().error_flags().contains(ErrorFlags::LIMIT_SWITCH));
}

#[test]
fn halt_window_enters_halt() {
    let mut node = Node::running(0x10);
    node.sim.set_encoder(EncoderChannel::Output, 100);
    assert_eq!(node.cycle().to, DeviceState::Halt);
    assert!(node.sim.amplifier_enabled());

    // Halt ignores master commands.
    node.command(DeviceState::Stop);
    assert_eq!(node.cycle().to, DeviceState::Halt);
}

#[test]
fn halt_at_init_is_refused() {
    let mut node = Node::new(0x10);
    node.sim.set_encoder(EncoderChannel::Output, 100);
    node.command(DeviceState::Run);
    assert_eq!(node.cycle().to, DeviceState::Error);
    assert!(!node.sim.amplifier_enabled());
}

#[test]
fn halt_failure_escalates() {
    let mut node = Node::running(0x10);
    node.sim.set_encoder(EncoderChannel::Output, 100);
    node.cycle();
    node.sim.set_amplifier_reject(true);

    let t = node.cycle();
    assert_eq!(t.to, DeviceState::Error);
    assert!(!node.sim.amplifier_enabled());
    assert_eq!(node.dwell(), 0);
    let last = node.driver.machine().history().last().copied().unwrap();
    assert_eq!(last.reason, TransitionReason::HaltFailed);
}

#[test]
fn boom_publishes_encoders_and_faults() {
    let mut node = Node::running(0x30);
    node.sim.set_encoder(EncoderChannel::BoomPan, 77);
    node.cycle();
    assert_eq!(node.master.tx_value::<u32>(boom::TX_PAN_ENCODER), 77);
    assert_eq!(node.state(), DeviceState::Run);

    node.sim.set_encoder_fault(EncoderChannel::BoomTilt, true);
    assert_eq!(node.cycle().to, DeviceState::Error);
    assert!(node.driver.device().error_flags().contains(ErrorFlags::SENSOR));
}

#[test]
fn boom_logic_voltage_window() {
    let mut node = Node::running(0x31);
    node.sim.set_logic_voltage(1000);
    assert_eq!(node.cycle().to, DeviceState::Error);
    assert!(node.driver.device().error_flags().contains(ErrorFlags::LOGIC_VOLTAGE));
}
