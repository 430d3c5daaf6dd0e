//! Integration test: stop-line debounce.
//!
//! The stop line must read asserted for more than `estop_debounce_limit`
//! cycles before Run or Halt trips to Error, and clearing it for fewer
//! cycles than the accumulated count does not undo the progress.

use medulla_common::error::ErrorFlags;
use medulla_common::hal::EncoderChannel;
use medulla_common::state::DeviceState;

use super::Node;

#[test]
fn run_trips_after_limit_plus_one() {
    let mut node = Node::running(0x10);
    node.sim.set_external_estop(true);
    for _ in 0..5 {
        assert_eq!(node.cycle().to, DeviceState::Run);
    }
    assert_eq!(node.cycle().to, DeviceState::Error);
    assert!(!node.sim.amplifier_enabled());
    assert!(node.sim.self_asserted());
    assert!(node.driver.device().error_flags().contains(ErrorFlags::ESTOP));
}

#[test]
fn short_clear_keeps_accumulated_count() {
    let mut node = Node::running(0x10);
    node.sim.set_external_estop(true);
    node.cycles(5);
    assert_eq!(node.driver.machine().supervisor().estop_debounce(), 5);

    node.sim.set_external_estop(false);
    node.cycles(2);
    assert_eq!(node.driver.machine().supervisor().estop_debounce(), 3);
    assert_eq!(node.state(), DeviceState::Run);

    node.sim.set_external_estop(true);
    node.cycles(2);
    assert_eq!(node.state(), DeviceState::Run);
    assert_eq!(node.cycle().to, DeviceState::Error);
}

#[test]
fn glitches_never_accumulate() {
    let mut node = Node::running(0x10);
    for i in 0..50 {
        node.sim.set_external_estop(i % 2 == 0);
        assert_eq!(node.cycle().to, DeviceState::Run);
    }
}

#[test]
fn halt_trips_on_stop_line() {
    let mut node = Node::running(0x10);
    node.sim.set_encoder(EncoderChannel::Output, 10);
    assert_eq!(node.cycle().to, DeviceState::Halt);

    node.sim.set_external_estop(true);
    for _ in 0..5 {
        assert_eq!(node.cycle().to, DeviceState::Halt);
    }
    assert_eq!(node.cycle().to, DeviceState::Error);
    assert_eq!(node.dwell(), 0);
}
