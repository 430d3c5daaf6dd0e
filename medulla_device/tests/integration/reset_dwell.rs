//! Integration test: recovery from Error.
//!
//! 1. Reset before the dwell elapses is ignored
//! 2. After the dwell, Error → Reset → Idle takes two ticks
//! 3. ErrorFlags, debounce and stop line are cleared on the way

use medulla_common::error::ErrorFlags;
use medulla_common::state::DeviceState;

use super::{DWELL, Node};

fn in_error() -> Node {
    let mut node = Node::running(0x10);
    node.command(DeviceState::Error);
    assert_eq!(node.cycle().to, DeviceState::Error);
    assert_eq!(node.dwell(), 0);
    node
}

#[test]
fn reset_below_dwell_is_ignored() {
    let mut node = in_error();
    node.command(DeviceState::Reset);
    for expected in 1..=DWELL {
        assert_eq!(node.cycle().to, DeviceState::Error);
        assert_eq!(node.dwell(), expected);
    }
}

#[test]
fn reset_after_dwell_returns_to_idle_in_two_ticks() {
    let mut node = in_error();
    node.cycles(DWELL as usize);
    assert_eq!(node.state(), DeviceState::Error);
    assert!(node.driver.device().error_flags().contains(ErrorFlags::ESTOP));

    node.command(DeviceState::Reset);
    assert_eq!(node.cycle().to, DeviceState::Reset);
    assert_eq!(node.cycle().to, DeviceState::Idle);

    assert!(node.driver.device().error_flags().is_empty());
    assert!(!node.sim.self_asserted());
    assert_eq!(node.driver.machine().supervisor().estop_debounce(), 0);
    assert_eq!(node.driver.machine().supervisor().master_errors(), 0);

    node.command(DeviceState::Idle);
    node.cycle();
    assert_eq!(node.master.error_flags(), ErrorFlags::empty());
    assert_eq!(node.master.device_state(), DeviceState::Idle);
}

#[test]
fn error_asserts_stop_line_every_cycle() {
    let mut node = in_error();
    for _ in 0..5 {
        node.cycle();
        assert!(node.sim.self_asserted());
        assert!(!node.sim.amplifier_enabled());
    }
}

#[test]
fn rerun_after_recovery() {
    let mut node = in_error();
    node.command(DeviceState::Reset);
    node.cycles(DWELL as usize + 2);
    assert_eq!(node.state(), DeviceState::Idle);

    node.command(DeviceState::Run);
    assert_eq!(node.cycle().to, DeviceState::Run);
    assert!(node.sim.amplifier_enabled());
}
