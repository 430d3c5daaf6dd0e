//! Integration test: master liveness.
//!
//! A master counter frozen for 10 consecutive cycles in Run trips Error;
//! 9 frozen cycles followed by progress resets the count.

use medulla_common::consts::MASTER_WATCHDOG_LIMIT;
use medulla_common::state::DeviceState;
use medulla_device::state::TransitionReason;

use super::Node;

#[test]
fn ten_frozen_cycles_trip() {
    let mut node = Node::running(0x10);
    node.master.freeze_counter(true);
    for _ in 1..MASTER_WATCHDOG_LIMIT {
        assert_eq!(node.cycle().to, DeviceState::Run);
    }
    assert_eq!(node.driver.machine().supervisor().master_errors(), 9);

    let t = node.cycle();
    assert_eq!(t.to, DeviceState::Error);
    assert!(!node.sim.amplifier_enabled());
    assert_eq!(node.dwell(), 0);
    let last = node.driver.machine().history().last().copied().unwrap();
    assert_eq!(last.reason, TransitionReason::MasterWatchdog);
}

#[test]
fn nine_frozen_then_progress_recovers() {
    let mut node = Node::running(0x10);
    node.master.freeze_counter(true);
    node.cycles(9);
    node.master.freeze_counter(false);
    assert_eq!(node.cycle().to, DeviceState::Run);
    assert_eq!(node.driver.machine().supervisor().master_errors(), 0);

    // A fresh stall has to count all the way up again.
    node.master.freeze_counter(true);
    node.cycles(9);
    assert_eq!(node.state(), DeviceState::Run);
}

#[test]
fn stalled_counter_ignored_outside_run() {
    let mut node = Node::new(0x10);
    node.master.freeze_counter(true);
    node.cycles(50);
    assert_eq!(node.state(), DeviceState::Idle);

    // Init takes the stalled value as the new reference.
    node.command(DeviceState::Run);
    assert_eq!(node.cycle().to, DeviceState::Run);
    node.cycles(8);
    assert_eq!(node.state(), DeviceState::Run);
}
