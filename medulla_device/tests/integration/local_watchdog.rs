//! Integration test: local watchdog.
//!
//! Fed on every edge and while Idle without edges. A node with live
//! outputs that loses the cycle edge expires: outputs are stopped, the
//! stop line asserted and the driver returns a fatal error.

use medulla_common::state::DeviceState;
use medulla_device::cycle::CycleOutcome;
use medulla_device::error::CycleError;

use super::Node;

#[test]
fn idle_without_edges_is_kept_alive() {
    let mut node = Node::new(0x10);
    node.cycle();
    let fed = node.sim.feed_count();
    for _ in 0..100 {
        assert!(matches!(node.driver.poll_once(), Ok(CycleOutcome::Idle)));
    }
    assert!(!node.sim.watchdog_expired());
    assert_eq!(node.sim.feed_count(), fed + 100);
}

#[test]
fn lost_edge_in_run_expires() {
    let mut node = Node::running(0x10);
    assert!(node.sim.amplifier_enabled());

    let mut idle_polls = 0;
    let err = loop {
        match node.driver.poll_once() {
            Ok(CycleOutcome::Idle) => idle_polls += 1,
            Ok(CycleOutcome::Synced(_)) => panic!("no edge was sent"),
            Err(e) => break e,
        }
        assert!(idle_polls < 100, "watchdog never expired");
    };

    // 8192 µs at 500 µs per empty poll
    assert!(idle_polls >= 16);
    assert!(matches!(
        err,
        CycleError::WatchdogExpired {
            state: DeviceState::Run,
            ..
        }
    ));
    assert!(node.sim.watchdog_expired());
    assert!(node.sim.self_asserted());
    assert!(!node.sim.amplifier_enabled());
}

#[test]
fn steady_edges_never_expire() {
    let mut node = Node::running(0x20);
    node.cycles(500);
    assert!(!node.sim.watchdog_expired());
    assert_eq!(node.state(), DeviceState::Run);
}
