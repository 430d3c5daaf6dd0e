//! Integration test: state machine over the full cycle.
//!
//! 1. Idle + Run command → Init → Run within one tick
//! 2. Outbound header lags the tick by one cycle
//! 3. Stop/Idle commands return to Idle with outputs off
//! 4. Idle de-assertion is idempotent

use medulla_common::error::ErrorFlags;
use medulla_common::state::DeviceState;
use medulla_device::state::TransitionReason;

use super::Node;

#[test]
fn idle_to_run_in_one_tick() {
    let mut node = Node::new(0x10);
    assert_eq!(node.master.device_state(), DeviceState::Idle);

    node.command(DeviceState::Run);
    let t = node.cycle();
    assert_eq!(t.from, DeviceState::Idle);
    assert_eq!(t.to, DeviceState::Run);
    assert!(node.sim.amplifier_enabled());
    assert!(node.driver.device().error_flags().is_empty());

    let path: Vec<_> = node.driver.machine().history().map(|r| r.to).collect();
    assert_eq!(path, [DeviceState::Init, DeviceState::Run]);
}

#[test]
fn header_reports_previous_tick() {
    let mut node = Node::new(0x12);
    node.command(DeviceState::Run);
    node.cycle();
    // Published before the tick that entered Run.
    assert_eq!(node.master.device_state(), DeviceState::Idle);
    assert_eq!(node.master.device_counter(), 0);

    node.cycle();
    assert_eq!(node.master.device_state(), DeviceState::Run);
    assert_eq!(node.master.device_counter(), 1);
    assert_eq!(node.master.device_id(), 0x12);
    assert_eq!(node.master.error_flags(), ErrorFlags::empty());
}

#[test]
fn device_counter_wraps() {
    let mut node = Node::new(0x20);
    node.cycles(257);
    assert_eq!(node.driver.counter(), 1);
    assert_eq!(node.master.device_counter(), 0);
}

#[test]
fn stop_and_idle_commands_disable_outputs() {
    for command in [DeviceState::Stop, DeviceState::Idle] {
        let mut node = Node::running(0x10);
        node.command(command);
        let t = node.cycle();
        assert_eq!(t.to, DeviceState::Idle);
        assert!(!node.sim.amplifier_enabled());
        let last = node.driver.machine().history().last().copied().unwrap();
        assert_eq!(last.from, DeviceState::Stop);
    }
}

#[test]
fn idle_deassertion_is_idempotent() {
    let mut node = Node::new(0x30);
    for _ in 0..5 {
        node.cycle();
        assert_eq!(node.state(), DeviceState::Idle);
        assert!(!node.sim.self_asserted());
    }
}

#[test]
fn stop_line_at_init_enters_error() {
    let mut node = Node::new(0x10);
    node.sim.set_external_estop(true);
    node.command(DeviceState::Run);
    assert_eq!(node.cycle().to, DeviceState::Error);
    assert!(node.sim.self_asserted());
    assert!(!node.sim.amplifier_enabled());
    assert_eq!(node.dwell(), 0);
    let last = node.driver.machine().history().last().copied().unwrap();
    assert_eq!(last.reason, TransitionReason::StopLine);
}

#[test]
fn missed_edges_are_counted() {
    let mut node = Node::running(0x10);
    node.master.step_n(6);
    let mut synced = 0;
    while let Ok(medulla_device::cycle::CycleOutcome::Synced(_)) = node.driver.poll_once() {
        synced += 1;
    }
    assert_eq!(synced, 4);
    assert_eq!(node.driver.stats().missed_edges, 2);
    assert_eq!(node.state(), DeviceState::Run);
}

#[test]
fn unknown_identity_is_rejected() {
    let config = super::node_config(0x70, super::safety());
    let (board, _, _) = medulla_hal::virtual_rig(&config.safety, super::CYCLE);
    let result = medulla_device::cycle::CycleDriver::new(board, &config);
    assert!(matches!(
        result,
        Err(medulla_device::error::CycleError::Device(
            medulla_device::error::DeviceError::UnknownDevice(_)
        ))
    ));
}
