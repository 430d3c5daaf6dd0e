//! Integration test: IMU frame validation.
//!
//! A corrupted frame latches SENSOR and drives Run to Error; the last good
//! sample stays on the wire with sequence 255. Sequence gaps are logged
//! but are not faults.

use medulla_common::error::ErrorFlags;
use medulla_common::kvh::{IMU_SEQUENCE_INVALID, ImuSample};
use medulla_common::state::DeviceState;
use medulla_device::device::imu::{TX_ACCEL, TX_SEQUENCE};
use medulla_hal::ImuFault;

use super::Node;

fn sample() -> ImuSample {
    ImuSample {
        angle_delta: [11, 12, 13],
        accel: [21, 22, 23],
        status: 0x77,
        sequence: 0,
        temperature: 25,
    }
}

fn running_imu() -> Node {
    let mut node = Node::new(0x40);
    node.sim.set_imu_sample(sample());
    node.command(DeviceState::Run);
    node.cycles(2);
    assert_eq!(node.state(), DeviceState::Run);
    node
}

#[test]
fn valid_frames_keep_running() {
    let mut node = running_imu();
    let before = node.master.tx_value::<u8>(TX_SEQUENCE);
    node.cycle();
    assert_eq!(node.master.tx_value::<u8>(TX_SEQUENCE), (before + 1) & 0x7F);
    assert_eq!(node.master.tx_value::<u32>(TX_ACCEL[2]), 23);
    assert_eq!(node.state(), DeviceState::Run);
}

#[test]
fn checksum_mismatch_is_fault() {
    for fault in [ImuFault::FlipBit, ImuFault::BadHeader, ImuFault::Truncate, ImuFault::Silent] {
        let mut node = running_imu();
        node.sim.inject_imu_fault(fault);
        // The corrupted frame is emitted after this cycle's exchange...
        assert_eq!(node.cycle().to, DeviceState::Run);
        // ...and rejected on the next.
        assert_eq!(node.cycle().to, DeviceState::Error, "{fault:?}");
        assert!(node.driver.device().error_flags().contains(ErrorFlags::SENSOR));
        assert_eq!(node.master.tx_value::<u8>(TX_SEQUENCE), IMU_SEQUENCE_INVALID);
        assert_eq!(node.master.tx_value::<u32>(TX_ACCEL[2]), 23);
    }
}

#[test]
fn sequence_gap_is_not_a_fault() {
    let mut node = running_imu();
    node.sim.inject_imu_fault(ImuFault::SkipSequence(4));
    node.cycles(3);
    assert_eq!(node.state(), DeviceState::Run);
    assert_ne!(node.master.tx_value::<u8>(TX_SEQUENCE), IMU_SEQUENCE_INVALID);
}
