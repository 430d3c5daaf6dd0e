//! Simulated board behavior through the capability traits only.

use medulla_common::config::SafetyConfig;
use medulla_common::hal::{
    AnalogChannel, Board, EncoderChannel, FieldbusPort, LocalWatchdog, SensorIo, StopLine,
    SyncTrigger,
};
use medulla_common::kvh::{IMU_FRAME_LEN, ImuSample};
use medulla_common::state::DeviceState;
use medulla_hal::{ImuFault, virtual_rig};
use std::time::Duration;

const CYCLE: Duration = Duration::from_millis(1);

fn assert_board<B: Board>(_: &B) {}

#[test]
fn sim_board_is_a_board() {
    let (board, _, _) = virtual_rig(&SafetyConfig::default(), CYCLE);
    assert_board(&board);
}

#[test]
fn master_edge_carries_inbound_record() {
    let (mut board, mut master, _) = virtual_rig(&SafetyConfig::default(), CYCLE);
    master.set_command(DeviceState::Run);
    master.step();

    let edge = board.wait_for_edge(Duration::ZERO).unwrap();
    assert_eq!(edge.sequence, 1);
    assert_eq!(edge.timestamp, CYCLE);
    assert_eq!(board.since_edge(), Duration::ZERO);

    let mut rx = [0u8; 3];
    board.read_rx(&mut rx);
    assert_eq!(rx, [DeviceState::Run as u8, 1, 0]);
}

#[test]
fn published_record_visible_to_master() {
    let (mut board, master, handle) = virtual_rig(&SafetyConfig::default(), CYCLE);
    board.write_tx(&[0x11, DeviceState::Error as u8, 7, 0x01]);
    assert_eq!(master.device_id(), 0x11);
    assert_eq!(master.device_state(), DeviceState::Error);
    assert_eq!(master.device_counter(), 7);
    assert_eq!(master.error_flags().bits(), 0x01);
    assert_eq!(handle.tx_writes(), 1);
}

#[test]
fn missed_edges_show_as_sequence_gap() {
    let (mut board, mut master, handle) = virtual_rig(&SafetyConfig::default(), CYCLE);
    master.step_n(6);
    let first = board.wait_for_edge(Duration::ZERO).unwrap();
    assert_eq!(first.sequence, 3);
    assert_eq!(handle.dropped_edges(), 2);
}

#[test]
fn watchdog_fed_each_cycle_never_expires() {
    let (mut board, mut master, _) = virtual_rig(&SafetyConfig::default(), CYCLE);
    for _ in 0..100 {
        master.step();
        board.wait_for_edge(Duration::ZERO).unwrap();
        board.feed();
    }
    assert!(!board.expired());
}

#[test]
fn watchdog_expires_without_feed() {
    let safety = SafetyConfig::default();
    let (mut board, _, _) = virtual_rig(&safety, CYCLE);
    let timeout = Duration::from_micros(safety.local_watchdog_timeout_us as u64);
    board.wait_for_edge(timeout);
    assert!(!board.expired());
    board.wait_for_edge(Duration::from_micros(1));
    assert!(board.expired());
}

#[test]
fn sensor_injection() {
    let (mut board, _, handle) = virtual_rig(&SafetyConfig::default(), CYCLE);
    handle.set_encoder(EncoderChannel::Output, 1234);
    handle.set_thermistor(2, 4000);
    handle.set_limit_switches(0b10);
    assert_eq!(board.read_encoder(EncoderChannel::Output), Ok(1234));
    assert_eq!(board.read_analog(AnalogChannel::Thermistor(2)), Ok(4000));
    assert!(board.read_analog(AnalogChannel::Thermistor(3)).is_err());
    assert_eq!(board.limit_switches(), Ok(0b10));

    handle.set_encoder_fault(EncoderChannel::Output, true);
    assert!(board.read_encoder(EncoderChannel::Output).is_err());
}

#[test]
fn imu_frames_follow_sync_pulses() {
    let (mut board, _, handle) = virtual_rig(&SafetyConfig::default(), CYCLE);
    let mut buf = [0u8; IMU_FRAME_LEN];

    assert_eq!(board.read_imu_frame(&mut buf), Ok(0));
    board.trigger_imu_sync().unwrap();
    assert_eq!(board.read_imu_frame(&mut buf), Ok(IMU_FRAME_LEN));
    assert!(ImuSample::decode(&buf).is_ok());

    handle.inject_imu_fault(ImuFault::BadHeader);
    board.trigger_imu_sync().unwrap();
    board.read_imu_frame(&mut buf).unwrap();
    assert!(ImuSample::decode(&buf).is_err());
}

#[test]
fn stop_line_assertion_is_visible_on_handle() {
    let (mut board, _, handle) = virtual_rig(&SafetyConfig::default(), CYCLE);
    board.assert_stop();
    assert!(handle.self_asserted());
    board.deassert_stop();
    assert!(!handle.self_asserted());
    assert!(!board.is_estopped());
}
