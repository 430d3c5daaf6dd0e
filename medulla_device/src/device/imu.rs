//! Inertial measurement unit (KVH frame over UART).
//!
//! Each cycle the device reads the frame requested on the previous cycle,
//! validates it and republishes its fields, then `post_sync` pulses the
//! sensor for the next one. A rejected frame latches `SENSOR` and the last
//! good sample is republished with sequence 255.

use medulla_common::error::ErrorFlags;
use medulla_common::hal::{HalError, SensorIo};
use medulla_common::identity::DeviceKind;
use medulla_common::kvh::{IMU_CRC_SPAN, IMU_FRAME_LEN, IMU_SEQUENCE_INVALID, ImuSample, crc32};
use medulla_common::pdo::{PdoLayout, RX_HEADER_END, TX_ERROR_FLAGS, TxField};
use static_assertions::const_assert;
use tracing::{error, warn};

use super::{DeviceType, SyncContext};
use crate::error::DeviceError;
use crate::pdo::ProcessData;

pub const TX_ANGLE_DELTA: [TxField; 3] = [
    TX_ERROR_FLAGS.then(4),
    TX_ERROR_FLAGS.then(4).then(4),
    TX_ERROR_FLAGS.then(4).then(4).then(4),
];
pub const TX_ACCEL: [TxField; 3] = [
    TX_ANGLE_DELTA[2].then(4),
    TX_ANGLE_DELTA[2].then(4).then(4),
    TX_ANGLE_DELTA[2].then(4).then(4).then(4),
];
pub const TX_STATUS: TxField = TX_ACCEL[2].then(1);
pub const TX_SEQUENCE: TxField = TX_STATUS.then(1);
pub const TX_TEMPERATURE: TxField = TX_SEQUENCE.then(2);
pub const TX_CRC: TxField = TX_TEMPERATURE.then(4);

pub const IMU_LAYOUT: PdoLayout = PdoLayout {
    name: "imu",
    rx_size: RX_HEADER_END,
    tx_size: TX_CRC.end(),
};

const_assert!(IMU_LAYOUT.tx_size == 36);

/// IMU device.
#[derive(Debug, Clone)]
pub struct ImuDevice {
    flags: ErrorFlags,
    frame: [u8; IMU_FRAME_LEN],
    last_good: ImuSample,
    last_crc: u32,
    expected_sequence: Option<u8>,
    sequence_gaps: u64,
    frames_rejected: u64,
}

impl Default for ImuDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ImuDevice {
    pub fn new() -> Self {
        Self {
            flags: ErrorFlags::empty(),
            frame: [0; IMU_FRAME_LEN],
            last_good: ImuSample::default(),
            last_crc: 0,
            expected_sequence: None,
            sequence_gaps: 0,
            frames_rejected: 0,
        }
    }

    /// Frames skipped by the sensor, summed over every gap seen.
    pub fn sequence_gaps(&self) -> u64 {
        self.sequence_gaps
    }

    /// Frames rejected for length, header or checksum.
    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected
    }

    fn latch(&mut self, err: &HalError) {
        if !self.flags.contains(ErrorFlags::SENSOR) {
            error!(%err, "imu transport fault");
        }
        self.flags |= ErrorFlags::SENSOR;
    }

    fn track_sequence(&mut self, sequence: u8) {
        if let Some(expected) = self.expected_sequence.filter(|&e| e != sequence) {
            let skipped = sequence.wrapping_sub(expected) & 0x7F;
            self.sequence_gaps += u64::from(skipped);
            warn!(expected, sequence, skipped, "imu sequence gap");
        }
        self.expected_sequence = Some(sequence.wrapping_add(1) & 0x7F);
    }

    fn publish(&self, pdo: &mut ProcessData, sequence: u8) {
        let s = &self.last_good;
        for (field, value) in TX_ANGLE_DELTA.iter().zip(s.angle_delta) {
            pdo.set_tx(*field, value);
        }
        for (field, value) in TX_ACCEL.iter().zip(s.accel) {
            pdo.set_tx(*field, value);
        }
        pdo.set_tx(TX_STATUS, s.status);
        pdo.set_tx(TX_SEQUENCE, sequence);
        pdo.set_tx(TX_TEMPERATURE, s.temperature);
        pdo.set_tx(TX_CRC, self.last_crc);
    }
}

impl DeviceType for ImuDevice {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Imu
    }

    fn layout(&self) -> PdoLayout {
        IMU_LAYOUT
    }

    fn initialize(
        &mut self,
        io: &mut dyn SensorIo,
        pdo: &mut ProcessData,
    ) -> Result<(), DeviceError> {
        // Prime the first frame so the first cycle has data to read.
        io.trigger_imu_sync()?;
        self.publish(pdo, IMU_SEQUENCE_INVALID);
        Ok(())
    }

    fn enable_outputs(&mut self, _io: &mut dyn SensorIo) {}

    fn disable_outputs(&mut self, _io: &mut dyn SensorIo) {}

    fn update_inputs(&mut self, io: &mut dyn SensorIo, _sync: &SyncContext, pdo: &mut ProcessData) {
        let received = match io.read_imu_frame(&mut self.frame) {
            Ok(n) => n,
            Err(err) => {
                self.latch(&err);
                0
            }
        };

        match ImuSample::decode(&self.frame[..received]) {
            Ok(sample) => {
                self.track_sequence(sample.sequence);
                self.last_good = sample;
                self.last_crc = crc32(&self.frame[..IMU_CRC_SPAN]);
                self.publish(pdo, sample.sequence);
            }
            Err(err) => {
                self.frames_rejected += 1;
                if !self.flags.contains(ErrorFlags::SENSOR) {
                    warn!(%err, "imu frame rejected");
                }
                self.flags |= ErrorFlags::SENSOR;
                self.publish(pdo, IMU_SEQUENCE_INVALID);
            }
        }
    }

    fn update_outputs(&mut self, _io: &mut dyn SensorIo, _pdo: &ProcessData) {}

    fn post_sync(&mut self, io: &mut dyn SensorIo, _pdo: &mut ProcessData) {
        if let Err(err) = io.trigger_imu_sync() {
            self.latch(&err);
        }
    }

    fn estop(&mut self, _io: &mut dyn SensorIo) {
        self.flags |= ErrorFlags::ESTOP;
    }

    fn check_error(&self) -> bool {
        self.flags.has_fault()
    }

    fn check_halt(&self) -> bool {
        false
    }

    fn reset_error(&mut self) {
        self.flags = ErrorFlags::empty();
        self.expected_sequence = None;
    }

    fn error_flags(&self) -> ErrorFlags {
        self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medulla_common::hal::EdgeEvent;
    use std::time::Duration;

    /// Serves one queued frame per read.
    struct Uart {
        next: Vec<u8>,
        pulses: u32,
    }

    impl SensorIo for Uart {
        fn trigger_imu_sync(&mut self) -> Result<(), HalError> {
            self.pulses += 1;
            Ok(())
        }

        fn read_imu_frame(&mut self, buf: &mut [u8]) -> Result<usize, HalError> {
            let n = self.next.len().min(buf.len());
            buf[..n].copy_from_slice(&self.next[..n]);
            Ok(n)
        }
    }

    fn sync() -> SyncContext {
        SyncContext {
            edge: EdgeEvent {
                sequence: 1,
                timestamp: Duration::ZERO,
            },
            since_edge: Duration::ZERO,
            cycle: 0,
        }
    }

    fn sample(sequence: u8) -> ImuSample {
        ImuSample {
            angle_delta: [1, 2, 3],
            accel: [4, 5, 6],
            status: 0x77,
            sequence,
            temperature: 30,
        }
    }

    fn setup() -> (ImuDevice, Uart, ProcessData) {
        let mut imu = ImuDevice::new();
        let mut uart = Uart {
            next: Vec::new(),
            pulses: 0,
        };
        let mut pdo = ProcessData::new(IMU_LAYOUT).unwrap();
        imu.initialize(&mut uart, &mut pdo).unwrap();
        (imu, uart, pdo)
    }

    #[test]
    fn layout_offsets() {
        assert_eq!(TX_ANGLE_DELTA[0].offset, 4);
        assert_eq!(TX_ACCEL[0].offset, 16);
        assert_eq!(TX_STATUS.offset, 28);
        assert_eq!(TX_SEQUENCE.offset, 29);
        assert_eq!(TX_TEMPERATURE.offset, 30);
        assert_eq!(TX_CRC.offset, 32);
    }

    #[test]
    fn valid_frame_is_published() {
        let (mut imu, mut uart, mut pdo) = setup();
        assert_eq!(uart.pulses, 1);
        let frame = sample(7).encode();
        uart.next = frame.to_vec();
        imu.update_inputs(&mut uart, &sync(), &mut pdo);

        assert!(!imu.check_error());
        assert_eq!(pdo.tx::<u32>(TX_ACCEL[1]), 5);
        assert_eq!(pdo.tx::<u8>(TX_SEQUENCE), 7);
        assert_eq!(pdo.tx::<u32>(TX_CRC), crc32(&frame[..IMU_CRC_SPAN]));
    }

    #[test]
    fn checksum_mismatch_is_fault_and_keeps_last_sample() {
        let (mut imu, mut uart, mut pdo) = setup();
        uart.next = sample(1).encode().to_vec();
        imu.update_inputs(&mut uart, &sync(), &mut pdo);

        let mut bad = sample(2);
        bad.accel = [40, 50, 60];
        let mut frame = bad.encode();
        frame[20] ^= 0x01;
        uart.next = frame.to_vec();
        imu.update_inputs(&mut uart, &sync(), &mut pdo);

        assert!(imu.check_error());
        assert!(imu.error_flags().contains(ErrorFlags::SENSOR));
        assert_eq!(pdo.tx::<u8>(TX_SEQUENCE), IMU_SEQUENCE_INVALID);
        assert_eq!(pdo.tx::<u32>(TX_ACCEL[1]), 5);
        assert_eq!(imu.frames_rejected(), 1);
    }

    #[test]
    fn missing_frame_is_fault() {
        let (mut imu, mut uart, mut pdo) = setup();
        imu.update_inputs(&mut uart, &sync(), &mut pdo);
        assert!(imu.check_error());
    }

    #[test]
    fn sequence_gap_is_counted_not_fault() {
        let (mut imu, mut uart, mut pdo) = setup();
        for seq in [126u8, 127, 2] {
            uart.next = sample(seq).encode().to_vec();
            imu.update_inputs(&mut uart, &sync(), &mut pdo);
        }
        // 127 -> 0 -> 1 skipped
        assert_eq!(imu.sequence_gaps(), 2);
        assert!(!imu.check_error());
    }

    #[test]
    fn post_sync_pulses_sensor_and_reset_clears() {
        let (mut imu, mut uart, mut pdo) = setup();
        imu.post_sync(&mut uart, &mut pdo);
        assert_eq!(uart.pulses, 2);

        imu.update_inputs(&mut uart, &sync(), &mut pdo);
        assert!(imu.check_error());
        imu.reset_error();
        imu.reset_error();
        assert!(!imu.check_error());
        assert!(imu.error_flags().is_empty());
    }
}
