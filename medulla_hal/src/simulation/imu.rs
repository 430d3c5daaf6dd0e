//! Simulated KVH inertial sensor.
//!
//! Emits one encoded frame per sync pulse. A pending [`ImuFault`] perturbs
//! exactly one frame.

use heapless::Vec;
use medulla_common::kvh::{IMU_FRAME_LEN, ImuSample};

/// Perturbation applied to the next emitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImuFault {
    /// Frame is emitted intact.
    #[default]
    None,
    /// One payload bit is flipped after the checksum was computed.
    FlipBit,
    /// Header byte is wrong.
    BadHeader,
    /// Only part of the frame arrives.
    Truncate,
    /// Nothing arrives at all.
    Silent,
    /// Sensor sequence jumps forward by this many frames.
    SkipSequence(u8),
}

#[derive(Debug, Default)]
pub(crate) struct SimImu {
    pub(crate) sample: ImuSample,
    pub(crate) next_sequence: u8,
    pub(crate) pending_fault: ImuFault,
    pub(crate) rx: Vec<u8, { IMU_FRAME_LEN * 2 }>,
    pub(crate) frames_sent: u64,
}

impl SimImu {
    /// Handle a master-sync pulse: emit one frame into the receive buffer.
    pub(crate) fn sync_pulse(&mut self) {
        let fault = core::mem::take(&mut self.pending_fault);
        if let ImuFault::SkipSequence(n) = fault {
            self.next_sequence = self.next_sequence.wrapping_add(n) & 0x7F;
        }

        let mut sample = self.sample;
        sample.sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1) & 0x7F;
        let mut frame = sample.encode();

        let len = match fault {
            ImuFault::FlipBit => {
                frame[6] ^= 0x10;
                IMU_FRAME_LEN
            }
            ImuFault::BadHeader => {
                frame[0] = 0x00;
                IMU_FRAME_LEN
            }
            ImuFault::Truncate => IMU_FRAME_LEN / 2,
            ImuFault::Silent => 0,
            ImuFault::None | ImuFault::SkipSequence(_) => IMU_FRAME_LEN,
        };

        // A stale, unread frame is discarded by the sync pulse.
        self.rx.clear();
        let _ = self.rx.extend_from_slice(&frame[..len]);
        self.frames_sent += 1;
    }

    /// Drain buffered bytes into `buf`.
    pub(crate) fn drain(&mut self, buf: &mut [u8]) -> usize {
        let n = self.rx.len().min(buf.len());
        buf[..n].copy_from_slice(&self.rx[..n]);
        self.rx.clear();
        n
    }
}
