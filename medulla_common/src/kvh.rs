//! KVH inertial sensor frame codec.
//!
//! The IMU emits one 36-byte frame per master-sync pulse. All multi-byte
//! fields are big-endian on the serial line:
//!
//! ```text
//! offset  size  field
//!  0      4     header FE 81 FF 55
//!  4      12    angle delta X/Y/Z (raw 32-bit)
//! 16      12    acceleration X/Y/Z (raw 32-bit)
//! 28      1     status
//! 29      1     sequence (0..127)
//! 30      2     temperature (i16)
//! 32      4     CRC-32 over bytes 0..32
//! ```

use thiserror::Error;

/// Total frame length [bytes].
pub const IMU_FRAME_LEN: usize = 36;

/// Fixed frame header.
pub const IMU_FRAME_HEADER: [u8; 4] = [0xFE, 0x81, 0xFF, 0x55];

/// Number of bytes covered by the checksum.
pub const IMU_CRC_SPAN: usize = 32;

/// Sequence value published when the frame was rejected.
pub const IMU_SEQUENCE_INVALID: u8 = 255;

/// Frame decoding failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Fewer bytes than a full frame arrived before the cycle deadline.
    #[error("short frame: {0} of 36 bytes")]
    Short(usize),

    /// Header bytes did not match.
    #[error("bad frame header")]
    BadHeader,

    /// Checksum mismatch.
    #[error("checksum mismatch: frame says {expected:#010x}, computed {actual:#010x}")]
    Checksum {
        /// Value carried in the frame.
        expected: u32,
        /// Value computed over the received bytes.
        actual: u32,
    },
}

/// CRC-32 (IEEE 802.3, reflected, poly 0xEDB88320).
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

/// One decoded IMU sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImuSample {
    /// Angle delta X/Y/Z (raw sensor words).
    pub angle_delta: [u32; 3],
    /// Linear acceleration X/Y/Z (raw sensor words).
    pub accel: [u32; 3],
    /// Sensor status byte.
    pub status: u8,
    /// Sensor sequence number.
    pub sequence: u8,
    /// Sensor temperature (raw).
    pub temperature: i16,
}

#[inline]
fn be_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

impl ImuSample {
    /// Encode into a complete frame with a valid checksum.
    pub fn encode(&self) -> [u8; IMU_FRAME_LEN] {
        let mut frame = [0u8; IMU_FRAME_LEN];
        frame[..4].copy_from_slice(&IMU_FRAME_HEADER);
        for (i, word) in self.angle_delta.iter().chain(self.accel.iter()).enumerate() {
            let at = 4 + i * 4;
            frame[at..at + 4].copy_from_slice(&word.to_be_bytes());
        }
        frame[28] = self.status;
        frame[29] = self.sequence;
        frame[30..32].copy_from_slice(&self.temperature.to_be_bytes());
        let crc = crc32(&frame[..IMU_CRC_SPAN]);
        frame[32..36].copy_from_slice(&crc.to_be_bytes());
        frame
    }

    /// Validate and decode a received frame.
    pub fn decode(frame: &[u8]) -> Result<Self, FrameError> {
        if frame.len() < IMU_FRAME_LEN {
            return Err(FrameError::Short(frame.len()));
        }
        if frame[..4] != IMU_FRAME_HEADER {
            return Err(FrameError::BadHeader);
        }
        let expected = be_u32(frame, 32);
        let actual = crc32(&frame[..IMU_CRC_SPAN]);
        if expected != actual {
            return Err(FrameError::Checksum { expected, actual });
        }

        Ok(Self {
            angle_delta: [be_u32(frame, 4), be_u32(frame, 8), be_u32(frame, 12)],
            accel: [be_u32(frame, 16), be_u32(frame, 20), be_u32(frame, 24)],
            status: frame[28],
            sequence: frame[29],
            temperature: i16::from_be_bytes([frame[30], frame[31]]),
        })
    }
}
