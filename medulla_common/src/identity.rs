//! Device identity decoding.
//!
//! Each node reads an 8-bit identity from its DIP switches at power-up. The
//! high nibble selects the device kind, the low nibble the position on the
//! robot (left/right, A/B side). The kind is decided once at startup.

use serde::{Deserialize, Serialize};

/// Mask selecting the device-kind prefix from an identity byte.
pub const DEVICE_ID_PREFIX_MASK: u8 = 0xF0;

/// Leg actuator prefix.
pub const LEG_ID_PREFIX: u8 = 0x10;
/// Hip actuator prefix.
pub const HIP_ID_PREFIX: u8 = 0x20;
/// Boom sensor prefix.
pub const BOOM_ID_PREFIX: u8 = 0x30;
/// Inertial sensor prefix.
pub const IMU_ID_PREFIX: u8 = 0x40;

/// Kind of hardware a node drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Series-elastic leg actuator (motor + output encoders, amplifier).
    Leg,
    /// Hip abduction actuator.
    Hip,
    /// Boom instrumentation (three encoders, no outputs).
    Boom,
    /// Inertial measurement unit.
    Imu,
}

impl DeviceKind {
    /// Human-readable name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Leg => "leg",
            Self::Hip => "hip",
            Self::Boom => "boom",
            Self::Imu => "imu",
        }
    }
}

/// Identity byte read from the DIP switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u8);

impl DeviceId {
    /// Device kind encoded in the prefix, `None` for an unknown prefix.
    pub const fn kind(&self) -> Option<DeviceKind> {
        match self.0 & DEVICE_ID_PREFIX_MASK {
            LEG_ID_PREFIX => Some(DeviceKind::Leg),
            HIP_ID_PREFIX => Some(DeviceKind::Hip),
            BOOM_ID_PREFIX => Some(DeviceKind::Boom),
            IMU_ID_PREFIX => Some(DeviceKind::Imu),
            _ => None,
        }
    }

    /// Position index within the kind.
    #[inline]
    pub const fn position(&self) -> u8 {
        self.0 & !DEVICE_ID_PREFIX_MASK
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}
