//! Process-data field primitives and the common header layout.
//!
//! Every device exchanges two fixed-size records per fieldbus cycle:
//! inbound (master → device, "rx") and outbound (device → master, "tx").
//! Fields are placed back to back starting at offset 0, all multi-byte
//! values little-endian. Offsets are `const` and never renegotiated at
//! runtime; each device type declares its fields after the common header.
//!
//! ```text
//! rx: [ commanded_state u8 | master_counter u16 | device commands ... ]
//! tx: [ device_id u8 | device_state u8 | device_counter u8 | error_flags u8 | telemetry ... ]
//! ```

use static_assertions::const_assert;

use crate::consts::PDO_MAX_BYTES;

/// A value that can be stored in a process-data field.
pub trait PdoValue: Copy {
    /// Encoded width [bytes].
    const WIDTH: usize;
    /// Decode from exactly `WIDTH` little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;
    /// Encode into exactly `WIDTH` little-endian bytes.
    fn write_le(self, bytes: &mut [u8]);
}

macro_rules! impl_pdo_value {
    ($($t:ty),*) => {$(
        impl PdoValue for $t {
            const WIDTH: usize = core::mem::size_of::<$t>();

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; core::mem::size_of::<$t>()];
                raw.copy_from_slice(&bytes[..Self::WIDTH]);
                <$t>::from_le_bytes(raw)
            }

            #[inline]
            fn write_le(self, bytes: &mut [u8]) {
                bytes[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
            }
        }
    )*};
}

impl_pdo_value!(u8, i8, u16, i16, u32, i32);

macro_rules! pdo_field {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name {
            /// Byte offset from the start of the record.
            pub offset: usize,
            /// Field width [bytes].
            pub width: usize,
        }

        impl $name {
            /// First field of a record.
            pub const fn first(width: usize) -> Self {
                Self { offset: 0, width }
            }

            /// Field placed directly after `self`.
            pub const fn then(self, width: usize) -> Self {
                Self { offset: self.offset + self.width, width }
            }

            /// One past the last byte of this field.
            pub const fn end(self) -> usize {
                self.offset + self.width
            }

            /// Byte range covered by this field.
            #[inline]
            pub const fn range(self) -> core::ops::Range<usize> {
                self.offset..self.offset + self.width
            }
        }
    };
}

pdo_field!(
    /// Field in the inbound (master → device) record.
    RxField
);
pdo_field!(
    /// Field in the outbound (device → master) record.
    TxField
);

// ─── Common Header ──────────────────────────────────────────────────

/// Commanded state (raw `DeviceState` byte).
pub const RX_COMMAND_STATE: RxField = RxField::first(1);
/// Master cycle counter; must advance every cycle the master is alive.
pub const RX_MASTER_COUNTER: RxField = RX_COMMAND_STATE.then(2);
/// First byte available for device-specific commands.
pub const RX_HEADER_END: usize = RX_MASTER_COUNTER.end();

/// Device identity byte.
pub const TX_DEVICE_ID: TxField = TxField::first(1);
/// Current device state (raw `DeviceState` byte).
pub const TX_DEVICE_STATE: TxField = TX_DEVICE_ID.then(1);
/// Device cycle counter (wrapping).
pub const TX_DEVICE_COUNTER: TxField = TX_DEVICE_STATE.then(1);
/// `ErrorFlags` bits.
pub const TX_ERROR_FLAGS: TxField = TX_DEVICE_COUNTER.then(1);
/// First byte available for device telemetry.
pub const TX_HEADER_END: usize = TX_ERROR_FLAGS.end();

const_assert!(RX_HEADER_END == 3);
const_assert!(TX_HEADER_END == 4);

/// Per-device-type record sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdoLayout {
    /// Layout name (device kind) for diagnostics.
    pub name: &'static str,
    /// Inbound record size [bytes].
    pub rx_size: usize,
    /// Outbound record size [bytes].
    pub tx_size: usize,
}

impl PdoLayout {
    /// Whether both records fit the fixed process-data capacity and hold
    /// at least the common header.
    pub const fn is_valid(&self) -> bool {
        self.rx_size >= RX_HEADER_END
            && self.tx_size >= TX_HEADER_END
            && self.rx_size <= PDO_MAX_BYTES
            && self.tx_size <= PDO_MAX_BYTES
    }
}
