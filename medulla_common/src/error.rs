//! Error flag bitset published in the outbound process data.
//!
//! Owned by the device-type strategy: set by `estop()` and hardware fault
//! detection, cleared only by `reset_error()`.

use bitflags::bitflags;

bitflags! {
    /// Device error flags (one byte on the wire).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ErrorFlags: u8 {
        /// Stop line asserted or device estop executed.
        const ESTOP          = 0x01;
        /// Debounced limit switch tripped.
        const LIMIT_SWITCH   = 0x02;
        /// Motor thermistor over temperature.
        const THERMISTOR     = 0x04;
        /// Motor supply outside its window.
        const MOTOR_VOLTAGE  = 0x08;
        /// Logic supply outside its window.
        const LOGIC_VOLTAGE  = 0x10;
        /// Encoder read failure or corrupt sensor frame (checksum/header).
        const SENSOR         = 0x20;
        /// Halt condition detected (output position near hard stops).
        const HALT           = 0x40;
        /// Amplifier reported a fault or rejected a command.
        const AMPLIFIER      = 0x80;
    }
}

impl ErrorFlags {
    /// Flags that make `check_error()` report a hardware fault.
    pub const FAULT_MASK: Self = Self::from_bits_truncate(
        Self::LIMIT_SWITCH.bits()
            | Self::THERMISTOR.bits()
            | Self::MOTOR_VOLTAGE.bits()
            | Self::LOGIC_VOLTAGE.bits()
            | Self::SENSOR.bits()
            | Self::AMPLIFIER.bits(),
    );

    /// Returns true if any hardware fault flag is set.
    #[inline]
    pub const fn has_fault(&self) -> bool {
        self.intersects(Self::FAULT_MASK)
    }
}

impl Default for ErrorFlags {
    fn default() -> Self {
        Self::empty()
    }
}
