//! System-wide constants for the medulla workspace.
//!
//! Single source of truth for numeric limits and defaults. Configurable
//! values also carry `MIN`/`MAX` bounds checked by config validation.

/// Default fieldbus cycle time in microseconds (1 kHz = 1000 µs).
pub const CYCLE_TIME_US: u32 = 1000;
/// Minimum configurable cycle time [µs].
pub const CYCLE_TIME_US_MIN: u32 = 100;
/// Maximum configurable cycle time [µs].
pub const CYCLE_TIME_US_MAX: u32 = 20_000;

/// Default idle poll interval while waiting for the cycle trigger [µs].
pub const IDLE_POLL_US_DEFAULT: u32 = 500;

/// Consecutive cycles without master counter progress before a liveness fault.
pub const MASTER_WATCHDOG_LIMIT: u32 = 10;

/// Default stop-line debounce limit [cycles]. Fault when the counter exceeds it.
pub const ESTOP_DEBOUNCE_LIMIT_DEFAULT: u32 = 5;
/// Minimum stop-line debounce limit [cycles].
pub const ESTOP_DEBOUNCE_LIMIT_MIN: u32 = 1;
/// Maximum stop-line debounce limit [cycles].
pub const ESTOP_DEBOUNCE_LIMIT_MAX: u32 = 1000;

/// Default minimum dwell in Error before a Reset command is honored [cycles].
pub const ESTOP_TIMEOUT_LENGTH_DEFAULT: u32 = 1000;
/// Minimum dwell bound [cycles].
pub const ESTOP_TIMEOUT_LENGTH_MIN: u32 = 1;
/// Maximum dwell bound [cycles].
pub const ESTOP_TIMEOUT_LENGTH_MAX: u32 = 600_000;

/// Default local hardware watchdog timeout [µs] (16-bit timer at 8 MHz).
pub const LOCAL_WATCHDOG_TIMEOUT_US_DEFAULT: u32 = 8192;

/// Default limit-switch debounce limit [cycles].
pub const LIMIT_SWITCH_DEBOUNCE_DEFAULT: u32 = 100;

/// Capacity of each process-data direction [bytes].
pub const PDO_MAX_BYTES: usize = 64;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/medulla.toml";
