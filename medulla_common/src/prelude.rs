//! Prelude module for common re-exports.
//!
//! ```rust
//! use medulla_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, DeviceSection, LimitsConfig, NodeConfig, SafetyConfig,
    SharedConfig,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CYCLE_TIME_US, MASTER_WATCHDOG_LIMIT, PDO_MAX_BYTES};

// ─── State & Flags ──────────────────────────────────────────────────
pub use crate::error::ErrorFlags;
pub use crate::identity::{DeviceId, DeviceKind};
pub use crate::state::{CommandedState, DeviceState};

// ─── Hardware ───────────────────────────────────────────────────────
pub use crate::hal::{
    AnalogChannel, Board, EdgeEvent, EncoderChannel, FieldbusPort, HalError, LocalWatchdog,
    SensorIo, StopLine, SyncTrigger,
};

// ─── Process Data ───────────────────────────────────────────────────
pub use crate::pdo::{PdoLayout, PdoValue, RxField, TxField};

/// Default system cycle time as Duration.
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_micros(CYCLE_TIME_US as u64);
