//! Configuration loading traits and types.
//!
//! Every medulla node reads one TOML file at startup:
//!
//! ```toml
//! [shared]
//! log_level = "info"
//! service_name = "medulla-leg-a"
//!
//! [device]
//! id = 0x11
//! cycle_time_us = 1000
//!
//! [safety]
//! estop_debounce_limit = 5
//! estop_timeout_length = 1000
//!
//! [limits]
//! thermistor_max = 3000
//! ```
//!
//! Every section except `[shared]` and `[device]` falls back to defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::consts::*;
use crate::identity::DeviceId;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, per-cycle detail.
    Trace,
    /// Debug information useful during bring-up.
    Debug,
    /// State transitions and startup.
    #[default]
    Info,
    /// Trips, overruns, missed edges.
    Warn,
    /// Hardware faults and watchdog expiry.
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared by every medulla binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

fn check_range(name: &str, value: u32, min: u32, max: u32) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::ValidationError(format!(
            "{name} = {value} outside [{min}, {max}]"
        )));
    }
    Ok(())
}

fn check_window(name: &str, min: u16, max: u16) -> Result<(), ConfigError> {
    if min >= max {
        return Err(ConfigError::ValidationError(format!(
            "{name}: min ({min}) must be below max ({max})"
        )));
    }
    Ok(())
}

// ─── [device] ───────────────────────────────────────────────────────

/// Node identity and cycle timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSection {
    /// DIP-switch identity byte.
    pub id: DeviceId,

    /// Expected fieldbus cycle time [µs], used for overrun accounting.
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,

    /// How long to wait for an edge before running idle housekeeping [µs].
    #[serde(default = "default_idle_poll_us")]
    pub idle_poll_us: u32,
}

fn default_cycle_time_us() -> u32 {
    CYCLE_TIME_US
}

fn default_idle_poll_us() -> u32 {
    IDLE_POLL_US_DEFAULT
}

impl DeviceSection {
    /// Validate timing bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "device.cycle_time_us",
            self.cycle_time_us,
            CYCLE_TIME_US_MIN,
            CYCLE_TIME_US_MAX,
        )?;
        check_range("device.idle_poll_us", self.idle_poll_us, 10, self.cycle_time_us)
    }
}

// ─── [safety] ───────────────────────────────────────────────────────

/// Safety supervisor parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Stop-line debounce limit [cycles]; fault when the counter exceeds it.
    pub estop_debounce_limit: u32,
    /// Minimum dwell in Error before Reset is honored [cycles].
    pub estop_timeout_length: u32,
    /// Local hardware watchdog timeout [µs].
    pub local_watchdog_timeout_us: u32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            estop_debounce_limit: ESTOP_DEBOUNCE_LIMIT_DEFAULT,
            estop_timeout_length: ESTOP_TIMEOUT_LENGTH_DEFAULT,
            local_watchdog_timeout_us: LOCAL_WATCHDOG_TIMEOUT_US_DEFAULT,
        }
    }
}

impl SafetyConfig {
    /// Validate bounds. The watchdog must outlast one cycle.
    pub fn validate(&self, cycle_time_us: u32) -> Result<(), ConfigError> {
        check_range(
            "safety.estop_debounce_limit",
            self.estop_debounce_limit,
            ESTOP_DEBOUNCE_LIMIT_MIN,
            ESTOP_DEBOUNCE_LIMIT_MAX,
        )?;
        check_range(
            "safety.estop_timeout_length",
            self.estop_timeout_length,
            ESTOP_TIMEOUT_LENGTH_MIN,
            ESTOP_TIMEOUT_LENGTH_MAX,
        )?;
        if self.local_watchdog_timeout_us <= cycle_time_us {
            return Err(ConfigError::ValidationError(format!(
                "safety.local_watchdog_timeout_us ({}) must exceed cycle_time_us ({cycle_time_us})",
                self.local_watchdog_timeout_us
            )));
        }
        Ok(())
    }
}

// ─── [limits] ───────────────────────────────────────────────────────

/// Actuator supervision limits (raw sensor units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Thermistor reading above which the motor is over temperature [ADC counts].
    pub thermistor_max: u16,
    /// Motor supply window [ADC counts].
    pub motor_voltage_min: u16,
    /// Motor supply window [ADC counts].
    pub motor_voltage_max: u16,
    /// Logic supply window [ADC counts].
    pub logic_voltage_min: u16,
    /// Logic supply window [ADC counts].
    pub logic_voltage_max: u16,
    /// Limit-switch debounce limit [cycles].
    pub limit_switch_debounce: u32,
    /// Output encoder position below which Halt engages [counts].
    pub halt_position_min: u32,
    /// Output encoder position above which Halt engages [counts].
    pub halt_position_max: u32,
    /// Damping gain of the halt controller [current per count/cycle].
    pub halt_damping: f32,
    /// Current clamp of the halt controller.
    pub halt_max_current: i32,
    /// Current clamp for commanded motor current in Run.
    pub max_motor_current: i32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            thermistor_max: 3000,
            motor_voltage_min: 1800,
            motor_voltage_max: 3900,
            logic_voltage_min: 2400,
            logic_voltage_max: 3600,
            limit_switch_debounce: LIMIT_SWITCH_DEBOUNCE_DEFAULT,
            halt_position_min: 20_000,
            halt_position_max: (1 << 25) - 20_000,
            halt_damping: 0.5,
            halt_max_current: 5_000,
            max_motor_current: 30_000,
        }
    }
}

impl LimitsConfig {
    /// Validate windows and clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_window(
            "limits.motor_voltage",
            self.motor_voltage_min,
            self.motor_voltage_max,
        )?;
        check_window(
            "limits.logic_voltage",
            self.logic_voltage_min,
            self.logic_voltage_max,
        )?;
        if self.halt_position_min >= self.halt_position_max {
            return Err(ConfigError::ValidationError(
                "limits.halt_position_min must be below halt_position_max".to_string(),
            ));
        }
        check_range(
            "limits.limit_switch_debounce",
            self.limit_switch_debounce,
            1,
            10_000,
        )?;
        if !self.halt_damping.is_finite() || self.halt_damping < 0.0 {
            return Err(ConfigError::ValidationError(
                "limits.halt_damping must be finite and non-negative".to_string(),
            ));
        }
        if self.halt_max_current <= 0 || self.max_motor_current <= 0 {
            return Err(ConfigError::ValidationError(
                "limits current clamps must be positive".to_string(),
            ));
        }
        if self.halt_max_current > self.max_motor_current {
            return Err(ConfigError::ValidationError(
                "limits.halt_max_current exceeds max_motor_current".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Node Config ────────────────────────────────────────────────────

/// Complete configuration of one device node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Service name and log level.
    pub shared: SharedConfig,
    /// Identity and timing.
    pub device: DeviceSection,
    /// Safety supervisor parameters.
    #[serde(default)]
    pub safety: SafetyConfig,
    /// Actuator limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl NodeConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.device.validate()?;
        self.safety.validate(self.device.cycle_time_us)?;
        self.limits.validate()
    }

    /// Load from TOML and validate.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = <Self as ConfigLoader>::load(path)?;
        config.validate()?;
        debug!(
            path = %path.display(),
            device = %config.device.id,
            "configuration loaded"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> NodeConfig {
        toml::from_str(
            r#"
[shared]
service_name = "unit"

[device]
id = 17
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert_eq!(LogLevel::Warn.as_filter(), "warn");
    }

    #[test]
    fn test_sections_default() {
        let config = minimal();
        assert_eq!(config.device.id, DeviceId(0x11));
        assert_eq!(config.device.cycle_time_us, CYCLE_TIME_US);
        assert_eq!(config.safety, SafetyConfig::default());
        assert_eq!(config.limits, LimitsConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debounce_limit_bounds() {
        let mut config = minimal();
        config.safety.estop_debounce_limit = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_watchdog_must_outlast_cycle() {
        let mut config = minimal();
        config.safety.local_watchdog_timeout_us = config.device.cycle_time_us;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_voltage_window() {
        let mut config = minimal();
        config.limits.logic_voltage_min = 4000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_halt_clamp_within_run_clamp() {
        let mut config = minimal();
        config.limits.halt_max_current = config.limits.max_motor_current + 1;
        assert!(config.validate().is_err());
    }
}
