//! Configuration loading for the device binary.
//!
//! Reads the node TOML, applies the command-line identity override (the
//! DIP switches on real hardware) and validates the result.

use std::path::Path;

use medulla_common::config::{ConfigError, NodeConfig};
use medulla_common::identity::DeviceId;
use tracing::info;

/// Load, override and validate a node configuration.
pub fn load_config(path: &Path, id_override: Option<DeviceId>) -> Result<NodeConfig, ConfigError> {
    let mut config = NodeConfig::load_validated(path)?;
    if let Some(id) = id_override {
        info!(from = %config.device.id, to = %id, "device id overridden");
        config.device.id = id;
        config.validate()?;
    }
    Ok(config)
}

/// Parse a device id given as hex (`0x21`) or decimal (`33`).
pub fn parse_device_id(raw: &str) -> Result<DeviceId, String> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => raw.parse::<u8>(),
    };
    parsed
        .map(DeviceId)
        .map_err(|e| format!("invalid device id '{raw}': {e}"))
}
