//! Medulla Common Library
//!
//! Shared definitions for every crate in the medulla workspace: the device
//! state enumeration, error flag bitset, device identity decoding, the
//! process-data field primitives, the hardware capability traits and the
//! configuration loader.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide limits and defaults
//! - [`state`] - `DeviceState` shared by device and master
//! - [`error`] - `ErrorFlags` bitset published in outbound process data
//! - [`identity`] - DIP-switch identity → device kind
//! - [`pdo`] - Fixed-offset process-data fields and the common header
//! - [`hal`] - Hardware capability traits (trigger, watchdog, stop line, I/O)
//! - [`kvh`] - KVH inertial sensor frame codec and CRC-32
//! - [`config`] - TOML configuration types and loader
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use medulla_common::prelude::*;
//! ```

pub mod config;
pub mod consts;
pub mod error;
pub mod hal;
pub mod identity;
pub mod kvh;
pub mod pdo;
pub mod prelude;
pub mod state;
