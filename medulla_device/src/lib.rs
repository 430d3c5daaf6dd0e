//! # Medulla Device Controller Library
//!
//! Firmware core of one fieldbus node on a legged robot. Every node runs
//! the same loop: wait for the cycle edge, sample the device, exchange
//! process data with the master, run one tick of the safety-gated state
//! machine, feed the local watchdog.
//!
//! ## Components
//!
//! - [`pdo`] - Process Data Channel (fixed-layout inbound/outbound records)
//! - [`safety`] - Safety Supervisor (stop-line debounce, master liveness, dwell)
//! - [`state`] - Device State Machine (Idle/Init/Run/Stop/Halt/Reset/Error)
//! - [`device`] - Device-Type strategies (Leg, Hip, Boom, Imu)
//! - [`cycle`] - Cyclic Synchronization Driver and RT setup
//! - [`config`] - Configuration loading for the binary
//! - [`error`] - Error types
//!
//! ## Zero-Allocation Cycle
//!
//! Process-data buffers, counters and the transition history are fixed-size
//! and allocated once. The device strategy is boxed once at startup.

pub mod config;
pub mod cycle;
pub mod device;
pub mod error;
pub mod pdo;
pub mod safety;
pub mod state;
