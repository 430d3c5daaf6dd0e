//! # Medulla HAL
//!
//! Simulated hardware for medulla device controllers.
//!
//! The device controller only sees the capability traits from
//! `medulla_common::hal`. This crate provides a software board implementing
//! all of them, plus a fieldbus master that drives the cycle trigger and
//! the inbound process data.
//!
//! # Module Structure
//!
//! - [`simulation`] - `SimBoard`, `SimHandle`, `SimMaster`, simulated IMU
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   edge + rx    ┌─────────────────────┐
//! │   SimMaster   │───────────────►│                     │
//! │ (test/thread) │◄───────────────│      SimState       │
//! └───────────────┘      tx        │ (Mutex + Condvar)   │
//!                                  │                     │
//! ┌───────────────┐  fault inject  │  clock, stop line,  │
//! │   SimHandle   │───────────────►│  watchdog, sensors  │
//! └───────────────┘                └──────────┬──────────┘
//!                                             │
//!                                  ┌──────────▼──────────┐
//!                                  │      SimBoard       │ impl Board
//!                                  └─────────────────────┘
//! ```

pub mod simulation;

pub use crate::simulation::{ImuFault, SimBoard, SimHandle, SimMaster, TimeMode, virtual_rig};
