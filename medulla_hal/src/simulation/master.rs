//! Simulated fieldbus master.
//!
//! Each `step()` is one fieldbus cycle as seen by the device: the master
//! writes the inbound record (commanded state, master counter, device
//! commands), time moves by one period, and the cycle trigger fires.

use medulla_common::consts::PDO_MAX_BYTES;
use medulla_common::error::ErrorFlags;
use medulla_common::pdo::{
    PdoValue, RX_COMMAND_STATE, RX_MASTER_COUNTER, RxField, TX_DEVICE_COUNTER, TX_DEVICE_ID,
    TX_DEVICE_STATE, TX_ERROR_FLAGS, TxField,
};
use medulla_common::state::DeviceState;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info};

use super::state::SimHandle;

/// Simulated fieldbus master.
#[derive(Debug)]
pub struct SimMaster {
    handle: SimHandle,
    period: Duration,
    rx: [u8; PDO_MAX_BYTES],
    command: u8,
    counter: u16,
    frozen: bool,
    cycles: u64,
}

impl SimMaster {
    /// Create a master running at `period`, commanding Idle.
    pub fn new(handle: SimHandle, period: Duration) -> Self {
        Self {
            handle,
            period,
            rx: [0; PDO_MAX_BYTES],
            command: DeviceState::Idle as u8,
            counter: 0,
            frozen: false,
            cycles: 0,
        }
    }

    /// Cycle period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of cycles stepped so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Command a state.
    pub fn set_command(&mut self, state: DeviceState) {
        self.command = state as u8;
    }

    /// Command a raw state byte (may be outside the enumeration).
    pub fn set_raw_command(&mut self, raw: u8) {
        self.command = raw;
    }

    /// Stop advancing the master counter, as a stalled master would.
    pub fn freeze_counter(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Current master counter value.
    pub fn counter(&self) -> u16 {
        self.counter
    }

    /// Set a device-specific inbound field.
    pub fn set_rx<T: PdoValue>(&mut self, field: RxField, value: T) {
        value.write_le(&mut self.rx[field.range()]);
    }

    /// Run one cycle: publish inbound data, let one period pass, fire the edge.
    pub fn step(&mut self) {
        if !self.frozen {
            self.counter = self.counter.wrapping_add(1);
        }
        self.rx[RX_COMMAND_STATE.offset] = self.command;
        self.counter.write_le(&mut self.rx[RX_MASTER_COUNTER.range()]);

        let shared = &self.handle.shared;
        {
            let mut state = shared.state.lock();
            state.rx = self.rx;
            state.advance(self.period);
            state.push_edge();
        }
        shared.edge_ready.notify_one();
        self.cycles += 1;
    }

    /// Step `n` cycles without consuming them.
    ///
    /// With an edge queue deeper than `n` every edge survives; beyond that
    /// the oldest are lost.
    pub fn step_n(&mut self, n: usize) {
        for _ in 0..n {
            self.step();
        }
    }

    // ─── Outbound record ────────────────────────────────────────────

    /// Raw outbound record.
    pub fn tx(&self) -> [u8; PDO_MAX_BYTES] {
        self.handle.tx_snapshot()
    }

    /// Read a telemetry field from the outbound record.
    pub fn tx_value<T: PdoValue>(&self, field: TxField) -> T {
        T::read_le(&self.tx()[field.range()])
    }

    /// Device identity byte.
    pub fn device_id(&self) -> u8 {
        self.tx()[TX_DEVICE_ID.offset]
    }

    /// Published device state.
    pub fn device_state(&self) -> DeviceState {
        DeviceState::from_raw(self.tx()[TX_DEVICE_STATE.offset])
    }

    /// Published device counter.
    pub fn device_counter(&self) -> u8 {
        self.tx()[TX_DEVICE_COUNTER.offset]
    }

    /// Published error flags.
    pub fn error_flags(&self) -> ErrorFlags {
        ErrorFlags::from_bits_retain(self.tx()[TX_ERROR_FLAGS.offset])
    }

    /// Run the master on its own thread until `running` clears.
    ///
    /// The master commands Run and keeps the counter moving; a device
    /// reporting Error is asked to Reset every cycle.
    pub fn spawn(mut self, running: Arc<AtomicBool>) -> std::io::Result<JoinHandle<u64>> {
        std::thread::Builder::new()
            .name("sim-master".to_string())
            .spawn(move || {
                info!(period_us = self.period.as_micros() as u64, "simulated master started");
                let mut last = DeviceState::Idle;
                while running.load(Ordering::Relaxed) {
                    let reported = self.device_state();
                    if reported != last {
                        debug!(?last, ?reported, "device state changed");
                        last = reported;
                    }
                    match reported {
                        DeviceState::Error => self.set_command(DeviceState::Reset),
                        _ => self.set_command(DeviceState::Run),
                    }
                    self.step();
                    std::thread::sleep(self.period);
                }
                info!(cycles = self.cycles, "simulated master stopped");
                self.cycles
            })
    }
}
