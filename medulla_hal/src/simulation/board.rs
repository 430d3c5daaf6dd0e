//! Simulated board implementing every hardware capability.

use medulla_common::hal::{
    AnalogChannel, EdgeEvent, EncoderChannel, FieldbusPort, HalError, LocalWatchdog, SensorIo,
    StopLine, SyncTrigger,
};
use std::time::{Duration, Instant};
use tracing::trace;

use super::state::SimHandle;

/// Software board owned by the device controller.
#[derive(Debug)]
pub struct SimBoard {
    handle: SimHandle,
}

impl SimBoard {
    /// Create a board on top of shared simulation state.
    pub fn new(handle: SimHandle) -> Self {
        Self { handle }
    }

    /// A handle to the same simulation state.
    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }
}

impl SyncTrigger for SimBoard {
    fn wait_for_edge(&mut self, timeout: Duration) -> Option<EdgeEvent> {
        let shared = &self.handle.shared;
        let mut state = shared.state.lock();

        if let Some(edge) = state.edges.pop_front() {
            return Some(edge);
        }

        if state.is_virtual() {
            // Nobody else moves virtual time; the wait itself passes it.
            state.advance(timeout);
            return state.edges.pop_front();
        }

        let deadline = Instant::now() + timeout;
        loop {
            if shared.edge_ready.wait_until(&mut state, deadline).timed_out() {
                return state.edges.pop_front();
            }
            if let Some(edge) = state.edges.pop_front() {
                return Some(edge);
            }
        }
    }

    fn since_edge(&self) -> Duration {
        let state = self.handle.lock();
        state.now().saturating_sub(state.last_edge_at)
    }
}

impl LocalWatchdog for SimBoard {
    fn feed(&mut self) {
        let mut state = self.handle.lock();
        // Expiry that already happened stays latched.
        state.latch_watchdog();
        state.last_feed = state.now();
        state.feed_count += 1;
    }

    fn expired(&self) -> bool {
        self.handle.lock().latch_watchdog()
    }
}

impl StopLine for SimBoard {
    fn is_estopped(&self) -> bool {
        let state = self.handle.lock();
        state.external_estop || state.self_asserted
    }

    fn assert_stop(&mut self) {
        self.handle.lock().self_asserted = true;
    }

    fn deassert_stop(&mut self) {
        self.handle.lock().self_asserted = false;
    }
}

impl FieldbusPort for SimBoard {
    fn write_tx(&mut self, data: &[u8]) {
        let mut state = self.handle.lock();
        let n = data.len().min(state.tx.len());
        state.tx[..n].copy_from_slice(&data[..n]);
        state.tx_writes += 1;
    }

    fn read_rx(&mut self, buf: &mut [u8]) {
        let state = self.handle.lock();
        let n = buf.len().min(state.rx.len());
        buf[..n].copy_from_slice(&state.rx[..n]);
    }
}

impl SensorIo for SimBoard {
    fn read_encoder(&mut self, channel: EncoderChannel) -> Result<u32, HalError> {
        let state = self.handle.lock();
        if state.encoder_faults[channel.index()] {
            return Err(HalError::SensorFault(format!("{channel:?} encoder timeout")));
        }
        Ok(state.encoders[channel.index()])
    }

    fn read_analog(&mut self, channel: AnalogChannel) -> Result<u16, HalError> {
        self.handle
            .lock()
            .analog(channel)
            .ok_or_else(|| HalError::SensorFault(format!("no analog channel {channel:?}")))
    }

    fn limit_switches(&mut self) -> Result<u8, HalError> {
        Ok(self.handle.lock().limit_switches)
    }

    fn set_amplifier_enabled(&mut self, enabled: bool) -> Result<(), HalError> {
        let mut state = self.handle.lock();
        state.amp_enabled = enabled;
        if !enabled {
            state.motor_current = 0;
        }
        trace!(enabled, "amplifier");
        Ok(())
    }

    fn set_motor_current(&mut self, current: i32) -> Result<(), HalError> {
        let mut state = self.handle.lock();
        if state.amp_reject {
            return Err(HalError::ActuatorFault("current command rejected".to_string()));
        }
        state.motor_current = if state.amp_enabled { current } else { 0 };
        Ok(())
    }

    fn amplifier_fault(&mut self) -> Result<bool, HalError> {
        Ok(self.handle.lock().amp_fault)
    }

    fn trigger_imu_sync(&mut self) -> Result<(), HalError> {
        self.handle.lock().imu.sync_pulse();
        Ok(())
    }

    fn read_imu_frame(&mut self, buf: &mut [u8]) -> Result<usize, HalError> {
        Ok(self.handle.lock().imu.drain(buf))
    }
}
