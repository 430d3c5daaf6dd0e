//! Shared simulation state.
//!
//! One `SimState` behind a `parking_lot::Mutex`, paired with a `Condvar`
//! that wakes a board blocked in `wait_for_edge()`.

use heapless::Deque;
use medulla_common::consts::PDO_MAX_BYTES;
use medulla_common::hal::{AnalogChannel, EdgeEvent, EncoderChannel};
use medulla_common::kvh::ImuSample;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::imu::{ImuFault, SimImu};

/// Edges buffered before the oldest is overwritten (a missed edge).
pub(crate) const EDGE_QUEUE_DEPTH: usize = 4;

/// How simulated time advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMode {
    /// Time only moves when the master steps or the board waits.
    /// Fully deterministic, used by tests.
    Virtual,
    /// Time follows the wall clock; waits block on the condvar.
    WallClock,
}

#[derive(Debug)]
enum Clock {
    Virtual(Duration),
    Wall(Instant),
}

impl Clock {
    fn now(&self) -> Duration {
        match self {
            Self::Virtual(now) => *now,
            Self::Wall(start) => start.elapsed(),
        }
    }

    fn advance(&mut self, by: Duration) {
        if let Self::Virtual(now) = self {
            *now += by;
        }
    }
}

/// Mutable board state.
#[derive(Debug)]
pub(crate) struct SimState {
    clock: Clock,

    // ─── Cycle trigger ──────────────────────────────────────────────
    pub(crate) edges: Deque<EdgeEvent, EDGE_QUEUE_DEPTH>,
    pub(crate) edge_sequence: u64,
    pub(crate) last_edge_at: Duration,
    pub(crate) dropped_edges: u64,

    // ─── Local watchdog ─────────────────────────────────────────────
    pub(crate) watchdog_timeout: Duration,
    pub(crate) last_feed: Duration,
    pub(crate) feed_count: u64,
    pub(crate) watchdog_expired: bool,

    // ─── Stop line ──────────────────────────────────────────────────
    pub(crate) external_estop: bool,
    pub(crate) self_asserted: bool,

    // ─── Process data ───────────────────────────────────────────────
    pub(crate) rx: [u8; PDO_MAX_BYTES],
    pub(crate) tx: [u8; PDO_MAX_BYTES],
    pub(crate) tx_writes: u64,

    // ─── Sensors / actuators ────────────────────────────────────────
    pub(crate) encoders: [u32; EncoderChannel::COUNT],
    pub(crate) encoder_faults: [bool; EncoderChannel::COUNT],
    pub(crate) thermistors: [u16; 3],
    pub(crate) motor_voltage: u16,
    pub(crate) logic_voltage: u16,
    pub(crate) limit_switches: u8,
    pub(crate) amp_enabled: bool,
    pub(crate) motor_current: i32,
    pub(crate) amp_fault: bool,
    pub(crate) amp_reject: bool,
    pub(crate) imu: SimImu,
}

impl SimState {
    fn new(mode: TimeMode, watchdog_timeout: Duration) -> Self {
        let clock = match mode {
            TimeMode::Virtual => Clock::Virtual(Duration::ZERO),
            TimeMode::WallClock => Clock::Wall(Instant::now()),
        };
        Self {
            clock,
            edges: Deque::new(),
            edge_sequence: 0,
            last_edge_at: Duration::ZERO,
            dropped_edges: 0,
            watchdog_timeout,
            last_feed: Duration::ZERO,
            feed_count: 0,
            watchdog_expired: false,
            external_estop: false,
            self_asserted: false,
            rx: [0; PDO_MAX_BYTES],
            tx: [0; PDO_MAX_BYTES],
            tx_writes: 0,
            encoders: [1 << 24; EncoderChannel::COUNT],
            encoder_faults: [false; EncoderChannel::COUNT],
            thermistors: [1500; 3],
            motor_voltage: 2800,
            logic_voltage: 3000,
            limit_switches: 0,
            amp_enabled: false,
            motor_current: 0,
            amp_fault: false,
            amp_reject: false,
            imu: SimImu::default(),
        }
    }

    pub(crate) fn now(&self) -> Duration {
        self.clock.now()
    }

    pub(crate) fn is_virtual(&self) -> bool {
        matches!(self.clock, Clock::Virtual(_))
    }

    pub(crate) fn advance(&mut self, by: Duration) {
        self.clock.advance(by);
        self.latch_watchdog();
    }

    /// Latch expiry if the countdown ran out since the last feed.
    pub(crate) fn latch_watchdog(&mut self) -> bool {
        if !self.watchdog_expired && self.now().saturating_sub(self.last_feed) > self.watchdog_timeout
        {
            self.watchdog_expired = true;
            warn!(
                since_feed_us = self.now().saturating_sub(self.last_feed).as_micros() as u64,
                "simulated local watchdog expired"
            );
        }
        self.watchdog_expired
    }

    /// Record a new cycle trigger edge.
    pub(crate) fn push_edge(&mut self) -> EdgeEvent {
        self.edge_sequence += 1;
        let event = EdgeEvent {
            sequence: self.edge_sequence,
            timestamp: self.now(),
        };
        self.last_edge_at = event.timestamp;
        if self.edges.is_full() {
            self.edges.pop_front();
            self.dropped_edges += 1;
            debug!(sequence = event.sequence, "edge queue full, oldest edge lost");
        }
        let _ = self.edges.push_back(event);
        event
    }

    pub(crate) fn analog(&self, channel: AnalogChannel) -> Option<u16> {
        match channel {
            AnalogChannel::Thermistor(n) => self.thermistors.get(n as usize).copied(),
            AnalogChannel::MotorVoltage => Some(self.motor_voltage),
            AnalogChannel::LogicVoltage => Some(self.logic_voltage),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) state: Mutex<SimState>,
    pub(crate) edge_ready: Condvar,
}

/// Cloneable handle to the simulated board.
///
/// Used by tests and by the simulated master to observe and perturb the
/// hardware while the controller owns the `SimBoard`.
#[derive(Debug, Clone)]
pub struct SimHandle {
    pub(crate) shared: Arc<Shared>,
}

impl SimHandle {
    /// Create a fresh board state.
    pub fn new(mode: TimeMode, watchdog_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SimState::new(mode, watchdog_timeout)),
                edge_ready: Condvar::new(),
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SimState> {
        self.shared.state.lock()
    }

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        self.lock().now()
    }

    /// Advance virtual time without producing an edge. No-op on wall clock.
    pub fn advance(&self, by: Duration) {
        self.lock().advance(by);
    }

    // ─── Stop line ──────────────────────────────────────────────────

    /// Drive the stop line from outside this device (another node or the
    /// operator button).
    pub fn set_external_estop(&self, asserted: bool) {
        self.lock().external_estop = asserted;
    }

    /// Whether this device itself drives the stop line.
    pub fn self_asserted(&self) -> bool {
        self.lock().self_asserted
    }

    // ─── Watchdog ───────────────────────────────────────────────────

    /// Number of watchdog feeds so far.
    pub fn feed_count(&self) -> u64 {
        self.lock().feed_count
    }

    /// Whether the local watchdog has fired.
    pub fn watchdog_expired(&self) -> bool {
        self.lock().latch_watchdog()
    }

    // ─── Sensors ────────────────────────────────────────────────────

    /// Set an encoder reading.
    pub fn set_encoder(&self, channel: EncoderChannel, counts: u32) {
        self.lock().encoders[channel.index()] = counts;
    }

    /// Make reads of `channel` fail.
    pub fn set_encoder_fault(&self, channel: EncoderChannel, failing: bool) {
        self.lock().encoder_faults[channel.index()] = failing;
    }

    /// Set a thermistor reading.
    pub fn set_thermistor(&self, index: usize, counts: u16) {
        if let Some(slot) = self.lock().thermistors.get_mut(index) {
            *slot = counts;
        }
    }

    /// Set the motor supply reading.
    pub fn set_motor_voltage(&self, counts: u16) {
        self.lock().motor_voltage = counts;
    }

    /// Set the logic supply reading.
    pub fn set_logic_voltage(&self, counts: u16) {
        self.lock().logic_voltage = counts;
    }

    /// Set the raw limit-switch bank.
    pub fn set_limit_switches(&self, bits: u8) {
        self.lock().limit_switches = bits;
    }

    // ─── Amplifier ──────────────────────────────────────────────────

    /// Whether the amplifier is enabled.
    pub fn amplifier_enabled(&self) -> bool {
        self.lock().amp_enabled
    }

    /// Last commanded motor current.
    pub fn motor_current(&self) -> i32 {
        self.lock().motor_current
    }

    /// Latch an amplifier fault.
    pub fn set_amplifier_fault(&self, fault: bool) {
        self.lock().amp_fault = fault;
    }

    /// Make the amplifier reject current commands.
    pub fn set_amplifier_reject(&self, reject: bool) {
        self.lock().amp_reject = reject;
    }

    // ─── IMU ────────────────────────────────────────────────────────

    /// Set the sample the IMU reports on the next sync pulses.
    pub fn set_imu_sample(&self, sample: ImuSample) {
        self.lock().imu.sample = sample;
    }

    /// Perturb the next IMU frame.
    pub fn inject_imu_fault(&self, fault: ImuFault) {
        self.lock().imu.pending_fault = fault;
    }

    // ─── Process data ───────────────────────────────────────────────

    /// Copy of the outbound record as last published by the device.
    pub fn tx_snapshot(&self) -> [u8; PDO_MAX_BYTES] {
        self.lock().tx
    }

    /// Number of times the device published outbound data.
    pub fn tx_writes(&self) -> u64 {
        self.lock().tx_writes
    }

    /// Edges overwritten before the board consumed them.
    pub fn dropped_edges(&self) -> u64 {
        self.lock().dropped_edges
    }
}
