//! Safety Supervisor.
//!
//! Owns the counters sampled every synchronized cycle regardless of state:
//! the stop-line debounce, the master-liveness watchdog and the Error dwell
//! counter gating Reset. The local hardware watchdog itself lives on the
//! board; [`watchdog::should_feed`] decides when it is fed.

pub mod debounce;
pub mod watchdog;

use medulla_common::config::SafetyConfig;
use medulla_common::consts::MASTER_WATCHDOG_LIMIT;
use tracing::warn;

use self::debounce::Debounce;
use self::watchdog::MasterWatchdog;

/// Stop-line debounce, master liveness and Error dwell.
#[derive(Debug, Clone)]
pub struct SafetySupervisor {
    estop: Debounce,
    master: MasterWatchdog,
    estop_timeout: u32,
    min_dwell: u32,
}

impl SafetySupervisor {
    /// Create from configuration. The master-watchdog threshold is fixed.
    pub fn new(config: &SafetyConfig) -> Self {
        Self {
            estop: Debounce::new(config.estop_debounce_limit),
            master: MasterWatchdog::new(MASTER_WATCHDOG_LIMIT),
            estop_timeout: 0,
            min_dwell: config.estop_timeout_length,
        }
    }

    // ─── Stop line ──────────────────────────────────────────────────

    /// Feed one stop-line sample into the debounce counter.
    pub fn sample_stop_line(&mut self, asserted: bool) {
        let was = self.estop.tripped();
        let now = self.estop.sample(asserted);
        if now && !was {
            warn!(count = self.estop.count(), "stop line debounce tripped");
        }
    }

    /// Whether the debounced stop line is over its limit.
    #[inline]
    pub fn estop_tripped(&self) -> bool {
        self.estop.tripped()
    }

    /// Current debounce count.
    #[inline]
    pub fn estop_debounce(&self) -> u32 {
        self.estop.count()
    }

    // ─── Master liveness ────────────────────────────────────────────

    /// Compare the master counter with the previous cycle.
    /// Returns true once the counter stalled for the full threshold.
    pub fn observe_master(&mut self, counter: u16) -> bool {
        let tripped = self.master.observe(counter);
        if tripped {
            warn!(
                errors = self.master.errors(),
                counter, "master watchdog tripped"
            );
        }
        tripped
    }

    /// Clear the stall count and take `counter` as the reference value.
    pub fn rearm_master(&mut self, counter: u16) {
        self.master.rearm(counter);
    }

    /// Consecutive stalled cycles.
    #[inline]
    pub fn master_errors(&self) -> u32 {
        self.master.errors()
    }

    // ─── Error dwell ────────────────────────────────────────────────

    /// Restart the dwell count on entry to Error.
    #[inline]
    pub fn restart_dwell(&mut self) {
        self.estop_timeout = 0;
    }

    /// Count one cycle spent in Error.
    #[inline]
    pub fn tick_dwell(&mut self) {
        self.estop_timeout = self.estop_timeout.saturating_add(1);
    }

    /// Whether a Reset command may be honored.
    #[inline]
    pub fn dwell_elapsed(&self) -> bool {
        self.estop_timeout > self.min_dwell
    }

    /// Cycles spent in Error so far.
    #[inline]
    pub fn estop_timeout(&self) -> u32 {
        self.estop_timeout
    }

    // ─── Reset ──────────────────────────────────────────────────────

    /// Zero the master stall count and the stop-line debounce.
    pub fn clear(&mut self) {
        self.master.clear();
        self.estop.reset();
    }
}
