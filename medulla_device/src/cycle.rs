//! Cyclic Synchronization Driver.
//!
//! Blocks on the board's cycle trigger and runs exactly one synchronized
//! cycle per observed edge:
//!
//! 1. `update_inputs` (timestamp origin is the edge)
//! 2. outbound header + publish
//! 3. ingest inbound record
//! 4. device cycle counter + 1
//! 5. `post_sync`
//! 6. feed local watchdog
//! 7. stop-line sample into the debounce
//! 8. one state-machine tick
//!
//! Between edges only housekeeping runs: the Idle feed policy and the
//! local watchdog expiry check. Expiry is fatal.
//!
//! ## RT Setup
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity` to the configured core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use medulla_common::config::NodeConfig;
use medulla_common::hal::{Board, EdgeEvent};
use medulla_common::identity::DeviceId;
use medulla_common::state::DeviceState;
use tracing::{debug, error, info, trace, warn};

use crate::device::{self, DeviceType, SyncContext};
use crate::error::{CycleError, DeviceError};
use crate::pdo::ProcessData;
use crate::safety::watchdog::should_feed;
use crate::state::{DeviceStateMachine, Transition};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Synchronized cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Cycles that ran past the budget.
    pub overruns: u64,
    /// Maximum edge-to-sampling latency [ns].
    pub max_latency_ns: i64,
    /// Edges lost between two observed edges.
    pub missed_edges: u64,
    /// Polls that timed out without an edge.
    pub idle_polls: u64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    /// Zeroed statistics.
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
            missed_edges: 0,
            idle_polls: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        if duration_ns < self.min_cycle_ns {
            self.min_cycle_ns = duration_ns;
        }
        if duration_ns > self.max_cycle_ns {
            self.max_cycle_ns = duration_ns;
        }
        self.sum_cycle_ns += duration_ns;
        if latency_ns > self.max_latency_ns {
            self.max_latency_ns = latency_ns;
        }
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
///
/// No-op when the `rt` feature is not enabled.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the cycle never takes a page fault on it.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xA5) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Full RT setup sequence. All system calls are no-ops without `rt`.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    debug!(cpu_core, rt_priority, rt = cfg!(feature = "rt"), "RT setup complete");
    Ok(())
}

// ─── Cycle Driver ───────────────────────────────────────────────────

/// Result of one pass of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// An edge was observed and a synchronized cycle ran.
    Synced(Transition),
    /// No edge before the poll timeout.
    Idle,
}

/// Owns the board, the device strategy, process data and the state machine.
pub struct CycleDriver<B: Board> {
    board: B,
    device: Box<dyn DeviceType>,
    pdo: ProcessData,
    machine: DeviceStateMachine,
    id: DeviceId,
    counter: u8,
    stats: CycleStats,
    cycle_budget: Duration,
    idle_poll: Duration,
    last_sequence: Option<u64>,
}

impl<B: Board> CycleDriver<B> {
    /// Select and initialize the device strategy, then publish an Idle
    /// header so the master sees the node before the first edge.
    pub fn new(mut board: B, config: &NodeConfig) -> Result<Self, CycleError> {
        let id = config.device.id;
        let mut device = device::create(id, &config.limits)?;
        let mut pdo = ProcessData::new(device.layout()).map_err(DeviceError::from)?;
        device.initialize(&mut board, &mut pdo)?;

        pdo.write_header(id, DeviceState::Idle, 0, device.error_flags());
        pdo.publish(&mut board);

        let layout = *pdo.layout();
        info!(
            %id,
            layout = layout.name,
            rx_bytes = layout.rx_size,
            tx_bytes = layout.tx_size,
            cycle_us = config.device.cycle_time_us,
            "device controller initialized"
        );

        Ok(Self {
            board,
            device,
            pdo,
            machine: DeviceStateMachine::new(&config.safety),
            id,
            counter: 0,
            stats: CycleStats::new(),
            cycle_budget: Duration::from_micros(u64::from(config.device.cycle_time_us)),
            idle_poll: Duration::from_micros(u64::from(config.device.idle_poll_us)),
            last_sequence: None,
        })
    }

    // ─── Accessors ──────────────────────────────────────────────────

    /// Current device state.
    #[inline]
    pub fn state(&self) -> DeviceState {
        self.machine.state()
    }

    /// State machine and safety counters.
    #[inline]
    pub fn machine(&self) -> &DeviceStateMachine {
        &self.machine
    }

    /// Timing statistics.
    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Process-data records.
    #[inline]
    pub fn pdo(&self) -> &ProcessData {
        &self.pdo
    }

    /// The device strategy.
    #[inline]
    pub fn device(&self) -> &dyn DeviceType {
        self.device.as_ref()
    }

    /// The board.
    #[inline]
    pub fn board(&self) -> &B {
        &self.board
    }

    /// Device cycle counter as last published.
    #[inline]
    pub fn counter(&self) -> u8 {
        self.counter
    }

    // ─── Loop ───────────────────────────────────────────────────────

    /// One pass of the loop: expiry check, then wait for an edge.
    pub fn poll_once(&mut self) -> Result<CycleOutcome, CycleError> {
        if self.board.expired() {
            return Err(self.watchdog_expired());
        }

        match self.board.wait_for_edge(self.idle_poll) {
            Some(edge) => Ok(CycleOutcome::Synced(self.sync_cycle(edge))),
            None => {
                self.stats.idle_polls += 1;
                if should_feed(false, self.machine.state()) {
                    self.board.feed();
                }
                Ok(CycleOutcome::Idle)
            }
        }
    }

    /// Run until `running` clears, or until `max_cycles` synchronized
    /// cycles have completed.
    pub fn run(&mut self, running: &AtomicBool, max_cycles: Option<u64>) -> Result<(), CycleError> {
        info!(
            budget_us = self.cycle_budget.as_micros() as u64,
            idle_poll_us = self.idle_poll.as_micros() as u64,
            "entering cycle loop"
        );

        while running.load(Ordering::Relaxed) {
            if max_cycles.is_some_and(|n| self.stats.cycle_count >= n) {
                break;
            }
            self.poll_once()?;
        }

        info!(
            cycles = self.stats.cycle_count,
            avg_ns = self.stats.avg_cycle_ns(),
            max_ns = self.stats.max_cycle_ns,
            overruns = self.stats.overruns,
            missed_edges = self.stats.missed_edges,
            state = ?self.machine.state(),
            "cycle loop stopped"
        );
        Ok(())
    }

    /// One synchronized cycle for `edge`.
    pub fn sync_cycle(&mut self, edge: EdgeEvent) -> Transition {
        let started = Instant::now();
        self.account_edge(edge);

        let since_edge = self.board.since_edge();
        let sync = SyncContext {
            edge,
            since_edge,
            cycle: self.stats.cycle_count,
        };

        self.device.update_inputs(&mut self.board, &sync, &mut self.pdo);
        self.pdo.write_header(
            self.id,
            self.machine.state(),
            self.counter,
            self.device.error_flags(),
        );
        self.pdo.publish(&mut self.board);
        self.pdo.ingest(&mut self.board);
        self.counter = self.counter.wrapping_add(1);
        self.device.post_sync(&mut self.board, &mut self.pdo);

        if should_feed(true, self.machine.state()) {
            self.board.feed();
        }
        let asserted = self.board.is_estopped();
        self.machine.supervisor_mut().sample_stop_line(asserted);

        let transition = self
            .machine
            .tick(&self.pdo, self.device.as_mut(), &mut self.board);

        let elapsed = started.elapsed();
        self.stats
            .record(elapsed.as_nanos() as i64, since_edge.as_nanos() as i64);
        if elapsed > self.cycle_budget {
            self.stats.overruns += 1;
            warn!(
                elapsed_us = elapsed.as_micros() as u64,
                budget_us = self.cycle_budget.as_micros() as u64,
                "cycle overran its budget"
            );
        }
        trace!(
            seq = edge.sequence,
            counter = self.counter,
            state = ?transition.to,
            "cycle complete"
        );
        transition
    }

    fn account_edge(&mut self, edge: EdgeEvent) {
        if let Some(previous) = self.last_sequence {
            let missed = edge.sequence.saturating_sub(previous).saturating_sub(1);
            if missed > 0 {
                self.stats.missed_edges += missed;
                warn!(missed, seq = edge.sequence, "edges missed");
            }
        }
        self.last_sequence = Some(edge.sequence);
    }

    /// Fatal path: stop outputs, assert the stop line, report.
    fn watchdog_expired(&mut self) -> CycleError {
        self.device.estop(&mut self.board);
        self.board.assert_stop();
        let state = self.machine.state();
        let cycles = self.stats.cycle_count;
        error!(?state, cycles, "local watchdog expired, outputs stopped");
        CycleError::WatchdogExpired { state, cycles }
    }
}
