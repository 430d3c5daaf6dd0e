//! Safety-gated device state machine.
//!
//! One `tick()` per synchronized cycle. Stages are evaluated in the fixed
//! order Idle, Init, Run, Stop, Halt, Reset, Error; each runs when the
//! state equals it at that point, so a transition into a later stage is
//! handled within the same tick:
//!
//! ```text
//!  Idle ──Run cmd──▶ Init ──ok──▶ Run ──Stop/Idle──▶ Stop ──▶ Idle
//!                     │            │  └──Halt/check_halt──▶ Halt
//!                     │ fault      │ fault                   │ fault / halt failed
//!                     ▼            ▼                         ▼
//!                   Error ◀────────┴─────────────────────────┘
//!                     │ Reset cmd after dwell
//!                     ▼
//!                   Reset ──▶ Idle
//! ```
//!
//! Every entry into Error restarts the dwell counter; the entry tick itself
//! does not count toward the dwell.

use heapless::Deque;
use medulla_common::config::SafetyConfig;
use medulla_common::hal::{SensorIo, StopLine};
use medulla_common::state::DeviceState;
use tracing::info;

use crate::device::DeviceType;
use crate::pdo::ProcessData;
use crate::safety::SafetySupervisor;

/// Transitions kept for diagnostics.
pub const HISTORY_DEPTH: usize = 32;

/// Why a transition was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    /// Master command.
    Commanded,
    /// Pre-run checks passed.
    InitComplete,
    /// Stop line asserted or debounced over its limit.
    StopLine,
    /// Master counter stalled.
    MasterWatchdog,
    /// Device reported a hardware fault.
    HardwareFault,
    /// Device asked for the halt controller.
    HaltRequested,
    /// Halt controller failed.
    HaltFailed,
    /// One-shot state finished.
    Completed,
    /// State restored from a raw value.
    Restored,
}

/// One recorded transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Tick number at which the transition happened.
    pub tick: u64,
    pub from: DeviceState,
    pub to: DeviceState,
    pub reason: TransitionReason,
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State before the tick.
    pub from: DeviceState,
    /// State after the tick.
    pub to: DeviceState,
}

impl Transition {
    /// Whether the tick changed state.
    #[inline]
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Current state, safety counters and transition history.
#[derive(Debug, Clone)]
pub struct DeviceStateMachine {
    state: DeviceState,
    supervisor: SafetySupervisor,
    history: Deque<TransitionRecord, HISTORY_DEPTH>,
    ticks: u64,
    error_entered: bool,
}

impl DeviceStateMachine {
    /// Start in Idle.
    pub fn new(config: &SafetyConfig) -> Self {
        Self {
            state: DeviceState::Idle,
            supervisor: SafetySupervisor::new(config),
            history: Deque::new(),
            ticks: 0,
            error_entered: false,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Safety counters.
    #[inline]
    pub fn supervisor(&self) -> &SafetySupervisor {
        &self.supervisor
    }

    /// Safety counters, for per-cycle sampling by the driver.
    #[inline]
    pub fn supervisor_mut(&mut self) -> &mut SafetySupervisor {
        &mut self.supervisor
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.history.iter()
    }

    /// Ticks run so far.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Force the state from a raw value. Unknown values become Error.
    pub fn restore(&mut self, raw: u8) {
        match DeviceState::from_raw(raw) {
            DeviceState::Error => self.enter_error(TransitionReason::Restored),
            state => self.enter(state, TransitionReason::Restored),
        }
    }

    fn enter(&mut self, to: DeviceState, reason: TransitionReason) {
        let from = self.state;
        if from == to {
            return;
        }
        if self.history.is_full() {
            self.history.pop_front();
        }
        let _ = self.history.push_back(TransitionRecord {
            tick: self.ticks,
            from,
            to,
            reason,
        });
        info!(?from, ?to, ?reason, "state transition");
        self.state = to;
    }

    fn enter_error(&mut self, reason: TransitionReason) {
        self.enter(DeviceState::Error, reason);
        self.supervisor.restart_dwell();
        self.error_entered = true;
    }

    /// Run one tick against the latest inbound record.
    ///
    /// The stop-line debounce must already hold this cycle's sample.
    pub fn tick<B: StopLine + SensorIo>(
        &mut self,
        pdo: &ProcessData,
        device: &mut dyn DeviceType,
        board: &mut B,
    ) -> Transition {
        use DeviceState::*;

        let from = self.state;
        let command = pdo.command();
        self.ticks += 1;
        self.error_entered = false;

        'tick: {
            // ─── Idle ───────────────────────────────────────────────
            if self.state == Idle {
                board.deassert_stop();
                if command != Some(Run) {
                    break 'tick;
                }
                self.enter(Init, TransitionReason::Commanded);
            }

            // ─── Init ───────────────────────────────────────────────
            if self.state == Init {
                device.reset_error();
                self.supervisor.rearm_master(pdo.master_counter());
                if board.is_estopped() {
                    self.enter_error(TransitionReason::StopLine);
                } else if device.check_error() {
                    self.enter_error(TransitionReason::HardwareFault);
                } else if device.check_halt() {
                    self.enter_error(TransitionReason::HaltRequested);
                } else {
                    device.enable_outputs(board);
                    self.enter(Run, TransitionReason::InitComplete);
                    break 'tick;
                }
            }

            // ─── Run ────────────────────────────────────────────────
            if self.state == Run {
                let mut next = (Run, TransitionReason::Commanded);
                match command {
                    Some(Stop | Idle) => next.0 = Stop,
                    Some(Halt) => next.0 = Halt,
                    Some(Error) => next.0 = Error,
                    _ => {}
                }

                if self.supervisor.observe_master(pdo.master_counter()) {
                    next = (Error, TransitionReason::MasterWatchdog);
                }
                if next.0 != Error && device.check_halt() {
                    next = (Halt, TransitionReason::HaltRequested);
                }
                if self.supervisor.estop_tripped() {
                    next = (Error, TransitionReason::StopLine);
                }
                if device.check_error() {
                    device.disable_outputs(board);
                    next = (Error, TransitionReason::HardwareFault);
                }

                match next {
                    (Run, _) => {
                        device.update_outputs(board, pdo);
                        break 'tick;
                    }
                    (Error, reason) => self.enter_error(reason),
                    (state, reason) => self.enter(state, reason),
                }
            }

            // ─── Stop ───────────────────────────────────────────────
            if self.state == Stop {
                device.disable_outputs(board);
                self.enter(Idle, TransitionReason::Completed);
                break 'tick;
            }

            // ─── Halt ───────────────────────────────────────────────
            if self.state == Halt {
                if self.supervisor.estop_tripped() {
                    self.enter_error(TransitionReason::StopLine);
                }
                if device.check_error() {
                    device.disable_outputs(board);
                    self.enter_error(TransitionReason::HardwareFault);
                }
                if self.state == Halt {
                    if !device.run_halt(board) {
                        device.disable_outputs(board);
                        self.enter_error(TransitionReason::HaltFailed);
                    }
                    break 'tick;
                }
            }

            // ─── Reset ──────────────────────────────────────────────
            if self.state == Reset {
                board.deassert_stop();
                device.reset_error();
                self.supervisor.clear();
                self.enter(Idle, TransitionReason::Completed);
                break 'tick;
            }

            // ─── Error ──────────────────────────────────────────────
            device.estop(board);
            board.assert_stop();
            if !self.error_entered {
                self.supervisor.tick_dwell();
            }
            if command == Some(Reset) && self.supervisor.dwell_elapsed() {
                self.enter(Reset, TransitionReason::Commanded);
            }
        }

        Transition {
            from,
            to: self.state,
        }
    }
}
