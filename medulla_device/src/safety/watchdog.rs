//! Master liveness watchdog and local watchdog feed policy.

use medulla_common::state::DeviceState;

/// Counts consecutive cycles where the master counter did not advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterWatchdog {
    errors: u32,
    previous: u16,
    limit: u32,
}

impl MasterWatchdog {
    /// Create with a stall threshold [cycles].
    pub const fn new(limit: u32) -> Self {
        Self {
            errors: 0,
            previous: 0,
            limit,
        }
    }

    /// Observe this cycle's counter. Returns true when `errors >= limit`.
    ///
    /// Any change counts as progress, including wrap-around.
    #[inline]
    pub fn observe(&mut self, counter: u16) -> bool {
        if counter == self.previous {
            self.errors = self.errors.saturating_add(1);
        } else {
            self.errors = 0;
        }
        self.previous = counter;
        self.errors >= self.limit
    }

    /// Zero the stall count and take `counter` as the reference.
    #[inline]
    pub fn rearm(&mut self, counter: u16) {
        self.errors = 0;
        self.previous = counter;
    }

    /// Zero the stall count.
    #[inline]
    pub fn clear(&mut self) {
        self.errors = 0;
    }

    /// Consecutive stalled cycles.
    #[inline]
    pub const fn errors(&self) -> u32 {
        self.errors
    }
}

/// Whether the local watchdog is fed this pass of the loop.
///
/// Always on an observed edge; without an edge only while Idle, so a
/// device with live outputs that loses the fieldbus clock times out.
#[inline]
pub const fn should_feed(edge_seen: bool, state: DeviceState) -> bool {
    edge_seen || matches!(state, DeviceState::Idle)
}
