//! Hysteresis debounce counter.
//!
//! +1 per asserted sample, -1 (floor 0) per clear sample. Level-triggered:
//! tripped while `count > limit`. A line that was asserted for N cycles
//! has to read clear for `N - limit` cycles before the fault goes away.

/// Saturating up/down debounce counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debounce {
    count: u32,
    limit: u32,
}

impl Debounce {
    /// Create with a trip limit.
    pub const fn new(limit: u32) -> Self {
        Self { count: 0, limit }
    }

    /// Feed one sample, returning the tripped level afterwards.
    #[inline]
    pub fn sample(&mut self, asserted: bool) -> bool {
        self.count = if asserted {
            self.count.saturating_add(1)
        } else {
            self.count.saturating_sub(1)
        };
        self.tripped()
    }

    /// Whether the count is over the limit.
    #[inline]
    pub const fn tripped(&self) -> bool {
        self.count > self.limit
    }

    /// Current count.
    #[inline]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Trip limit.
    #[inline]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Zero the count.
    #[inline]
    pub fn reset(&mut self) {
        self.count = 0;
    }
}
