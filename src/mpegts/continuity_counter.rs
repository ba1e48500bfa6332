/// Continuity counter.
///
/// A 4-bit per-PID sequence number incremented on every payload-bearing
/// packet, used to detect packet loss and reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContinuityCounter(u8);

impl ContinuityCounter {
    /// Maximum counter value.
    pub const MAX: u8 = (1 << 4) - 1;

    /// Makes a new `ContinuityCounter` instance with the given value,
    /// masked to 4 bits.
    pub const fn from_u8(n: u8) -> Self {
        ContinuityCounter(n & Self::MAX)
    }

    /// Returns the value of the counter.
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Returns `true` when `self` is `prev` incremented by one, modulo 16.
    ///
    /// ```
    /// use mpegts_analyzer::ContinuityCounter;
    ///
    /// let prev = ContinuityCounter::from_u8(15);
    /// assert!(ContinuityCounter::from_u8(0).follows(prev));
    /// assert!(!ContinuityCounter::from_u8(1).follows(prev));
    /// ```
    pub const fn follows(&self, prev: ContinuityCounter) -> bool {
        (prev.0 + 1) & Self::MAX == self.0
    }
}

impl Default for ContinuityCounter {
    fn default() -> Self {
        ContinuityCounter(0)
    }
}
