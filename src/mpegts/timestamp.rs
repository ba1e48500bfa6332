use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PtsDts;
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Clock<T>(PhantomData<T>);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PCR;

/// Timestamp value, parameterized by its clock domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp<T>(pub(crate) u64, pub(crate) PhantomData<T>);

impl Timestamp<PtsDts> {
    /// 90 kHz.
    pub const RESOLUTION: u64 = 90_000;

    /// Maximum timestamp value (33 bits).
    pub const MAX: u64 = (1 << 33) - 1;

    /// Makes a new `Timestamp` instance, masked to 33 bits.
    pub const fn new(n: u64) -> Self {
        Timestamp(n & Self::MAX, PhantomData)
    }

    /// Returns the value of the timestamp in 90 kHz ticks.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the timestamp in seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / Self::RESOLUTION as f64
    }

    /// Reassembles a 33-bit tick count from the 5-byte PTS/DTS wire field:
    /// a 4-bit prefix, then 3 + 15 + 15 value bits with marker bits
    /// interleaved. Marker bits are not enforced; damaged fields still
    /// yield a value and damage shows up downstream as interval noise.
    pub(crate) fn from_encoded(n: u64) -> Self {
        let n0 = (n >> 33) & ((1 << 3) - 1);
        let n1 = (n >> 17) & ((1 << 15) - 1);
        let n2 = (n >> 1) & ((1 << 15) - 1);

        Timestamp((n0 << 30) | (n1 << 15) | n2, PhantomData)
    }
}

impl<T> Timestamp<Clock<T>> {
    /// 27 MHz.
    pub const RESOLUTION: u64 = 27_000_000;

    /// Maximum clock value: 33-bit base at 90 kHz plus 9-bit extension.
    pub const MAX: u64 = ((1 << 33) - 1) * 300 + 0b1_1111_1111;

    /// Returns the value of the clock reference in 27 MHz ticks.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the clock reference in seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / Self::RESOLUTION as f64
    }

    /// Decodes the 48-bit PCR wire field: base(33) | reserved(6) | ext(9),
    /// combined as `base * 300 + ext` ticks of the 27 MHz clock.
    pub(crate) fn from_base_ext(n: u64) -> Self {
        let base = n >> 15;
        let extension = n & 0b1_1111_1111;

        Timestamp(base * 300 + extension, PhantomData)
    }
}

impl<T> From<Timestamp<PtsDts>> for Timestamp<Clock<T>> {
    fn from(f: Timestamp<PtsDts>) -> Self {
        Timestamp(f.0 * 300, PhantomData)
    }
}
