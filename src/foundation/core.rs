use std::ops::{Add, Sub};

pub use kurbo::{Point, Vec2};

/// Monotonic session time in seconds.
///
/// The engine never reads a wall clock. Hosts pass the current `Time` into every `advance` call,
/// usually derived from their animation-frame timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Time(pub f64);

impl Time {
    /// Session start.
    pub const ZERO: Time = Time(0.0);

    /// Build a time from seconds since session start.
    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// Build a time from milliseconds since session start.
    pub fn from_millis(ms: f64) -> Self {
        Self(ms / 1000.0)
    }

    /// Seconds since session start.
    pub fn secs(self) -> f64 {
        self.0
    }

    /// Seconds elapsed since `earlier`, never negative.
    pub fn since(self, earlier: Time) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }

    /// Return the later of two times.
    pub fn max(self, other: Time) -> Time {
        if other.0 > self.0 { other } else { self }
    }
}

impl Add<f64> for Time {
    type Output = Time;

    fn add(self, secs: f64) -> Time {
        Time(self.0 + secs)
    }
}

impl Sub<f64> for Time {
    type Output = Time;

    fn sub(self, secs: f64) -> Time {
        Time(self.0 - secs)
    }
}

/// Return `true` when `v` is a finite, non-negative duration in seconds.
pub fn is_valid_duration(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

/// Return `true` when `v` is a finite volume or opacity in `[0, 1]`.
pub fn is_unit_interval(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

/// Deterministic SplitMix64 generator used for particle spawning.
#[derive(Clone, Copy, Debug)]
pub struct Rng64 {
    state: u64,
}

impl Rng64 {
    /// Create a generator from a seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        // SplitMix64
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_f64_01(&mut self) -> f64 {
        // 53 bits of precision.
        let v = self.next_u64() >> 11;
        (v as f64) * (1.0 / ((1u64 << 53) as f64))
    }

    /// Uniform value in `[lo, hi)`.
    pub fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64_01()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
