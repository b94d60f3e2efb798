//! Lock-free export progress.

use std::sync::atomic::{AtomicU64, Ordering};

/// Fraction of the export completed, in `[0.0, 1.0]`.
///
/// Stored as the bit pattern of an `f64`. For non-negative floats the bit
/// patterns order the same way as the values, so `fetch_max` keeps the
/// reading monotonic without a lock.
#[derive(Debug, Default)]
pub struct ProgressMeter {
    bits: AtomicU64,
}

impl ProgressMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current reading.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Record that `elapsed_secs` of `duration_secs` have been processed.
    /// A zero-length export counts as complete.
    pub fn observe(&self, elapsed_secs: f64, duration_secs: f64) {
        let fraction = if duration_secs <= 0.0 {
            1.0
        } else {
            elapsed_secs / duration_secs
        };
        self.advance(fraction);
    }

    /// Raise the reading to `fraction`; lower values are ignored.
    pub fn advance(&self, fraction: f64) {
        if !fraction.is_finite() {
            return;
        }
        let clamped = fraction.clamp(0.0, 1.0);
        self.bits.fetch_max(clamped.to_bits(), Ordering::AcqRel);
    }

    pub fn complete(&self) {
        self.advance(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_never_decreases() {
        let meter = ProgressMeter::new();
        meter.observe(5.0, 10.0);
        meter.observe(2.0, 10.0);
        assert!((meter.get() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_duration_is_complete() {
        let meter = ProgressMeter::new();
        meter.observe(0.0, 0.0);
        assert_eq!(meter.get(), 1.0);
    }

    #[test]
    fn test_clamps_and_ignores_nan() {
        let meter = ProgressMeter::new();
        meter.observe(-1.0, 10.0);
        assert_eq!(meter.get(), 0.0);
        meter.advance(f64::NAN);
        assert_eq!(meter.get(), 0.0);
        meter.observe(12.0, 10.0);
        assert_eq!(meter.get(), 1.0);
    }
}
