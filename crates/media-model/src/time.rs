//! Rational media time.
//!
//! Timestamps are kept as `value / timescale` seconds so that sample
//! times coming from a container survive arithmetic without drift.
//! Comparison is exact: `1/2` and `2/4` are equal.

use std::cmp::Ordering;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Timescale used when converting from floating-point seconds.
pub const DEFAULT_TIMESCALE: i32 = 600;

/// A rational timestamp or duration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MediaTime {
    /// Numerator, in units of `1 / timescale` seconds.
    pub value: i64,
    /// Units per second. Always positive.
    pub timescale: i32,
}

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime {
        value: 0,
        timescale: 1,
    };

    /// Create a time of `value / timescale` seconds.
    ///
    /// A non-positive timescale is replaced by 1.
    pub fn new(value: i64, timescale: i32) -> Self {
        Self {
            value,
            timescale: timescale.max(1),
        }
    }

    /// Convert seconds to a rational time at the given timescale.
    pub fn from_seconds(secs: f64, timescale: i32) -> Self {
        let timescale = timescale.max(1);
        let value = if secs.is_finite() {
            (secs * timescale as f64).round() as i64
        } else {
            0
        };
        Self { value, timescale }
    }

    /// This time in floating-point seconds.
    pub fn seconds(&self) -> f64 {
        self.value as f64 / self.timescale as f64
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    pub fn is_negative(&self) -> bool {
        self.value < 0
    }

    /// Re-express this time at another timescale, rounding to nearest.
    pub fn convert_scale(&self, timescale: i32) -> Self {
        let timescale = timescale.max(1);
        if timescale == self.timescale {
            return *self;
        }
        let scaled = self.value as i128 * timescale as i128;
        let divisor = self.timescale as i128;
        let half = divisor / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / divisor
        } else {
            (scaled - half) / divisor
        };
        Self {
            value: rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            timescale,
        }
    }

    /// Clamp negative times to zero.
    pub fn max_zero(self) -> Self {
        if self.is_negative() {
            Self::new(0, self.timescale)
        } else {
            self
        }
    }
}

impl Default for MediaTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.value as i128 * other.timescale as i128;
        let rhs = other.value as i128 * self.timescale as i128;
        lhs.cmp(&rhs)
    }
}

impl Add for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: MediaTime) -> MediaTime {
        let timescale = common_timescale(self.timescale, rhs.timescale);
        let a = self.convert_scale(timescale);
        let b = rhs.convert_scale(timescale);
        MediaTime::new(a.value.saturating_add(b.value), timescale)
    }
}

impl Sub for MediaTime {
    type Output = MediaTime;

    fn sub(self, rhs: MediaTime) -> MediaTime {
        let timescale = common_timescale(self.timescale, rhs.timescale);
        let a = self.convert_scale(timescale);
        let b = rhs.convert_scale(timescale);
        MediaTime::new(a.value.saturating_sub(b.value), timescale)
    }
}

/// Least common multiple of two timescales, or the larger one when the
/// multiple does not fit.
fn common_timescale(a: i32, b: i32) -> i32 {
    if a == b {
        return a;
    }
    let lcm = (a as i64 / gcd(a as i64, b as i64)) * b as i64;
    i32::try_from(lcm).unwrap_or(a.max(b))
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.abs().max(1)
}

/// A range of media time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range.
    pub start: MediaTime,
    /// Length of the range; `None` runs to the end of the asset.
    pub duration: Option<MediaTime>,
}

impl TimeRange {
    /// The whole asset.
    pub const FULL: TimeRange = TimeRange {
        start: MediaTime::ZERO,
        duration: None,
    };

    pub fn new(start: MediaTime, duration: MediaTime) -> Self {
        Self {
            start,
            duration: Some(duration),
        }
    }

    /// A range from `start` to the end of the asset.
    pub fn from_start(start: MediaTime) -> Self {
        Self {
            start,
            duration: None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.duration.is_none()
    }

    /// End of the range, if bounded.
    pub fn end(&self) -> Option<MediaTime> {
        self.duration.map(|d| self.start + d)
    }

    /// Whether `time` falls inside `[start, end)`.
    pub fn contains(&self, time: MediaTime) -> bool {
        time >= self.start && self.end().map_or(true, |end| time < end)
    }

    /// Concrete duration of this range inside an asset of the given length.
    ///
    /// Unbounded ranges run from `start` to `asset_duration`; bounded ones
    /// are clipped to it. The result is never negative.
    pub fn resolved_duration(&self, asset_duration: MediaTime) -> MediaTime {
        let remaining = (asset_duration - self.start).max_zero();
        match self.duration {
            Some(duration) => duration.max_zero().min(remaining),
            None => remaining,
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::FULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_equal_across_timescales() {
        assert_eq!(MediaTime::new(1, 2), MediaTime::new(300, 600));
        assert!(MediaTime::new(1, 30) < MediaTime::new(1, 24));
    }

    #[test]
    fn test_subtraction_uses_common_timescale() {
        let a = MediaTime::new(100, 30);
        let b = MediaTime::new(1, 2);
        let diff = a - b;
        assert_eq!(diff.timescale, 30);
        assert!((diff.seconds() - (100.0 / 30.0 - 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_from_seconds_rounds() {
        let t = MediaTime::from_seconds(1.0 / 3.0, 600);
        assert_eq!(t.value, 200);
        assert_eq!(MediaTime::from_seconds(f64::NAN, 600).value, 0);
    }

    #[test]
    fn test_unbounded_range_resolves_against_asset() {
        let range = TimeRange::from_start(MediaTime::new(2, 1));
        assert_eq!(
            range.resolved_duration(MediaTime::new(10, 1)),
            MediaTime::new(8, 1)
        );
        // Start past the end never yields a negative duration.
        let late = TimeRange::from_start(MediaTime::new(12, 1));
        assert!(late.resolved_duration(MediaTime::new(10, 1)).is_zero());
    }

    #[test]
    fn test_bounded_range_clipped_to_asset_end() {
        let asset = MediaTime::new(1, 1);
        let overlong = TimeRange::new(MediaTime::new(1, 2), MediaTime::new(10, 1));
        assert_eq!(overlong.resolved_duration(asset), MediaTime::new(1, 2));

        let inside = TimeRange::new(MediaTime::new(1, 2), MediaTime::new(3, 10));
        assert_eq!(inside.resolved_duration(asset), MediaTime::new(3, 10));

        let past_end = TimeRange::new(MediaTime::new(2, 1), MediaTime::new(1, 1));
        assert!(past_end.resolved_duration(asset).is_zero());
    }

    #[test]
    fn test_range_contains_half_open() {
        let range = TimeRange::new(MediaTime::new(1, 1), MediaTime::new(2, 1));
        assert!(range.contains(MediaTime::new(1, 1)));
        assert!(range.contains(MediaTime::new(299, 100)));
        assert!(!range.contains(MediaTime::new(3, 1)));
        assert!(TimeRange::FULL.contains(MediaTime::new(1_000_000, 1)));
    }

    proptest! {
        #[test]
        fn prop_ordering_matches_seconds(
            a in -1_000_000i64..1_000_000,
            ta in 1i32..10_000,
            b in -1_000_000i64..1_000_000,
            tb in 1i32..10_000,
        ) {
            let x = MediaTime::new(a, ta);
            let y = MediaTime::new(b, tb);
            let lhs = a as i128 * tb as i128;
            let rhs = b as i128 * ta as i128;
            prop_assert_eq!(x.cmp(&y), lhs.cmp(&rhs));
            if x < y {
                prop_assert!(x.seconds() <= y.seconds());
            }
        }
    }
}
