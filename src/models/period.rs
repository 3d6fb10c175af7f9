//! Congestion (backlog) periods.

use serde::{Deserialize, Serialize};

/// A maximal interval in which the in-system flight count exceeded the
/// backlog threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CongestionPeriod {
    /// Period start (s).
    pub start_s: i64,
    /// Period end (s).
    pub end_s: i64,
    /// Flights whose in-system window intersects the period.
    pub flight_count: usize,
    /// Maximum concurrent in-system count inside the period.
    pub peak_count: usize,
}

impl CongestionPeriod {
    /// Creates a period.
    pub fn new(start_s: i64, end_s: i64, flight_count: usize, peak_count: usize) -> Self {
        Self {
            start_s,
            end_s,
            flight_count,
            peak_count,
        }
    }

    /// Duration (s).
    #[inline]
    pub fn duration_s(&self) -> i64 {
        self.end_s - self.start_s
    }

    /// Length of the intersection with another period (s). 0 if disjoint.
    pub fn overlap_s(&self, other: &CongestionPeriod) -> i64 {
        (self.end_s.min(other.end_s) - self.start_s.max(other.start_s)).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap() {
        let a = CongestionPeriod::new(0, 3600, 20, 12);
        let b = CongestionPeriod::new(1800, 7200, 30, 15);
        let c = CongestionPeriod::new(7200, 9000, 5, 11);
        assert_eq!(a.overlap_s(&b), 1800);
        assert_eq!(b.overlap_s(&a), 1800);
        assert_eq!(b.overlap_s(&c), 0);
        assert_eq!(a.overlap_s(&c), 0);
        assert_eq!(a.duration_s(), 3600);
    }
}
