//! Backlog (congestion) period detection.
//!
//! A flight is backlogged once its delay exceeds the delay threshold and
//! stays backlogged until its runway operation. Both sides are measured at
//! the runway: a simulated flight ends at its runway start, a recorded
//! flight at its ground-truth operation time, so identical delays give
//! identical windows. A sweep over the window boundaries yields the
//! concurrent backlog count as a step function, and a congestion period is
//! a maximal interval in which that count is strictly above the backlog
//! threshold.
//!
//! Windows are half-open `[scheduled + threshold, operation)`: a window
//! ending at `t` and one starting at `t` never overlap. Flights delayed by
//! no more than the threshold have empty windows and contribute nothing.
//!
//! # Complexity
//! O(n log n) for the sweep, O(n·p) for flight counts over p periods.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::Configuration;
use crate::models::{CongestionPeriod, FlightRecord};

/// Interval in which a flight is backlogged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InSystemWindow {
    /// Flight identifier.
    pub flight_id: String,
    /// Window start (s).
    pub start_s: i64,
    /// Window end, exclusive (s).
    pub end_s: i64,
}

impl InSystemWindow {
    /// Window of a simulated flight, ending at its runway start.
    ///
    /// Returns `None` for unrealized records.
    pub fn simulated(record: &FlightRecord, delay_threshold_s: i64) -> Option<Self> {
        record.simulated_s().map(|end_s| Self {
            flight_id: record.id.clone(),
            start_s: record.scheduled_s + delay_threshold_s,
            end_s,
        })
    }

    /// Window of a recorded flight, ending at its actual time.
    pub fn recorded(record: &FlightRecord, delay_threshold_s: i64) -> Self {
        Self {
            flight_id: record.id.clone(),
            start_s: record.scheduled_s + delay_threshold_s,
            end_s: record.actual_s,
        }
    }

    /// Whether the window covers no time.
    pub fn is_empty(&self) -> bool {
        self.end_s <= self.start_s
    }

    /// Whether the window intersects `[start_s, end_s)`.
    pub fn intersects(&self, start_s: i64, end_s: i64) -> bool {
        !self.is_empty() && self.start_s < end_s && self.end_s > start_s
    }
}

/// Extracts congestion periods from in-system windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CongestionDetector {
    backlog_threshold: usize,
    delay_threshold_s: i64,
}

impl CongestionDetector {
    /// Creates a detector; periods are where the count exceeds `backlog_threshold`.
    ///
    /// Every delayed flight counts until [`with_delay_threshold`](Self::with_delay_threshold)
    /// sets a threshold.
    pub fn new(backlog_threshold: usize) -> Self {
        Self {
            backlog_threshold,
            delay_threshold_s: 0,
        }
    }

    /// Counts a flight only once its delay exceeds `seconds`.
    pub fn with_delay_threshold(mut self, seconds: i64) -> Self {
        self.delay_threshold_s = seconds;
        self
    }

    /// Creates a detector from the configured thresholds.
    pub fn from_config(config: &Configuration) -> Self {
        let settings = config.congestion();
        Self::new(settings.backlog_threshold).with_delay_threshold(settings.delay_threshold_s())
    }

    /// Backlog threshold.
    pub fn backlog_threshold(&self) -> usize {
        self.backlog_threshold
    }

    /// Delay threshold (s).
    pub fn delay_threshold_s(&self) -> i64 {
        self.delay_threshold_s
    }

    /// Concurrent in-system count as a step function.
    ///
    /// Each `(t, n)` means the count is `n` from `t` until the next step.
    /// The last step always has count 0.
    pub fn count_series(&self, windows: &[InSystemWindow]) -> Vec<(i64, usize)> {
        let mut deltas: BTreeMap<i64, i64> = BTreeMap::new();
        for w in windows.iter().filter(|w| !w.is_empty()) {
            *deltas.entry(w.start_s).or_insert(0) += 1;
            *deltas.entry(w.end_s).or_insert(0) -= 1;
        }

        let mut series = Vec::with_capacity(deltas.len());
        let mut count: i64 = 0;
        for (t, delta) in deltas {
            if delta == 0 {
                continue;
            }
            count += delta;
            series.push((t, count.max(0) as usize));
        }
        series
    }

    /// Detects congestion periods, ordered by start.
    pub fn detect(&self, windows: &[InSystemWindow]) -> Vec<CongestionPeriod> {
        let series = self.count_series(windows);
        let mut periods = Vec::new();
        let mut open: Option<(i64, usize)> = None;

        for &(t, count) in &series {
            let congested = count > self.backlog_threshold;
            open = match (open, congested) {
                (None, true) => Some((t, count)),
                (Some((start, peak)), true) => Some((start, peak.max(count))),
                (Some((start, peak)), false) => {
                    periods.push(self.period(windows, start, t, peak));
                    None
                }
                (None, false) => None,
            };
        }
        // The series ends at count 0, so a period is always closed.
        debug_assert!(open.is_none());
        periods
    }

    /// Detects periods over simulated backlog windows.
    pub fn detect_simulated(&self, flights: &[FlightRecord]) -> Vec<CongestionPeriod> {
        let windows: Vec<InSystemWindow> = flights
            .iter()
            .filter_map(|f| InSystemWindow::simulated(f, self.delay_threshold_s))
            .collect();
        self.detect(&windows)
    }

    /// Detects periods over recorded backlog windows.
    pub fn detect_recorded(&self, flights: &[FlightRecord]) -> Vec<CongestionPeriod> {
        let windows: Vec<InSystemWindow> = flights
            .iter()
            .map(|f| InSystemWindow::recorded(f, self.delay_threshold_s))
            .collect();
        self.detect(&windows)
    }

    fn period(
        &self,
        windows: &[InSystemWindow],
        start_s: i64,
        end_s: i64,
        peak: usize,
    ) -> CongestionPeriod {
        let flight_count = windows
            .iter()
            .filter(|w| w.intersects(start_s, end_s))
            .count();
        CongestionPeriod::new(start_s, end_s, flight_count, peak)
    }
}

/// Recorded statistics a simulation is validated against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruth {
    /// Recorded congestion periods, ordered by start.
    pub periods: Vec<CongestionPeriod>,
    /// Latest recorded operation (s). `None` = no operations.
    pub latest_s: Option<i64>,
}

impl GroundTruth {
    /// Creates ground truth from precomputed statistics.
    pub fn new(periods: Vec<CongestionPeriod>, latest_s: Option<i64>) -> Self {
        Self { periods, latest_s }
    }

    /// Derives ground truth from the recorded times of a flight set.
    pub fn from_recorded(flights: &[FlightRecord], detector: &CongestionDetector) -> Self {
        Self {
            periods: detector.detect_recorded(flights),
            latest_s: flights.iter().map(|f| f.actual_s).max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(id: &str, start_s: i64, end_s: i64) -> InSystemWindow {
        InSystemWindow {
            flight_id: id.into(),
            start_s,
            end_s,
        }
    }

    #[test]
    fn test_count_series() {
        let d = CongestionDetector::new(1);
        let windows = vec![window("A", 0, 100), window("B", 50, 150), window("C", 100, 200)];
        // B overlaps both; A ends where C starts.
        assert_eq!(
            d.count_series(&windows),
            vec![(0, 1), (50, 2), (150, 1), (200, 0)]
        );
    }

    #[test]
    fn test_single_period() {
        let d = CongestionDetector::new(1);
        let windows = vec![
            window("A", 0, 100),
            window("B", 50, 150),
            window("C", 60, 70),
            window("D", 300, 400),
        ];
        let periods = d.detect(&windows);
        assert_eq!(periods, vec![CongestionPeriod::new(50, 100, 3, 3)]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let windows = vec![window("A", 0, 100), window("B", 0, 100)];
        assert!(CongestionDetector::new(2).detect(&windows).is_empty());
        assert_eq!(CongestionDetector::new(1).detect(&windows).len(), 1);
    }

    #[test]
    fn test_adjacent_windows_do_not_overlap() {
        let d = CongestionDetector::new(1);
        let windows = vec![window("A", 0, 100), window("B", 100, 200)];
        assert!(d.detect(&windows).is_empty());
    }

    #[test]
    fn test_separate_periods() {
        let d = CongestionDetector::new(1);
        let windows = vec![
            window("A", 0, 100),
            window("B", 0, 100),
            window("C", 500, 600),
            window("D", 550, 650),
            window("E", 560, 570),
        ];
        let periods = d.detect(&windows);
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0], CongestionPeriod::new(0, 100, 2, 2));
        assert_eq!(periods[1].start_s, 550);
        assert_eq!(periods[1].end_s, 600);
        assert_eq!(periods[1].peak_count, 3);
    }

    #[test]
    fn test_empty_windows_ignored() {
        let d = CongestionDetector::new(0);
        let windows = vec![window("A", 100, 100), window("B", 200, 150)];
        assert!(d.count_series(&windows).is_empty());
        assert!(d.detect(&windows).is_empty());
        assert!(d.detect(&[]).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let d = CongestionDetector::new(2);
        let windows: Vec<InSystemWindow> = (0..50)
            .map(|i| window(&format!("F{i}"), (i % 7) * 60, (i % 7) * 60 + 300 + i))
            .collect();
        assert_eq!(d.detect(&windows), d.detect(&windows));
    }

    #[test]
    fn test_delay_threshold_filters_short_delays() {
        use crate::models::Direction;
        let d = CongestionDetector::new(0).with_delay_threshold(900);
        let flights = vec![
            FlightRecord::new("AT", Direction::Departure, 0, 900),
            FlightRecord::new("OVER", Direction::Departure, 0, 901),
        ];
        assert_eq!(d.detect_recorded(&flights), vec![CongestionPeriod::new(900, 901, 1, 1)]);
    }

    #[test]
    fn test_delay_free_flights_form_no_backlog() {
        use crate::models::{Direction, WakeCategory};
        use crate::scheduler::SimulationOrchestrator;
        let config = Configuration::default();
        let flights: Vec<FlightRecord> = (0..12)
            .map(|i| {
                FlightRecord::new(format!("D{i}"), Direction::Departure, 500 + i * 50, 500 + i * 50)
                    .with_wake(WakeCategory::Medium)
            })
            .collect();
        let result = SimulationOrchestrator::new(&config).run(&flights).unwrap();
        let d = CongestionDetector::from_config(&config);
        assert!(d.detect_simulated(&result.flights).is_empty());
        assert!(d.detect_recorded(&flights).is_empty());
    }

    #[test]
    fn test_same_delays_give_same_periods() {
        use crate::models::{Direction, RunwayAssignment};
        let flights: Vec<FlightRecord> = (0..12)
            .map(|i| {
                let actual_s = 1200 + i * 60;
                FlightRecord::new(format!("D{i}"), Direction::Departure, 0, actual_s).realized(
                    RunwayAssignment {
                        runway: "01L".into(),
                        start_s: actual_s,
                        end_s: actual_s + 60,
                        realized_s: actual_s + 600,
                    },
                )
            })
            .collect();
        let d = CongestionDetector::new(10).with_delay_threshold(900);
        let simulated = d.detect_simulated(&flights);
        assert_eq!(simulated, d.detect_recorded(&flights));
        // Twelve backlogged from 900 s until the second operation at 1260 s.
        assert_eq!(simulated, vec![CongestionPeriod::new(900, 1260, 12, 12)]);
    }

    #[test]
    fn test_ground_truth_from_recorded() {
        use crate::models::Direction;
        let flights: Vec<FlightRecord> = (0..3)
            .map(|i| FlightRecord::new(format!("F{i}"), Direction::Departure, 0, 600 + i * 60))
            .collect();
        let truth = GroundTruth::from_recorded(&flights, &CongestionDetector::new(2));
        assert_eq!(truth.latest_s, Some(720));
        assert_eq!(truth.periods, vec![CongestionPeriod::new(0, 600, 3, 3)]);

        let none = GroundTruth::from_recorded(&[], &CongestionDetector::new(2));
        assert_eq!(none, GroundTruth::default());
    }
}
