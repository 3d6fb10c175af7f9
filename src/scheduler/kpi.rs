//! Runway performance statistics.
//!
//! Computed from a completed [`SimulationResult`].
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Mean delay | mean(simulated - scheduled) over realized flights |
//! | Max delay | Largest single delay |
//! | Delay rate | Fraction of flights with delay > 0 |
//! | On-time rate | Fraction with delay <= tolerance |
//! | Operation share | Flights per runway / total flights |
//! | Utilization | Busy time / simulated span, per runway |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::SimulationResult;
use crate::models::Direction;

/// Default on-time tolerance (minutes).
pub const DEFAULT_ON_TIME_TOLERANCE_MINUTES: f64 = 15.0;

/// Per-runway figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunwayUsage {
    /// Flights operated.
    pub operations: usize,
    /// Share of all flights (0.0..1.0).
    pub operation_share: f64,
    /// Busy time over the simulated span (0.0..1.0).
    pub utilization: f64,
}

/// Run-level performance indicators.
///
/// Delay values are in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunwayStatistics {
    /// Realized flights.
    pub total_flights: usize,
    /// Realized departures.
    pub departures: usize,
    /// Realized arrivals.
    pub arrivals: usize,
    /// Flights with a positive delay.
    pub delayed_flights: usize,
    /// Mean delay (minutes).
    pub mean_delay_minutes: f64,
    /// Maximum delay (minutes).
    pub max_delay_minutes: f64,
    /// Fraction of flights with a positive delay (0.0..1.0).
    pub delay_rate: f64,
    /// Fraction of flights within the on-time tolerance (0.0..1.0).
    pub on_time_rate: f64,
    /// Per-runway usage, keyed by runway designator.
    pub by_runway: BTreeMap<String, RunwayUsage>,
}

impl RunwayStatistics {
    /// Computes statistics with the given on-time tolerance (minutes).
    pub fn calculate(result: &SimulationResult, on_time_tolerance_minutes: f64) -> Self {
        let tolerance_s = on_time_tolerance_minutes * 60.0;
        let delays: Vec<i64> = result.flights.iter().filter_map(|f| f.delay_s()).collect();
        let total = delays.len();

        let delayed = delays.iter().filter(|&&d| d > 0).count();
        let on_time = delays.iter().filter(|&&d| d as f64 <= tolerance_s).count();
        let max_delay_s = delays.iter().copied().max().unwrap_or(0);
        let mean_delay_s = if total == 0 {
            0.0
        } else {
            delays.iter().sum::<i64>() as f64 / total as f64
        };

        let ratio = |n: usize| if total == 0 { 0.0 } else { n as f64 / total as f64 };

        // Span over which runway busy time is measured.
        let span = {
            let starts = result.timelines.iter().filter_map(|t| t.occupancies().first());
            let ends = result.timelines.iter().filter_map(|t| t.last());
            match (starts.map(|o| o.start_s).min(), ends.map(|o| o.end_s).max()) {
                (Some(first), Some(last)) if last > first => (last - first) as f64,
                _ => 0.0,
            }
        };

        let by_runway = result
            .timelines
            .iter()
            .map(|t| {
                let usage = RunwayUsage {
                    operations: t.len(),
                    operation_share: ratio(t.len()),
                    utilization: if span > 0.0 {
                        t.busy_s() as f64 / span
                    } else {
                        0.0
                    },
                };
                (t.runway.clone(), usage)
            })
            .collect();

        Self {
            total_flights: total,
            departures: count_direction(result, Direction::Departure),
            arrivals: count_direction(result, Direction::Arrival),
            delayed_flights: delayed,
            mean_delay_minutes: mean_delay_s / 60.0,
            max_delay_minutes: max_delay_s as f64 / 60.0,
            delay_rate: ratio(delayed),
            // No flights → nothing late.
            on_time_rate: if total == 0 { 1.0 } else { ratio(on_time) },
            by_runway,
        }
    }

    /// Whether the run meets the given delay thresholds.
    pub fn meets_thresholds(&self, max_mean_delay_minutes: f64, min_on_time_rate: f64) -> bool {
        self.mean_delay_minutes <= max_mean_delay_minutes && self.on_time_rate >= min_on_time_rate
    }
}

fn count_direction(result: &SimulationResult, direction: Direction) -> usize {
    result
        .flights
        .iter()
        .filter(|f| f.direction == direction && f.is_realized())
        .count()
}
