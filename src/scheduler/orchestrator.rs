//! Multi-runway simulation orchestrator.
//!
//! # Algorithm
//!
//! 1. Partition flights by direction; stable-sort each group by scheduled
//!    time (equal times keep input order).
//! 2. For each role: a single runway takes the whole queue; with several
//!    runways, each flight goes to the runway that frees up earliest
//!    (an unused runway first, ties to the runway declared first).
//! 3. Merge realized flights ordered by (simulated time, input position).
//!
//! Departure and arrival runways share no state, so the two roles are
//! scheduled concurrently with `rayon::join`. The result is identical to
//! a sequential run.

use rayon::join;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::runway::{RunwayScheduler, SimulationTrace, TraceEntry};
use crate::config::Configuration;
use crate::error::{Result, SimError};
use crate::models::{Direction, FlightRecord, RunwayRole, RunwayTimeline};

/// Output of one orchestrated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Realized flights, ordered by simulated time then input position.
    pub flights: Vec<FlightRecord>,
    /// One timeline per configured runway, in declaration order.
    pub timelines: Vec<RunwayTimeline>,
    /// Scheduling decisions (`None` unless tracing).
    pub trace: Option<SimulationTrace>,
}

impl SimulationResult {
    /// Timeline of a runway.
    pub fn timeline(&self, runway: &str) -> Option<&RunwayTimeline> {
        self.timelines.iter().find(|t| t.runway == runway)
    }

    /// Latest simulated runway operation (s).
    pub fn latest_simulated_s(&self) -> Option<i64> {
        self.flights.iter().filter_map(FlightRecord::simulated_s).max()
    }
}

/// Per-role outcome: timelines in declaration order plus placed flights
/// tagged with their input position.
struct RoleOutcome {
    timelines: Vec<RunwayTimeline>,
    placed: Vec<(usize, FlightRecord)>,
    trace: Vec<TraceEntry>,
}

/// Coordinates per-runway schedulers over one flight set.
///
/// # Example
///
/// ```
/// use runway_sim::config::Configuration;
/// use runway_sim::models::{Direction, FlightRecord, WakeCategory};
/// use runway_sim::scheduler::SimulationOrchestrator;
///
/// let config = Configuration::default();
/// let flights = vec![
///     FlightRecord::new("CZ1", Direction::Departure, 0, 0).with_wake(WakeCategory::Medium),
///     FlightRecord::new("CZ2", Direction::Departure, 0, 0).with_wake(WakeCategory::Medium),
/// ];
/// let result = SimulationOrchestrator::new(&config).run(&flights).unwrap();
/// // Two departure runways: both flights go at t=0.
/// assert_eq!(result.flights[0].runway(), Some("01L"));
/// assert_eq!(result.flights[1].runway(), Some("01R"));
/// ```
#[derive(Debug, Clone)]
pub struct SimulationOrchestrator<'a> {
    config: &'a Configuration,
    trace: bool,
}

impl<'a> SimulationOrchestrator<'a> {
    /// Creates an orchestrator over a configuration.
    pub fn new(config: &'a Configuration) -> Self {
        Self {
            config,
            trace: false,
        }
    }

    /// Enables decision tracing.
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    /// Runs the simulation.
    ///
    /// Input records are not modified; realized copies are returned.
    /// An empty flight set yields an empty result.
    ///
    /// # Errors
    /// The first scheduler error (departures before arrivals).
    pub fn run(&self, flights: &[FlightRecord]) -> Result<SimulationResult> {
        let departures = sorted_queue(flights, Direction::Departure);
        let arrivals = sorted_queue(flights, Direction::Arrival);
        debug!(
            departures = departures.len(),
            arrivals = arrivals.len(),
            "simulation partitioned"
        );

        let (dep, arr) = join(
            || self.schedule_role(RunwayRole::Departure, &departures),
            || self.schedule_role(RunwayRole::Arrival, &arrivals),
        );
        let (dep, arr) = (dep?, arr?);

        let mut placed: Vec<(usize, FlightRecord)> = dep.placed;
        placed.extend(arr.placed);
        placed.sort_by_key(|(idx, f)| (f.simulated_s().unwrap_or(f.scheduled_s), *idx));
        let flights: Vec<FlightRecord> = placed.into_iter().map(|(_, f)| f).collect();

        let mut by_id: Vec<RunwayTimeline> = dep.timelines;
        by_id.extend(arr.timelines);
        let timelines = self
            .config
            .runways()
            .iter()
            .filter_map(|r| {
                by_id
                    .iter()
                    .position(|t| t.runway == r.id)
                    .map(|i| by_id.swap_remove(i))
            })
            .collect();

        let trace = self.trace.then(|| {
            let mut entries = dep.trace;
            entries.extend(arr.trace);
            SimulationTrace::new(entries)
        });

        info!(flights = flights.len(), "simulation completed");
        Ok(SimulationResult {
            flights,
            timelines,
            trace,
        })
    }

    fn schedule_role(&self, role: RunwayRole, queue: &[(usize, &FlightRecord)]) -> Result<RoleOutcome> {
        let mut lanes: Vec<RunwayScheduler> = self
            .config
            .runways_for(role)
            .map(|r| RunwayScheduler::new(r, self.config).with_trace(self.trace))
            .collect();

        let mut positions: Vec<Vec<usize>> = vec![Vec::new(); lanes.len()];
        for &(idx, flight) in queue {
            let lane = earliest_free(&lanes).ok_or_else(|| {
                SimError::out_of_range(
                    "runways",
                    format!("no {role:?} runway for {}", flight.id),
                    "at least one runway per role",
                )
            })?;
            lanes[lane].admit(flight)?;
            positions[lane].push(idx);
        }

        let mut outcome = RoleOutcome {
            timelines: Vec::with_capacity(lanes.len()),
            placed: Vec::with_capacity(queue.len()),
            trace: Vec::new(),
        };
        for (lane, idxs) in lanes.into_iter().zip(positions) {
            let schedule = lane.finish();
            outcome.placed.extend(idxs.into_iter().zip(schedule.flights));
            outcome.timelines.push(schedule.timeline);
            outcome.trace.extend(schedule.trace);
        }
        Ok(outcome)
    }
}

/// Flights of one direction, stable-sorted by scheduled time, tagged with
/// their input position.
fn sorted_queue(flights: &[FlightRecord], direction: Direction) -> Vec<(usize, &FlightRecord)> {
    let mut queue: Vec<(usize, &FlightRecord)> = flights
        .iter()
        .enumerate()
        .filter(|(_, f)| f.direction == direction)
        .collect();
    queue.sort_by_key(|(_, f)| f.scheduled_s);
    queue
}

/// Index of the lane that frees up earliest. Unused lanes come first;
/// ties go to the lower index.
fn earliest_free(lanes: &[RunwayScheduler]) -> Option<usize> {
    lanes
        .iter()
        .enumerate()
        .min_by_key(|(i, lane)| (lane.free_at(), *i))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Runway, WakeCategory};
    use crate::scheduler::Binding;

    fn flight(id: &str, direction: Direction, scheduled_s: i64) -> FlightRecord {
        FlightRecord::new(id, direction, scheduled_s, scheduled_s).with_wake(WakeCategory::Medium)
    }

    fn single_runway_config() -> Configuration {
        Configuration::builder()
            .with_runways(vec![Runway::departure("01"), Runway::arrival("02")])
            .with_taxi_buffer(0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_flight_set() {
        let config = Configuration::default();
        let result = SimulationOrchestrator::new(&config).run(&[]).unwrap();
        assert!(result.flights.is_empty());
        assert_eq!(result.timelines.len(), 4);
        assert!(result.timelines.iter().all(|t| t.is_empty()));
        assert_eq!(result.latest_simulated_s(), None);
    }

    #[test]
    fn test_unsorted_input_is_sorted_per_direction() {
        let config = single_runway_config();
        let flights = vec![
            flight("D2", Direction::Departure, 600),
            flight("A1", Direction::Arrival, 0),
            flight("D1", Direction::Departure, 0),
        ];
        let result = SimulationOrchestrator::new(&config).run(&flights).unwrap();
        let ids: Vec<&str> = result.flights.iter().map(|f| f.id.as_str()).collect();
        // Merge by simulated time; A1 and D1 tie at 0, A1 came first in input.
        assert_eq!(ids, vec!["A1", "D1", "D2"]);
    }

    #[test]
    fn test_equal_scheduled_times_keep_input_order() {
        let config = single_runway_config();
        let flights = vec![
            flight("X", Direction::Departure, 100),
            flight("Y", Direction::Departure, 100),
            flight("Z", Direction::Departure, 100),
        ];
        let result = SimulationOrchestrator::new(&config).run(&flights).unwrap();
        let tl = result.timeline("01").unwrap();
        let order: Vec<&str> = tl.occupancies().iter().map(|o| o.flight_id.as_str()).collect();
        assert_eq!(order, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_load_balancing_prefers_earliest_free() {
        let config = Configuration::builder().with_taxi_buffer(0).build().unwrap();
        let flights: Vec<FlightRecord> = (0..4)
            .map(|i| flight(&format!("D{i}"), Direction::Departure, 0))
            .collect();
        let result = SimulationOrchestrator::new(&config).run(&flights).unwrap();
        let runway_of = |id: &str| {
            result
                .flights
                .iter()
                .find(|f| f.id == id)
                .and_then(|f| f.runway().map(str::to_string))
                .unwrap()
        };
        assert_eq!(runway_of("D0"), "01L");
        assert_eq!(runway_of("D1"), "01R");
        assert_eq!(runway_of("D2"), "01L");
        assert_eq!(runway_of("D3"), "01R");
        // Second wave: ROT 60 plus Medium→Medium separation 60.
        assert_eq!(result.latest_simulated_s(), Some(120));
    }

    #[test]
    fn test_earliest_free_lane() {
        let config = Configuration::default();
        let mut lanes: Vec<RunwayScheduler> = config
            .runways_for(RunwayRole::Departure)
            .map(|r| RunwayScheduler::new(r, &config))
            .collect();
        assert_eq!(earliest_free(&[]), None);
        assert_eq!(earliest_free(&lanes), Some(0));

        lanes[0].admit(&flight("D0", Direction::Departure, 0)).unwrap();
        assert_eq!(earliest_free(&lanes), Some(1));
        lanes[1].admit(&flight("D1", Direction::Departure, 0)).unwrap();
        // Both free at 60: the runway declared first wins.
        assert_eq!(earliest_free(&lanes), Some(0));
    }

    #[test]
    fn test_directions_use_their_own_runways() {
        let config = Configuration::default();
        let flights = vec![
            flight("D", Direction::Departure, 0),
            flight("A", Direction::Arrival, 0),
        ];
        let result = SimulationOrchestrator::new(&config).run(&flights).unwrap();
        for f in &result.flights {
            let role = config.role_of(f.runway().unwrap()).unwrap();
            assert!(role.serves(f.direction));
            assert_eq!(f.delay_s(), Some(0));
        }
    }

    #[test]
    fn test_trace_orders_by_start() {
        let config = single_runway_config();
        let flights = vec![
            flight("D1", Direction::Departure, 0),
            flight("D2", Direction::Departure, 0),
            flight("A1", Direction::Arrival, 30),
        ];
        let result = SimulationOrchestrator::new(&config)
            .with_trace(true)
            .run(&flights)
            .unwrap();
        let trace = result.trace.as_ref().unwrap();
        let starts: Vec<i64> = trace.entries().iter().map(|e| e.start_s).collect();
        assert_eq!(starts, vec![0, 30, 120]);
        assert_eq!(trace.for_flight("D2").unwrap().binding, Binding::WakeSeparation);
        assert_eq!(trace.count(Binding::Schedule), 2);

        let untraced = SimulationOrchestrator::new(&config).run(&flights).unwrap();
        assert!(untraced.trace.is_none());
        assert_eq!(untraced.flights, result.flights);
    }

    #[test]
    fn test_run_is_repeatable() {
        let config = Configuration::default();
        let flights: Vec<FlightRecord> = (0..30)
            .map(|i| {
                let dir = if i % 3 == 0 { Direction::Arrival } else { Direction::Departure };
                flight(&format!("F{i}"), dir, (i % 7) * 45)
            })
            .collect();
        let orchestrator = SimulationOrchestrator::new(&config);
        assert_eq!(orchestrator.run(&flights).unwrap(), orchestrator.run(&flights).unwrap());
    }

    #[test]
    fn test_scheduler_error_propagates() {
        let config = Configuration::default();
        let flights = vec![FlightRecord::new("U", Direction::Arrival, 0, 0)];
        let err = SimulationOrchestrator::new(&config).run(&flights).unwrap_err();
        assert_eq!(err.name(), "UnknownAircraftType");
    }
}
