//! Single-runway scheduler.
//!
//! # Algorithm
//!
//! Flights are admitted strictly in scheduled-time order. For each flight:
//!
//! 1. `ready = scheduled`
//! 2. `start = max(ready, prev.end + separation(prev.wake, wake))`
//! 3. occupancy = `[start, start + ROT)`
//!
//! Wake separation runs from the moment the previous flight clears the
//! runway and is directional (the leading aircraft's category constrains
//! the trailing one). Since
//! `start >= scheduled`, delay is never negative. The taxi buffer is added
//! to the realized time after the runway operation and never creates a
//! runway conflict.
//!
//! # Complexity
//! O(n) for a queue of n flights.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Configuration;
use crate::error::{Result, SimError};
use crate::models::{
    FlightRecord, Occupancy, Runway, RunwayAssignment, RunwayRole, RunwayTimeline,
    SeparationMatrix, WakeCategory,
};

/// Constraint that fixed a flight's runway start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Binding {
    /// Runway was free and separated at the scheduled time.
    Schedule,
    /// Previous occupant still held the runway and no separation applies.
    RunwayOccupied,
    /// Wake separation after the previous occupant cleared the runway.
    WakeSeparation,
}

/// One scheduling decision, recorded when tracing is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Flight scheduled.
    pub flight_id: String,
    /// Runway it was placed on.
    pub runway: String,
    /// Time the flight was ready for the runway (s).
    pub ready_s: i64,
    /// Runway start (s).
    pub start_s: i64,
    /// What determined the start.
    pub binding: Binding,
}

/// Scheduling decisions of one run, ordered by runway start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationTrace {
    entries: Vec<TraceEntry>,
}

impl SimulationTrace {
    /// Builds a trace; entries are ordered by start (stable).
    pub fn new(mut entries: Vec<TraceEntry>) -> Self {
        entries.sort_by_key(|e| e.start_s);
        Self { entries }
    }

    /// All decisions.
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Decision for one flight.
    pub fn for_flight(&self, flight_id: &str) -> Option<&TraceEntry> {
        self.entries.iter().find(|e| e.flight_id == flight_id)
    }

    /// Number of decisions fixed by the given constraint.
    pub fn count(&self, binding: Binding) -> usize {
        self.entries.iter().filter(|e| e.binding == binding).count()
    }

    /// Number of decisions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the trace is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Output of one runway scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunwaySchedule {
    /// Occupancy timeline.
    pub timeline: RunwayTimeline,
    /// Realized flights in admission order.
    pub flights: Vec<FlightRecord>,
    /// Decisions (empty unless tracing).
    pub trace: Vec<TraceEntry>,
}

/// Schedules one runway's queue under ROT and wake separation.
///
/// Owns its timeline exclusively for the duration of one run.
///
/// # Example
///
/// ```
/// use runway_sim::config::Configuration;
/// use runway_sim::models::{Direction, FlightRecord, Runway, WakeCategory};
/// use runway_sim::scheduler::RunwayScheduler;
///
/// let config = Configuration::builder().with_departure_rot(120).build().unwrap();
/// let queue = vec![
///     FlightRecord::new("CZ1", Direction::Departure, 0, 0).with_wake(WakeCategory::Heavy),
///     FlightRecord::new("CZ2", Direction::Departure, 0, 0).with_wake(WakeCategory::Medium),
/// ];
/// let schedule = RunwayScheduler::new(&Runway::departure("01L"), &config)
///     .schedule(&queue)
///     .unwrap();
/// // Heavy clears at 120; Heavy→Medium separation adds 120 s.
/// assert_eq!(schedule.flights[1].simulated_s(), Some(240));
/// ```
#[derive(Debug, Clone)]
pub struct RunwayScheduler {
    role: RunwayRole,
    rot_s: i64,
    taxi_buffer_s: i64,
    separation: SeparationMatrix,
    default_wake: Option<WakeCategory>,
    timeline: RunwayTimeline,
    flights: Vec<FlightRecord>,
    trace: Option<Vec<TraceEntry>>,
}

impl RunwayScheduler {
    /// Creates a scheduler for a runway under the given configuration.
    pub fn new(runway: &Runway, config: &Configuration) -> Self {
        Self {
            role: runway.role,
            rot_s: config.rot_s(runway.role),
            taxi_buffer_s: config.taxi_buffer_s(),
            separation: config.separation().clone(),
            default_wake: config.default_wake(),
            timeline: RunwayTimeline::new(runway.id.clone(), runway.role),
            flights: Vec::new(),
            trace: None,
        }
    }

    /// Enables decision tracing.
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled.then(Vec::new);
        self
    }

    /// Runway designator.
    pub fn runway(&self) -> &str {
        &self.timeline.runway
    }

    /// End of the previous occupancy (`None` = unused so far).
    pub fn free_at(&self) -> Option<i64> {
        self.timeline.free_at()
    }

    /// Number of flights admitted.
    pub fn admitted(&self) -> usize {
        self.flights.len()
    }

    /// Admits the next flight of the queue and returns its realized record.
    ///
    /// # Errors
    /// - `RoleMismatch` if the flight's direction is not served by this runway.
    /// - `UnsortedQueue` if the flight is scheduled before the previous one.
    /// - `UnknownAircraftType` if it has no wake category and no default is set.
    pub fn admit(&mut self, flight: &FlightRecord) -> Result<&FlightRecord> {
        if !self.role.serves(flight.direction) {
            return Err(SimError::RoleMismatch {
                flight_id: flight.id.clone(),
                direction: flight.direction,
                runway: self.timeline.runway.clone(),
                role: self.role,
            });
        }
        if let Some(prev) = self.flights.last() {
            if flight.scheduled_s < prev.scheduled_s {
                return Err(SimError::UnsortedQueue {
                    runway: self.timeline.runway.clone(),
                    position: self.flights.len(),
                    flight_id: flight.id.clone(),
                    scheduled_s: flight.scheduled_s,
                    previous_s: prev.scheduled_s,
                });
            }
        }
        let wake = flight
            .wake
            .or(self.default_wake)
            .ok_or_else(|| SimError::UnknownAircraftType {
                flight_id: flight.id.clone(),
                designator: flight.aircraft_type.clone(),
            })?;

        let ready_s = flight.scheduled_s;
        let (start_s, binding) = match self.timeline.last() {
            None => (ready_s, Binding::Schedule),
            Some(prev) => {
                let separation_s = self.separation.separation(prev.wake, wake);
                let available_s = prev.end_s + separation_s;
                if ready_s >= available_s {
                    (ready_s, Binding::Schedule)
                } else if separation_s > 0 {
                    (available_s, Binding::WakeSeparation)
                } else {
                    (available_s, Binding::RunwayOccupied)
                }
            }
        };
        let end_s = start_s + self.rot_s;

        debug!(
            flight = %flight.id,
            runway = %self.timeline.runway,
            ready_s,
            start_s,
            ?binding,
            "runway slot assigned"
        );

        self.timeline.push(Occupancy {
            flight_id: flight.id.clone(),
            wake,
            start_s,
            end_s,
        });
        if let Some(trace) = self.trace.as_mut() {
            trace.push(TraceEntry {
                flight_id: flight.id.clone(),
                runway: self.timeline.runway.clone(),
                ready_s,
                start_s,
                binding,
            });
        }

        let mut realized = flight.realized(RunwayAssignment {
            runway: self.timeline.runway.clone(),
            start_s,
            end_s,
            realized_s: start_s + self.taxi_buffer_s,
        });
        realized.wake = Some(wake);
        self.flights.push(realized);
        Ok(&self.flights[self.flights.len() - 1])
    }

    /// Schedules a whole queue (already sorted by scheduled time).
    ///
    /// An empty queue yields an empty schedule.
    pub fn schedule(mut self, queue: &[FlightRecord]) -> Result<RunwaySchedule> {
        for flight in queue {
            self.admit(flight)?;
        }
        Ok(self.finish())
    }

    /// Consumes the scheduler and returns its output.
    pub fn finish(self) -> RunwaySchedule {
        RunwaySchedule {
            timeline: self.timeline,
            flights: self.flights,
            trace: self.trace.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use WakeCategory::*;

    fn config(dep_rot: i64) -> Configuration {
        Configuration::builder()
            .with_departure_rot(dep_rot)
            .with_taxi_buffer(0)
            .build()
            .unwrap()
    }

    fn dep(id: &str, scheduled_s: i64, wake: WakeCategory) -> FlightRecord {
        FlightRecord::new(id, Direction::Departure, scheduled_s, scheduled_s).with_wake(wake)
    }

    fn scheduler(config: &Configuration) -> RunwayScheduler {
        RunwayScheduler::new(&Runway::departure("01L"), config)
    }

    #[test]
    fn test_heavy_then_medium_same_minute() {
        let c = config(120);
        let queue = vec![dep("A", 600, Heavy), dep("B", 630, Medium)];
        let s = scheduler(&c).schedule(&queue).unwrap();

        let a = &s.timeline.occupancies()[0];
        let b = s.flights[1].simulated_s().unwrap();
        assert_eq!(a.start_s, 600);
        assert_eq!(a.end_s, 720);
        assert_eq!(b, a.end_s + 120);
        assert_eq!(s.flights[1].delay_s(), Some(840 - 630));
    }

    #[test]
    fn test_separation_counts_from_runway_clear() {
        let c = config(60);
        let queue = vec![dep("A", 0, Heavy), dep("B", 0, Light)];
        let s = scheduler(&c).with_trace(true).schedule(&queue).unwrap();
        // Heavy holds [0, 60); Heavy→Light separation 180 follows.
        assert_eq!(s.flights[1].simulated_s(), Some(60 + 180));
        assert_eq!(s.trace[1].binding, Binding::WakeSeparation);
    }

    #[test]
    fn test_rot_alone_binds_without_separation() {
        let c = Configuration::builder()
            .with_departure_rot(150)
            .with_taxi_buffer(0)
            .with_separation(SeparationMatrix::new())
            .build()
            .unwrap();
        let queue = vec![dep("A", 0, Medium), dep("B", 0, Medium)];
        let s = scheduler(&c).with_trace(true).schedule(&queue).unwrap();
        assert_eq!(s.flights[1].simulated_s(), Some(150));
        assert_eq!(s.trace[1].binding, Binding::RunwayOccupied);
    }

    #[test]
    fn test_separation_is_directional() {
        let c = config(60);
        let light_first = scheduler(&c)
            .schedule(&[dep("A", 0, Light), dep("B", 0, Heavy)])
            .unwrap();
        // Light→Heavy 60 s versus Heavy→Light 180 s.
        assert_eq!(light_first.flights[1].simulated_s(), Some(60 + 60));
    }

    #[test]
    fn test_free_runway_uses_schedule() {
        let c = config(60);
        let s = scheduler(&c)
            .with_trace(true)
            .schedule(&[dep("A", 0, Medium), dep("B", 1000, Medium)])
            .unwrap();
        assert_eq!(s.flights[1].simulated_s(), Some(1000));
        assert_eq!(s.flights[1].delay_s(), Some(0));
        assert_eq!(s.trace[1].binding, Binding::Schedule);
    }

    #[test]
    fn test_empty_queue() {
        let c = config(60);
        let s = scheduler(&c).schedule(&[]).unwrap();
        assert!(s.flights.is_empty());
        assert!(s.timeline.is_empty());
    }

    #[test]
    fn test_unsorted_queue_fails_fast() {
        let c = config(60);
        let err = scheduler(&c)
            .schedule(&[dep("A", 500, Medium), dep("B", 100, Medium)])
            .unwrap_err();
        match err {
            SimError::UnsortedQueue {
                position,
                flight_id,
                ..
            } => {
                assert_eq!(position, 1);
                assert_eq!(flight_id, "B");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_role_mismatch() {
        let c = config(60);
        let arrival = FlightRecord::new("X", Direction::Arrival, 0, 0).with_wake(Medium);
        let mut s = scheduler(&c);
        assert!(matches!(
            s.admit(&arrival),
            Err(SimError::RoleMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_wake_without_default_fails() {
        let c = config(60);
        let unclassified = FlightRecord::new("X", Direction::Departure, 0, 0).with_aircraft_type("ZZZ");
        let err = scheduler(&c).schedule(&[unclassified]).unwrap_err();
        assert_eq!(err.name(), "UnknownAircraftType");
    }

    #[test]
    fn test_unknown_wake_uses_default() {
        let c = Configuration::builder()
            .with_default_wake(Light)
            .build()
            .unwrap();
        let queue = vec![
            dep("A", 0, Heavy),
            FlightRecord::new("X", Direction::Departure, 0, 0),
        ];
        let s = scheduler(&c).schedule(&queue).unwrap();
        assert_eq!(s.flights[1].wake, Some(Light));
        // Default departure ROT 60, then Heavy→Light 180.
        assert_eq!(s.flights[1].simulated_s(), Some(60 + 180));
    }

    #[test]
    fn test_taxi_buffer_added_downstream() {
        let c = Configuration::builder().with_taxi_buffer(15).build().unwrap();
        let s = scheduler(&c)
            .schedule(&[dep("A", 0, Medium), dep("B", 0, Medium)])
            .unwrap();
        // Buffer shifts realized time only, not runway spacing.
        assert_eq!(s.flights[1].simulated_s(), Some(60 + 60));
        assert_eq!(s.flights[1].realized_s(), Some(120 + 900));
    }

    #[test]
    fn test_occupancies_never_overlap() {
        let c = config(90);
        let wakes = [Heavy, Light, Medium, Heavy, Heavy, Light, Medium, Medium];
        let queue: Vec<FlightRecord> = wakes
            .iter()
            .enumerate()
            .map(|(i, &w)| dep(&format!("F{i}"), (i as i64) * 40, w))
            .collect();
        let s = scheduler(&c).schedule(&queue).unwrap();
        let occ = s.timeline.occupancies();
        for pair in occ.windows(2) {
            let required = c.separation().separation(pair[0].wake, pair[1].wake);
            assert!(pair[1].start_s >= pair[0].end_s + required);
        }
        for f in &s.flights {
            assert!(f.delay_s().unwrap() >= 0);
        }
    }
}
