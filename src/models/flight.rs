//! Flight records.
//!
//! A `FlightInput` is what the ingestion collaborator hands over;
//! a `FlightRecord` is the classified, typed record the core works on.
//! The scheduler-assigned fields of a record are written exactly once,
//! by producing a new record (`FlightRecord::realized`).
//!
//! # Time Representation
//! All times are in seconds relative to a simulation epoch (t=0).
//! The ingestion side defines what t=0 means (e.g., local midnight).

use serde::{Deserialize, Serialize};

use super::WakeCategory;

/// Operation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Outbound flight (take-off).
    Departure,
    /// Inbound flight (landing).
    Arrival,
}

/// A flight row as delivered by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightInput {
    /// Flight identifier (e.g., "CZ3101").
    pub id: String,
    /// Departure or arrival.
    pub direction: Direction,
    /// ICAO/IATA aircraft type designator (e.g., "B738", "A333").
    pub aircraft_type: String,
    /// Aircraft registration, if known.
    pub registration: Option<String>,
    /// Scheduled runway time (s).
    pub scheduled_s: i64,
    /// Recorded (ground-truth) operation time (s).
    pub actual_s: i64,
}

impl FlightInput {
    /// Creates an input row.
    pub fn new(
        id: impl Into<String>,
        direction: Direction,
        aircraft_type: impl Into<String>,
        scheduled_s: i64,
        actual_s: i64,
    ) -> Self {
        Self {
            id: id.into(),
            direction,
            aircraft_type: aircraft_type.into(),
            registration: None,
            scheduled_s,
            actual_s,
        }
    }

    /// Sets the registration.
    pub fn with_registration(mut self, registration: impl Into<String>) -> Self {
        self.registration = Some(registration.into());
        self
    }
}

/// A classified flight, optionally realized by a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Flight identifier.
    pub id: String,
    /// Departure or arrival.
    pub direction: Direction,
    /// Aircraft type designator (kept for reporting).
    pub aircraft_type: String,
    /// Scheduled runway time (s).
    pub scheduled_s: i64,
    /// Recorded (ground-truth) operation time (s).
    pub actual_s: i64,
    /// Wake category. `None` = not classified.
    pub wake: Option<WakeCategory>,
    #[serde(default)]
    assignment: Option<RunwayAssignment>,
}

/// Scheduler-assigned part of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunwayAssignment {
    /// Runway the flight was scheduled on.
    pub runway: String,
    /// Start of the runway occupancy (s).
    pub start_s: i64,
    /// End of the runway occupancy (s).
    pub end_s: i64,
    /// Realized time: runway start plus taxi buffer (s).
    pub realized_s: i64,
}

impl FlightRecord {
    /// Creates an unrealized record.
    pub fn new(
        id: impl Into<String>,
        direction: Direction,
        scheduled_s: i64,
        actual_s: i64,
    ) -> Self {
        Self {
            id: id.into(),
            direction,
            aircraft_type: String::new(),
            scheduled_s,
            actual_s,
            wake: None,
            assignment: None,
        }
    }

    /// Sets the wake category.
    pub fn with_wake(mut self, wake: WakeCategory) -> Self {
        self.wake = Some(wake);
        self
    }

    /// Sets the aircraft type designator.
    pub fn with_aircraft_type(mut self, aircraft_type: impl Into<String>) -> Self {
        self.aircraft_type = aircraft_type.into();
        self
    }

    /// Returns a copy carrying the scheduler's assignment.
    ///
    /// Assignments are not overwritten: realizing an already realized
    /// record returns it unchanged.
    pub(crate) fn realized(&self, assignment: RunwayAssignment) -> Self {
        let mut record = self.clone();
        if record.assignment.is_none() {
            record.assignment = Some(assignment);
        }
        record
    }

    /// The scheduler's assignment, if the record was realized.
    pub fn assignment(&self) -> Option<&RunwayAssignment> {
        self.assignment.as_ref()
    }

    /// Assigned runway.
    pub fn runway(&self) -> Option<&str> {
        self.assignment.as_ref().map(|a| a.runway.as_str())
    }

    /// Simulated runway operation time (s).
    pub fn simulated_s(&self) -> Option<i64> {
        self.assignment.as_ref().map(|a| a.start_s)
    }

    /// Realized time used downstream: runway start plus taxi buffer (s).
    pub fn realized_s(&self) -> Option<i64> {
        self.assignment.as_ref().map(|a| a.realized_s)
    }

    /// Delay = simulated − scheduled (s).
    pub fn delay_s(&self) -> Option<i64> {
        self.simulated_s().map(|t| t - self.scheduled_s)
    }

    /// Recorded delay = actual − scheduled (s), clamped at zero.
    pub fn recorded_delay_s(&self) -> i64 {
        (self.actual_s - self.scheduled_s).max(0)
    }

    /// Whether the record was realized by a simulation run.
    pub fn is_realized(&self) -> bool {
        self.assignment.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(start_s: i64) -> RunwayAssignment {
        RunwayAssignment {
            runway: "02L".into(),
            start_s,
            end_s: start_s + 60,
            realized_s: start_s + 600,
        }
    }

    #[test]
    fn test_unrealized_record() {
        let r = FlightRecord::new("CZ3101", Direction::Departure, 3600, 3900)
            .with_wake(WakeCategory::Medium)
            .with_aircraft_type("A320");
        assert!(!r.is_realized());
        assert_eq!(r.delay_s(), None);
        assert_eq!(r.runway(), None);
        assert_eq!(r.recorded_delay_s(), 300);
    }

    #[test]
    fn test_realized_record() {
        let r = FlightRecord::new("CZ3101", Direction::Departure, 3600, 3900);
        let realized = r.realized(assignment(3720));
        assert_eq!(realized.runway(), Some("02L"));
        assert_eq!(realized.simulated_s(), Some(3720));
        assert_eq!(realized.delay_s(), Some(120));
        assert_eq!(realized.realized_s(), Some(4320));
        // Original untouched.
        assert!(!r.is_realized());
    }

    #[test]
    fn test_assignment_written_once() {
        let r = FlightRecord::new("MU5301", Direction::Arrival, 0, 0).realized(assignment(10));
        let again = r.realized(assignment(500));
        assert_eq!(again.simulated_s(), Some(10));
    }

    #[test]
    fn test_recorded_delay_never_negative() {
        let r = FlightRecord::new("HU7801", Direction::Arrival, 1000, 700);
        assert_eq!(r.recorded_delay_s(), 0);
    }

    #[test]
    fn test_input_builder() {
        let input = FlightInput::new("CZ3101", Direction::Departure, "B738", 0, 60)
            .with_registration("B-1234");
        assert_eq!(input.registration.as_deref(), Some("B-1234"));
    }
}
