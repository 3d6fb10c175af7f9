//! Runway model.
//!
//! A runway serves exactly one role for the duration of a run. Its
//! timeline is the ordered list of occupancy intervals produced by the
//! runway scheduler.

use serde::{Deserialize, Serialize};

use super::{Direction, WakeCategory};

/// Operational role of a runway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunwayRole {
    /// Used for take-offs only.
    Departure,
    /// Used for landings only.
    Arrival,
}

impl RunwayRole {
    /// Role serving the given direction.
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Departure => Self::Departure,
            Direction::Arrival => Self::Arrival,
        }
    }

    /// Whether this role serves the given direction.
    pub fn serves(self, direction: Direction) -> bool {
        self == Self::for_direction(direction)
    }
}

/// A configured runway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runway {
    /// Runway designator (e.g., "02L").
    pub id: String,
    /// Assigned role.
    pub role: RunwayRole,
}

impl Runway {
    /// Creates a runway.
    pub fn new(id: impl Into<String>, role: RunwayRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Creates a departure runway.
    pub fn departure(id: impl Into<String>) -> Self {
        Self::new(id, RunwayRole::Departure)
    }

    /// Creates an arrival runway.
    pub fn arrival(id: impl Into<String>) -> Self {
        Self::new(id, RunwayRole::Arrival)
    }
}

/// One runway occupancy `[start_s, end_s)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    /// Occupying flight.
    pub flight_id: String,
    /// Wake category of the occupying flight.
    pub wake: WakeCategory,
    /// Start (s).
    pub start_s: i64,
    /// End (s).
    pub end_s: i64,
}

impl Occupancy {
    /// Duration (s).
    #[inline]
    pub fn duration_s(&self) -> i64 {
        self.end_s - self.start_s
    }
}

/// Ordered occupancy intervals of one runway.
///
/// Intervals are non-overlapping and strictly ordered by start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunwayTimeline {
    /// Runway designator.
    pub runway: String,
    /// Runway role.
    pub role: RunwayRole,
    occupancies: Vec<Occupancy>,
}

impl RunwayTimeline {
    /// Creates an empty timeline.
    pub fn new(runway: impl Into<String>, role: RunwayRole) -> Self {
        Self {
            runway: runway.into(),
            role,
            occupancies: Vec::new(),
        }
    }

    /// Appends an occupancy. Callers guarantee it starts at or after the
    /// last occupancy's end.
    pub(crate) fn push(&mut self, occupancy: Occupancy) {
        debug_assert!(self
            .last()
            .map_or(true, |prev| occupancy.start_s >= prev.end_s));
        self.occupancies.push(occupancy);
    }

    /// Occupancies in time order.
    pub fn occupancies(&self) -> &[Occupancy] {
        &self.occupancies
    }

    /// Most recent occupancy.
    pub fn last(&self) -> Option<&Occupancy> {
        self.occupancies.last()
    }

    /// End of the most recent occupancy (`None` = never used).
    pub fn free_at(&self) -> Option<i64> {
        self.last().map(|o| o.end_s)
    }

    /// Total occupied time (s).
    pub fn busy_s(&self) -> i64 {
        self.occupancies.iter().map(Occupancy::duration_s).sum()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.occupancies.len()
    }

    /// Whether the runway saw no operation.
    pub fn is_empty(&self) -> bool {
        self.occupancies.is_empty()
    }
}
