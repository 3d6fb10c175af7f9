//! Runway-operations domain models.
//!
//! Plain data types shared by every pipeline stage. Each stage takes
//! these as immutable inputs and returns new values.
//!
//! # Domain Mappings
//!
//! | runway-sim | Scheduling term |
//! |------------|-----------------|
//! | FlightRecord | Job with release time |
//! | Runway | Disjunctive resource |
//! | SeparationMatrix | Sequence-dependent setup matrix |
//! | RunwayTimeline | Resource schedule |

mod flight;
mod period;
mod runway;
mod wake;

pub use flight::{Direction, FlightInput, FlightRecord, RunwayAssignment};
pub use period::CongestionPeriod;
pub use runway::{Occupancy, Runway, RunwayRole, RunwayTimeline};
pub use wake::{SeparationEntry, SeparationMatrix, WakeCategory};
