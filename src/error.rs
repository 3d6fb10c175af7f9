//! Error types for simulation and calibration runs.
//!
//! Record-level problems (`InvalidInput`) are collected and reported
//! alongside a run. Configuration and contract errors abort immediately.

use thiserror::Error;

use crate::models::{Direction, RunwayRole};

/// Crate result type.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised by the simulation core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A malformed record reached the core. Fatal to that record only.
    #[error("invalid input record '{flight_id}': {reason}")]
    InvalidInput { flight_id: String, reason: String },

    /// The aircraft type could not be classified and no default is configured.
    #[error("unknown aircraft type '{designator}' for flight '{flight_id}'")]
    UnknownAircraftType {
        flight_id: String,
        designator: String,
    },

    /// A runway queue was handed over out of scheduled-time order.
    #[error(
        "queue for runway {runway} is not sorted: flight '{flight_id}' at position {position} \
         is scheduled at {scheduled_s}s, before the previous flight at {previous_s}s"
    )]
    UnsortedQueue {
        runway: String,
        position: usize,
        flight_id: String,
        scheduled_s: i64,
        previous_s: i64,
    },

    /// A configuration value is outside its permitted range.
    #[error("configuration value out of range: {field} = {value} (expected {expected})")]
    ConfigurationOutOfRange {
        field: String,
        value: String,
        expected: &'static str,
    },

    /// A flight was routed onto a runway that does not serve its direction.
    #[error("flight '{flight_id}' ({direction:?}) routed to runway {runway} serving {role:?}")]
    RoleMismatch {
        flight_id: String,
        direction: Direction,
        runway: String,
        role: RunwayRole,
    },
}

impl SimError {
    /// Shorthand for a configuration range error.
    pub fn out_of_range(
        field: impl Into<String>,
        value: impl ToString,
        expected: &'static str,
    ) -> Self {
        Self::ConfigurationOutOfRange {
            field: field.into(),
            value: value.to_string(),
            expected,
        }
    }

    /// Stable taxonomy name, used in run summaries.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "InvalidInput",
            Self::UnknownAircraftType { .. } => "UnknownAircraftType",
            Self::UnsortedQueue { .. } => "UnsortedQueue",
            Self::ConfigurationOutOfRange { .. } => "ConfigurationOutOfRange",
            Self::RoleMismatch { .. } => "RoleMismatch",
        }
    }

    /// The value that triggered the error.
    pub fn offending_value(&self) -> String {
        match self {
            Self::InvalidInput { flight_id, .. } => flight_id.clone(),
            Self::UnknownAircraftType { designator, .. } => designator.clone(),
            Self::UnsortedQueue { flight_id, .. } => flight_id.clone(),
            Self::ConfigurationOutOfRange { field, value, .. } => format!("{field}={value}"),
            Self::RoleMismatch { flight_id, .. } => flight_id.clone(),
        }
    }

    /// Whether the error only invalidates a single record.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names_and_values() {
        let e = SimError::out_of_range("min_departure_rot", -5, "> 0");
        assert_eq!(e.name(), "ConfigurationOutOfRange");
        assert_eq!(e.offending_value(), "min_departure_rot=-5");
        assert!(!e.is_record_level());

        let e = SimError::UnknownAircraftType {
            flight_id: "CZ3101".into(),
            designator: "ZZZ9".into(),
        };
        assert_eq!(e.name(), "UnknownAircraftType");
        assert_eq!(e.offending_value(), "ZZZ9");
        assert!(e.to_string().contains("ZZZ9"));
    }

    #[test]
    fn test_record_level() {
        let e = SimError::InvalidInput {
            flight_id: "".into(),
            reason: "empty id".into(),
        };
        assert!(e.is_record_level());
    }
}
