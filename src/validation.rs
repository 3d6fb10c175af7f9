//! Input validation and run consistency checks.
//!
//! [`validate_inputs`] checks the structural integrity of ingested flight rows
//! before classification. Detects:
//! - Empty flight IDs
//! - Duplicate flight IDs (later rows are rejected)
//! - Missing aircraft type without a registration override
//!
//! Rejected rows become `InvalidInput` record errors; the run proceeds with
//! the rest.
//!
//! [`check_consistency`] audits a finished run against the scheduling
//! invariants: no negative delay, runway role matches direction, occupancies
//! ordered and disjoint, wake separation honored. Extreme delays are
//! reported as notices.

use std::collections::HashSet;

use crate::classifier::AircraftClassifier;
use crate::config::Configuration;
use crate::error::SimError;
use crate::models::FlightInput;
use crate::scheduler::SimulationResult;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Delay above which a flight is reported as extreme (minutes).
pub const EXTREME_DELAY_MINUTES: i64 = 180;

/// A rejected input row.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Position of the row in the input.
    pub index: usize,
    /// Flight ID of the row (may be empty).
    pub flight_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Categories of input validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The flight ID is empty.
    EmptyId,
    /// Two rows share the same flight ID.
    DuplicateId,
    /// No aircraft type and no registration override.
    MissingAircraftType,
}

impl ValidationError {
    fn new(
        kind: ValidationErrorKind,
        index: usize,
        flight_id: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            index,
            flight_id: flight_id.to_string(),
            message: message.into(),
        }
    }
}

impl From<ValidationError> for SimError {
    fn from(e: ValidationError) -> Self {
        let flight_id = if e.flight_id.is_empty() {
            format!("#{}", e.index)
        } else {
            e.flight_id
        };
        SimError::InvalidInput {
            flight_id,
            reason: e.message,
        }
    }
}

/// Validates ingested flight rows.
///
/// Checks:
/// 1. Every row has a non-empty flight ID
/// 2. No flight ID appears twice (the first row wins)
/// 3. Every row has an aircraft type or a registration with an override
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_inputs(inputs: &[FlightInput], classifier: &AircraftClassifier) -> ValidationResult {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();

    for (index, input) in inputs.iter().enumerate() {
        let id = input.id.trim();
        if id.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyId,
                index,
                id,
                format!("Row {index} has no flight ID"),
            ));
            continue;
        }
        if !ids.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                index,
                id,
                format!("Duplicate flight ID: {id}"),
            ));
            continue;
        }

        let overridden = input
            .registration
            .as_deref()
            .map_or(false, |reg| classifier.has_override(reg));
        if input.aircraft_type.trim().is_empty() && !overridden {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingAircraftType,
                index,
                id,
                format!("Flight '{id}' has no aircraft type"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A broken scheduling invariant (or notice) found in a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Violation category.
    pub kind: ViolationKind,
    /// Flight concerned.
    pub flight_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Categories of run consistency findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// Simulated time before scheduled time.
    NegativeDelay,
    /// Flight on a runway whose role differs from its direction.
    RoleMismatch,
    /// Occupancies out of order or overlapping.
    OverlappingOccupancy,
    /// Gap after the previous occupant clears is below the wake separation.
    SeparationViolation,
    /// Delay above [`EXTREME_DELAY_MINUTES`]. A notice, not an error.
    ExtremeDelay,
}

impl ViolationKind {
    /// Whether the finding breaks a scheduling invariant.
    pub fn is_error(self) -> bool {
        !matches!(self, Self::ExtremeDelay)
    }
}

impl Violation {
    fn new(kind: ViolationKind, flight_id: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            flight_id: flight_id.to_string(),
            message: message.into(),
        }
    }
}

/// Audits a finished run.
///
/// A run produced by the scheduler yields no errors; only
/// `ExtremeDelay` notices can appear.
pub fn check_consistency(result: &SimulationResult, config: &Configuration) -> Vec<Violation> {
    let mut violations = Vec::new();

    for f in &result.flights {
        let Some(delay_s) = f.delay_s() else {
            continue;
        };
        if delay_s < 0 {
            violations.push(Violation::new(
                ViolationKind::NegativeDelay,
                &f.id,
                format!("Flight '{}' simulated {}s before schedule", f.id, -delay_s),
            ));
        } else if delay_s > EXTREME_DELAY_MINUTES * 60 {
            violations.push(Violation::new(
                ViolationKind::ExtremeDelay,
                &f.id,
                format!("Flight '{}' delayed {} minutes", f.id, delay_s / 60),
            ));
        }

        let runway = f.runway().unwrap_or_default();
        let serves = config.role_of(runway).map_or(false, |role| role.serves(f.direction));
        if !serves {
            violations.push(Violation::new(
                ViolationKind::RoleMismatch,
                &f.id,
                format!("Flight '{}' ({:?}) on runway '{runway}'", f.id, f.direction),
            ));
        }
    }

    let separation = config.separation();
    for timeline in &result.timelines {
        for pair in timeline.occupancies().windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.start_s < prev.end_s {
                violations.push(Violation::new(
                    ViolationKind::OverlappingOccupancy,
                    &next.flight_id,
                    format!(
                        "Runway {}: '{}' starts at {}s before '{}' ends at {}s",
                        timeline.runway, next.flight_id, next.start_s, prev.flight_id, prev.end_s
                    ),
                ));
            }
            let required = separation.separation(prev.wake, next.wake);
            if next.start_s >= prev.end_s && next.start_s < prev.end_s + required {
                violations.push(Violation::new(
                    ViolationKind::SeparationViolation,
                    &next.flight_id,
                    format!(
                        "Runway {}: '{}' starts {}s after '{}' clears, {}s required",
                        timeline.runway,
                        next.flight_id,
                        next.start_s - prev.end_s,
                        prev.flight_id,
                        required
                    ),
                ));
            }
        }
    }

    violations
}
