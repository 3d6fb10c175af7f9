//! End-to-end pipeline.
//!
//! Each stage takes immutable inputs and returns new values:
//!
//! ```text
//! FlightInput ──prepare_flights──▶ FlightRecord ──simulate──▶ SimulationRun
//!                                                   │
//!                         GroundTruth ──evaluate────┴──▶ ValidationOutcome
//! ```
//!
//! [`calibrate`] runs the whole chain once and always yields a
//! [`RunSummary`]: either a complete outcome or the accumulated record
//! errors plus the fatal error.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classifier::AircraftClassifier;
use crate::config::Configuration;
use crate::congestion::{CongestionDetector, GroundTruth};
use crate::error::{Result, SimError};
use crate::metrics::{ResultValidator, TargetMetrics, ValidationOutcome};
use crate::models::{CongestionPeriod, FlightInput, FlightRecord, RunwayTimeline};
use crate::scheduler::{
    RunwayStatistics, SimulationOrchestrator, SimulationTrace, DEFAULT_ON_TIME_TOLERANCE_MINUTES,
};
use crate::validation::validate_inputs;

/// Classified records ready for simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedFlights {
    /// Records that passed validation, in input order.
    pub records: Vec<FlightRecord>,
    /// Rejected rows (`InvalidInput`).
    pub record_errors: Vec<SimError>,
    /// Records whose type was unknown and received the default category.
    pub downgraded: usize,
}

impl PreparedFlights {
    /// Number of rows skipped.
    pub fn skipped(&self) -> usize {
        self.record_errors.len()
    }
}

/// Validates and classifies ingested rows.
///
/// Invalid rows are skipped and reported. An unknown aircraft type falls
/// back to the configured default category with a warning; without a
/// default the record stays unclassified and the simulation will fail
/// with `UnknownAircraftType`.
pub fn prepare_flights(
    inputs: &[FlightInput],
    classifier: &AircraftClassifier,
    config: &Configuration,
) -> PreparedFlights {
    let rejected = validate_inputs(inputs, classifier).err().unwrap_or_default();
    let mut skip = vec![false; inputs.len()];
    for e in &rejected {
        warn!(index = e.index, flight = %e.flight_id, "{}", e.message);
        skip[e.index] = true;
    }

    let mut downgraded = 0;
    let records = inputs
        .iter()
        .zip(skip)
        .filter(|(_, skipped)| !skipped)
        .map(|(input, _)| {
            let record =
                FlightRecord::new(input.id.trim(), input.direction, input.scheduled_s, input.actual_s)
                    .with_aircraft_type(input.aircraft_type.trim());
            match classifier.classify(&record.id, &input.aircraft_type, input.registration.as_deref()) {
                Ok(wake) => record.with_wake(wake),
                Err(e) => match config.default_wake() {
                    Some(wake) => {
                        warn!(flight = %record.id, designator = %input.aircraft_type, %wake, "{e}; using default category");
                        downgraded += 1;
                        record.with_wake(wake)
                    }
                    None => {
                        warn!(flight = %record.id, "{e}");
                        record
                    }
                },
            }
        })
        .collect();

    PreparedFlights {
        records,
        record_errors: rejected.into_iter().map(SimError::from).collect(),
        downgraded,
    }
}

/// Everything one simulation run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    /// Realized flights ordered by simulated time.
    pub flights: Vec<FlightRecord>,
    /// Runway timelines in declaration order.
    pub timelines: Vec<RunwayTimeline>,
    /// Simulated congestion periods.
    pub periods: Vec<CongestionPeriod>,
    /// Delay and utilization statistics.
    pub statistics: RunwayStatistics,
    /// Scheduling decisions, when traced.
    pub trace: Option<SimulationTrace>,
}

impl SimulationRun {
    /// Latest runway operation (s), comparable to recorded operation times.
    pub fn latest_operation_s(&self) -> Option<i64> {
        self.flights.iter().filter_map(FlightRecord::simulated_s).max()
    }

    /// Latest realized time including the taxi buffer (s).
    pub fn latest_realized_s(&self) -> Option<i64> {
        self.flights.iter().filter_map(FlightRecord::realized_s).max()
    }

    /// Ground truth equal to this run's own statistics.
    pub fn as_ground_truth(&self) -> GroundTruth {
        GroundTruth::new(self.periods.clone(), self.latest_operation_s())
    }
}

/// Simulates a classified flight set.
pub fn simulate(records: &[FlightRecord], config: &Configuration) -> Result<SimulationRun> {
    run(records, config, false)
}

/// Simulates a classified flight set and records every scheduling decision.
pub fn simulate_traced(records: &[FlightRecord], config: &Configuration) -> Result<SimulationRun> {
    run(records, config, true)
}

fn run(records: &[FlightRecord], config: &Configuration, trace: bool) -> Result<SimulationRun> {
    let result = SimulationOrchestrator::new(config)
        .with_trace(trace)
        .run(records)?;
    let periods = CongestionDetector::from_config(config).detect_simulated(&result.flights);
    let statistics = RunwayStatistics::calculate(&result, DEFAULT_ON_TIME_TOLERANCE_MINUTES);
    Ok(SimulationRun {
        flights: result.flights,
        timelines: result.timelines,
        periods,
        statistics,
        trace: result.trace,
    })
}

/// Validates a run against ground truth.
pub fn evaluate(
    run: &SimulationRun,
    truth: &GroundTruth,
    config: &Configuration,
    targets: &TargetMetrics,
) -> ValidationOutcome {
    ResultValidator::new(config.thresholds())
        .with_targets(*targets)
        .validate(&run.flights, &run.periods, run.latest_operation_s(), truth)
}

/// Final state of a calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunSummary {
    /// The run completed.
    Completed {
        /// Validation result.
        outcome: ValidationOutcome,
        /// Simulation output.
        run: SimulationRun,
        /// Rows skipped as invalid.
        skipped: usize,
        /// Messages of the skipped rows.
        record_errors: Vec<String>,
    },
    /// A fatal error stopped the run.
    Aborted {
        /// Messages of the rows skipped before the failure.
        record_errors: Vec<String>,
        /// Taxonomy name of the fatal error.
        error_name: String,
        /// Value that triggered it.
        offending_value: String,
    },
}

impl RunSummary {
    /// Validation outcome, if completed.
    pub fn outcome(&self) -> Option<&ValidationOutcome> {
        match self {
            Self::Completed { outcome, .. } => Some(outcome),
            Self::Aborted { .. } => None,
        }
    }

    /// Whether the run completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Prepares, simulates and validates in one pass.
///
/// Ground truth is derived from the recorded times of the prepared records.
pub fn calibrate(
    inputs: &[FlightInput],
    classifier: &AircraftClassifier,
    config: &Configuration,
    targets: &TargetMetrics,
) -> RunSummary {
    let prepared = prepare_flights(inputs, classifier, config);
    let record_errors: Vec<String> = prepared.record_errors.iter().map(ToString::to_string).collect();
    let truth = GroundTruth::from_recorded(&prepared.records, &CongestionDetector::from_config(config));

    match simulate(&prepared.records, config) {
        Ok(run) => {
            let outcome = evaluate(&run, &truth, config, targets);
            info!(
                flights = run.flights.len(),
                skipped = prepared.skipped(),
                passed = outcome.pass_count,
                "calibration run completed"
            );
            RunSummary::Completed {
                outcome,
                run,
                skipped: prepared.skipped(),
                record_errors,
            }
        }
        Err(e) => {
            warn!(error = %e, "calibration run aborted");
            RunSummary::Aborted {
                record_errors,
                error_name: e.name().to_string(),
                offending_value: e.offending_value(),
            }
        }
    }
}
