//! Runway schedulers and run statistics.
//!
//! # Algorithm
//!
//! `RunwayScheduler` is a first-come-first-served list scheduler for one
//! runway: each flight, in scheduled order, takes the earliest start that
//! respects runway occupancy and the sequence-dependent wake separation
//! behind the previous flight. `SimulationOrchestrator` runs one scheduler
//! per runway and assigns each flight to the runway that frees up earliest.
//!
//! # Statistics
//!
//! `RunwayStatistics` computes delay and utilization figures of a run.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4
//! - ICAO Doc 4444, PANS-ATM, Ch. 5 (wake turbulence separation minima)

mod kpi;
mod orchestrator;
mod runway;

pub use kpi::{RunwayStatistics, RunwayUsage, DEFAULT_ON_TIME_TOLERANCE_MINUTES};
pub use orchestrator::{SimulationOrchestrator, SimulationResult};
pub use runway::{Binding, RunwaySchedule, RunwayScheduler, SimulationTrace, TraceEntry};
