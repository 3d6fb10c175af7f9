//! Runway operations simulation and calibration.
//!
//! Assigns flights to runway time slots under runway occupancy time (ROT)
//! and ICAO wake-turbulence separation, detects backlog periods, scores the
//! simulation against recorded ground truth with four indicators, and
//! searches for the configuration that reproduces the recorded congestion
//! best.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `FlightRecord`, `Runway`, `RunwayTimeline`,
//!   `SeparationMatrix`, `CongestionPeriod`
//! - **`config`**: Immutable, eagerly validated `Configuration`
//! - **`classifier`**: Aircraft type → wake category lookup
//! - **`scheduler`**: Per-runway scheduler, multi-runway orchestrator, statistics
//! - **`congestion`**: Backlog period detection, ground truth
//! - **`metrics`**: Four-indicator validation and secondary objectives
//! - **`optimize`**: Seeded local search over the configuration
//! - **`simulation`**: End-to-end pipeline and run summaries
//! - **`validation`**: Input integrity and run consistency checks
//!
//! # Pipeline
//!
//! ```text
//! FlightInput → classify → FlightRecord → schedule → realized FlightRecord
//!     → detect → CongestionPeriod → validate → ValidationOutcome → optimize
//! ```
//!
//! # Example
//!
//! ```
//! use runway_sim::classifier::AircraftClassifier;
//! use runway_sim::config::Configuration;
//! use runway_sim::metrics::TargetMetrics;
//! use runway_sim::models::{Direction, FlightInput};
//! use runway_sim::simulation::calibrate;
//!
//! let inputs = vec![
//!     FlightInput::new("CZ3101", Direction::Departure, "A333", 3600, 3900),
//!     FlightInput::new("MU5301", Direction::Arrival, "A320", 3660, 3700),
//! ];
//! let summary = calibrate(
//!     &inputs,
//!     &AircraftClassifier::new(),
//!     &Configuration::default(),
//!     &TargetMetrics::default(),
//! );
//! assert!(summary.is_completed());
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - ICAO Doc 4444, "Procedures for Air Navigation Services: Air Traffic Management"
//! - Bianco, Dell'Olmo & Giordani (2006), "Scheduling models for air traffic
//!   control in terminal areas"

pub mod classifier;
pub mod config;
pub mod congestion;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod optimize;
pub mod scheduler;
pub mod simulation;
pub mod validation;

pub use error::{Result, SimError};
