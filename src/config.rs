//! Simulation configuration.
//!
//! `Configuration` is an immutable value. It is produced by
//! [`ConfigBuilder::build`], which validates every field eagerly, and is
//! never mutated afterwards: optimization steps derive a new value through
//! [`Configuration::to_builder`].
//!
//! Units follow the configuration surface: runway occupancy and separation
//! in seconds, buffers and tolerances in minutes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Result, SimError};
use crate::models::{Runway, RunwayRole, SeparationMatrix, WakeCategory};

/// Upper bound of any ROT or separation value (one day, in seconds).
pub const MAX_DURATION_S: i64 = 86_400;

/// Upper bound of any buffer or threshold in minutes (one day).
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

/// Thresholds used by the four validation indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationThresholds {
    /// Max start deviation of a matched period (minutes).
    pub period_tolerance_minutes: f64,
    /// Max relative peak deviation (fraction, 0..=1).
    pub peak_deviation_threshold: f64,
    /// Max relative duration deviation (fraction, 0..=1).
    pub duration_tolerance_ratio: f64,
    /// Max deviation of the latest operation time (minutes).
    pub latest_tolerance_minutes: f64,
    /// Share of periods that must satisfy indicators 1 and 2 (0..=1).
    pub match_pass_fraction: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            period_tolerance_minutes: 60.0,
            peak_deviation_threshold: 0.15,
            duration_tolerance_ratio: 0.3,
            latest_tolerance_minutes: 30.0,
            match_pass_fraction: 0.8,
        }
    }
}

/// Congestion detection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CongestionSettings {
    /// A period is congested while the backlogged count is strictly above this.
    pub backlog_threshold: usize,
    /// A flight is backlogged once its delay exceeds this (minutes).
    pub delay_threshold_minutes: i64,
}

impl Default for CongestionSettings {
    fn default() -> Self {
        Self {
            backlog_threshold: 10,
            delay_threshold_minutes: 15,
        }
    }
}

impl CongestionSettings {
    /// Delay threshold in seconds.
    pub fn delay_threshold_s(&self) -> i64 {
        self.delay_threshold_minutes * 60
    }
}

/// Optimizer budget and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Maximum number of trials, including the baseline trial 0.
    pub max_iterations: usize,
    /// Pass-count at which the loop converges (0..=4).
    pub min_passed_metrics: u8,
    /// Random seed for candidate generation.
    pub seed: u64,
    /// Trials evaluated per batch (1 = strictly sequential).
    pub batch_size: usize,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            min_passed_metrics: 3,
            seed: 42,
            batch_size: 1,
        }
    }
}

/// Immutable, validated simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfigBuilder", into = "ConfigBuilder")]
pub struct Configuration {
    departure_rot_s: i64,
    arrival_rot_s: i64,
    taxi_buffer_minutes: i64,
    separation: SeparationMatrix,
    runways: Vec<Runway>,
    default_wake: Option<WakeCategory>,
    thresholds: ValidationThresholds,
    congestion: CongestionSettings,
    optimizer: OptimizerSettings,
}

/// Builder (and serde surface) for [`Configuration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigBuilder {
    /// Minimum departure runway occupancy (s, > 0).
    pub min_departure_rot: i64,
    /// Minimum arrival runway occupancy (s, > 0).
    pub min_arrival_rot: i64,
    /// Ground-movement buffer (minutes, >= 0).
    pub taxi_buffer_minutes: i64,
    /// Wake separation matrix (entries > 0).
    pub wake_separation: SeparationMatrix,
    /// Runways in declaration order (order breaks load-balancing ties).
    pub runways: Vec<Runway>,
    /// Category used when an aircraft type cannot be classified.
    pub default_wake_category: Option<WakeCategory>,
    /// Validation thresholds.
    pub thresholds: ValidationThresholds,
    /// Congestion detection.
    pub congestion: CongestionSettings,
    /// Optimizer settings.
    pub optimizer: OptimizerSettings,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            min_departure_rot: 60,
            min_arrival_rot: 45,
            taxi_buffer_minutes: 10,
            wake_separation: SeparationMatrix::icao(),
            runways: vec![
                Runway::departure("01L"),
                Runway::departure("01R"),
                Runway::arrival("07L"),
                Runway::arrival("07R"),
            ],
            default_wake_category: None,
            thresholds: ValidationThresholds::default(),
            congestion: CongestionSettings::default(),
            optimizer: OptimizerSettings::default(),
        }
    }
}

impl ConfigBuilder {
    /// Sets the minimum departure ROT (s).
    pub fn with_departure_rot(mut self, seconds: i64) -> Self {
        self.min_departure_rot = seconds;
        self
    }

    /// Sets the minimum arrival ROT (s).
    pub fn with_arrival_rot(mut self, seconds: i64) -> Self {
        self.min_arrival_rot = seconds;
        self
    }

    /// Sets the taxi buffer (minutes).
    pub fn with_taxi_buffer(mut self, minutes: i64) -> Self {
        self.taxi_buffer_minutes = minutes;
        self
    }

    /// Replaces the separation matrix.
    pub fn with_separation(mut self, matrix: SeparationMatrix) -> Self {
        self.wake_separation = matrix;
        self
    }

    /// Sets a single separation entry (s).
    pub fn with_separation_entry(
        mut self,
        leading: WakeCategory,
        trailing: WakeCategory,
        seconds: i64,
    ) -> Self {
        self.wake_separation.set(leading, trailing, seconds);
        self
    }

    /// Replaces the runway list.
    pub fn with_runways(mut self, runways: Vec<Runway>) -> Self {
        self.runways = runways;
        self
    }

    /// Sets the fallback wake category for unclassified aircraft.
    pub fn with_default_wake(mut self, wake: WakeCategory) -> Self {
        self.default_wake_category = Some(wake);
        self
    }

    /// Replaces the validation thresholds.
    pub fn with_thresholds(mut self, thresholds: ValidationThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Sets the backlog threshold.
    pub fn with_backlog_threshold(mut self, threshold: usize) -> Self {
        self.congestion.backlog_threshold = threshold;
        self
    }

    /// Sets the delay above which a flight counts as backlogged (minutes).
    pub fn with_delay_threshold(mut self, minutes: i64) -> Self {
        self.congestion.delay_threshold_minutes = minutes;
        self
    }

    /// Replaces the optimizer settings.
    pub fn with_optimizer(mut self, optimizer: OptimizerSettings) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Validates all fields and produces the configuration.
    pub fn build(self) -> Result<Configuration> {
        check_seconds("min_departure_rot", self.min_departure_rot)?;
        check_seconds("min_arrival_rot", self.min_arrival_rot)?;
        check_minutes("taxi_buffer_minutes", self.taxi_buffer_minutes)?;
        check_minutes("delay_threshold_minutes", self.congestion.delay_threshold_minutes)?;
        for e in self.wake_separation.entries() {
            check_seconds(
                &format!("wake_separation[{},{}]", e.leading, e.trailing),
                e.seconds,
            )?;
        }

        let mut seen = HashSet::new();
        for r in &self.runways {
            if r.id.trim().is_empty() {
                return Err(SimError::out_of_range("runways", "\"\"", "non-empty runway id"));
            }
            if !seen.insert(r.id.as_str()) {
                return Err(SimError::out_of_range(
                    "runways",
                    &r.id,
                    "each runway declared once with exactly one role",
                ));
            }
        }
        for role in [RunwayRole::Departure, RunwayRole::Arrival] {
            if !self.runways.iter().any(|r| r.role == role) {
                return Err(SimError::out_of_range(
                    "runways",
                    format!("no {role:?} runway"),
                    "at least one runway per role",
                ));
            }
        }

        let t = &self.thresholds;
        check_non_negative("period_tolerance_minutes", t.period_tolerance_minutes)?;
        check_fraction("peak_deviation_threshold", t.peak_deviation_threshold)?;
        check_fraction("duration_tolerance_ratio", t.duration_tolerance_ratio)?;
        check_non_negative("latest_tolerance_minutes", t.latest_tolerance_minutes)?;
        check_fraction("match_pass_fraction", t.match_pass_fraction)?;

        let o = &self.optimizer;
        if o.max_iterations == 0 {
            return Err(SimError::out_of_range("max_iterations", 0, "> 0"));
        }
        if o.min_passed_metrics > 4 {
            return Err(SimError::out_of_range(
                "min_passed_metrics",
                o.min_passed_metrics,
                "0..=4",
            ));
        }
        if o.batch_size == 0 {
            return Err(SimError::out_of_range("batch_size", 0, "> 0"));
        }

        Ok(Configuration {
            departure_rot_s: self.min_departure_rot,
            arrival_rot_s: self.min_arrival_rot,
            taxi_buffer_minutes: self.taxi_buffer_minutes,
            separation: self.wake_separation,
            runways: self.runways,
            default_wake: self.default_wake_category,
            thresholds: self.thresholds,
            congestion: self.congestion,
            optimizer: self.optimizer,
        })
    }
}

fn check_seconds(field: &str, value: i64) -> Result<()> {
    if (1..=MAX_DURATION_S).contains(&value) {
        Ok(())
    } else {
        Err(SimError::out_of_range(field, value, "1..=86400 seconds"))
    }
}

fn check_minutes(field: &str, value: i64) -> Result<()> {
    if (0..=MAX_DURATION_MINUTES).contains(&value) {
        Ok(())
    } else {
        Err(SimError::out_of_range(field, value, "0..=1440 minutes"))
    }
}

fn check_fraction(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::out_of_range(field, value, "fraction in 0..=1"))
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::out_of_range(field, value, ">= 0 minutes"))
    }
}

impl Configuration {
    /// Starts from the reference airport defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Returns a builder pre-filled with this configuration.
    pub fn to_builder(&self) -> ConfigBuilder {
        self.clone().into()
    }

    /// Minimum departure ROT (s).
    pub fn departure_rot_s(&self) -> i64 {
        self.departure_rot_s
    }

    /// Minimum arrival ROT (s).
    pub fn arrival_rot_s(&self) -> i64 {
        self.arrival_rot_s
    }

    /// ROT applying to a runway role (s).
    pub fn rot_s(&self, role: RunwayRole) -> i64 {
        match role {
            RunwayRole::Departure => self.departure_rot_s,
            RunwayRole::Arrival => self.arrival_rot_s,
        }
    }

    /// Taxi buffer (minutes).
    pub fn taxi_buffer_minutes(&self) -> i64 {
        self.taxi_buffer_minutes
    }

    /// Taxi buffer (s).
    pub fn taxi_buffer_s(&self) -> i64 {
        self.taxi_buffer_minutes * 60
    }

    /// Wake separation matrix.
    pub fn separation(&self) -> &SeparationMatrix {
        &self.separation
    }

    /// Runways in declaration order.
    pub fn runways(&self) -> &[Runway] {
        &self.runways
    }

    /// Runways serving a role, in declaration order.
    pub fn runways_for(&self, role: RunwayRole) -> impl Iterator<Item = &Runway> + '_ {
        self.runways.iter().filter(move |r| r.role == role)
    }

    /// Role of a runway, if configured.
    pub fn role_of(&self, runway: &str) -> Option<RunwayRole> {
        self.runways.iter().find(|r| r.id == runway).map(|r| r.role)
    }

    /// Fallback for unclassified aircraft.
    pub fn default_wake(&self) -> Option<WakeCategory> {
        self.default_wake
    }

    /// Validation thresholds.
    pub fn thresholds(&self) -> &ValidationThresholds {
        &self.thresholds
    }

    /// Congestion settings.
    pub fn congestion(&self) -> &CongestionSettings {
        &self.congestion
    }

    /// Optimizer settings.
    pub fn optimizer(&self) -> &OptimizerSettings {
        &self.optimizer
    }
}

impl Default for Configuration {
    fn default() -> Self {
        let b = ConfigBuilder::default();
        Self {
            departure_rot_s: b.min_departure_rot,
            arrival_rot_s: b.min_arrival_rot,
            taxi_buffer_minutes: b.taxi_buffer_minutes,
            separation: b.wake_separation,
            runways: b.runways,
            default_wake: b.default_wake_category,
            thresholds: b.thresholds,
            congestion: b.congestion,
            optimizer: b.optimizer,
        }
    }
}

impl TryFrom<ConfigBuilder> for Configuration {
    type Error = SimError;

    fn try_from(builder: ConfigBuilder) -> Result<Self> {
        builder.build()
    }
}

impl From<Configuration> for ConfigBuilder {
    fn from(c: Configuration) -> Self {
        Self {
            min_departure_rot: c.departure_rot_s,
            min_arrival_rot: c.arrival_rot_s,
            taxi_buffer_minutes: c.taxi_buffer_minutes,
            wake_separation: c.separation,
            runways: c.runways,
            default_wake_category: c.default_wake,
            thresholds: c.thresholds,
            congestion: c.congestion,
            optimizer: c.optimizer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let c = Configuration::builder().build().unwrap();
        assert_eq!(c, Configuration::default());
        assert_eq!(c.departure_rot_s(), 60);
        assert_eq!(c.arrival_rot_s(), 45);
        assert_eq!(c.taxi_buffer_s(), 600);
        assert_eq!(c.congestion().delay_threshold_minutes, 15);
        assert_eq!(c.congestion().delay_threshold_s(), 900);
        assert_eq!(c.runways_for(RunwayRole::Departure).count(), 2);
        assert_eq!(c.role_of("07L"), Some(RunwayRole::Arrival));
        assert_eq!(c.role_of("99"), None);
    }

    #[test]
    fn test_negative_rot_rejected() {
        let err = Configuration::builder()
            .with_departure_rot(-10)
            .build()
            .unwrap_err();
        assert_eq!(err.name(), "ConfigurationOutOfRange");
        assert_eq!(err.offending_value(), "min_departure_rot=-10");
    }

    #[test]
    fn test_durations_bounded() {
        let err = Configuration::builder()
            .with_taxi_buffer(i64::MAX / 2)
            .build()
            .unwrap_err();
        assert_eq!(err.name(), "ConfigurationOutOfRange");
        assert!(err.offending_value().starts_with("taxi_buffer_minutes="));

        assert!(Configuration::builder().with_taxi_buffer(MAX_DURATION_MINUTES).build().is_ok());
        assert!(Configuration::builder().with_departure_rot(MAX_DURATION_S + 1).build().is_err());
        assert!(Configuration::builder().with_delay_threshold(-1).build().is_err());
        assert!(Configuration::builder()
            .with_separation_entry(WakeCategory::Heavy, WakeCategory::Light, i64::MAX)
            .build()
            .is_err());
    }

    #[test]
    fn test_zero_separation_rejected() {
        let err = Configuration::builder()
            .with_separation_entry(WakeCategory::Heavy, WakeCategory::Light, 0)
            .build()
            .unwrap_err();
        assert!(err.offending_value().starts_with("wake_separation[Heavy,Light]"));
    }

    #[test]
    fn test_runway_roles_validated() {
        let dup = Configuration::builder()
            .with_runways(vec![
                Runway::departure("01"),
                Runway::arrival("01"),
            ])
            .build();
        assert!(dup.is_err());

        let no_arrival = Configuration::builder()
            .with_runways(vec![Runway::departure("01")])
            .build();
        assert!(no_arrival.is_err());
    }

    #[test]
    fn test_threshold_ranges() {
        let bad = ValidationThresholds {
            peak_deviation_threshold: 1.5,
            ..Default::default()
        };
        assert!(Configuration::builder().with_thresholds(bad).build().is_err());

        let nan = ValidationThresholds {
            period_tolerance_minutes: f64::NAN,
            ..Default::default()
        };
        assert!(Configuration::builder().with_thresholds(nan).build().is_err());
    }

    #[test]
    fn test_optimizer_ranges() {
        let bad = OptimizerSettings {
            min_passed_metrics: 5,
            ..Default::default()
        };
        assert!(Configuration::builder().with_optimizer(bad).build().is_err());

        let zero = OptimizerSettings {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(Configuration::builder().with_optimizer(zero).build().is_err());
    }

    #[test]
    fn test_to_builder_produces_new_value() {
        let base = Configuration::default();
        let next = base.to_builder().with_departure_rot(120).build().unwrap();
        assert_eq!(base.departure_rot_s(), 60);
        assert_eq!(next.departure_rot_s(), 120);
        assert_eq!(next.separation(), base.separation());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Configuration =
            serde_json::from_str(r#"{"min_departure_rot": 120, "taxi_buffer_minutes": 5}"#)
                .unwrap();
        assert_eq!(ok.departure_rot_s(), 120);
        assert_eq!(ok.arrival_rot_s(), 45);

        let bad = serde_json::from_str::<Configuration>(r#"{"min_arrival_rot": -1}"#);
        assert!(bad.is_err());
    }
}
