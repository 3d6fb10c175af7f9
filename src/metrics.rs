//! Validation of a simulation run against recorded ground truth.
//!
//! # Indicators
//!
//! | # | Indicator | Per-period check | Aggregate |
//! |---|-----------|------------------|-----------|
//! | 1 | Period deviation | `|sim_start - act_start| <= period_tolerance` | share >= `match_pass_fraction` |
//! | 2 | Duration consistency | `|sim_dur - act_dur| / act_dur <= duration_tolerance_ratio` | share >= `match_pass_fraction` |
//! | 3 | Peak deviation | `|sim_peak - act_peak| / act_peak <= peak_deviation_threshold` | every recorded period |
//! | 4 | Latest operation | `|sim_latest - act_latest| <= latest_tolerance` | single comparison |
//!
//! # Period Matching
//!
//! Each recorded period is matched to the simulated period with the
//! largest positive overlap (ties: earliest). A recorded period without
//! overlap is unmatched. For indicators 1-2 the share is taken over the
//! recorded periods plus the simulated periods no recorded period matched,
//! so spurious and missing periods both count as failures.
//!
//! # Secondary Objectives
//!
//! Mean delay and on-time rate are scored against [`TargetMetrics`] into a
//! secondary score in `[0, 0.6]`. The scalar [`ValidationOutcome::score`]
//! is `pass_count + secondary`, which orders by pass count first.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ValidationThresholds;
use crate::congestion::GroundTruth;
use crate::models::{CongestionPeriod, FlightRecord};
use crate::scheduler::DEFAULT_ON_TIME_TOLERANCE_MINUTES;

/// Tolerance applied to inclusive ratio comparisons.
pub const RATIO_EPSILON: f64 = 1e-12;

/// Weight of each secondary objective.
const SECONDARY_WEIGHT: f64 = 0.3;

/// The four validation indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Indicator {
    /// Start-time deviation of matched periods.
    PeriodDeviation,
    /// Relative duration deviation of matched periods.
    DurationConsistency,
    /// Relative peak-count deviation of every recorded period.
    PeakDeviation,
    /// Deviation of the latest operation time.
    LatestOperation,
}

impl Indicator {
    /// All indicators in reporting order.
    pub const ALL: [Indicator; 4] = [
        Indicator::PeriodDeviation,
        Indicator::DurationConsistency,
        Indicator::PeakDeviation,
        Indicator::LatestOperation,
    ];

    /// Stable snake-case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::PeriodDeviation => "period_deviation",
            Self::DurationConsistency => "duration_consistency",
            Self::PeakDeviation => "peak_deviation",
            Self::LatestOperation => "latest_operation",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Relative deviation `|sim - actual| / actual`.
///
/// A zero reference yields 0 when the simulated value is also zero and
/// infinity otherwise.
pub fn relative_deviation(simulated: f64, actual: f64) -> f64 {
    if actual == 0.0 {
        if simulated == 0.0 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        (simulated - actual).abs() / actual.abs()
    }
}

/// Inclusive ratio check: `ratio <= threshold` up to [`RATIO_EPSILON`].
#[inline]
pub fn within_ratio(ratio: f64, threshold: f64) -> bool {
    ratio <= threshold + RATIO_EPSILON
}

/// Pairing of one recorded period with a simulated period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodMatch {
    /// Index into the recorded periods.
    pub recorded: usize,
    /// Index into the simulated periods (`None` = unmatched).
    pub simulated: Option<usize>,
    /// Overlap (s).
    pub overlap_s: i64,
}

/// Matches each recorded period to the simulated period of maximal overlap.
pub fn match_periods(
    simulated: &[CongestionPeriod],
    recorded: &[CongestionPeriod],
) -> Vec<PeriodMatch> {
    recorded
        .iter()
        .enumerate()
        .map(|(ri, rec)| {
            let mut best: Option<(usize, i64)> = None;
            for (si, sim) in simulated.iter().enumerate() {
                let overlap = sim.overlap_s(rec);
                if overlap > 0 && best.map_or(true, |(_, o)| overlap > o) {
                    best = Some((si, overlap));
                }
            }
            PeriodMatch {
                recorded: ri,
                simulated: best.map(|(si, _)| si),
                overlap_s: best.map_or(0, |(_, o)| o),
            }
        })
        .collect()
}

/// Result of one indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    /// Which indicator.
    pub indicator: Indicator,
    /// Whether it passed.
    pub passed: bool,
    /// Checks satisfied.
    pub satisfied: usize,
    /// Checks evaluated (including unmatched periods).
    pub evaluated: usize,
    /// Worst deviation observed: minutes for indicators 1 and 4, a ratio for
    /// 2 and 3. `None` when nothing was compared.
    pub max_deviation: Option<f64>,
}

impl IndicatorResult {
    fn aggregate(
        indicator: Indicator,
        deviations: &[Option<f64>],
        within: impl Fn(f64) -> bool,
        pass_fraction: Option<f64>,
    ) -> Self {
        let evaluated = deviations.len();
        let satisfied = deviations
            .iter()
            .filter(|d| d.map_or(false, &within))
            .count();
        let passed = match pass_fraction {
            _ if evaluated == 0 => true,
            Some(fraction) => satisfied as f64 >= fraction * evaluated as f64 - RATIO_EPSILON,
            None => satisfied == evaluated,
        };
        let max_deviation = deviations
            .iter()
            .flatten()
            .copied()
            .max_by(f64::total_cmp);
        Self {
            indicator,
            passed,
            satisfied,
            evaluated,
            max_deviation,
        }
    }
}

/// Caller-supplied targets for the secondary objectives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetMetrics {
    /// Pass count that counts as success (0..=4).
    pub min_passed_metrics: u8,
    /// Mean delay target (minutes).
    pub max_mean_delay_minutes: f64,
    /// On-time rate target (percent).
    pub min_on_time_rate: f64,
    /// Delay up to which a flight is on time (minutes).
    pub on_time_tolerance_minutes: f64,
}

impl Default for TargetMetrics {
    fn default() -> Self {
        Self {
            min_passed_metrics: 3,
            max_mean_delay_minutes: 30.0,
            min_on_time_rate: 70.0,
            on_time_tolerance_minutes: DEFAULT_ON_TIME_TOLERANCE_MINUTES,
        }
    }
}

impl TargetMetrics {
    /// Sets the success pass count.
    pub fn with_min_passed_metrics(mut self, n: u8) -> Self {
        self.min_passed_metrics = n;
        self
    }

    /// Sets the mean delay target (minutes).
    pub fn with_max_mean_delay(mut self, minutes: f64) -> Self {
        self.max_mean_delay_minutes = minutes;
        self
    }

    /// Sets the on-time rate target (percent).
    pub fn with_min_on_time_rate(mut self, percent: f64) -> Self {
        self.min_on_time_rate = percent;
        self
    }
}

/// Delay statistics of the simulated flights and their score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondaryMetrics {
    /// Mean delay (minutes).
    pub mean_delay_minutes: f64,
    /// Flights within the on-time tolerance (percent).
    pub on_time_rate: f64,
    /// Maximum delay (minutes).
    pub max_delay_minutes: f64,
    /// Secondary score in `[0, 0.6]`.
    pub score: f64,
}

impl SecondaryMetrics {
    /// Computes delay statistics of realized flights against the targets.
    pub fn calculate(flights: &[FlightRecord], targets: &TargetMetrics) -> Self {
        let delays: Vec<f64> = flights
            .iter()
            .filter_map(FlightRecord::delay_s)
            .map(|d| d as f64 / 60.0)
            .collect();
        let (mean_delay_minutes, on_time_rate, max_delay_minutes) = if delays.is_empty() {
            (0.0, 100.0, 0.0)
        } else {
            let n = delays.len() as f64;
            let on_time = delays
                .iter()
                .filter(|&&d| d <= targets.on_time_tolerance_minutes)
                .count();
            (
                delays.iter().sum::<f64>() / n,
                on_time as f64 / n * 100.0,
                delays.iter().copied().fold(0.0, f64::max),
            )
        };

        let target_delay = targets.max_mean_delay_minutes;
        let delay_score = if mean_delay_minutes <= target_delay {
            SECONDARY_WEIGHT
        } else if target_delay > 0.0 {
            (SECONDARY_WEIGHT * (1.0 - (mean_delay_minutes - target_delay) / target_delay)).max(0.0)
        } else {
            0.0
        };

        let target_rate = targets.min_on_time_rate;
        let on_time_score = if on_time_rate >= target_rate {
            SECONDARY_WEIGHT
        } else {
            (SECONDARY_WEIGHT * on_time_rate / target_rate).max(0.0)
        };

        Self {
            mean_delay_minutes,
            on_time_rate,
            max_delay_minutes,
            score: delay_score + on_time_score,
        }
    }
}

/// Indicator results of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Indicator 1.
    pub period_deviation: IndicatorResult,
    /// Indicator 2.
    pub duration_consistency: IndicatorResult,
    /// Indicator 3.
    pub peak_deviation: IndicatorResult,
    /// Indicator 4.
    pub latest_operation: IndicatorResult,
    /// Indicators passed (0..=4).
    pub pass_count: u8,
    /// Period pairings used by indicators 1-3.
    pub matches: Vec<PeriodMatch>,
    /// Delay statistics and secondary score.
    pub secondary: SecondaryMetrics,
}

impl ValidationOutcome {
    /// Results in reporting order.
    pub fn indicators(&self) -> [&IndicatorResult; 4] {
        [
            &self.period_deviation,
            &self.duration_consistency,
            &self.peak_deviation,
            &self.latest_operation,
        ]
    }

    /// Result of one indicator.
    pub fn indicator(&self, indicator: Indicator) -> &IndicatorResult {
        match indicator {
            Indicator::PeriodDeviation => &self.period_deviation,
            Indicator::DurationConsistency => &self.duration_consistency,
            Indicator::PeakDeviation => &self.peak_deviation,
            Indicator::LatestOperation => &self.latest_operation,
        }
    }

    /// Whether all four indicators passed.
    pub fn all_passed(&self) -> bool {
        self.pass_count == 4
    }

    /// Scalar score: pass count plus secondary score.
    pub fn score(&self) -> f64 {
        f64::from(self.pass_count) + self.secondary.score
    }

    /// Tuning hints for the failed indicators.
    pub fn recommendations(&self) -> Vec<&'static str> {
        if self.all_passed() {
            return vec![
                "validation passed: parameters are plausible",
                "current parameters can be used for further analysis",
            ];
        }
        let mut hints = vec!["tune simulation parameters to raise the pass count"];
        for result in self.indicators().into_iter().filter(|r| !r.passed) {
            hints.push(match result.indicator {
                Indicator::PeriodDeviation => {
                    "adjust ROT or wake separation to improve backlog period timing"
                }
                Indicator::DurationConsistency => {
                    "recalibrate taxi buffer or runway capacity parameters"
                }
                Indicator::PeakDeviation => "revise peak-hour runway allocation",
                Indicator::LatestOperation => "review late-evening operation modelling",
            });
        }
        hints
    }
}

/// Scores simulated periods and flights against ground truth.
#[derive(Debug, Clone, Copy)]
pub struct ResultValidator<'a> {
    thresholds: &'a ValidationThresholds,
    targets: TargetMetrics,
}

impl<'a> ResultValidator<'a> {
    /// Creates a validator with default targets.
    pub fn new(thresholds: &'a ValidationThresholds) -> Self {
        Self {
            thresholds,
            targets: TargetMetrics::default(),
        }
    }

    /// Replaces the secondary-objective targets.
    pub fn with_targets(mut self, targets: TargetMetrics) -> Self {
        self.targets = targets;
        self
    }

    /// Evaluates the four indicators and the secondary objectives.
    ///
    /// # Arguments
    /// * `flights` - Realized flights of the run.
    /// * `simulated` - Congestion periods of the run.
    /// * `simulated_latest_s` - Latest runway operation of the run.
    /// * `truth` - Recorded periods and latest operation.
    pub fn validate(
        &self,
        flights: &[FlightRecord],
        simulated: &[CongestionPeriod],
        simulated_latest_s: Option<i64>,
        truth: &GroundTruth,
    ) -> ValidationOutcome {
        let recorded = &truth.periods;
        let matches = match_periods(simulated, recorded);
        let t = self.thresholds;

        // Pairs for indicators 1-2: one per recorded period plus one per
        // spurious simulated period, each `None` when unmatched.
        let mut pairs: Vec<Option<(&CongestionPeriod, &CongestionPeriod)>> = matches
            .iter()
            .map(|m| m.simulated.map(|si| (&simulated[si], &recorded[m.recorded])))
            .collect();
        let spurious = (0..simulated.len())
            .filter(|si| !matches.iter().any(|m| m.simulated == Some(*si)))
            .count();
        pairs.extend(std::iter::repeat(None).take(spurious));

        let start_devs: Vec<Option<f64>> = pairs
            .iter()
            .map(|p| p.map(|(s, r)| (s.start_s - r.start_s).abs() as f64 / 60.0))
            .collect();
        let period_deviation = IndicatorResult::aggregate(
            Indicator::PeriodDeviation,
            &start_devs,
            |d| d <= t.period_tolerance_minutes,
            Some(t.match_pass_fraction),
        );

        let duration_devs: Vec<Option<f64>> = pairs
            .iter()
            .map(|p| {
                p.map(|(s, r)| relative_deviation(s.duration_s() as f64, r.duration_s() as f64))
            })
            .collect();
        let duration_consistency = IndicatorResult::aggregate(
            Indicator::DurationConsistency,
            &duration_devs,
            |d| within_ratio(d, t.duration_tolerance_ratio),
            Some(t.match_pass_fraction),
        );

        let peak_devs: Vec<Option<f64>> = matches
            .iter()
            .map(|m| {
                let sim_peak = m.simulated.map_or(0, |si| simulated[si].peak_count);
                Some(relative_deviation(
                    sim_peak as f64,
                    recorded[m.recorded].peak_count as f64,
                ))
            })
            .collect();
        let peak_deviation = IndicatorResult::aggregate(
            Indicator::PeakDeviation,
            &peak_devs,
            |d| within_ratio(d, t.peak_deviation_threshold),
            None,
        );

        let latest_operation =
            latest_operation(simulated_latest_s, truth.latest_s, t.latest_tolerance_minutes);

        let pass_count = [
            &period_deviation,
            &duration_consistency,
            &peak_deviation,
            &latest_operation,
        ]
        .iter()
        .filter(|r| r.passed)
        .count() as u8;

        ValidationOutcome {
            period_deviation,
            duration_consistency,
            peak_deviation,
            latest_operation,
            pass_count,
            matches,
            secondary: SecondaryMetrics::calculate(flights, &self.targets),
        }
    }
}

fn latest_operation(
    simulated_s: Option<i64>,
    recorded_s: Option<i64>,
    tolerance_minutes: f64,
) -> IndicatorResult {
    let (passed, max_deviation) = match (simulated_s, recorded_s) {
        (None, None) => (true, None),
        (Some(s), Some(r)) => {
            let minutes = (s - r).abs() as f64 / 60.0;
            (minutes <= tolerance_minutes, Some(minutes))
        }
        _ => (false, None),
    };
    IndicatorResult {
        indicator: Indicator::LatestOperation,
        passed,
        satisfied: usize::from(passed),
        evaluated: 1,
        max_deviation,
    }
}
