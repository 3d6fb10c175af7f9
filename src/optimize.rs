//! Parameter calibration by local random search.
//!
//! # State Machine
//!
//! ```text
//! Idle ──run──▶ Running ──▶ Converged
//!                      ├──▶ IterationLimitReached
//!                      ├──▶ Cancelled
//!                      └──▶ Failed
//! ```
//!
//! # Algorithm
//!
//! Trial 0 evaluates the initial configuration. Every further trial
//! perturbs the best configuration so far: a random non-empty subset of
//! {departure ROT, arrival ROT, taxi buffer, one separation entry} moves by
//! one or two steps, clamped to the [`SearchSpace`]. A trial replaces the
//! best only if its score is strictly higher, so the best-score history
//! is non-decreasing.
//!
//! Trials can be evaluated in batches on the rayon pool. Candidates of a
//! batch are drawn sequentially from the seeded generator and results are
//! applied in trial-index order, so a run is deterministic for a fixed
//! seed and batch size.
//!
//! # Reference
//! Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach",
//! Ch. 4.1 (Local search: stochastic hill climbing)

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{ConfigBuilder, Configuration};
use crate::congestion::GroundTruth;
use crate::error::{Result, SimError};
use crate::metrics::{TargetMetrics, ValidationOutcome};
use crate::models::FlightRecord;
use crate::simulation::{evaluate, simulate};

/// Redraws allowed before a step gives up on finding a new valid candidate.
const MAX_DRAWS: usize = 64;

/// Optimizer life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerState {
    /// Not started.
    Idle,
    /// Evaluating trials.
    Running,
    /// A trial met the pass-count target.
    Converged,
    /// The trial budget is exhausted.
    IterationLimitReached,
    /// Stopped by a cancel token or the wall-clock budget.
    Cancelled,
    /// The initial configuration could not be simulated.
    Failed,
}

impl OptimizerState {
    /// Whether the state is final.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Idle | Self::Running)
    }
}

/// Bounded integer range with a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamRange {
    /// Lower bound.
    pub min: i64,
    /// Upper bound.
    pub max: i64,
    /// Step size (> 0).
    pub step: i64,
}

impl ParamRange {
    /// Creates a range.
    ///
    /// # Errors
    /// `ConfigurationOutOfRange` if `min > max` or `step <= 0`.
    pub fn new(min: i64, max: i64, step: i64) -> Result<Self> {
        if min > max {
            return Err(SimError::out_of_range("search_space", format!("{min}..={max}"), "min <= max"));
        }
        if step <= 0 {
            return Err(SimError::out_of_range("search_space.step", step, "> 0"));
        }
        Ok(Self { min, max, step })
    }

    /// Clamps a value into the range.
    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }

    /// Moves a value by one or two steps in a random direction, clamped.
    fn step_from<R: Rng>(&self, value: i64, rng: &mut R) -> i64 {
        let steps = rng.random_range(1..=2i64);
        let sign = if rng.random_bool(0.5) { 1 } else { -1 };
        let delta = sign * steps * self.step;
        self.clamp(value + delta)
    }
}

/// Bounds of the tunable parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpace {
    /// Departure ROT (s).
    pub departure_rot: ParamRange,
    /// Arrival ROT (s).
    pub arrival_rot: ParamRange,
    /// Taxi buffer (minutes).
    pub taxi_buffer: ParamRange,
    /// Every wake separation entry (s).
    pub separation: ParamRange,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            departure_rot: ParamRange { min: 90, max: 180, step: 30 },
            arrival_rot: ParamRange { min: 60, max: 120, step: 30 },
            taxi_buffer: ParamRange { min: 5, max: 20, step: 5 },
            separation: ParamRange { min: 60, max: 240, step: 30 },
        }
    }
}

impl SearchSpace {
    /// Draws a perturbed builder from a base configuration.
    fn perturb<R: Rng>(&self, base: &Configuration, rng: &mut R) -> ConfigBuilder {
        let mut b = base.to_builder();
        // Bit mask over the four parameters; never empty.
        let mask: u8 = rng.random_range(1..16);
        if mask & 1 != 0 {
            b.min_departure_rot = self.departure_rot.step_from(b.min_departure_rot, rng);
        }
        if mask & 2 != 0 {
            b.min_arrival_rot = self.arrival_rot.step_from(b.min_arrival_rot, rng);
        }
        if mask & 4 != 0 {
            b.taxi_buffer_minutes = self.taxi_buffer.step_from(b.taxi_buffer_minutes, rng);
        }
        if mask & 8 != 0 && !b.wake_separation.is_empty() {
            let i = rng.random_range(0..b.wake_separation.len());
            let e = b.wake_separation.entries()[i];
            let seconds = self.separation.step_from(e.seconds, rng);
            b.wake_separation.set(e.leading, e.trailing, seconds);
        }
        b
    }
}

/// Shared flag to stop a running optimization.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }
}

/// One evaluated configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationTrial {
    /// Trial index (0 = initial configuration).
    pub index: usize,
    /// Configuration evaluated.
    pub configuration: Configuration,
    /// Validation result.
    pub outcome: ValidationOutcome,
    /// Scalar score (pass count plus secondary score).
    pub score: f64,
}

/// A candidate whose simulation failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTrial {
    /// Attempt number.
    pub index: usize,
    /// Configuration attempted.
    pub configuration: Configuration,
    /// Error message.
    pub error: String,
}

/// Result of an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Evaluated trials in attempt order; `index` is the attempt number.
    pub trials: Vec<OptimizationTrial>,
    /// Attempts whose simulation failed, in attempt order.
    pub failed: Vec<FailedTrial>,
    /// Position of the best trial in `trials` (`None` only when the run failed).
    pub best: Option<usize>,
    /// Terminal state.
    pub state: OptimizerState,
    /// No trial improved on the initial configuration.
    pub diverged: bool,
    /// Fatal error of a failed run.
    #[serde(skip)]
    pub error: Option<SimError>,
}

impl OptimizationReport {
    /// Best trial.
    pub fn best_trial(&self) -> Option<&OptimizationTrial> {
        self.best.and_then(|i| self.trials.get(i))
    }

    /// Number of attempts made, failed ones included.
    pub fn attempts(&self) -> usize {
        self.trials.len() + self.failed.len()
    }

    /// Best configuration found.
    pub fn best_configuration(&self) -> Option<&Configuration> {
        self.best_trial().map(|t| &t.configuration)
    }

    /// Best score after each trial (non-decreasing).
    pub fn best_score_history(&self) -> Vec<f64> {
        let mut best = f64::NEG_INFINITY;
        self.trials
            .iter()
            .map(|t| {
                if t.score.total_cmp(&best) == Ordering::Greater {
                    best = t.score;
                }
                best
            })
            .collect()
    }
}

/// Calibrates a configuration against ground truth.
///
/// # Example
///
/// ```
/// use runway_sim::config::Configuration;
/// use runway_sim::congestion::GroundTruth;
/// use runway_sim::optimize::{OptimizationLoop, OptimizerState};
///
/// let config = Configuration::default();
/// let truth = GroundTruth::default();
/// let mut opt = OptimizationLoop::new(&[], &truth, config);
/// assert_eq!(opt.state(), OptimizerState::Idle);
/// let report = opt.run();
/// assert_eq!(report.state, OptimizerState::Converged);
/// ```
#[derive(Debug, Clone)]
pub struct OptimizationLoop<'a> {
    flights: &'a [FlightRecord],
    truth: &'a GroundTruth,
    initial: Configuration,
    targets: TargetMetrics,
    space: SearchSpace,
    cancel: Option<CancelToken>,
    budget: Option<Duration>,
    state: OptimizerState,
}

impl<'a> OptimizationLoop<'a> {
    /// Creates a loop; the pass-count target comes from the configuration.
    pub fn new(flights: &'a [FlightRecord], truth: &'a GroundTruth, initial: Configuration) -> Self {
        let targets =
            TargetMetrics::default().with_min_passed_metrics(initial.optimizer().min_passed_metrics);
        Self {
            flights,
            truth,
            initial,
            targets,
            space: SearchSpace::default(),
            cancel: None,
            budget: None,
            state: OptimizerState::Idle,
        }
    }

    /// Replaces the targets (including the pass-count target).
    pub fn with_targets(mut self, targets: TargetMetrics) -> Self {
        self.targets = targets;
        self
    }

    /// Replaces the search space.
    pub fn with_search_space(mut self, space: SearchSpace) -> Self {
        self.space = space;
        self
    }

    /// Stops when the token is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Stops once the wall-clock budget is spent.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Current state.
    pub fn state(&self) -> OptimizerState {
        self.state
    }

    /// Runs the optimization to a terminal state.
    ///
    /// The best trial found so far is always kept, including on
    /// cancellation.
    pub fn run(&mut self) -> OptimizationReport {
        self.state = OptimizerState::Running;
        let deadline = self.budget.map(|b| Instant::now() + b);
        let settings = *self.initial.optimizer();
        let mut rng = SmallRng::seed_from_u64(settings.seed);
        info!(
            max_iterations = settings.max_iterations,
            target = self.targets.min_passed_metrics,
            "optimization started"
        );

        let baseline = match self.evaluate(&self.initial) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "initial configuration failed");
                self.state = OptimizerState::Failed;
                return OptimizationReport {
                    trials: Vec::new(),
                    failed: Vec::new(),
                    best: None,
                    state: self.state,
                    diverged: false,
                    error: Some(e),
                };
            }
        };
        let mut history = History::new(self.trial(0, self.initial.clone(), baseline));

        let mut state = if self.meets_target(&history.trials[0]) {
            OptimizerState::Converged
        } else {
            OptimizerState::IterationLimitReached
        };
        let mut attempted = 1;

        while state != OptimizerState::Converged && attempted < settings.max_iterations {
            if self.is_cancelled(deadline) {
                state = OptimizerState::Cancelled;
                break;
            }

            let n = settings.batch_size.min(settings.max_iterations - attempted);
            let base = history.best().configuration.clone();
            let candidates: Vec<Configuration> =
                (0..n).map(|_| self.candidate(&base, &mut rng)).collect();
            let results: Vec<Result<ValidationOutcome>> =
                candidates.par_iter().map(|c| self.evaluate(c)).collect();
            let first = attempted;
            attempted += n;

            for (offset, (configuration, result)) in candidates.into_iter().zip(results).enumerate() {
                let index = first + offset;
                match result {
                    Ok(outcome) => {
                        let trial = self.trial(index, configuration, outcome);
                        let converged = self.meets_target(&trial);
                        history.push(trial);
                        if converged {
                            state = OptimizerState::Converged;
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(trial = index, error = %e, "candidate failed");
                        history.push_failure(index, configuration, &e);
                    }
                }
            }
        }

        self.state = state;
        let diverged = state == OptimizerState::IterationLimitReached && history.best == 0;
        info!(
            trials = history.trials.len(),
            failed = history.failed.len(),
            best = history.best().index,
            score = history.best().score,
            ?state,
            diverged,
            "optimization finished"
        );
        OptimizationReport {
            best: Some(history.best),
            trials: history.trials,
            failed: history.failed,
            state,
            diverged,
            error: None,
        }
    }

    fn evaluate(&self, config: &Configuration) -> Result<ValidationOutcome> {
        let run = simulate(self.flights, config)?;
        Ok(evaluate(&run, self.truth, config, &self.targets))
    }

    fn trial(&self, index: usize, configuration: Configuration, outcome: ValidationOutcome) -> OptimizationTrial {
        let score = outcome.score();
        info!(
            trial = index,
            passed = outcome.pass_count,
            score,
            departure_rot_s = configuration.departure_rot_s(),
            arrival_rot_s = configuration.arrival_rot_s(),
            taxi_buffer_minutes = configuration.taxi_buffer_minutes(),
            "trial evaluated"
        );
        OptimizationTrial {
            index,
            configuration,
            outcome,
            score,
        }
    }

    fn meets_target(&self, trial: &OptimizationTrial) -> bool {
        trial.outcome.pass_count >= self.targets.min_passed_metrics
    }

    fn is_cancelled(&self, deadline: Option<Instant>) -> bool {
        self.cancel.as_ref().map_or(false, CancelToken::is_cancelled)
            || deadline.map_or(false, |d| Instant::now() >= d)
    }

    /// Draws a valid candidate different from `base`. Falls back to `base`
    /// when the search space allows no move.
    fn candidate(&self, base: &Configuration, rng: &mut SmallRng) -> Configuration {
        for _ in 0..MAX_DRAWS {
            match self.space.perturb(base, rng).build() {
                Ok(c) if c != *base => return c,
                Ok(_) => {}
                Err(e) => debug!(error = %e, "candidate rejected"),
            }
        }
        base.clone()
    }
}

/// Trial history and the best-trial register.
struct History {
    trials: Vec<OptimizationTrial>,
    failed: Vec<FailedTrial>,
    best: usize,
}

impl History {
    fn new(baseline: OptimizationTrial) -> Self {
        Self {
            trials: vec![baseline],
            failed: Vec::new(),
            best: 0,
        }
    }

    fn best(&self) -> &OptimizationTrial {
        &self.trials[self.best]
    }

    /// Appends a trial; it becomes best only on a strictly higher score.
    fn push(&mut self, trial: OptimizationTrial) {
        let improved = trial.score.total_cmp(&self.best().score) == Ordering::Greater;
        self.trials.push(trial);
        if improved {
            self.best = self.trials.len() - 1;
            debug!(trial = self.best().index, score = self.best().score, "new best");
        }
    }

    fn push_failure(&mut self, index: usize, configuration: Configuration, error: &SimError) {
        self.failed.push(FailedTrial {
            index,
            configuration,
            error: error.to_string(),
        });
    }
}
