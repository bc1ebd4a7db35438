//! Temperature prediction for anticipatory safety cutoff.
//!
//! The heating element reads hotter than the plate surface, and both
//! lag the power command. These filters forecast the plate temperature
//! ahead of the current sample so the power controller can cut off
//! before an overshoot, not after.
//!
//! Variants are a tagged enum behind a scalar-in/scalar-out tick
//! interface plus a tuning operation; there is no deeper hierarchy.

use crate::config::TuneOptions;
use crate::error::FitError;
use crate::fit::golden_section_min;
use crate::sample::Sample;

/// Single-stage exponential low-pass filter with one time constant.
#[derive(Debug, Clone)]
pub struct LowPass {
    tau: f64,
    state: Option<f64>,
}

impl LowPass {
    pub fn new(tau: f64) -> Self {
        Self { tau, state: None }
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// Change the time constant and re-initialize filter memory.
    pub fn set_tau(&mut self, tau: f64) {
        self.tau = tau;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.state = None;
    }

    /// One forward step: exponentially-weighted blend of the previous
    /// output and the current reading, scaled by `period / tau`.
    pub fn step(&mut self, value: f64, period: f64) -> f64 {
        let next = match self.state {
            Some(previous) => {
                let alpha = (period / self.tau).clamp(0.0, 1.0);
                previous + (value - previous) * alpha
            }
            // First sample passes through so the filter starts live.
            None => value,
        };
        self.state = Some(next);
        next
    }
}

/// Two cascaded low-pass stages, matching second-order thermal lag
/// better than a single stage.
#[derive(Debug, Clone)]
pub struct DoubleLowPass {
    first: LowPass,
    second: LowPass,
}

impl DoubleLowPass {
    pub fn new(tau_first: f64, tau_second: f64) -> Self {
        Self {
            first: LowPass::new(tau_first),
            second: LowPass::new(tau_second),
        }
    }

    pub fn taus(&self) -> (f64, f64) {
        (self.first.tau(), self.second.tau())
    }

    /// Change both time constants and re-initialize filter memory.
    pub fn set_taus(&mut self, tau_first: f64, tau_second: f64) {
        self.first.set_tau(tau_first);
        self.second.set_tau(tau_second);
    }

    pub fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
    }

    pub fn step(&mut self, value: f64, period: f64) -> f64 {
        let intermediate = self.first.step(value, period);
        self.second.step(intermediate, period)
    }
}

/// Finite-difference extrapolator.
///
/// Maintains successive backward differences up to a configured order
/// and extrapolates forward by propagating them, assuming the highest
/// difference stays constant.
#[derive(Debug, Clone)]
pub struct FiniteDifference {
    /// `diffs[0]` is the last value, `diffs[i]` the i-th backward
    /// difference.
    diffs: Vec<f64>,
    ingested: usize,
}

impl FiniteDifference {
    pub fn new(order: usize) -> Self {
        Self {
            diffs: vec![0.0; order + 1],
            ingested: 0,
        }
    }

    pub fn order(&self) -> usize {
        self.diffs.len() - 1
    }

    /// Ingest a new observation and recompute the difference table.
    pub fn next(&mut self, value: f64) {
        let mut updated = vec![0.0; self.diffs.len()];
        updated[0] = value;
        for i in 1..self.diffs.len() {
            updated[i] = updated[i - 1] - self.diffs[i - 1];
        }
        // Difference levels deeper than the history collected so far
        // carry no information yet.
        for slot in updated.iter_mut().skip(self.ingested + 1) {
            *slot = 0.0;
        }
        self.diffs = updated;
        self.ingested += 1;
    }

    /// Extrapolate `ahead` steps past the last ingested value.
    ///
    /// Returns `None` until at least one value has been ingested.
    pub fn predict(&self, ahead: usize) -> Option<f64> {
        if self.ingested == 0 {
            return None;
        }
        let mut diffs = self.diffs.clone();
        for _ in 0..ahead {
            for i in (0..diffs.len() - 1).rev() {
                diffs[i] += diffs[i + 1];
            }
        }
        Some(diffs[0])
    }

    /// Reconstruct the value `behind` steps before the last ingested
    /// one from the difference table.
    pub fn last(&self, behind: usize) -> Option<f64> {
        if self.ingested == 0 {
            return None;
        }
        let mut diffs = self.diffs.clone();
        for _ in 0..behind {
            for i in 0..diffs.len() - 1 {
                diffs[i] -= diffs[i + 1];
            }
        }
        Some(diffs[0])
    }

    pub fn reset(&mut self) {
        self.diffs.iter_mut().for_each(|d| *d = 0.0);
        self.ingested = 0;
    }
}

/// Fitted parameters reported by [`Predictor::tune`].
#[derive(Debug, Clone, PartialEq)]
pub struct TuneReport {
    /// Fitted scalar parameters (time constants, or the selected order
    /// for the finite-difference variant).
    pub parameters: Vec<f64>,
    /// Weighted mean squared error of the fitted predictor.
    pub mean_squared_error: f64,
    /// Number of samples contributing to the objective.
    pub samples_used: usize,
}

/// Temperature predictor variants, selected by configuration at
/// construction.
#[derive(Debug, Clone)]
pub enum Predictor {
    Single(LowPass),
    Double(DoubleLowPass),
    FiniteDifference(FiniteDifference),
}

impl Predictor {
    pub fn single(tau: f64) -> Self {
        Predictor::Single(LowPass::new(tau))
    }

    pub fn double(tau_first: f64, tau_second: f64) -> Self {
        Predictor::Double(DoubleLowPass::new(tau_first, tau_second))
    }

    pub fn finite_difference(order: usize) -> Self {
        Predictor::FiniteDifference(FiniteDifference::new(order))
    }

    /// Forecast the temperature one period ahead and record it on the
    /// sample. Returns `None` when the sample carries no estimate.
    pub fn predict_temperature(&mut self, sample: &mut Sample) -> Option<f64> {
        let value = sample.temperature?;
        let predicted = match self {
            Predictor::Single(filter) => filter.step(value, sample.period),
            Predictor::Double(filter) => filter.step(value, sample.period),
            Predictor::FiniteDifference(table) => {
                table.next(value);
                table.predict(1)?
            }
        };
        sample.predicted_temperature = Some(predicted);
        Some(predicted)
    }

    /// Re-initialize internal filter memory, keeping parameters.
    pub fn reset(&mut self) {
        match self {
            Predictor::Single(filter) => filter.reset(),
            Predictor::Double(filter) => filter.reset(),
            Predictor::FiniteDifference(table) => table.reset(),
        }
    }

    /// Fit internal parameters by minimizing the weighted mean squared
    /// error between the forecast and the probe-measured reference
    /// temperature over a recorded sample set.
    ///
    /// The filter is replayed from scratch for every candidate, so the
    /// recording must be in time order. Tuning re-initializes filter
    /// memory.
    pub fn tune(
        &mut self,
        samples: &[Sample],
        options: &TuneOptions,
    ) -> Result<TuneReport, FitError> {
        let eligible = count_eligible(samples, options);
        if eligible < 2 {
            return Err(FitError::InsufficientData {
                needed: 2,
                available: eligible,
            });
        }

        let (lo, hi) = options.bounds;
        match self {
            Predictor::Single(filter) => {
                let objective = |tau: f64| replay_single(samples, options, tau);
                let tau = golden_section_min(objective, lo, hi, options.iterations);
                filter.set_tau(tau);
                let (mse, used) = evaluate_single(samples, options, tau);
                Ok(TuneReport {
                    parameters: vec![tau],
                    mean_squared_error: mse,
                    samples_used: used,
                })
            }
            Predictor::Double(filter) => {
                // Coordinate descent: each sweep relaxes one time
                // constant with the other held fixed.
                let mid = (lo * hi).sqrt();
                let (mut tau_first, mut tau_second) = (mid, mid);
                for _ in 0..options.sweeps.max(1) {
                    tau_first = golden_section_min(
                        |t| replay_double(samples, options, t, tau_second),
                        lo,
                        hi,
                        options.iterations,
                    );
                    tau_second = golden_section_min(
                        |t| replay_double(samples, options, tau_first, t),
                        lo,
                        hi,
                        options.iterations,
                    );
                }
                filter.set_taus(tau_first, tau_second);
                let (mse, used) = evaluate_double(samples, options, tau_first, tau_second);
                Ok(TuneReport {
                    parameters: vec![tau_first, tau_second],
                    mean_squared_error: mse,
                    samples_used: used,
                })
            }
            Predictor::FiniteDifference(table) => {
                // The only free parameter is the (integer) order.
                let mut best = (1usize, f64::INFINITY, 0usize);
                for order in 1..=5 {
                    let (mse, used) = evaluate(samples, options, {
                        let mut candidate = FiniteDifference::new(order);
                        move |value, _period| {
                            candidate.next(value);
                            candidate.predict(1).unwrap_or(value)
                        }
                    });
                    if mse < best.1 {
                        best = (order, mse, used);
                    }
                }
                *table = FiniteDifference::new(best.0);
                Ok(TuneReport {
                    parameters: vec![best.0 as f64],
                    mean_squared_error: best.1,
                    samples_used: best.2,
                })
            }
        }
    }
}

fn eligible(sample: &Sample, options: &TuneOptions) -> Option<(f64, f64)> {
    let reference = sample.device_temperature?;
    if options.max_time.is_some_and(|t| sample.now > t) {
        return None;
    }
    if options.min_temperature.is_some_and(|t| reference < t) {
        return None;
    }
    let weight = match options.ambient_bias {
        Some(ambient) => (reference - ambient).max(0.0),
        None => 1.0,
    };
    if weight <= 0.0 {
        return None;
    }
    Some((reference, weight))
}

fn count_eligible(samples: &[Sample], options: &TuneOptions) -> usize {
    samples
        .iter()
        .filter(|s| s.temperature.is_some() && eligible(s, options).is_some())
        .count()
}

/// Replay a candidate filter over the recording and compute the
/// weighted MSE against the reference temperature.
fn evaluate<S>(samples: &[Sample], options: &TuneOptions, mut step: S) -> (f64, usize)
where
    S: FnMut(f64, f64) -> f64,
{
    let mut weighted_error = 0.0;
    let mut weight_sum = 0.0;
    let mut used = 0usize;

    for sample in samples {
        let Some(value) = sample.temperature else {
            continue;
        };
        // The filter state advances over the full recording even where
        // the objective excludes the sample.
        let forecast = step(value, sample.period);
        let Some((reference, weight)) = eligible(sample, options) else {
            continue;
        };
        weighted_error += weight * (forecast - reference) * (forecast - reference);
        weight_sum += weight;
        used += 1;
    }

    if weight_sum > 0.0 {
        (weighted_error / weight_sum, used)
    } else {
        (f64::INFINITY, 0)
    }
}

fn evaluate_single(samples: &[Sample], options: &TuneOptions, tau: f64) -> (f64, usize) {
    let mut filter = LowPass::new(tau);
    evaluate(samples, options, move |value, period| {
        filter.step(value, period)
    })
}

fn replay_single(samples: &[Sample], options: &TuneOptions, tau: f64) -> f64 {
    evaluate_single(samples, options, tau).0
}

fn evaluate_double(
    samples: &[Sample],
    options: &TuneOptions,
    tau_first: f64,
    tau_second: f64,
) -> (f64, usize) {
    let mut filter = DoubleLowPass::new(tau_first, tau_second);
    evaluate(samples, options, move |value, period| {
        filter.step(value, period)
    })
}

fn replay_double(samples: &[Sample], options: &TuneOptions, tau_first: f64, tau_second: f64) -> f64 {
    evaluate_double(samples, options, tau_first, tau_second).0
}
