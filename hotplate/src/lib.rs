//! Closed-loop temperature control core for a solder-reflow hotplate.
//!
//! The heating element doubles as the temperature sensor: each control
//! tick converts the element's measured voltage and current into a
//! resistance, a calibration curve maps resistance to temperature, a
//! predictor forecasts where the temperature is heading, and a power
//! controller commands the next heater power while a sequencer walks
//! the run through its profile stages or calibration steps.
//!
//! The crate is transport-agnostic. Callers own time, measurement and
//! actuation; [`ReflowController::tick`] takes elapsed seconds and raw
//! electrical measurements and returns the power to apply.

pub mod calibrate;
pub mod config;
pub mod curve;
pub mod error;
pub mod estimator;
pub mod fit;
pub mod power;
pub mod predictor;
pub mod profile;
pub mod sample;

pub use calibrate::{CalibrationSequencer, CalibrationStep};
pub use config::{
    BangBangConfig, CalibrationConfig, EstimatorConfig, FeedForwardConfig, Hysteresis, Stage,
    TuneOptions,
};
pub use curve::CalibrationCurve;
pub use error::{ControlError, FitError};
pub use estimator::{ProbeReading, RtdEstimator, TemperatureProbe};
pub use fit::{step_response, StepResponseFit};
pub use power::{BangBang, FeedForward, PowerController};
pub use predictor::{Predictor, TuneReport};
pub use profile::ProfileSequencer;
pub use sample::{Sample, SampleKind, SampleLog};

/// Raw electrical measurement for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Element voltage (V).
    pub voltage: f64,
    /// Element current (A).
    pub current: f64,
}

impl Measurement {
    pub fn new(voltage: f64, current: f64) -> Self {
        Self { voltage, current }
    }
}

/// Which sequence the controller is running.
pub enum Sequencer {
    /// Closed-loop tracking of a reflow profile.
    Profile(ProfileSequencer),
    /// Open-loop calibration excitation ladder.
    Calibration(CalibrationSequencer),
}

impl Sequencer {
    fn tick(&mut self, sample: &mut Sample) -> bool {
        match self {
            Sequencer::Profile(inner) => inner.tick(sample),
            Sequencer::Calibration(inner) => inner.tick(sample),
        }
    }

    fn abort(&mut self) {
        match self {
            Sequencer::Profile(inner) => inner.abort(),
            Sequencer::Calibration(inner) => inner.abort(),
        }
    }
}

/// What one control tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// False once the sequence has finished or been aborted.
    pub running: bool,
    /// Power to apply until the next tick (W). `None` means no estimate
    /// was possible; the caller should hold its previous output.
    pub power: Option<f64>,
    /// Log index of this tick's sample.
    pub sample: usize,
}

/// The assembled control loop: estimator, predictor, power controller
/// and sequencer sharing one sample log.
pub struct ReflowController {
    estimator: RtdEstimator,
    predictor: Predictor,
    power: PowerController,
    sequencer: Sequencer,
    log: SampleLog,
}

impl ReflowController {
    pub fn new(
        estimator: RtdEstimator,
        predictor: Predictor,
        power: PowerController,
        sequencer: Sequencer,
    ) -> Self {
        Self {
            estimator,
            predictor,
            power,
            sequencer,
            log: SampleLog::new(),
        }
    }

    pub fn log(&self) -> &SampleLog {
        &self.log
    }

    pub fn estimator(&self) -> &RtdEstimator {
        &self.estimator
    }

    /// Stop the sequence. Takes effect on the next tick.
    pub fn abort(&mut self) {
        self.sequencer.abort();
    }

    /// Record an interactive operator event in the log.
    pub fn interrupt(&mut self, now: f64) -> usize {
        let mut sample = Sample::interactive(now);
        sample.stage = Some("interrupt".to_string());
        self.log.push(sample)
    }

    /// Run one control tick.
    ///
    /// `now` is elapsed seconds since run start, `period` the time to
    /// the next tick. Every call appends exactly one sample to the log,
    /// including ticks where no estimate was possible.
    pub fn tick(&mut self, now: f64, period: f64, measurement: Measurement) -> TickOutcome {
        let mut sample = Sample::new(now, period, measurement.voltage, measurement.current);

        if self.estimator.temperature(&mut sample).is_none() {
            // Hold the previous output rather than acting on garbage.
            log::debug!("tick at t={now:.1}s produced no temperature estimate");
            let index = self.log.push(sample);
            return TickOutcome {
                running: true,
                power: None,
                sample: index,
            };
        }

        let running = self.sequencer.tick(&mut sample);
        let power = if !running {
            // Finished or aborted: drive the element to zero.
            sample.set_power = Some(0.0);
            Some(0.0)
        } else {
            match &mut self.sequencer {
                Sequencer::Profile(_) => self.power.power_limited(&mut sample, &mut self.predictor),
                Sequencer::Calibration(_) => {
                    // Open-loop excitation still honors the predictive
                    // cutoff; runaway during calibration is the case it
                    // exists for.
                    let requested = sample.set_power;
                    let predicted = self.predictor.predict_temperature(&mut sample);
                    if self.power.cutoff_tripped(&sample, predicted) {
                        sample.set_power = Some(0.0);
                        Some(0.0)
                    } else {
                        requested
                    }
                }
            }
        };

        let index = self.log.push(sample);
        TickOutcome {
            running,
            power,
            sample: index,
        }
    }
}
