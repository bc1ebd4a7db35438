//! Power command computation.
//!
//! Two controller variants behind a tagged enum: bang-bang switching
//! with hysteresis and an optional breakpoint table, and feed-forward
//! power from a first-order thermal model. Both are subject to the
//! predictive hard cutoff in [`PowerController::power_limited`]: the
//! instantaneous reading alone cannot prevent overshoot given sensor
//! and control lag.

use crate::config::{BangBangConfig, FeedForwardConfig, DEFAULT_AMBIENT};
use crate::curve::CalibrationCurve;
use crate::error::ControlError;
use crate::predictor::Predictor;
use crate::sample::Sample;

const DEFAULT_CUTOFF: f64 = 225.0;

/// Bang-bang controller: maximum power below target, idle power above,
/// with an asymmetric hysteresis band to prevent toggling on noise.
///
/// When a breakpoint table is configured, power is instead interpolated
/// over the *current* temperature, optionally derated by an externally
/// measured plate temperature ("suggestion").
pub struct BangBang {
    config: BangBangConfig,
    breakpoints: CalibrationCurve,
    /// Single bit of call-to-call memory: latched once the temperature
    /// crosses `target + high`, released below `target - low`.
    over_target: bool,
}

impl BangBang {
    pub fn new(config: BangBangConfig) -> Self {
        Self {
            config,
            breakpoints: CalibrationCurve::new(),
            over_target: false,
        }
    }

    /// Configure a (temperature, power) breakpoint table.
    pub fn with_breakpoints(mut self, breakpoints: CalibrationCurve) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    /// Replace the breakpoint table live, e.g. while a calibration run
    /// learns safe limits. Hysteresis state is preserved.
    pub fn set_breakpoints(&mut self, breakpoints: CalibrationCurve) {
        self.breakpoints = breakpoints;
    }

    pub fn breakpoints(&self) -> &CalibrationCurve {
        &self.breakpoints
    }

    pub fn config(&self) -> &BangBangConfig {
        &self.config
    }

    /// Power required to track the sample's look-ahead target.
    ///
    /// Returns `None` when the sample carries no temperature estimate,
    /// or no target in hysteresis mode. The breakpoint table is indexed
    /// by the current temperature alone and needs no target.
    pub fn required_power(&mut self, sample: &Sample) -> Option<f64> {
        let temperature = sample.temperature?;

        if !self.breakpoints.is_empty() {
            let mut power = self.breakpoints.estimate(temperature);
            if let Some(suggestion) = sample.device_temperature {
                power *= self.derating(suggestion);
            }
            return Some(power.max(0.0));
        }

        let target = sample.then_temperature?;

        // Ties favor the low-power side at the top edge and the
        // high-power side at the bottom edge.
        if temperature >= target + self.config.hysteresis.high {
            self.over_target = true;
        } else if temperature < target - self.config.hysteresis.low {
            self.over_target = false;
        }

        Some(if self.over_target {
            self.config.idle_power
        } else {
            self.config.max_power
        })
    }

    /// Linear derate factor from how far the suggestion sits between
    /// its adjacent breakpoints: 1 at the lower breakpoint, 0 at the
    /// upper.
    fn derating(&self, suggestion: f64) -> f64 {
        match self.breakpoints.segment(suggestion) {
            Some(((t_low, _), (t_high, _))) if t_high > t_low => {
                ((t_high - suggestion) / (t_high - t_low)).clamp(0.0, 1.0)
            }
            _ => 1.0,
        }
    }
}

/// Feed-forward controller: solves the first-order thermal model
/// `ΔT = (period/C)·P − (period/(C·R))·(T − ambient)` for P.
#[derive(Debug)]
pub struct FeedForward {
    resistance: f64,
    capacitance: f64,
    ambient: f64,
    cutoff_temperature: f64,
}

impl FeedForward {
    /// Fails fast when the thermal model is absent or non-physical.
    pub fn new(config: FeedForwardConfig) -> Result<Self, ControlError> {
        let resistance = config
            .thermal_resistance
            .ok_or(ControlError::MissingThermalModel {
                parameter: "thermal_resistance",
            })?;
        let capacitance = config
            .thermal_capacitance
            .ok_or(ControlError::MissingThermalModel {
                parameter: "thermal_capacitance",
            })?;
        if resistance <= 0.0 {
            return Err(ControlError::InvalidThermalModel {
                parameter: "thermal_resistance",
                value: resistance,
            });
        }
        if capacitance <= 0.0 {
            return Err(ControlError::InvalidThermalModel {
                parameter: "thermal_capacitance",
                value: capacitance,
            });
        }
        Ok(Self {
            resistance,
            capacitance,
            ambient: config.ambient.unwrap_or(DEFAULT_AMBIENT),
            cutoff_temperature: config.cutoff_temperature.unwrap_or(DEFAULT_CUTOFF),
        })
    }

    /// Power needed over one sample period to reach the look-ahead
    /// target, clamped to non-negative.
    pub fn required_power(&self, sample: &Sample) -> Option<f64> {
        let temperature = sample.temperature?;
        let target = sample.then_temperature?;
        if sample.period <= 0.0 {
            return None;
        }
        let delta = target - temperature;
        let power = self.capacitance * delta / sample.period
            + (temperature - self.ambient) / self.resistance;
        Some(power.max(0.0))
    }
}

/// Power controller variants, selected by configuration at
/// construction.
pub enum PowerController {
    BangBang(BangBang),
    FeedForward(FeedForward),
}

impl PowerController {
    pub fn bang_bang(config: BangBangConfig) -> Self {
        PowerController::BangBang(BangBang::new(config))
    }

    pub fn feed_forward(config: FeedForwardConfig) -> Result<Self, ControlError> {
        Ok(PowerController::FeedForward(FeedForward::new(config)?))
    }

    pub fn cutoff_temperature(&self) -> f64 {
        match self {
            PowerController::BangBang(inner) => inner.config.cutoff_temperature,
            PowerController::FeedForward(inner) => inner.cutoff_temperature,
        }
    }

    /// Raw power computation without the safety cutoff. Prefer
    /// [`PowerController::power_limited`] in the control loop.
    pub fn required_power(&mut self, sample: &Sample) -> Option<f64> {
        match self {
            PowerController::BangBang(inner) => inner.required_power(sample),
            PowerController::FeedForward(inner) => inner.required_power(sample),
        }
    }

    /// True when the predicted or measured temperature has reached the
    /// hard cutoff. Logged for diagnosis; the corrective action itself
    /// is silent (the caller forces zero power).
    pub fn cutoff_tripped(&self, sample: &Sample, predicted: Option<f64>) -> bool {
        let cutoff = self.cutoff_temperature();
        let predicted_hot = predicted.is_some_and(|p| p >= cutoff);
        let measured_hot = sample.temperature.is_some_and(|t| t >= cutoff);
        if predicted_hot || measured_hot {
            log::warn!(
                "thermal cutoff at t={:.1}s: predicted {:?} measured {:?} >= {:.1}",
                sample.now,
                predicted,
                sample.temperature,
                cutoff
            );
            return true;
        }
        false
    }

    /// Compute the power command with the mandatory predictive cutoff.
    ///
    /// Runs the predictor on every call; once the forecast (or the
    /// measurement itself) reaches the cutoff, zero power overrides
    /// every other computation. Writes `set_power` onto the sample.
    pub fn power_limited(
        &mut self,
        sample: &mut Sample,
        predictor: &mut Predictor,
    ) -> Option<f64> {
        let predicted = predictor.predict_temperature(sample);
        if self.cutoff_tripped(sample, predicted) {
            sample.set_power = Some(0.0);
            return Some(0.0);
        }
        let power = self.required_power(sample)?;
        sample.set_power = Some(power);
        Some(power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_at(temperature: f64, target: f64) -> Sample {
        let mut sample = Sample::new(0.0, 1.5, 0.0, 0.0);
        sample.temperature = Some(temperature);
        sample.then_temperature = Some(target);
        sample
    }

    #[test]
    fn test_hysteresis_boundaries() {
        let mut controller = BangBang::new(BangBangConfig::default());

        // Rising: full power strictly below target + high.
        assert_eq!(controller.required_power(&sample_at(77.9, 75.0)), Some(100.0));
        assert_eq!(controller.required_power(&sample_at(78.0, 75.0)), Some(2.0));

        // Descending: idle holds until temperature < target - low.
        assert_eq!(controller.required_power(&sample_at(74.0, 75.0)), Some(2.0));
        assert_eq!(controller.required_power(&sample_at(72.0, 75.0)), Some(2.0));
        assert_eq!(controller.required_power(&sample_at(71.9, 75.0)), Some(100.0));
    }

    #[test]
    fn test_no_estimate_yields_no_power() {
        let mut controller = BangBang::new(BangBangConfig::default());
        let sample = Sample::new(0.0, 1.5, 0.0, 0.0);
        assert!(controller.required_power(&sample).is_none());
    }

    #[test]
    fn test_breakpoints_interpolate_on_current_temperature() {
        let breakpoints = CalibrationCurve::from_points([(100.0, 80.0), (200.0, 20.0)]);
        let mut controller =
            BangBang::new(BangBangConfig::default()).with_breakpoints(breakpoints);

        let power = controller.required_power(&sample_at(150.0, 175.0));
        assert_relative_eq!(power.expect("power"), 50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_breakpoints_work_without_a_tracking_target() {
        let breakpoints = CalibrationCurve::from_points([(100.0, 80.0), (200.0, 20.0)]);
        let mut controller =
            BangBang::new(BangBangConfig::default()).with_breakpoints(breakpoints);

        // No sequencer target set, only a temperature estimate.
        let mut sample = Sample::new(0.0, 1.5, 0.0, 0.0);
        sample.temperature = Some(150.0);
        let power = controller.required_power(&sample);
        assert_relative_eq!(power.expect("power"), 50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_suggestion_derates_breakpoint_power() {
        let breakpoints = CalibrationCurve::from_points([(100.0, 80.0), (200.0, 20.0)]);
        let mut controller =
            BangBang::new(BangBangConfig::default()).with_breakpoints(breakpoints);

        let mut sample = sample_at(150.0, 175.0);
        sample.device_temperature = Some(150.0); // halfway between breakpoints
        let power = controller.required_power(&sample);
        assert_relative_eq!(power.expect("power"), 25.0, epsilon = 1e-12);

        // At or above the last breakpoint the derate reaches zero.
        sample.device_temperature = Some(200.0);
        assert_relative_eq!(
            controller.required_power(&sample).expect("power"),
            0.0,
            epsilon = 1e-12
        );

        // Below the first breakpoint no derating applies.
        sample.device_temperature = Some(50.0);
        assert_relative_eq!(
            controller.required_power(&sample).expect("power"),
            50.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_cutoff_overrides_everything() {
        let mut controller = PowerController::bang_bang(BangBangConfig::default());
        // Single low-pass passes the first reading through, so the
        // forecast equals the seeded temperature exactly.
        let mut predictor = Predictor::single(40.0);

        let mut sample = sample_at(224.9, 300.0);
        assert_eq!(
            controller.power_limited(&mut sample, &mut predictor),
            Some(100.0)
        );

        let mut predictor = Predictor::single(40.0);
        let mut sample = sample_at(225.0, 300.0);
        assert_eq!(
            controller.power_limited(&mut sample, &mut predictor),
            Some(0.0)
        );
    }

    #[test]
    fn test_cutoff_trips_on_prediction_before_measurement() {
        let config = BangBangConfig {
            cutoff_temperature: 225.0,
            ..BangBangConfig::default()
        };
        let mut controller = PowerController::bang_bang(config);
        // Finite differences extrapolate the rising trend past the
        // cutoff even though the reading itself is still below it.
        let mut predictor = Predictor::finite_difference(1);
        for temperature in [200.0, 210.0, 220.0] {
            let mut sample = sample_at(temperature, 300.0);
            controller.power_limited(&mut sample, &mut predictor);
        }
        let mut sample = sample_at(224.0, 300.0);
        // Forecast = 224 + (224 - 220) = 228 >= 225.
        assert_eq!(
            controller.power_limited(&mut sample, &mut predictor),
            Some(0.0)
        );
        assert_eq!(sample.predicted_temperature, Some(228.0));
    }

    #[test]
    fn test_feed_forward_requires_thermal_model() {
        let err = FeedForward::new(FeedForwardConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ControlError::MissingThermalModel {
                parameter: "thermal_resistance"
            }
        ));

        let err = FeedForward::new(FeedForwardConfig {
            thermal_resistance: Some(2.0),
            ..FeedForwardConfig::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            ControlError::MissingThermalModel {
                parameter: "thermal_capacitance"
            }
        ));
    }

    #[test]
    fn test_feed_forward_rejects_non_physical_model() {
        let err = FeedForward::new(FeedForwardConfig {
            thermal_resistance: Some(-1.0),
            thermal_capacitance: Some(60.0),
            ..FeedForwardConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, ControlError::InvalidThermalModel { .. }));
    }

    #[test]
    fn test_feed_forward_solves_thermal_model() {
        let controller = FeedForward::new(FeedForwardConfig {
            thermal_resistance: Some(2.0),
            thermal_capacitance: Some(60.0),
            ambient: Some(25.0),
            cutoff_temperature: None,
        })
        .expect("construct");

        // Hold steady at 125 °C: P = (125 - 25) / 2 = 50 W.
        let sample = sample_at(125.0, 125.0);
        assert_relative_eq!(
            controller.required_power(&sample).expect("power"),
            50.0,
            epsilon = 1e-12
        );

        // Climb 1.5 °C in one period on top of the holding power.
        let sample = sample_at(125.0, 126.5);
        assert_relative_eq!(
            controller.required_power(&sample).expect("power"),
            50.0 + 60.0 * 1.5 / 1.5,
            epsilon = 1e-12
        );
    }
}
