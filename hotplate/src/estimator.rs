//! Resistance-temperature estimation using the heating element itself
//! as an RTD.
//!
//! Converts a tick's voltage/current into element resistance, then
//! resistance into plate temperature through a calibration curve. When
//! no real calibration exists yet, synthetic points derived from the
//! material's nominal temperature coefficient keep interpolation
//! well-defined.

use crate::config::EstimatorConfig;
use crate::curve::CalibrationCurve;
use crate::sample::Sample;

/// One reading from an auxiliary temperature instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeReading {
    /// Independently measured plate temperature (°C).
    pub temperature: f64,
    /// Reference / cold-junction temperature, if the instrument reports
    /// one (°C).
    pub reference: Option<f64>,
}

/// Boundary trait for an optional external measurement instrument.
///
/// Implementations expose the most recent known value at the instant
/// the core reads it; the instrument's own cadence and transport are
/// not this crate's concern.
pub trait TemperatureProbe {
    /// Most recent reading, if the instrument has produced one.
    fn read(&mut self) -> Option<ProbeReading>;
}

/// Estimates plate temperature from electrical measurements.
pub struct RtdEstimator {
    config: EstimatorConfig,
    curve: CalibrationCurve,
    probe: Option<Box<dyn TemperatureProbe>>,
}

impl RtdEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            curve: CalibrationCurve::new(),
            probe: None,
        }
    }

    /// Start from an existing resistance → temperature calibration.
    pub fn with_curve(mut self, curve: CalibrationCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Attach an auxiliary temperature instrument.
    pub fn with_probe(mut self, probe: Box<dyn TemperatureProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn curve(&self) -> &CalibrationCurve {
        &self.curve
    }

    /// Record a real calibration point (Ω, °C).
    pub fn add_calibration_point(&mut self, resistance: f64, temperature: f64) {
        self.curve.add_point(resistance, temperature);
    }

    /// Estimate the plate temperature for this tick.
    ///
    /// Writes `resistance` and `temperature` onto the sample. Returns
    /// `None` when the current is below the measurable threshold; the
    /// sample's derived fields are left unset so downstream stages hold
    /// state instead of acting on garbage.
    ///
    /// A fitted probe's reading is recorded alongside but never
    /// replaces the RTD-derived estimate.
    pub fn temperature(&mut self, sample: &mut Sample) -> Option<f64> {
        if let Some(probe) = self.probe.as_mut() {
            if let Some(reading) = probe.read() {
                sample.device_temperature = Some(reading.temperature);
                sample.reference_temperature = reading.reference;
            }
        }

        let resistance = match sample.resistance {
            Some(r) => r,
            None => {
                if sample.current < self.config.min_current {
                    log::debug!(
                        "current {:.3} A below measurable threshold {:.3} A, no estimate",
                        sample.current,
                        self.config.min_current
                    );
                    return None;
                }
                sample.voltage / sample.current
            }
        };

        self.bootstrap(resistance);

        let temperature = self.curve.estimate(resistance);
        sample.resistance = Some(resistance);
        sample.temperature = Some(temperature);
        Some(temperature)
    }

    /// Guarantee a non-degenerate curve before any real calibration
    /// exists.
    ///
    /// An empty curve is seeded with (resistance now, ambient). With
    /// exactly one point, the existing point is preserved and a
    /// companion 1 °C away is back-computed from the temperature
    /// coefficient: R(T) = R0·(1 + α·(T − T0)).
    fn bootstrap(&mut self, resistance: f64) {
        if self.curve.is_empty() {
            self.curve.add_point(resistance, self.config.ambient);
        }
        if self.curve.len() == 1 {
            if let Some((r0, t0)) = self.curve.first() {
                let companion = r0 * (1.0 + self.config.temperature_coefficient);
                self.curve.add_point(companion, t0 + 1.0);
            }
        }
    }
}
