//! Construction-time configuration for the control core.
//!
//! All tables and coefficients are accepted as plain structured values at
//! construction; file formats and loading live outside this crate.

use serde::{Deserialize, Serialize};

/// Nominal temperature coefficient of resistance for copper, per °C.
///
/// Used to synthesize a second calibration point before any real
/// calibration data exists.
pub const COPPER_TEMPERATURE_COEFFICIENT: f64 = 0.00393;

/// Ambient temperature assumed before the first real reading, in °C.
pub const DEFAULT_AMBIENT: f64 = 25.0;

/// Configuration for the resistance-temperature estimator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Ambient temperature used to seed an empty calibration curve (°C).
    pub ambient: f64,
    /// Temperature coefficient of resistance of the element material (1/°C).
    pub temperature_coefficient: f64,
    /// Minimum measurable current (A). Below this the V/I division is
    /// too unstable to trust and the tick produces no estimate.
    pub min_current: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            ambient: DEFAULT_AMBIENT,
            temperature_coefficient: COPPER_TEMPERATURE_COEFFICIENT,
            min_current: 0.05,
        }
    }
}

/// Asymmetric hysteresis band around the tracking target (°C offsets).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Hysteresis {
    /// Offset below target that re-arms full power on the way down.
    pub low: f64,
    /// Offset above target that switches to idle power on the way up.
    pub high: f64,
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self { low: 3.0, high: 3.0 }
    }
}

/// Configuration for the bang-bang power controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BangBangConfig {
    /// Maximum commanded power (W).
    pub max_power: f64,
    /// Idle power commanded above target; keeps the element measurable (W).
    pub idle_power: f64,
    /// Hysteresis band around the tracking target.
    pub hysteresis: Hysteresis,
    /// Hard cutoff: predicted or measured temperature at/above this
    /// always forces zero power (°C).
    pub cutoff_temperature: f64,
}

impl Default for BangBangConfig {
    fn default() -> Self {
        Self {
            max_power: 100.0,
            idle_power: 2.0,
            hysteresis: Hysteresis::default(),
            cutoff_temperature: 225.0,
        }
    }
}

/// Configuration for the feed-forward power controller.
///
/// The thermal resistance and capacitance are mandatory; construction
/// fails fast without them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct FeedForwardConfig {
    /// Thermal resistance of the plate to ambient (°C/W).
    pub thermal_resistance: Option<f64>,
    /// Thermal capacitance of the plate (J/°C).
    pub thermal_capacitance: Option<f64>,
    /// Ambient temperature of the thermal model (°C).
    /// Defaults to [`DEFAULT_AMBIENT`] when unset.
    pub ambient: Option<f64>,
    /// Hard cutoff temperature (°C). Defaults to 225.
    pub cutoff_temperature: Option<f64>,
}

/// One named segment of a reflow profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Human-readable stage name, e.g. "preheat".
    pub name: String,
    /// Target temperature at the end of the stage (°C).
    pub target: f64,
    /// Stage duration (s). Assumed to be at least one sample period.
    pub duration: f64,
}

impl Stage {
    pub fn new(name: impl Into<String>, target: f64, duration: f64) -> Self {
        Self {
            name: name.into(),
            target,
            duration,
        }
    }
}

/// Configuration for the stepped-excitation calibration sequencer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Power increment between successive rising steps (W).
    pub power_step: f64,
    /// Duration of each step (s).
    pub step_duration: f64,
    /// Number of steps before the sequence reports completion.
    pub max_steps: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            power_step: 10.0,
            step_duration: 450.0,
            max_steps: 12,
        }
    }
}

/// Options for predictor tuning against recorded samples.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TuneOptions {
    /// Search bounds for each time-constant parameter (s).
    pub bounds: (f64, f64),
    /// Golden-section iterations per parameter.
    pub iterations: usize,
    /// Coordinate-descent sweeps across parameters.
    pub sweeps: usize,
    /// Exclude samples later than this from the objective, cutting off
    /// the cool-down tail of a run.
    pub max_time: Option<f64>,
    /// Exclude samples whose reference temperature is below this (°C).
    pub min_temperature: Option<f64>,
    /// Weight errors by the reference's rise above this ambient (°C),
    /// so the long cool-down tail does not dominate the fit.
    pub ambient_bias: Option<f64>,
}

impl Default for TuneOptions {
    fn default() -> Self {
        Self {
            bounds: (1.0, 600.0),
            iterations: 48,
            sweeps: 3,
            max_time: None,
            min_temperature: None,
            ambient_bias: None,
        }
    }
}
