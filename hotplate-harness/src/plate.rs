//! First-order thermal simulation of a hotplate and its electrical
//! measurement path.

use std::sync::{Arc, Mutex};

use hotplate::{Measurement, ProbeReading, TemperatureProbe};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Physical parameters of the simulated plate.
#[derive(Debug, Clone)]
pub struct PlateConfig {
    /// Ambient temperature (°C).
    pub ambient: f64,
    /// Thermal resistance to ambient (°C/W).
    pub thermal_resistance: f64,
    /// Thermal capacitance (J/°C).
    pub thermal_capacitance: f64,
    /// Element resistance at ambient (Ω).
    pub base_resistance: f64,
    /// Temperature coefficient of the element (1/°C).
    pub temperature_coefficient: f64,
    /// Minimum excitation used by the measurement path so voltage and
    /// current stay readable at zero commanded power (W). Does not
    /// contribute heat.
    pub sense_power: f64,
    /// Relative measurement noise amplitude (fraction of reading).
    pub noise: f64,
    /// Noise generator seed; runs are reproducible.
    pub seed: u64,
}

impl Default for PlateConfig {
    fn default() -> Self {
        Self {
            ambient: 25.0,
            thermal_resistance: 2.5,
            thermal_capacitance: 40.0,
            base_resistance: 1.0,
            temperature_coefficient: 0.00393,
            sense_power: 2.0,
            noise: 0.0,
            seed: 42,
        }
    }
}

/// A hotplate reduced to one thermal mass behind one loss path:
/// `dT/dt = P/C − (T − ambient)/(R·C)`.
pub struct SimulatedPlate {
    config: PlateConfig,
    temperature: f64,
    applied_power: f64,
    rng: ChaCha8Rng,
}

impl SimulatedPlate {
    pub fn new(config: PlateConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            temperature: config.ambient,
            applied_power: 0.0,
            config,
            rng,
        }
    }

    pub fn config(&self) -> &PlateConfig {
        &self.config
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Element resistance at the current plate temperature, linear in
    /// temperature like a metal RTD.
    pub fn element_resistance(&self) -> f64 {
        self.config.base_resistance
            * (1.0 + self.config.temperature_coefficient * (self.temperature - self.config.ambient))
    }

    /// Command the heater power held until the next [`advance`].
    ///
    /// [`advance`]: SimulatedPlate::advance
    pub fn apply(&mut self, power: f64) {
        self.applied_power = power.max(0.0);
    }

    /// Integrate the thermal model forward by `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        let loss = (self.temperature - self.config.ambient)
            / (self.config.thermal_resistance * self.config.thermal_capacitance);
        self.temperature += dt * (self.applied_power / self.config.thermal_capacitance - loss);
    }

    /// Read the element's voltage and current.
    ///
    /// The measurement path excites the element with at least
    /// `sense_power` so the reading never collapses to 0 V / 0 A while
    /// the heater is off.
    pub fn measure(&mut self) -> Measurement {
        let resistance = self.element_resistance();
        let excitation = self.applied_power.max(self.config.sense_power);
        let current = (excitation / resistance).sqrt();
        let voltage = current * resistance;
        Measurement::new(
            voltage * (1.0 + self.noise_sample()),
            current * (1.0 + self.noise_sample()),
        )
    }

    fn noise_sample(&mut self) -> f64 {
        if self.config.noise == 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-self.config.noise..=self.config.noise)
    }
}

/// Handle shared between the runner and an attached probe.
pub type SharedPlate = Arc<Mutex<SimulatedPlate>>;

pub fn shared(plate: SimulatedPlate) -> SharedPlate {
    Arc::new(Mutex::new(plate))
}

/// An ideal auxiliary thermometer reading the simulated plate directly.
pub struct PlateProbe {
    plate: SharedPlate,
}

impl PlateProbe {
    pub fn new(plate: SharedPlate) -> Self {
        Self { plate }
    }
}

impl TemperatureProbe for PlateProbe {
    fn read(&mut self) -> Option<ProbeReading> {
        let plate = self.plate.lock().ok()?;
        Some(ProbeReading {
            temperature: plate.temperature(),
            reference: Some(plate.config().ambient),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_settles_to_steady_state() {
        let mut plate = SimulatedPlate::new(PlateConfig::default());
        plate.apply(40.0);
        for _ in 0..10_000 {
            plate.advance(0.5);
        }
        // Steady state: ambient + P·R = 25 + 40·2.5.
        assert_relative_eq!(plate.temperature(), 125.0, epsilon = 0.1);
    }

    #[test]
    fn test_resistance_tracks_temperature() {
        let mut plate = SimulatedPlate::new(PlateConfig::default());
        assert_relative_eq!(plate.element_resistance(), 1.0, epsilon = 1e-12);
        plate.apply(40.0);
        for _ in 0..10_000 {
            plate.advance(0.5);
        }
        let expected = 1.0 * (1.0 + 0.00393 * (plate.temperature() - 25.0));
        assert_relative_eq!(plate.element_resistance(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_measurement_survives_zero_power() {
        let mut plate = SimulatedPlate::new(PlateConfig::default());
        let m = plate.measure();
        assert!(m.current > 0.0);
        // V/I recovers the element resistance exactly with no noise.
        assert_relative_eq!(m.voltage / m.current, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_noise_is_reproducible() {
        let config = PlateConfig {
            noise: 0.01,
            ..PlateConfig::default()
        };
        let mut a = SimulatedPlate::new(config.clone());
        let mut b = SimulatedPlate::new(config);
        assert_eq!(a.measure(), b.measure());
    }

    #[test]
    fn test_probe_reads_plate_temperature() {
        let plate = shared(SimulatedPlate::new(PlateConfig::default()));
        let mut probe = PlateProbe::new(plate.clone());
        let reading = probe.read().expect("reading");
        assert_eq!(reading.temperature, 25.0);
        assert_eq!(reading.reference, Some(25.0));
    }
}
