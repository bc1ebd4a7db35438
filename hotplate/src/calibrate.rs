//! Calibration excitation sequencing.
//!
//! Replaces the profile's temperature targets with a deterministic
//! power ladder: hold each power level long enough to settle, stepping
//! alternately up a new rung and back down a previously visited one so
//! the log captures both heating and cooling approaches to each level.

use crate::config::CalibrationConfig;
use crate::sample::Sample;

/// One rung of the excitation ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationStep {
    /// Zero-based step number.
    pub index: usize,
    /// Commanded power for the whole step (W).
    pub power: f64,
    /// Absolute time at which this step ends (s).
    pub step_end: f64,
    /// Stage label recorded on samples, e.g. `rising-20`.
    pub name: String,
}

/// Emits open-loop power setpoints for a calibration run.
pub struct CalibrationSequencer {
    config: CalibrationConfig,
    aborted: bool,
}

impl CalibrationSequencer {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            aborted: false,
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// The ladder rung for a step number.
    ///
    /// Even steps past the first revisit an earlier level from above,
    /// odd steps climb to a new one. The first two steps both rise so
    /// there is a level to fall back to.
    pub fn step(&self, index: usize) -> CalibrationStep {
        let (direction, rung) = match index {
            0 => ("rising", 1),
            1 => ("rising", 2),
            n if n % 2 == 1 => ("rising", (n + 3) / 2),
            n => ("falling", n / 2),
        };
        let power = self.config.power_step * rung as f64;
        CalibrationStep {
            index,
            power,
            step_end: (index as f64 + 1.0) * self.config.step_duration,
            name: format!("{direction}-{power}"),
        }
    }

    /// Advance the run. Writes `stage` and `set_power` onto the sample
    /// and returns true while steps remain.
    pub fn tick(&mut self, sample: &mut Sample) -> bool {
        if self.aborted {
            return false;
        }
        let index = (sample.now / self.config.step_duration).floor() as usize;
        if index >= self.config.max_steps {
            return false;
        }
        let step = self.step(index);
        sample.then = sample.now + sample.period;
        sample.set_power = Some(step.power);
        sample.stage = Some(step.name);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_alternates_after_second_step() {
        let sequencer = CalibrationSequencer::new(CalibrationConfig::default());
        let expected = [
            (0, 10.0, 450.0, "rising-10"),
            (1, 20.0, 900.0, "rising-20"),
            (2, 10.0, 1350.0, "falling-10"),
            (3, 30.0, 1800.0, "rising-30"),
            (4, 20.0, 2250.0, "falling-20"),
            (5, 40.0, 2700.0, "rising-40"),
            (6, 30.0, 3150.0, "falling-30"),
        ];
        for (index, power, step_end, name) in expected {
            let step = sequencer.step(index);
            assert_eq!(step.index, index);
            assert_eq!(step.power, power);
            assert_eq!(step.step_end, step_end);
            assert_eq!(step.name, name);
        }
    }

    #[test]
    fn test_tick_holds_power_for_whole_step() {
        let mut sequencer = CalibrationSequencer::new(CalibrationConfig::default());

        let mut sample = Sample::new(0.0, 1.5, 0.0, 0.0);
        assert!(sequencer.tick(&mut sample));
        assert_eq!(sample.set_power, Some(10.0));
        assert_eq!(sample.stage.as_deref(), Some("rising-10"));

        // Just before the boundary, still step 0.
        let mut sample = Sample::new(449.9, 1.5, 0.0, 0.0);
        assert!(sequencer.tick(&mut sample));
        assert_eq!(sample.set_power, Some(10.0));

        // At the boundary the next step begins.
        let mut sample = Sample::new(450.0, 1.5, 0.0, 0.0);
        assert!(sequencer.tick(&mut sample));
        assert_eq!(sample.set_power, Some(20.0));
        assert_eq!(sample.stage.as_deref(), Some("rising-20"));
    }

    #[test]
    fn test_completes_after_max_steps() {
        let mut sequencer = CalibrationSequencer::new(CalibrationConfig {
            max_steps: 3,
            ..Default::default()
        });

        let mut sample = Sample::new(1349.9, 1.5, 0.0, 0.0);
        assert!(sequencer.tick(&mut sample));

        let mut sample = Sample::new(1350.0, 1.5, 0.0, 0.0);
        assert!(!sequencer.tick(&mut sample));
        assert!(sample.set_power.is_none());
    }

    #[test]
    fn test_abort_stops_the_ladder() {
        let mut sequencer = CalibrationSequencer::new(CalibrationConfig::default());
        let mut sample = Sample::new(0.0, 1.5, 0.0, 0.0);
        assert!(sequencer.tick(&mut sample));
        sequencer.abort();
        let mut sample = Sample::new(1.5, 1.5, 0.0, 0.0);
        assert!(!sequencer.tick(&mut sample));
    }
}
