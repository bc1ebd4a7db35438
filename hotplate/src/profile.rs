//! Reflow profile sequencing.
//!
//! A profile is an ordered, immutable list of named stages set at
//! construction. Each tick converts elapsed time into the tracking
//! target for `now + period`, interpolating within the active stage,
//! and signals completion once the final stage boundary is passed.

use crate::config::{Stage, DEFAULT_AMBIENT};
use crate::error::ControlError;
use crate::sample::Sample;

/// Drives a reflow run through its stages.
pub struct ProfileSequencer {
    stages: Vec<Stage>,
    /// Cumulative end time of each stage (s).
    boundaries: Vec<f64>,
    /// Pinned from the first real temperature reading; the start point
    /// of stage zero's interpolation.
    ambient: Option<f64>,
    aborted: bool,
}

impl ProfileSequencer {
    pub fn new(stages: Vec<Stage>) -> Result<Self, ControlError> {
        if stages.is_empty() {
            return Err(ControlError::EmptyProfile);
        }
        let mut boundaries = Vec::with_capacity(stages.len());
        let mut total = 0.0;
        for stage in &stages {
            total += stage.duration;
            boundaries.push(total);
        }
        Ok(Self {
            stages,
            boundaries,
            ambient: None,
            aborted: false,
        })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> f64 {
        self.boundaries.last().copied().unwrap_or(0.0)
    }

    /// Operator interrupt: maps to an immediate "sequence exhausted"
    /// signal on the next tick. Nothing concurrent needs cancelling.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Index and stage containing elapsed time `t`. The boundary
    /// instant belongs to the stage ending there.
    fn stage_at(&self, t: f64) -> Option<(usize, &Stage)> {
        self.boundaries
            .iter()
            .position(|&end| t <= end)
            .map(|i| (i, &self.stages[i]))
    }

    /// Advance the run. Writes `then`, `then_temperature` and `stage`
    /// onto the sample and returns true while stages remain.
    ///
    /// The look-ahead target is interpolated within the stage
    /// containing `then = now + period`; the look-ahead crosses at most
    /// one stage boundary per tick since durations are at least one
    /// period.
    pub fn tick(&mut self, sample: &mut Sample) -> bool {
        if self.aborted {
            return false;
        }
        if self.ambient.is_none() {
            if let Some(temperature) = sample.temperature {
                self.ambient = Some(temperature);
                log::debug!("profile ambient pinned at {temperature:.1} °C");
            }
        }
        if sample.now > self.total_duration() {
            return false;
        }

        let then = sample.now + sample.period;
        sample.then = then;

        // Past the final boundary the target clips to the last stage's end.
        let lookahead = then.min(self.total_duration());
        let Some((index, stage)) = self.stage_at(lookahead) else {
            return false;
        };

        let stage_start = if index == 0 {
            0.0
        } else {
            self.boundaries[index - 1]
        };
        let start_temperature = if index == 0 {
            self.ambient.unwrap_or(DEFAULT_AMBIENT)
        } else {
            self.stages[index - 1].target
        };

        let fraction = if stage.duration > 0.0 {
            ((lookahead - stage_start) / stage.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        sample.then_temperature =
            Some(start_temperature + fraction * (stage.target - start_temperature));
        sample.stage = Some(stage.name.clone());
        true
    }
}
