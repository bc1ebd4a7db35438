//! Sample records flowing through the control tick.
//!
//! One [`Sample`] carries a tick's raw measurements plus the derived
//! fields written in place as it passes through the pipeline stages.
//! Finished samples are pushed into an append-only [`SampleLog`]; each
//! sample keeps the *index* of its predecessor of the same event
//! category, so filters can walk short history without a back-pointer
//! graph.

/// Event category a sample belongs to.
///
/// Periodic ticks and interactive operator input form two independent
/// predecessor chains in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    /// Regular periodic control tick.
    Tick,
    /// Lower-frequency interactive input (abort, pause, ...).
    Interactive,
}

impl SampleKind {
    fn slot(self) -> usize {
        match self {
            SampleKind::Tick => 0,
            SampleKind::Interactive => 1,
        }
    }
}

/// The unit of data flowing through one control tick.
///
/// Raw fields are set at construction; derived fields are filled in by
/// the estimator, predictor, sequencer and power controller. Once the
/// sample is pushed into the [`SampleLog`] it is immutable; later
/// ticks create new records rather than rewriting history.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Event category.
    pub kind: SampleKind,
    /// Monotonic elapsed time since run start (s).
    pub now: f64,
    /// Inter-sample duration (s).
    pub period: f64,
    /// Measured element voltage (V).
    pub voltage: f64,
    /// Measured element current (A).
    pub current: f64,
    /// Independently measured plate temperature, if a probe is fitted (°C).
    pub device_temperature: Option<f64>,
    /// Probe reference / cold-junction temperature (°C).
    pub reference_temperature: Option<f64>,
    /// Element resistance derived from V/I (Ω).
    pub resistance: Option<f64>,
    /// Plate temperature estimated from resistance (°C).
    pub temperature: Option<f64>,
    /// Forecast temperature from the predictor (°C).
    pub predicted_temperature: Option<f64>,
    /// Look-ahead instant, `now + period` (s).
    pub then: f64,
    /// Tracking target temperature at `then` (°C).
    pub then_temperature: Option<f64>,
    /// Commanded power for this tick (W).
    pub set_power: Option<f64>,
    /// Name of the active sequencer stage.
    pub stage: Option<String>,
    /// Log index of the previous sample of the same kind. Advisory
    /// history access only, never an ownership edge.
    pub prev: Option<usize>,
}

impl Sample {
    /// Create a periodic tick sample from raw measurements.
    pub fn new(now: f64, period: f64, voltage: f64, current: f64) -> Self {
        Self {
            kind: SampleKind::Tick,
            now,
            period,
            voltage,
            current,
            device_temperature: None,
            reference_temperature: None,
            resistance: None,
            temperature: None,
            predicted_temperature: None,
            then: now + period,
            then_temperature: None,
            set_power: None,
            stage: None,
            prev: None,
        }
    }

    /// Create an interactive-input sample. Carries no measurements.
    pub fn interactive(now: f64) -> Self {
        let mut sample = Self::new(now, 0.0, 0.0, 0.0);
        sample.kind = SampleKind::Interactive;
        sample
    }
}

/// Append-only log of finished samples with per-category predecessor
/// chains.
#[derive(Debug, Clone, Default)]
pub struct SampleLog {
    samples: Vec<Sample>,
    last: [Option<usize>; 2],
}

impl SampleLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a finished sample, linking it to the previous sample of the
    /// same kind. Returns the new sample's index.
    pub fn push(&mut self, mut sample: Sample) -> usize {
        let slot = sample.kind.slot();
        sample.prev = self.last[slot];
        let index = self.samples.len();
        self.samples.push(sample);
        self.last[slot] = Some(index);
        index
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    /// The most recent sample of the given kind.
    pub fn latest(&self, kind: SampleKind) -> Option<&Sample> {
        self.last[kind.slot()].and_then(|i| self.samples.get(i))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples in insertion (time) order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Walk the predecessor chain of a category, newest first.
    pub fn history(&self, kind: SampleKind) -> History<'_> {
        History {
            log: self,
            cursor: self.last[kind.slot()],
        }
    }
}

/// Iterator over one category's predecessor chain, newest first.
pub struct History<'a> {
    log: &'a SampleLog,
    cursor: Option<usize>,
}

impl<'a> Iterator for History<'a> {
    type Item = &'a Sample;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = self.log.get(self.cursor?)?;
        self.cursor = sample.prev;
        Some(sample)
    }
}
