//! Runner for executing a controller against the simulated plate over
//! time, collecting results.

use hotplate::ReflowController;

use crate::plate::SharedPlate;

/// Results from a runner execution.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Control ticks executed.
    pub ticks: usize,
    /// True when the sequence finished on its own rather than hitting
    /// the duration limit.
    pub completed: bool,
    /// Hottest plate temperature seen during the run (°C).
    pub max_temperature: f64,
    /// Plate temperature at each tick, for fitting and plotting.
    pub history: Vec<(f64, f64)>,
}

/// Run the controller against the plate for up to `duration` seconds at
/// the given tick period.
///
/// Each tick: measure, control, actuate, integrate. A tick that yields
/// no power command leaves the previous actuation in place.
pub fn run(
    controller: &mut ReflowController,
    plate: &SharedPlate,
    duration: f64,
    period: f64,
) -> RunSummary {
    let mut summary = RunSummary {
        ticks: 0,
        completed: false,
        max_temperature: f64::NEG_INFINITY,
        history: Vec::new(),
    };

    let steps = (duration / period).ceil() as usize;
    for step in 0..steps {
        let now = step as f64 * period;

        let measurement = {
            let mut plate = plate.lock().expect("plate lock");
            summary.history.push((now, plate.temperature()));
            summary.max_temperature = summary.max_temperature.max(plate.temperature());
            plate.measure()
        };

        let outcome = controller.tick(now, period, measurement);
        summary.ticks += 1;

        {
            let mut plate = plate.lock().expect("plate lock");
            if let Some(power) = outcome.power {
                plate.apply(power);
            }
            plate.advance(period);
        }

        if !outcome.running {
            summary.completed = true;
            break;
        }
    }

    log::info!(
        "run {} after {} ticks, peak {:.1} °C",
        if summary.completed { "completed" } else { "hit the duration limit" },
        summary.ticks,
        summary.max_temperature
    );
    summary
}
