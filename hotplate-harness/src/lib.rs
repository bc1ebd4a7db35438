//! Simulation harness for the hotplate control core.
//!
//! Provides a first-order thermal plate model with a realistic
//! electrical measurement path, and a runner that closes the loop
//! between a [`hotplate::ReflowController`] and the simulated plate.

pub mod plate;
pub mod runner;

pub use plate::{shared, PlateConfig, PlateProbe, SharedPlate, SimulatedPlate};
pub use runner::{run, RunSummary};
