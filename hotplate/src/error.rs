use thiserror::Error;

/// Errors produced when constructing or driving the control core.
#[derive(Error, Debug)]
pub enum ControlError {
    /// Feed-forward control cannot run without a thermal model.
    #[error("feed-forward controller requires {parameter} to be configured")]
    MissingThermalModel {
        /// Name of the missing parameter.
        parameter: &'static str,
    },

    /// A thermal model parameter has a physically impossible value.
    #[error("{parameter} must be positive, got {value}")]
    InvalidThermalModel {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Configured value.
        value: f64,
    },

    /// A reflow profile was constructed with no stages.
    #[error("reflow profile must contain at least one stage")]
    EmptyProfile,
}

/// Errors produced by offline curve fitting and predictor tuning.
#[derive(Error, Debug)]
pub enum FitError {
    /// Not enough usable data points to fit.
    #[error("fit needs at least {needed} points, got {available}")]
    InsufficientData {
        /// Minimum number of points required.
        needed: usize,
        /// Number of points actually available.
        available: usize,
    },

    /// The series never reaches the 63.2% threshold of its range.
    #[error("series never crosses the step-response threshold")]
    NoCrossing,

    /// The regression produced a slope with the wrong sign for a
    /// first-order response.
    #[error("degenerate fit: regression slope is not negative")]
    DegenerateFit,
}
