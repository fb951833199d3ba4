use thiserror::Error;

/// Failures of the offline evaluation and calibration steps.
///
/// Estimation itself has no error type: it always produces an amount.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("example set is empty; calibration needs labeled cases")]
    EmptyDataset,

    #[error("example {index} is malformed: {reason}")]
    MalformedExample { index: usize, reason: String },

    #[error("optimizer unavailable: this build was compiled without the `optimizer` feature")]
    OptimizerUnavailable,

    #[error("engine exposes no calibratable parameters")]
    NoParameters,

    #[error("invalid calibration settings: {0}")]
    InvalidSettings(String),
}
