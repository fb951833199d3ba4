mod cases;
mod metrics;

pub use cases::{load_cases, parse_cases};
pub use metrics::{check_examples, evaluate, CalibrationExample, CaseError, Evaluation, Tolerances};
