pub mod calibrate;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod output;
pub mod scoring;

pub use error::CalibrationError;
