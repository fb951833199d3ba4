pub mod adjustment;
pub mod component;
pub mod config;
pub mod distance;
pub mod duration;
pub mod engine;
pub mod expense;
pub mod jitter;
pub mod params;
pub mod quirk;
pub mod record;
pub mod validation;

pub use component::ScoringComponent;
pub use config::*;
pub use engine::{round_cents, Breakdown, ComponentContribution, Engine};
pub use params::{ParameterMap, ParameterVector};
pub use record::InputRecord;
pub use validation::validate_scoring;
