use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::calibrate::CalibrationSettings;
use crate::scoring::ScoringConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scoring: Option<ScoringConfig>,
    #[serde(default)]
    pub calibration: Option<CalibrationSettings>,
    /// Parameter store location. Defaults to ~/.config/reimburse/parameters.json
    #[serde(default)]
    pub parameters_path: Option<PathBuf>,
}

impl Config {
    pub fn scoring(&self) -> ScoringConfig {
        self.scoring.clone().unwrap_or_default()
    }

    pub fn calibration(&self) -> CalibrationSettings {
        self.calibration.clone().unwrap_or_default()
    }
}
