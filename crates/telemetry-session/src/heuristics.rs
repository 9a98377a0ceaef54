//! Distance thresholds tuned against observed game behaviour.

use lapsync_errors::ConfigError;
use serde::{Deserialize, Serialize};

/// A backwards jump in lap distance shorter than this is a rewind.
pub const DEFAULT_FLASHBACK_THRESHOLD_M: f64 = 1500.0;
/// Distances below this count as "just past the start line".
pub const DEFAULT_NEW_LAP_THRESHOLD_M: f64 = 200.0;
/// Race/one-shot laps below this distance with full sectors are in-laps.
pub const DEFAULT_INLAP_THRESHOLD_M: f64 = 200.0;

/// Thresholds used by the lap and telemetry heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LapHeuristics {
    pub flashback_threshold_m: f64,
    pub new_lap_threshold_m: f64,
    pub inlap_threshold_m: f64,
}

impl Default for LapHeuristics {
    fn default() -> Self {
        Self {
            flashback_threshold_m: DEFAULT_FLASHBACK_THRESHOLD_M,
            new_lap_threshold_m: DEFAULT_NEW_LAP_THRESHOLD_M,
            inlap_threshold_m: DEFAULT_INLAP_THRESHOLD_M,
        }
    }
}

impl LapHeuristics {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("flashback_threshold_m", self.flashback_threshold_m),
            ("new_lap_threshold_m", self.new_lap_threshold_m),
            ("inlap_threshold_m", self.inlap_threshold_m),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid(field, "must be a positive distance"));
            }
        }
        Ok(())
    }
}
