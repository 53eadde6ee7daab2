//! Growth parameters for the autonomy scalar.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Golden ratio. The scalar is multiplied by this on every beat.
pub const PHI: f64 = 1.618_033_988_749_895;

/// Starting value, and the value the scalar cycles back to on overflow.
pub const UNITY: f64 = 1.0;

pub const DEFAULT_BEAT_MS: u64 = 1000;

pub const DEFAULT_DRIFT_AMPLITUDE: f64 = 0.001;

/// What happens when the scalar leaves the finite range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthMode {
    /// Reset to [`UNITY`] once the scalar is no longer finite.
    #[default]
    Cyclic,
    /// Let the scalar run to `+inf` and stay there.
    Unbounded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutonomyConfig {
    /// Multiplier applied per beat.
    pub ratio: f64,
    /// Beat period in milliseconds.
    pub beat_ms: u64,
    /// Perturb the ratio with `drift_amplitude * sin(phase / ratio)`.
    pub drift: bool,
    pub drift_amplitude: f64,
    pub mode: GrowthMode,
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            ratio: PHI,
            beat_ms: DEFAULT_BEAT_MS,
            drift: true,
            drift_amplitude: DEFAULT_DRIFT_AMPLITUDE,
            mode: GrowthMode::Cyclic,
        }
    }
}

impl AutonomyConfig {
    /// Beat period; a zero period is bumped to 1 ms.
    pub fn beat(&self) -> Duration {
        Duration::from_millis(self.beat_ms.max(1))
    }

    /// Effective multiplier for the given phase.
    pub fn factor(&self, phase: u64) -> f64 {
        if self.drift {
            self.ratio + self.drift_amplitude * (phase as f64 / self.ratio).sin()
        } else {
            self.ratio
        }
    }
}
