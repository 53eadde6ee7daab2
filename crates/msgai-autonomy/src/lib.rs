//! msgai autonomy - the periodic growth scalar that damps ledger tension

pub mod config;
pub mod pulse;

pub use config::{AutonomyConfig, GrowthMode, DEFAULT_BEAT_MS, DEFAULT_DRIFT_AMPLITUDE, PHI, UNITY};
pub use pulse::{step, Autonomy, AutonomyHandle};
pub use tokio_util::sync::CancellationToken;
