//! msgai core - ledger types, the power source seam, and error handling

pub mod error;
pub mod power;
pub mod types;

pub use error::{Error, Result};
pub use power::PowerSource;
pub use types::*;
