//! msgai - a toy multi-account ledger whose tension is damped by an
//! ever-growing autonomy scalar.

pub mod config;
pub mod console;
