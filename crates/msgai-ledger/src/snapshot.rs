//! Whole-state JSON snapshots.

use msgai_core::{LedgerState, Result, STATUS_RESTORED, TAX_ARCHIVE};
use tracing::info;

pub fn encode_snapshot(state: &LedgerState) -> Result<String> {
    Ok(serde_json::to_string(state)?)
}

/// Parse a stored snapshot back into a live state.
///
/// A snapshot that lost the archive account gets a zeroed one back, and the
/// status message always reads as restored.
pub fn decode_snapshot(raw: &str) -> Result<LedgerState> {
    let mut state: LedgerState = serde_json::from_str(raw)?;
    if state.repair() {
        info!("snapshot was missing {}, re-added", TAX_ARCHIVE);
    }
    state.status_message = STATUS_RESTORED.to_string();
    Ok(state)
}
