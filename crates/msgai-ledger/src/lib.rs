//! msgai ledger - the account state holder, transfer processor and its storage

pub mod ledger;
pub mod snapshot;
pub mod store;

pub use ledger::{Ledger, LedgerConfig, DEFAULT_STORAGE_KEY, TRANSFER_TENSION_FACTOR};
pub use msgai_core::*;
pub use snapshot::{decode_snapshot, encode_snapshot};
pub use store::{FileStore, MemoryStore, Store};
