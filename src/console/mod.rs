//! Interactive ledger console: JSON commands in on stdin, JSON replies out on
//! stdout, with the autonomy beat running underneath.

pub mod listen;
pub mod report;
pub mod run;
pub mod types;

pub use listen::{listen, listen_stdin};
pub use report::{reply, Reply};
pub use run::Session;
pub use types::LedgerCommand;
