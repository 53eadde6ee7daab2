//! The seam between the autonomy timer and the ledger.

use std::sync::Arc;

/// Anything that can report the current autonomy scalar.
///
/// The ledger divides tension by this value on every resync, so a source
/// that keeps growing damps tension toward zero. Non-positive values leave
/// tension untouched.
pub trait PowerSource: Send + Sync {
    fn power(&self) -> f64;
}

/// A fixed scalar. Handy for one-shot commands and tests.
impl PowerSource for f64 {
    fn power(&self) -> f64 {
        *self
    }
}

impl<T: PowerSource + ?Sized> PowerSource for Arc<T> {
    fn power(&self) -> f64 {
        (**self).power()
    }
}
