//! Core ledger types for msgai

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Currency code → balance.
pub type Account = BTreeMap<String, f64>;

/// Account name → account.
pub type Accounts = BTreeMap<String, Account>;

pub const CURRENCIES: [&str; 6] = ["USD", "JPY", "EUR", "BTC", "ETH", "MATIC"];

pub const TAX_ARCHIVE: &str = "Tax_Archive";

/// The four vessels every fresh ledger starts with.
pub const ACCOUNT_NAMES: [&str; 4] = ["User_A", "User_B", "User_C", TAX_ARCHIVE];

pub const DEFAULT_ACTIVE_USER: &str = "User_A";

pub const STATUS_INITIALIZED: &str = "System Integrity Initialized";
pub const STATUS_RESTORED: &str = "Core State Restored";

/// An account holding 0.00 of every template currency.
pub fn zeroed_account() -> Account {
    CURRENCIES.iter().map(|c| (c.to_string(), 0.0)).collect()
}

pub fn initial_accounts() -> Accounts {
    ACCOUNT_NAMES
        .iter()
        .map(|name| (name.to_string(), zeroed_account()))
        .collect()
}

/// Bookkeeping "stress" value, damped by the autonomy scalar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TensionRecord {
    pub value: f64,
    pub max_limit: f64,
    /// Carried through snapshots; nothing reads it.
    pub increase_rate: f64,
}

impl Default for TensionRecord {
    fn default() -> Self {
        Self {
            value: 0.0,
            max_limit: 1.0,
            increase_rate: 0.00001,
        }
    }
}

impl TensionRecord {
    /// Add `amount` (any sign) and clamp at zero.
    pub fn add(&mut self, amount: f64) {
        self.value += amount;
        self.clamp();
    }

    pub fn clamp(&mut self) {
        // f64::max drops NaN in favour of the other operand
        self.value = self.value.max(0.0);
    }

    /// Scale the value by `1 / power`. Returns false when `power` is not
    /// positive and nothing changed.
    pub fn damp(&mut self, power: f64) -> bool {
        if power > 0.0 {
            self.value = (self.value * (1.0 / power)).max(0.0);
            true
        } else {
            false
        }
    }
}

fn default_status() -> String {
    STATUS_INITIALIZED.to_string()
}

fn default_active_user() -> String {
    DEFAULT_ACTIVE_USER.to_string()
}

/// The whole ledger. This is exactly what gets persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(default = "default_status")]
    pub status_message: String,
    #[serde(default = "default_active_user")]
    pub active_user: String,
    pub accounts: Accounts,
    #[serde(default)]
    pub tension: TensionRecord,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self::initial()
    }
}

impl LedgerState {
    /// The zeroed template.
    pub fn initial() -> Self {
        Self {
            status_message: default_status(),
            active_user: default_active_user(),
            accounts: initial_accounts(),
            tension: TensionRecord::default(),
        }
    }

    pub fn has_account(&self, name: &str) -> bool {
        self.accounts.contains_key(name)
    }

    pub fn account(&self, name: &str) -> Option<&Account> {
        self.accounts.get(name)
    }

    /// Balance of `user` in `currency`; unknown users and currencies read as zero.
    pub fn balance(&self, user: &str, currency: &str) -> f64 {
        self.accounts
            .get(user)
            .and_then(|a| a.get(currency))
            .copied()
            .unwrap_or(0.0)
    }

    /// Sum of one currency across every account.
    pub fn total_value(&self, currency: &str) -> f64 {
        self.accounts
            .values()
            .filter_map(|a| a.get(currency))
            .sum()
    }

    /// Re-add the archive account if a snapshot lost it. Returns true if
    /// anything was added.
    pub fn repair(&mut self) -> bool {
        if self.accounts.contains_key(TAX_ARCHIVE) {
            return false;
        }
        self.accounts
            .insert(TAX_ARCHIVE.to_string(), zeroed_account());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_has_four_zeroed_accounts() {
        let state = LedgerState::initial();
        assert_eq!(state.accounts.len(), 4);
        for name in ACCOUNT_NAMES {
            let account = state.account(name).unwrap();
            assert_eq!(account.len(), CURRENCIES.len());
            assert!(account.values().all(|b| *b == 0.0));
        }
        assert_eq!(state.active_user, "User_A");
        assert_eq!(state.status_message, STATUS_INITIALIZED);
    }

    #[test]
    fn damp_ignores_non_positive_power() {
        let mut t = TensionRecord { value: 0.5, ..Default::default() };
        assert!(!t.damp(0.0));
        assert!(!t.damp(-2.0));
        assert_eq!(t.value, 0.5);
        assert!(t.damp(2.0));
        assert_eq!(t.value, 0.25);
    }

    #[test]
    fn damp_by_infinity_zeroes() {
        let mut t = TensionRecord { value: 3.0, ..Default::default() };
        t.damp(f64::INFINITY);
        assert_eq!(t.value, 0.0);
    }

    #[test]
    fn add_clamps_at_zero() {
        let mut t = TensionRecord::default();
        t.add(0.2);
        t.add(-5.0);
        assert_eq!(t.value, 0.0);
    }

    #[test]
    fn repair_only_adds_missing_archive() {
        let mut state = LedgerState::initial();
        assert!(!state.repair());
        state.accounts.remove(TAX_ARCHIVE);
        assert!(state.repair());
        assert_eq!(state.account(TAX_ARCHIVE), Some(&zeroed_account()));
    }
}
