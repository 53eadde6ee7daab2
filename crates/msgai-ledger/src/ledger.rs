//! The ledger: owned account state, transfers, and tension bookkeeping.
//!
//! Every mutating call writes the whole state to the store under one key.
//! Tension is damped against a [`PowerSource`] on [`Ledger::resync`].
//! `current_state`, `tension` and `active_user_balance` resync first;
//! [`Ledger::state`] and [`Ledger::balance`] are pure.

use crate::snapshot::{decode_snapshot, encode_snapshot};
use crate::store::Store;
use msgai_core::{Account, Error, LedgerState, PowerSource, Result, TensionRecord};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_STORAGE_KEY: &str = "msaiState";

/// Tension added per unit transferred.
pub const TRANSFER_TENSION_FACTOR: f64 = 0.0001;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Store key holding the JSON snapshot.
    pub storage_key: String,
    pub transfer_tension_factor: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            transfer_tension_factor: TRANSFER_TENSION_FACTOR,
        }
    }
}

pub struct Ledger {
    state: LedgerState,
    store: Arc<dyn Store>,
    power: Arc<dyn PowerSource>,
    config: LedgerConfig,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn check_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidAmount(amount))
    }
}

impl Ledger {
    pub fn open(store: Arc<dyn Store>, power: Arc<dyn PowerSource>) -> Result<Self> {
        Self::open_with(store, power, LedgerConfig::default())
    }

    /// Load the ledger from `store`.
    ///
    /// No snapshot: the zeroed template is persisted right away. Unreadable
    /// snapshot (bad JSON or bytes that are not UTF-8): logged and replaced
    /// in memory by the template; the bad blob stays in the store until the
    /// next mutation overwrites it. Other store errors are returned.
    pub fn open_with(
        store: Arc<dyn Store>,
        power: Arc<dyn PowerSource>,
        config: LedgerConfig,
    ) -> Result<Self> {
        let saved = match store.get(&config.storage_key) {
            Ok(saved) => saved.map(|raw| decode_snapshot(&raw)),
            Err(Error::IoError(e)) if e.kind() == ErrorKind::InvalidData => {
                Some(Err(Error::IoError(e)))
            }
            Err(e) => return Err(e),
        };
        let mut ledger = Self {
            state: LedgerState::initial(),
            store,
            power,
            config,
        };

        match saved {
            Some(loaded) => match loaded {
                Ok(state) => {
                    ledger.state = state;
                    ledger.resync();
                    info!(
                        key = %ledger.config.storage_key,
                        accounts = ledger.state.accounts.len(),
                        "ledger restored"
                    );
                }
                Err(e) => {
                    error!("Failed to load state: {}", e);
                }
            },
            None => {
                ledger.persist()?;
                info!(key = %ledger.config.storage_key, "ledger initialized");
            }
        }

        Ok(ledger)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Live state without resync.
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn into_state(self) -> LedgerState {
        self.state
    }

    pub fn active_user(&self) -> &str {
        &self.state.active_user
    }

    /// One account without resync.
    pub fn balance(&self, user: &str) -> Option<&Account> {
        self.state.account(user)
    }

    pub fn total_value(&self, currency: &str) -> f64 {
        self.state.total_value(currency)
    }

    /// Current scalar of the power source.
    pub fn power(&self) -> f64 {
        self.power.power()
    }

    pub fn snapshot_json(&self) -> Result<String> {
        encode_snapshot(&self.state)
    }

    /// Damp tension by `1 / power`. A non-positive power leaves it alone.
    /// Returns the resulting tension value. Not persisted on its own.
    pub fn resync(&mut self) -> f64 {
        let power = self.power.power();
        if self.state.tension.damp(power) {
            debug!(power, tension = self.state.tension.value, "tension resynced");
        }
        self.state.tension.value
    }

    /// Resync, then hand back the live state.
    pub fn current_state(&mut self) -> &LedgerState {
        self.resync();
        &self.state
    }

    /// Resync, then hand back the tension record.
    pub fn tension(&mut self) -> &TensionRecord {
        self.resync();
        &self.state.tension
    }

    /// Replace the whole state and persist it.
    pub fn update_state(&mut self, state: LedgerState) -> Result<()> {
        self.commit(state)
    }

    pub fn persist(&self) -> Result<()> {
        let json = encode_snapshot(&self.state)?;
        self.store.set(&self.config.storage_key, &json)
    }

    /// Write `next` to the store, then make it the live state. A failed
    /// write leaves the live state untouched.
    fn commit(&mut self, next: LedgerState) -> Result<()> {
        let json = encode_snapshot(&next)?;
        self.store.set(&self.config.storage_key, &json)?;
        self.state = next;
        Ok(())
    }

    /// Add `amount` (either sign) to tension, clamp at zero, resync, persist.
    pub fn add_tension(&mut self, amount: f64) -> Result<()> {
        let mut next = self.state.clone();
        next.tension.add(amount);
        next.tension.damp(self.power.power());
        self.commit(next)
    }

    pub fn set_active_user(&mut self, user: &str) -> Result<()> {
        if !self.state.has_account(user) {
            return Err(Error::unknown_user(user));
        }
        let mut next = self.state.clone();
        next.active_user = user.to_string();
        self.commit(next)
    }

    /// Resync, then return a copy of `user`'s balances; empty if unknown.
    pub fn active_user_balance(&mut self, user: &str) -> Account {
        self.resync();
        self.state.account(user).cloned().unwrap_or_default()
    }

    /// Credit `user` from outside the ledger.
    pub fn deposit(&mut self, user: &str, currency: &str, amount: f64) -> Result<()> {
        check_amount(amount)?;
        let mut next = self.state.clone();
        let account = next
            .accounts
            .get_mut(user)
            .ok_or_else(|| Error::unknown_user(user))?;
        *account.entry(currency.to_string()).or_insert(0.0) += amount;
        self.commit(next)?;
        info!(user, currency, amount, "deposit");
        Ok(())
    }

    /// Drop the persisted snapshot and fall back to the zeroed template.
    ///
    /// The fresh state is not written until the next mutation.
    pub fn delete_accounts(&mut self) -> Result<()> {
        self.store.remove(&self.config.storage_key)?;
        self.state = LedgerState::initial();
        info!("ledger reset");
        Ok(())
    }

    /// Move `amount` of `currency` from `sender` to `recipient`.
    ///
    /// The sender must hold at least `amount`. An unknown recipient receives
    /// nothing: the debited funds are burnt. Tension grows by
    /// `amount * transfer_tension_factor` either way.
    pub fn transfer(
        &mut self,
        sender: &str,
        recipient: &str,
        amount: f64,
        currency: &str,
    ) -> Result<&LedgerState> {
        check_amount(amount)?;
        let internal = self.state.has_account(recipient);

        if self.state.balance(sender, currency) < amount {
            return Err(Error::insufficient_balance(sender, currency));
        }
        let mut next = self.state.clone();
        let from = next
            .accounts
            .get_mut(sender)
            .ok_or_else(|| Error::unknown_user(sender))?;
        *from.entry(currency.to_string()).or_insert(0.0) -= amount;

        if let Some(to) = next.accounts.get_mut(recipient) {
            *to.entry(currency.to_string()).or_insert(0.0) += amount;
        }
        next.tension.add(amount * self.config.transfer_tension_factor);
        next.tension.damp(self.power.power());
        self.commit(next)?;

        if internal {
            info!(sender, recipient, currency, amount, "transfer");
        } else {
            warn!(
                sender,
                recipient,
                currency,
                amount,
                "transfer to unknown recipient burnt funds"
            );
        }
        Ok(&self.state)
    }
}
