use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use msgai_autonomy::Autonomy;
use msgai_ledger::Ledger;

use super::report::{reply, Reply};
use super::types::LedgerCommand;
use crate::config::SessionConfig;

/// A ledger paired with the autonomy beat that damps it.
pub struct Session {
    ledger: Ledger,
    autonomy: Autonomy,
    config: SessionConfig,
}

impl Session {
    /// `ledger` should have been opened against `autonomy.handle()`.
    pub fn new(ledger: Ledger, autonomy: Autonomy, config: SessionConfig) -> Self {
        Self {
            ledger,
            autonomy,
            config,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn autonomy(&self) -> &Autonomy {
        &self.autonomy
    }

    pub fn into_parts(self) -> (Ledger, Autonomy) {
        (self.ledger, self.autonomy)
    }

    fn power_data(&self) -> serde_json::Value {
        json!({
            "power": self.autonomy.power(),
            "phase": self.autonomy.phase(),
            "active": self.autonomy.is_active(),
        })
    }

    /// Run one command. Ledger errors come back as `Err`.
    pub fn try_apply(&mut self, cmd: &LedgerCommand) -> msgai_core::Result<Reply> {
        let r = match cmd {
            LedgerCommand::State => {
                let state = self.ledger.current_state();
                reply("state", json!({ "state": state }))
            }
            LedgerCommand::Balance { user } => {
                let balance = self.ledger.active_user_balance(user);
                reply("balance", json!({ "user": user, "balance": balance }))
            }
            LedgerCommand::SetActiveUser { user } => {
                self.ledger.set_active_user(user)?;
                reply("active_user", json!({ "user": user }))
            }
            LedgerCommand::Deposit {
                user,
                currency,
                amount,
            } => {
                self.ledger.deposit(user, currency, *amount)?;
                let balance = self.ledger.state().balance(user, currency);
                reply(
                    "deposit",
                    json!({ "user": user, "currency": currency, "balance": balance }),
                )
            }
            LedgerCommand::Transfer {
                sender,
                recipient,
                amount,
                currency,
            } => {
                let state = self.ledger.transfer(sender, recipient, *amount, currency)?;
                reply("transfer", json!({ "state": state }))
            }
            LedgerCommand::AddTension { amount } => {
                self.ledger.add_tension(*amount)?;
                reply("tension", json!({ "tension": self.ledger.state().tension }))
            }
            LedgerCommand::Resync => {
                let tension = self.ledger.resync();
                reply("resync", json!({ "tension": tension, "power": self.autonomy.power() }))
            }
            LedgerCommand::Reset => {
                self.ledger.delete_accounts()?;
                reply("reset", json!({ "state": self.ledger.state() }))
            }
            LedgerCommand::Power => reply("power", self.power_data()),
            LedgerCommand::Quit => reply("quit", json!({})),
        };
        Ok(r)
    }

    /// Run one command, turning a ledger error into an `error` reply.
    pub fn apply(&mut self, cmd: &LedgerCommand) -> Reply {
        match self.try_apply(cmd) {
            Ok(r) => r,
            Err(e) => {
                warn!(cmd = cmd.name(), "command failed: {}", e);
                reply("error", json!({ "cmd": cmd.name(), "error": e.to_string() }))
            }
        }
    }

    /// Drive the session until `quit`, command EOF, or `cancel`.
    ///
    /// The autonomy beat runs under a child of `cancel` for the lifetime of
    /// the loop. Every reply, including the periodic `status` line, goes to
    /// `emit`.
    pub async fn run<F>(
        mut self,
        mut commands: mpsc::Receiver<LedgerCommand>,
        cancel: CancellationToken,
        mut emit: F,
    ) -> Self
    where
        F: FnMut(&Reply),
    {
        self.autonomy.start_with(cancel.child_token());

        let mut status = tokio::time::interval(self.config.report_interval());
        status.set_missed_tick_behavior(MissedTickBehavior::Delay);
        status.tick().await;

        info!(
            active_user = self.ledger.active_user(),
            report_interval_ms = self.config.report_interval_ms,
            "session started"
        );

        let mut handled: u64 = 0;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("session cancelled");
                    break;
                }
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("command stream closed");
                        break;
                    };
                    handled += 1;
                    let r = self.apply(&cmd);
                    emit(&r);
                    if cmd == LedgerCommand::Quit {
                        break;
                    }
                }
                _ = status.tick() => {
                    let tension = self.ledger.resync();
                    let mut data = self.power_data();
                    data["tension"] = json!(tension);
                    data["active_user"] = json!(self.ledger.active_user());
                    emit(&reply("status", data));
                }
            }
        }

        self.autonomy.stop();
        info!(handled, power = self.autonomy.power(), "session ended");
        self
    }
}
