use serde::Deserialize;

/// One line of console input, e.g. `{"cmd":"transfer","sender":"User_A",...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum LedgerCommand {
    State,
    Balance {
        user: String,
    },
    SetActiveUser {
        user: String,
    },
    Deposit {
        user: String,
        currency: String,
        amount: f64,
    },
    Transfer {
        sender: String,
        recipient: String,
        amount: f64,
        currency: String,
    },
    AddTension {
        amount: f64,
    },
    Resync,
    Reset,
    Power,
    Quit,
}

impl LedgerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Balance { .. } => "balance",
            Self::SetActiveUser { .. } => "set_active_user",
            Self::Deposit { .. } => "deposit",
            Self::Transfer { .. } => "transfer",
            Self::AddTension { .. } => "add_tension",
            Self::Resync => "resync",
            Self::Reset => "reset",
            Self::Power => "power",
            Self::Quit => "quit",
        }
    }
}
