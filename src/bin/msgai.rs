//! msgai - ledger console
//!
//! Usage:
//!   msgai state                               → print the ledger (resynced)
//!   msgai deposit User_A USD 50               → credit from outside
//!   msgai transfer User_A User_B 10 USD       → move funds
//!   msgai run                                 → JSON console with the autonomy beat
//!   msgai dump-config                         → default config as TOML

use clap::{Parser, Subcommand};
use msgai::config::{default_config_path, expand_tilde, MsgaiConfig};
use msgai::console::{listen_stdin, report, LedgerCommand, Session};
use msgai_autonomy::{Autonomy, CancellationToken};
use msgai_ledger::{FileStore, Ledger, MemoryStore, Store};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "msgai",
    about = "Multi-account ledger damped by a growing autonomy scalar",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (TOML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Snapshot directory (or set MSGAI_STORE_DIR)
    #[arg(long, global = true)]
    store_dir: Option<String>,

    /// Keep the ledger in memory only
    #[arg(long, global = true, default_value_t = false)]
    ephemeral: bool,

    /// Write logs to a file (in addition to stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the whole ledger
    State,
    /// Print one account's balances
    Balance { user: String },
    /// Set the active user
    Use { user: String },
    /// Credit an account from outside the ledger
    Deposit {
        user: String,
        currency: String,
        amount: f64,
    },
    /// Move funds; an unknown recipient burns them
    Transfer {
        sender: String,
        recipient: String,
        amount: f64,
        currency: String,
    },
    /// Add (or, with a negative amount, relieve) tension
    Tension {
        #[arg(allow_negative_numbers = true)]
        amount: f64,
    },
    /// Delete the snapshot and start from the zeroed template
    Reset,
    /// Interactive console: one JSON command per stdin line
    Run,
    /// Print the default config as TOML and exit
    DumpConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::DumpConfig) {
        println!("{}", MsgaiConfig::default().to_toml());
        return Ok(());
    }

    let guard = init_tracing(cli.log_file.as_deref())?;

    let config_path = cli
        .config
        .as_deref()
        .map(expand_tilde)
        .unwrap_or_else(default_config_path);
    let config = MsgaiConfig::load(&config_path);

    let store = open_store(&cli, &config);
    let autonomy = Autonomy::new(config.autonomy.clone());
    let ledger = Ledger::open_with(store, Arc::new(autonomy.handle()), config.ledger.clone())?;
    let mut session = Session::new(ledger, autonomy, config.session.clone());

    let cmd = match cli.command {
        Commands::Run => {
            run_console(session).await?;
            drop(guard);
            // the stdin reader thread cannot be cancelled; don't wait on it
            std::process::exit(0);
        }
        Commands::DumpConfig => return Ok(()),
        Commands::State => LedgerCommand::State,
        Commands::Balance { user } => LedgerCommand::Balance { user },
        Commands::Use { user } => LedgerCommand::SetActiveUser { user },
        Commands::Deposit {
            user,
            currency,
            amount,
        } => LedgerCommand::Deposit {
            user,
            currency,
            amount,
        },
        Commands::Transfer {
            sender,
            recipient,
            amount,
            currency,
        } => LedgerCommand::Transfer {
            sender,
            recipient,
            amount,
            currency,
        },
        Commands::Tension { amount } => LedgerCommand::AddTension { amount },
        Commands::Reset => LedgerCommand::Reset,
    };

    let reply = session.try_apply(&cmd)?;
    report::emit(&reply);
    Ok(())
}

async fn run_console(session: Session) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel::<LedgerCommand>(32);
    tokio::spawn(listen_stdin(tx));

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            interrupt.cancel();
        }
    });

    let session = session.run(rx, cancel, report::emit).await;
    // keep the last damped tension
    session.ledger().persist()?;
    Ok(())
}

fn open_store(cli: &Cli, config: &MsgaiConfig) -> Arc<dyn Store> {
    if cli.ephemeral {
        tracing::info!("Store: in-memory");
        return Arc::new(MemoryStore::new());
    }
    let dir = cli
        .store_dir
        .clone()
        .or_else(|| std::env::var("MSGAI_STORE_DIR").ok())
        .map(|d| expand_tilde(&d))
        .unwrap_or_else(|| config.storage.resolved_dir());
    tracing::info!("Store: {}", dir.display());
    Arc::new(FileStore::new(dir))
}

fn init_tracing(log_file: Option<&str>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "msgai=info,msgai_ledger=info,msgai_autonomy=info".into());
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let Some(path) = log_file else {
        tracing_subscriber::registry().with(filter).with(stderr).init();
        return Ok(None);
    };

    let path = expand_tilde(path);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("--log-file needs a file name"))?;
    std::fs::create_dir_all(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();
    Ok(Some(guard))
}
