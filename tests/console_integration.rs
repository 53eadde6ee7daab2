//! Integration tests: the console session driving a real ledger with the
//! autonomy beat running under paused tokio time.

use msgai::config::SessionConfig;
use msgai::console::{LedgerCommand, Reply, Session};
use msgai_autonomy::{Autonomy, AutonomyConfig, CancellationToken, PHI};
use msgai_ledger::{Ledger, LedgerState, MemoryStore, Store, DEFAULT_STORAGE_KEY};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn session_with(store: Arc<MemoryStore>, beat_ms: u64, report_ms: u64) -> Session {
    let autonomy = Autonomy::new(AutonomyConfig {
        beat_ms,
        drift: false,
        ..Default::default()
    });
    let ledger = Ledger::open(store, Arc::new(autonomy.handle())).unwrap();
    Session::new(
        ledger,
        autonomy,
        SessionConfig {
            report_interval_ms: report_ms,
        },
    )
}

fn events(replies: &[Reply]) -> Vec<&'static str> {
    replies.iter().map(|r| r.event).collect()
}

// ===========================================================================
// Command flow
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn transfer_then_damp_then_quit() {
    let store = Arc::new(MemoryStore::new());
    let session = session_with(store.clone(), 100, 1050);
    let (tx, rx) = mpsc::channel(8);
    let mut replies: Vec<Reply> = Vec::new();

    let (session, ()) = tokio::join!(
        session.run(rx, CancellationToken::new(), |r| replies.push(r.clone())),
        async move {
            tx.send(LedgerCommand::Transfer {
                sender: "User_A".into(),
                recipient: "User_B".into(),
                amount: 10.0,
                currency: "USD".into(),
            })
            .await
            .unwrap();
            tx.send(LedgerCommand::Deposit {
                user: "User_A".into(),
                currency: "USD".into(),
                amount: 50.0,
            })
            .await
            .unwrap();
            tx.send(LedgerCommand::Transfer {
                sender: "User_A".into(),
                recipient: "User_B".into(),
                amount: 10.0,
                currency: "USD".into(),
            })
            .await
            .unwrap();
            tokio::time::sleep(Duration::from_millis(1100)).await;
            tx.send(LedgerCommand::State).await.unwrap();
            tx.send(LedgerCommand::Quit).await.unwrap();
        }
    );

    assert_eq!(
        events(&replies),
        vec!["error", "deposit", "transfer", "status", "state", "quit"]
    );
    assert_eq!(replies[0].data["error"], "User_A balance insufficient for USD.");

    let transfer = &replies[2].data["state"];
    assert_eq!(transfer["accounts"]["User_A"]["USD"], 40.0);
    assert_eq!(transfer["accounts"]["User_B"]["USD"], 10.0);
    let undamped = transfer["tension"]["value"].as_f64().unwrap();
    assert!((undamped - 0.001).abs() < 1e-12);

    let status = &replies[3].data;
    assert_eq!(status["phase"], 10);
    let damped = status["tension"].as_f64().unwrap();
    assert!((damped - 0.001 / PHI.powi(10)).abs() < 1e-15);

    assert!(!session.autonomy().is_active());
    let stored: LedgerState =
        serde_json::from_str(&store.get(DEFAULT_STORAGE_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored.balance("User_B", "USD"), 10.0);
}

#[tokio::test(start_paused = true)]
async fn errors_do_not_stop_the_loop() {
    let session = session_with(Arc::new(MemoryStore::new()), 1000, 60_000);
    let (tx, rx) = mpsc::channel(8);
    let mut replies: Vec<Reply> = Vec::new();

    tx.send(LedgerCommand::SetActiveUser { user: "Ghost".into() })
        .await
        .unwrap();
    tx.send(LedgerCommand::SetActiveUser { user: "User_C".into() })
        .await
        .unwrap();
    tx.send(LedgerCommand::Balance { user: "Ghost".into() })
        .await
        .unwrap();
    drop(tx);

    let session = session
        .run(rx, CancellationToken::new(), |r| replies.push(r.clone()))
        .await;

    assert_eq!(events(&replies), vec!["error", "active_user", "balance"]);
    assert_eq!(replies[2].data["balance"], serde_json::json!({}));
    assert_eq!(session.ledger().active_user(), "User_C");
}

// ===========================================================================
// Shutdown
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn closed_command_stream_ends_session() {
    let session = session_with(Arc::new(MemoryStore::new()), 100, 60_000);
    let (tx, rx) = mpsc::channel::<LedgerCommand>(1);
    drop(tx);

    let session = session.run(rx, CancellationToken::new(), |_| {}).await;
    assert!(!session.autonomy().is_active());
}

#[tokio::test(start_paused = true)]
async fn cancellation_ends_session_and_beat() {
    let session = session_with(Arc::new(MemoryStore::new()), 100, 60_000);
    let (_tx, rx) = mpsc::channel::<LedgerCommand>(1);
    let cancel = CancellationToken::new();
    let mut replies: Vec<Reply> = Vec::new();

    let trigger = cancel.clone();
    let (session, ()) = tokio::join!(
        session.run(rx, cancel, |r| replies.push(r.clone())),
        async move {
            tokio::time::sleep(Duration::from_millis(550)).await;
            trigger.cancel();
        }
    );

    assert!(replies.is_empty());
    assert!(!session.autonomy().is_active());
    let phase = session.autonomy().phase();
    assert_eq!(phase, 5);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(session.autonomy().phase(), phase);
}

#[tokio::test(start_paused = true)]
async fn reset_clears_snapshot() {
    let store = Arc::new(MemoryStore::new());
    let session = session_with(store.clone(), 1000, 60_000);
    let (tx, rx) = mpsc::channel(8);
    let mut replies: Vec<Reply> = Vec::new();

    tx.send(LedgerCommand::Deposit {
        user: "User_B".into(),
        currency: "EUR".into(),
        amount: 3.0,
    })
    .await
    .unwrap();
    tx.send(LedgerCommand::Reset).await.unwrap();
    tx.send(LedgerCommand::Quit).await.unwrap();

    let session = session
        .run(rx, CancellationToken::new(), |r| replies.push(r.clone()))
        .await;

    assert_eq!(events(&replies), vec!["deposit", "reset", "quit"]);
    assert!(!store.contains(DEFAULT_STORAGE_KEY));
    assert_eq!(*session.ledger().state(), LedgerState::initial());
}
