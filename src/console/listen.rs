use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use super::types::LedgerCommand;

pub async fn listen_stdin(tx: mpsc::Sender<LedgerCommand>) {
    listen(BufReader::new(tokio::io::stdin()), tx).await
}

/// Forward one parsed command per non-empty line until EOF or until the
/// receiver goes away. Malformed lines are logged and skipped.
pub async fn listen<R: AsyncBufRead + Unpin>(reader: R, tx: mpsc::Sender<LedgerCommand>) {
    let mut lines = reader.lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<LedgerCommand>(line) {
            Ok(cmd) => {
                if tx.send(cmd).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(input = line, "invalid command: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_lines_and_skips_garbage() {
        let input = b"{\"cmd\":\"state\"}\n\n   \nnot json\n{\"cmd\":\"add_tension\",\"amount\":0.5}\n{\"cmd\":\"fly\"}\n{\"cmd\":\"quit\"}\n";
        let (tx, mut rx) = mpsc::channel(8);
        listen(&input[..], tx).await;

        assert_eq!(rx.recv().await, Some(LedgerCommand::State));
        assert_eq!(rx.recv().await, Some(LedgerCommand::AddTension { amount: 0.5 }));
        assert_eq!(rx.recv().await, Some(LedgerCommand::Quit));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn stops_when_receiver_dropped() {
        let input = b"{\"cmd\":\"power\"}\n{\"cmd\":\"power\"}\n";
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        // returns instead of blocking on a full channel
        listen(&input[..], tx).await;
    }
}
