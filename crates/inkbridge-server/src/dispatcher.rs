//! The single task that owns the relay [`Router`].

use std::time::Duration;

use inkbridge_relay::{DrawProgress, RelayEvent, RelayStatus, Router};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How often a paused batch checks for send-queue room.
const DRAIN_POLL: Duration = Duration::from_millis(2);

/// Feed transport events to the router one at a time, publishing a fresh
/// status snapshot after each.
///
/// A batch that fills a peer's send queue is finished before the next event
/// is read. A peer that makes no room for `stall_timeout` is pushed past and
/// dropped by the router.
pub fn spawn_dispatcher(
    mut router: Router,
    mut events: mpsc::Receiver<RelayEvent>,
    status: watch::Sender<RelayStatus>,
    stall_timeout: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                event = events.recv() => event,
                () = cancel.cancelled() => break,
            };
            let Some(event) = event else { break };
            let progress = router.handle(event);
            if let DrawProgress::Pending { .. } = progress {
                finish_batch(&mut router, progress, stall_timeout, &cancel).await;
            }
            let _ = status.send_replace(router.status());
        }
        tracing::debug!("dispatcher stopped");
    })
}

async fn finish_batch(
    router: &mut Router,
    mut progress: DrawProgress,
    stall_timeout: Duration,
    cancel: &CancellationToken,
) {
    let mut last_move = Instant::now();
    while let DrawProgress::Pending { remaining } = progress {
        if last_move.elapsed() >= stall_timeout {
            tracing::warn!(remaining, "send queue stalled, forcing batch forward");
            progress = router.force_step();
            last_move = Instant::now();
            continue;
        }

        tokio::select! {
            () = tokio::time::sleep(DRAIN_POLL) => {}
            () = cancel.cancelled() => return,
        }

        progress = router.resume();
        if progress != (DrawProgress::Pending { remaining }) {
            last_move = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::connection::ConnectionTable;
    use inkbridge_core::ConnectionId;
    use inkbridge_relay::RelayConfig;

    fn setup() -> (
        mpsc::Sender<RelayEvent>,
        watch::Receiver<RelayStatus>,
        CancellationToken,
        tokio::task::JoinHandle<()>,
    ) {
        let table = Arc::new(ConnectionTable::new(8));
        let router = Router::new(&RelayConfig::default(), table);
        let (tx, rx) = mpsc::channel(16);
        let (status_tx, status_rx) = watch::channel(RelayStatus::default());
        let cancel = CancellationToken::new();
        let handle = spawn_dispatcher(router, rx, status_tx, STALL, cancel.clone());
        (tx, status_rx, cancel, handle)
    }

    const STALL: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn publishes_status_after_each_event() {
        let (tx, mut status, _cancel, _handle) = setup();
        tx.send(RelayEvent::Connected(ConnectionId::from_raw("a")))
            .await
            .unwrap();
        status.changed().await.unwrap();
        assert_eq!(status.borrow().connections, 1);

        tx.send(RelayEvent::Disconnected(ConnectionId::from_raw("a")))
            .await
            .unwrap();
        status.changed().await.unwrap();
        assert_eq!(status.borrow().connections, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_arm_is_dropped_after_stall_timeout() {
        let table = Arc::new(ConnectionTable::new(4));
        let root = CancellationToken::new();
        let (arm, _arm_rx, arm_closed) = table.register(&root);
        let (op, mut op_rx, _) = table.register(&root);

        let router = Router::new(&RelayConfig::default(), table.clone());
        let (tx, rx) = mpsc::channel(16);
        let (status_tx, mut status) = watch::channel(RelayStatus::default());
        let _handle = spawn_dispatcher(router, rx, status_tx, STALL, CancellationToken::new());

        // The operator keeps reading; the arm never does.
        let (seen_tx, mut seen) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(text) = op_rx.recv().await {
                let _ = seen_tx.send(text);
            }
        });

        let points: Vec<String> = (0..10).map(|x| format!("{x},7")).collect();
        let drawing = format!(r#"{{"id":"DRAWING","data":[{{"points":[{}]}}]}}"#, points.join(","));
        for event in [
            RelayEvent::Connected(arm.clone()),
            RelayEvent::Frame(arm.clone(), r#"{"id":"ARM"}"#.into()),
            RelayEvent::Connected(op.clone()),
            RelayEvent::Frame(op.clone(), drawing),
        ] {
            tx.send(event).await.unwrap();
        }

        let started = tokio::time::Instant::now();
        status.wait_for(|s| s.strokes_logged == 1).await.unwrap();
        assert!(started.elapsed() >= STALL);
        assert!(!status.borrow().arm_bound);
        assert!(arm_closed.is_cancelled());

        let mut echoes = 0;
        let mut arm_gone = false;
        tokio::time::timeout(Duration::from_secs(1), async {
            while echoes < 10 {
                let text = seen.recv().await.unwrap();
                echoes += usize::from(text.contains("Calculated angles"));
                arm_gone |= text.contains("ARM disconnected");
            }
        })
        .await
        .unwrap();
        assert!(arm_gone);
    }

    #[tokio::test]
    async fn stops_when_cancelled() {
        let (_tx, _status, cancel, handle) = setup();
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stops_when_senders_drop() {
        let (tx, _status, _cancel, handle) = setup();
        drop(tx);
        handle.await.unwrap();
    }
}
