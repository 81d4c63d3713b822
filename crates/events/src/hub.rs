//! In-process broadcast hub.
//!
//! Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
//! shared across the daemon. Observers receive serialized JSON frames over
//! an unbounded channel; a transport layer (WebSocket, SSE, test harness)
//! forwards them however it likes.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::feed::FeedEvent;

/// Receiving half handed to a new observer.
pub struct ObserverHandle {
    pub id: Uuid,
    pub receiver: mpsc::UnboundedReceiver<String>,
}

/// Broadcast hub with last-progress replay.
///
/// Holds exactly one piece of event state: the most recent in-flight
/// benchmark progress event. It is set on every progress broadcast and
/// cleared when the benchmark reaches a terminal event, so an observer
/// joining mid-run catches up without polling and an observer joining after
/// completion sees nothing stale.
#[derive(Default)]
pub struct LiveFeed {
    observers: RwLock<HashMap<Uuid, mpsc::UnboundedSender<String>>>,
    last_progress: RwLock<Option<FeedEvent>>,
}

impl LiveFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer.
    ///
    /// The observer immediately receives a connected-acknowledgement and,
    /// when a benchmark is mid-flight, a replay of its latest progress
    /// event.
    pub async fn subscribe(&self) -> ObserverHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        let client_count = {
            let mut observers = self.observers.write().await;
            observers.insert(id, tx.clone());
            observers.len()
        };

        if let Some(frame) = serialize(&FeedEvent::Connected { client_count }) {
            let _ = tx.send(frame);
        }
        if let Some(progress) = self.last_progress.read().await.as_ref() {
            if let Some(frame) = serialize(progress) {
                let _ = tx.send(frame);
            }
        }

        tracing::debug!(observer_id = %id, client_count, "Live feed observer connected");
        ObserverHandle { id, receiver: rx }
    }

    /// Remove an observer by id.
    pub async fn unsubscribe(&self, id: Uuid) {
        self.observers.write().await.remove(&id);
    }

    /// Broadcast an event to every live observer, pruning dead connections
    /// opportunistically.
    pub async fn broadcast(&self, event: &FeedEvent) {
        // Maintain the replay cell before fan-out so a concurrent subscriber
        // never replays a progress event from a benchmark that already
        // ended.
        if event.is_progress() {
            *self.last_progress.write().await = Some(event.clone());
        } else if event.is_benchmark_terminal() {
            *self.last_progress.write().await = None;
        }

        let Some(frame) = serialize(event) else {
            return;
        };

        let dead: Vec<Uuid> = {
            let observers = self.observers.read().await;
            observers
                .iter()
                .filter(|(_, tx)| tx.send(frame.clone()).is_err())
                .map(|(id, _)| *id)
                .collect()
        };

        if !dead.is_empty() {
            let mut observers = self.observers.write().await;
            for id in &dead {
                observers.remove(id);
            }
            tracing::debug!(pruned = dead.len(), "Pruned dead live feed observers");
        }
    }

    /// Number of currently connected observers.
    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }
}

fn serialize(event: &FeedEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize feed event");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::feed::BenchmarkPhase;

    use super::*;

    fn progress(run_id: i64, point_index: usize) -> FeedEvent {
        FeedEvent::BenchmarkProgress {
            run_id,
            point_index,
            total_points: 11,
            speed_bps: 5.0e8,
            phase: BenchmarkPhase::Curve,
            phase_label: None,
        }
    }

    fn frame_type(frame: &str) -> String {
        let value: serde_json::Value = serde_json::from_str(frame).unwrap();
        value["type"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn new_observer_gets_ack_first() {
        let feed = LiveFeed::new();
        let mut handle = feed.subscribe().await;
        let frame = handle.receiver.recv().await.unwrap();
        assert_eq!(frame_type(&frame), "connected");
    }

    #[tokio::test]
    async fn mid_run_joiner_replays_latest_progress() {
        let feed = LiveFeed::new();
        feed.broadcast(&progress(7, 2)).await;
        feed.broadcast(&progress(7, 3)).await;

        let mut handle = feed.subscribe().await;
        let ack = handle.receiver.recv().await.unwrap();
        assert_eq!(frame_type(&ack), "connected");

        let replay = handle.receiver.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&replay).unwrap();
        assert_eq!(value["type"], "benchmark_progress");
        // The replay is the most recent progress event, not the first.
        assert_eq!(value["point_index"], 3);
    }

    #[tokio::test]
    async fn completion_clears_the_replay_cell() {
        let feed = LiveFeed::new();
        feed.broadcast(&progress(7, 5)).await;
        feed.broadcast(&FeedEvent::BenchmarkCompleted { run_id: 7, drive_id: 1 }).await;

        let mut handle = feed.subscribe().await;
        let ack = handle.receiver.recv().await.unwrap();
        assert_eq!(frame_type(&ack), "connected");
        // Nothing stale follows the ack.
        assert!(handle.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn failure_clears_the_replay_cell_too() {
        let feed = LiveFeed::new();
        feed.broadcast(&progress(9, 1)).await;
        feed.broadcast(&FeedEvent::BenchmarkFailed {
            run_id: 9,
            error: "fio exited 1".to_string(),
        })
        .await;

        let mut handle = feed.subscribe().await;
        handle.receiver.recv().await.unwrap();
        assert!(handle.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_observer() {
        let feed = LiveFeed::new();
        let mut a = feed.subscribe().await;
        let mut b = feed.subscribe().await;
        a.receiver.recv().await.unwrap();
        b.receiver.recv().await.unwrap();

        feed.broadcast(&FeedEvent::DriveRemoved { drive_id: 3 }).await;

        assert_eq!(frame_type(&a.receiver.recv().await.unwrap()), "drive_removed");
        assert_eq!(frame_type(&b.receiver.recv().await.unwrap()), "drive_removed");
    }

    #[tokio::test]
    async fn dropped_observers_are_pruned_on_broadcast() {
        let feed = LiveFeed::new();
        let handle = feed.subscribe().await;
        drop(handle);
        let mut alive = feed.subscribe().await;
        alive.receiver.recv().await.unwrap();
        assert_eq!(feed.observer_count().await, 2);

        feed.broadcast(&FeedEvent::DriveRemoved { drive_id: 1 }).await;
        assert_eq!(feed.observer_count().await, 1);
    }
}
