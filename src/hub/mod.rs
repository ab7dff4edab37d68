// region:    --- Imports
use crate::auction::events::AuctionEvent;
use axum::extract::ws::Message;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;
// endregion: --- Imports

// region:    --- Broadcast Hub

/// Channel sender half for pushing messages to one observer connection.
pub type ObserverSender = mpsc::UnboundedSender<Message>;

/// Registry of connected observers and the single fan-out point for auction
/// events. All mutation of the connection set goes through this struct, so
/// connect/disconnect/broadcast never race. Delivery is best-effort: an
/// observer whose send fails is pruned inside the same broadcast call, and
/// no failure ever reaches the request that triggered the broadcast.
#[derive(Default)]
pub struct BroadcastHub {
    connections: RwLock<HashMap<Uuid, ObserverSender>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Returns its id and the receiver half the
    /// socket task forwards to the WebSocket sink.
    pub async fn connect(&self) -> (Uuid, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let observer_id = Uuid::new_v4();
        self.connections.write().await.insert(observer_id, tx);
        debug!("{:<12} --> observer connected: {}", "Hub", observer_id);
        (observer_id, rx)
    }

    /// Remove an observer; a second removal of the same id is a no-op.
    pub async fn disconnect(&self, observer_id: Uuid) {
        if self.connections.write().await.remove(&observer_id).is_some() {
            debug!("{:<12} --> observer disconnected: {}", "Hub", observer_id);
        }
    }

    /// Fan an event out to every connected observer, pruning any whose
    /// delivery fails. Order across observers is unspecified.
    pub async fn broadcast(&self, event: &AuctionEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("{:<12} --> failed to encode event: {:?}", "Hub", e);
                return;
            }
        };

        let mut connections = self.connections.write().await;
        let before = connections.len();
        connections.retain(|observer_id, tx| {
            let alive = tx.send(Message::Text(payload.clone())).is_ok();
            if !alive {
                debug!("{:<12} --> pruning dead observer: {}", "Hub", observer_id);
            }
            alive
        });
        let pruned = before - connections.len();
        if pruned > 0 {
            warn!("{:<12} --> pruned {} dead observer(s)", "Hub", pruned);
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

// endregion: --- Broadcast Hub

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bid_accepted() -> AuctionEvent {
        AuctionEvent::BidAccepted {
            vehicle_id: 1,
            current_price: dec!(1500),
            bidder: "alice".to_string(),
        }
    }

    #[tokio::test]
    async fn delivers_one_message_per_broadcast_to_each_observer() {
        let hub = BroadcastHub::new();
        let (_id_a, mut rx_a) = hub.connect().await;
        let (_id_b, mut rx_b) = hub.connect().await;

        hub.broadcast(&bid_accepted()).await;

        for rx in [&mut rx_a, &mut rx_b] {
            let msg = rx.try_recv().expect("observer should have one message");
            let Message::Text(text) = msg else {
                panic!("expected a text frame");
            };
            let wire: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(wire["type"], "BidAccepted");
            assert_eq!(wire["bidder"], "alice");
            assert!(rx.try_recv().is_err(), "exactly one message expected");
        }
    }

    #[tokio::test]
    async fn failed_delivery_prunes_the_observer_and_spares_the_rest() {
        let hub = BroadcastHub::new();
        let (_dead_id, dead_rx) = hub.connect().await;
        let (_live_id, mut live_rx) = hub.connect().await;
        drop(dead_rx);

        hub.broadcast(&bid_accepted()).await;

        assert_eq!(hub.connection_count().await, 1);
        assert!(live_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let hub = BroadcastHub::new();
        let (id, _rx) = hub.connect().await;

        hub.disconnect(id).await;
        hub.disconnect(id).await;

        assert_eq!(hub.connection_count().await, 0);
        // broadcasting to an empty set is fine
        hub.broadcast(&bid_accepted()).await;
    }
}

// endregion: --- Tests
