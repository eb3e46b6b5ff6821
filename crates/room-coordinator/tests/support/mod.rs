//! In-process test harness: registry + coordinator + relay wired to mock
//! external services, with channel-backed fake clients.
//!
//! `join`/`leave` mirror the transport's dispatch (attach identity, take
//! the room association exactly once) so integration tests exercise the
//! same sequencing as real connections.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use common::store::ParticipationStore;
use common::types::{ConnectionId, Identity, ParticipantId, RoomId};
use parley_test_utils::MockParticipationStore;
use room_coordinator::actors::messages::JoinResult;
use room_coordinator::actors::{CoordinatorHandle, CoordinatorMetrics, RoomHandle};
use room_coordinator::errors::CoordinatorError;
use room_coordinator::events::ServerEvent;
use room_coordinator::registry::ConnectionRegistry;
use room_coordinator::relay::SignalRelay;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const CLIENT_BUFFER: usize = 256;

#[derive(Clone)]
pub struct TestHarness {
    pub registry: Arc<ConnectionRegistry>,
    pub coordinator: CoordinatorHandle,
    pub relay: SignalRelay,
    pub store: Arc<MockParticipationStore>,
    pub metrics: Arc<CoordinatorMetrics>,
}

impl TestHarness {
    pub fn spawn() -> Self {
        Self::with_store_and_capacity(MockParticipationStore::new(), 50)
    }

    pub fn with_history_capacity(capacity: usize) -> Self {
        Self::with_store_and_capacity(MockParticipationStore::new(), capacity)
    }

    pub fn with_store(store: MockParticipationStore) -> Self {
        Self::with_store_and_capacity(store, 50)
    }

    fn with_store_and_capacity(store: MockParticipationStore, capacity: usize) -> Self {
        let metrics = CoordinatorMetrics::new();
        let registry = ConnectionRegistry::new(Arc::clone(&metrics));
        let store = Arc::new(store);
        let coordinator = CoordinatorHandle::new(
            Arc::clone(&registry),
            Arc::clone(&store) as Arc<dyn ParticipationStore>,
            Arc::clone(&metrics),
            capacity,
        );
        let relay = SignalRelay::new(Arc::clone(&registry), Arc::clone(&metrics));

        Self {
            registry,
            coordinator,
            relay,
            store,
            metrics,
        }
    }

    /// Open a fake client channel.
    pub fn connect(&self) -> TestClient {
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        let connection_id = self.registry.register(tx);
        TestClient { connection_id, rx }
    }

    /// Join a room the way the transport does: attach identity, set the
    /// room association, then join (clearing the association on failure).
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        room: &str,
        participant_id: &str,
        display_name: &str,
    ) -> Result<(JoinResult, RoomHandle), CoordinatorError> {
        let identity = Identity {
            participant_id: ParticipantId::from(participant_id),
            display_name: display_name.to_string(),
            role: "member".to_string(),
        };
        self.registry
            .attach_identity(connection_id, identity.clone());
        self.registry.set_room(connection_id, RoomId::from(room))?;

        match self
            .coordinator
            .join_room(RoomId::from(room), connection_id, identity)
            .await
        {
            Ok(ok) => Ok(ok),
            Err(e) => {
                let _ = self.registry.take_room(connection_id);
                Err(e)
            }
        }
    }

    /// Explicit leave, exactly-once via the registry's room take.
    pub async fn leave(&self, connection_id: ConnectionId, room: &RoomHandle) -> usize {
        if self.registry.take_room(connection_id).is_some() {
            room.leave(connection_id).await
        } else {
            room.members().await.len()
        }
    }

    /// Poll until the coordinator no longer resolves the room.
    pub async fn wait_room_gone(&self, room: &str) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        loop {
            if self.coordinator.room(RoomId::from(room)).await.is_none() {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "room {room} was never removed"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

pub struct TestClient {
    pub connection_id: ConnectionId,
    pub rx: mpsc::Receiver<ServerEvent>,
}

impl TestClient {
    /// Receive the next event, failing the test after one second.
    pub async fn recv(&mut self) -> ServerEvent {
        tokio::time::timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("client channel closed")
    }

    /// Assert no event is pending after a short settle delay.
    pub async fn assert_silent(&mut self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if let Ok(event) = self.rx.try_recv() {
            panic!("expected silence, got {event:?}");
        }
    }
}
