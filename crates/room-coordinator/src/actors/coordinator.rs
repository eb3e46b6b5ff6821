//! `CoordinatorActor` - singleton supervisor that owns the room directory.
//!
//! The coordinator is the top of the actor hierarchy:
//!
//! - Singleton per process, explicitly constructed with its dependencies
//! - Owns the room-id → `RoomActor` map; creates rooms on first join
//! - Removes rooms when they empty (`RoomEmptied`), so no reachable room
//!   ever has zero members
//! - Owns the root `CancellationToken` for graceful shutdown
//! - Sweeps terminated room tasks and logs panics
//!
//! The coordinator never awaits a room actor while handling a message;
//! it only resolves handles. Room-level work happens in the room actors,
//! so operations on different rooms proceed concurrently.

use crate::errors::CoordinatorError;
use crate::observability::metrics as prom;
use crate::registry::ConnectionRegistry;

use super::messages::{CoordinatorMessage, CoordinatorStatus, JoinResult};
use super::metrics::CoordinatorMetrics;
use super::room::{RoomActor, RoomHandle};

use common::store::ParticipationStore;
use common::types::{ConnectionId, Identity, RoomId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Default channel buffer size for the coordinator mailbox.
const COORDINATOR_CHANNEL_BUFFER: usize = 512;

/// How long to wait for each room task during graceful shutdown.
const ROOM_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the `CoordinatorActor`.
///
/// The public interface for the room directory. Cloneable; all methods
/// communicate with the actor via message passing.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<CoordinatorMessage>,
    cancel_token: CancellationToken,
}

impl CoordinatorHandle {
    /// Create a new `CoordinatorActor` and return a handle to it.
    ///
    /// Spawns the actor task and returns immediately.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn ParticipationStore>,
        metrics: Arc<CoordinatorMetrics>,
        history_capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(COORDINATOR_CHANNEL_BUFFER);
        let cancel_token = CancellationToken::new();

        let actor = CoordinatorActor {
            receiver,
            self_tx: sender.clone(),
            cancel_token: cancel_token.clone(),
            rooms: HashMap::new(),
            accepting_new: true,
            registry,
            store,
            metrics,
            history_capacity,
        };

        tokio::spawn(actor.run());

        Self {
            sender,
            cancel_token,
        }
    }

    /// Join a room, creating it if needed.
    ///
    /// If the resolved room emptied and closed in the window between
    /// resolution and join, the join is retried against a fresh room.
    /// One retry is always enough: the emptied room enqueued its removal
    /// at the coordinator before answering `RoomClosed`, so the retry's
    /// lookup runs after the removal.
    pub async fn join_room(
        &self,
        room_id: RoomId,
        connection_id: ConnectionId,
        identity: Identity,
    ) -> Result<(JoinResult, RoomHandle), CoordinatorError> {
        for _attempt in 0..2 {
            let (room, _created) = self.get_or_create_room(room_id.clone()).await?;
            match room.join(connection_id, identity.clone()).await {
                Ok(result) => return Ok((result, room)),
                Err(CoordinatorError::RoomClosed) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(CoordinatorError::Internal(
            "room closed twice during join".to_string(),
        ))
    }

    /// Resolve a room handle, creating the room if it does not exist.
    pub async fn get_or_create_room(
        &self,
        room_id: RoomId,
    ) -> Result<(RoomHandle, bool), CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::GetOrCreateRoom {
                room_id,
                respond_to: tx,
            })
            .await
            .map_err(|_| CoordinatorError::Internal("coordinator stopped".to_string()))?;

        rx.await
            .map_err(|_| CoordinatorError::Internal("coordinator dropped response".to_string()))?
    }

    /// Resolve an existing room handle without creating one.
    pub async fn room(&self, room_id: RoomId) -> Option<RoomHandle> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::GetRoom {
                room_id,
                respond_to: tx,
            })
            .await
            .ok()?;
        rx.await.ok().flatten()
    }

    /// Get the current directory status.
    pub async fn status(&self) -> Result<CoordinatorStatus, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::GetStatus { respond_to: tx })
            .await
            .map_err(|_| CoordinatorError::Internal("coordinator stopped".to_string()))?;

        rx.await
            .map_err(|_| CoordinatorError::Internal("coordinator dropped response".to_string()))
    }

    /// Initiate graceful shutdown: stop accepting joins and drain rooms.
    pub async fn shutdown(&self) -> Result<(), CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::Shutdown { respond_to: tx })
            .await
            .map_err(|_| CoordinatorError::Internal("coordinator stopped".to_string()))?;

        rx.await
            .map_err(|_| CoordinatorError::Internal("coordinator dropped response".to_string()))
    }

    /// Cancel the actor (immediate shutdown).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Get a child token for sibling tasks (servers, etc.).
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}

/// Internal state for a managed room.
struct ManagedRoom {
    handle: RoomHandle,
    task_handle: JoinHandle<()>,
}

/// The `CoordinatorActor` implementation.
struct CoordinatorActor {
    receiver: mpsc::Receiver<CoordinatorMessage>,
    /// Sender clone handed to room actors for `RoomEmptied`.
    self_tx: mpsc::Sender<CoordinatorMessage>,
    /// Root cancellation token.
    cancel_token: CancellationToken,
    rooms: HashMap<RoomId, ManagedRoom>,
    /// False while draining; joins are rejected.
    accepting_new: bool,
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn ParticipationStore>,
    metrics: Arc<CoordinatorMetrics>,
    history_capacity: usize,
}

impl CoordinatorActor {
    /// Run the actor message loop.
    #[instrument(skip_all, name = "parley.actor.coordinator")]
    async fn run(mut self) {
        info!(target: "parley.actor.coordinator", "CoordinatorActor started");

        loop {
            self.sweep_finished_rooms();

            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "parley.actor.coordinator",
                        "CoordinatorActor received cancellation signal"
                    );
                    self.graceful_shutdown().await;
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message),
                        None => {
                            info!(
                                target: "parley.actor.coordinator",
                                "CoordinatorActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "parley.actor.coordinator",
            rooms_remaining = self.rooms.len(),
            "CoordinatorActor stopped"
        );
    }

    /// Handle a single message. Never awaits a room actor.
    fn handle_message(&mut self, message: CoordinatorMessage) {
        match message {
            CoordinatorMessage::GetOrCreateRoom {
                room_id,
                respond_to,
            } => {
                let result = self.get_or_create_room(room_id);
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::GetRoom {
                room_id,
                respond_to,
            } => {
                let handle = self.rooms.get(&room_id).map(|r| r.handle.clone());
                let _ = respond_to.send(handle);
            }

            CoordinatorMessage::RoomEmptied { room_id } => {
                self.remove_room(&room_id);
            }

            CoordinatorMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(CoordinatorStatus {
                    room_count: self.rooms.len(),
                    accepting_new: self.accepting_new,
                });
            }

            CoordinatorMessage::Shutdown { respond_to } => {
                info!(target: "parley.actor.coordinator", "shutdown requested, draining");
                self.accepting_new = false;
                let _ = respond_to.send(());
                // The cancelled branch of the run loop performs the drain.
                self.cancel_token.cancel();
            }
        }
    }

    /// Resolve or create a room.
    fn get_or_create_room(
        &mut self,
        room_id: RoomId,
    ) -> Result<(RoomHandle, bool), CoordinatorError> {
        if let Some(managed) = self.rooms.get(&room_id) {
            return Ok((managed.handle.clone(), false));
        }

        if !self.accepting_new {
            return Err(CoordinatorError::Draining);
        }

        let room_token = self.cancel_token.child_token();
        let (handle, task_handle) = RoomActor::spawn(
            room_id.clone(),
            room_token,
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            self.self_tx.clone(),
            self.history_capacity,
            Arc::clone(&self.metrics),
        );

        self.rooms.insert(
            room_id.clone(),
            ManagedRoom {
                handle: handle.clone(),
                task_handle,
            },
        );

        self.metrics.room_opened();
        prom::record_room_created();
        info!(
            target: "parley.actor.coordinator",
            room_id = %room_id,
            total_rooms = self.rooms.len(),
            "room created"
        );

        Ok((handle, true))
    }

    /// Remove an emptied room from the directory.
    fn remove_room(&mut self, room_id: &RoomId) {
        let Some(managed) = self.rooms.remove(room_id) else {
            debug!(
                target: "parley.actor.coordinator",
                room_id = %room_id,
                "RoomEmptied for unknown room ignored"
            );
            return;
        };

        managed.handle.cancel();
        self.metrics.room_closed();
        prom::record_room_closed();
        info!(
            target: "parley.actor.coordinator",
            room_id = %room_id,
            total_rooms = self.rooms.len(),
            "room removed"
        );
    }

    /// Reap room tasks that terminated on their own and log panics.
    fn sweep_finished_rooms(&mut self) {
        let finished: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(_, managed)| managed.task_handle.is_finished())
            .map(|(id, _)| id.clone())
            .collect();

        for room_id in finished {
            if let Some(managed) = self.rooms.remove(&room_id) {
                if managed.handle.is_cancelled() {
                    debug!(
                        target: "parley.actor.coordinator",
                        room_id = %room_id,
                        "room task finished after cancellation"
                    );
                } else {
                    error!(
                        target: "parley.actor.coordinator",
                        room_id = %room_id,
                        "room task terminated unexpectedly"
                    );
                }
                self.metrics.room_closed();
                prom::record_room_closed();
            }
        }
    }

    /// Cancel all rooms and wait briefly for their tasks.
    async fn graceful_shutdown(&mut self) {
        info!(
            target: "parley.actor.coordinator",
            rooms = self.rooms.len(),
            "performing graceful shutdown"
        );

        self.accepting_new = false;

        for managed in self.rooms.values() {
            managed.handle.cancel();
        }

        for (room_id, managed) in self.rooms.drain() {
            match tokio::time::timeout(ROOM_DRAIN_TIMEOUT, managed.task_handle).await {
                Ok(Ok(())) => {
                    debug!(
                        target: "parley.actor.coordinator",
                        room_id = %room_id,
                        "room drained cleanly"
                    );
                }
                Ok(Err(e)) => {
                    warn!(
                        target: "parley.actor.coordinator",
                        room_id = %room_id,
                        error = ?e,
                        "room task panicked during shutdown"
                    );
                }
                Err(_) => {
                    warn!(
                        target: "parley.actor.coordinator",
                        room_id = %room_id,
                        "room drain timed out"
                    );
                }
            }
        }

        info!(target: "parley.actor.coordinator", "graceful shutdown complete");
    }
}
