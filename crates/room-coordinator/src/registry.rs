//! Connection registry - the leaf of the coordination state.
//!
//! Tracks every live client channel: its outbound event sender, attached
//! identity, current room, and connect timestamp. Handles are opaque; no
//! caller inspects their representation.
//!
//! All maps sit behind one mutex. Registration and resolution are cheap
//! and infrequent relative to message volume, so directory-global
//! exclusion is sufficient here; the lock is never held across an await.
//!
//! Participant-id resolution is best-effort and last-write-wins: if two
//! connections announce the same participant id, the newer one is
//! reachable by id and the older becomes unreachable by id while staying
//! in its room.

use crate::actors::metrics::CoordinatorMetrics;
use crate::errors::CoordinatorError;
use crate::events::ServerEvent;
use crate::observability::metrics as prom;
use chrono::{DateTime, Utc};
use common::types::{ConnectionId, Identity, ParticipantId, RoomId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One live connection.
struct ConnectionEntry {
    /// Outbound event channel, drained by the connection's write task.
    sender: mpsc::Sender<ServerEvent>,
    /// Identity attached at join time (None before the first join).
    identity: Option<Identity>,
    /// Room this connection currently occupies.
    room: Option<RoomId>,
    /// Channel-open timestamp, for session duration on unregister.
    connected_at: DateTime<Utc>,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    /// Participant-id index. Last write wins on duplicate announcements.
    by_participant: HashMap<ParticipantId, ConnectionId>,
}

/// Registry of live client channels.
pub struct ConnectionRegistry {
    inner: Mutex<RegistryInner>,
    metrics: Arc<CoordinatorMetrics>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new(metrics: Arc<CoordinatorMetrics>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(RegistryInner::default()),
            metrics,
        })
    }

    fn locked(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a freshly opened channel and return its opaque handle.
    pub fn register(&self, sender: mpsc::Sender<ServerEvent>) -> ConnectionId {
        let handle = ConnectionId::new();
        self.locked().connections.insert(
            handle,
            ConnectionEntry {
                sender,
                identity: None,
                room: None,
                connected_at: Utc::now(),
            },
        );
        self.metrics.connection_opened();
        prom::record_connection_opened();
        debug!(target: "parley.registry", connection_id = %handle, "connection registered");
        handle
    }

    /// Attach (or re-announce) an identity for a connection.
    ///
    /// Idempotent; overwrites any previous identity. The participant-id
    /// index is updated last-write-wins.
    pub fn attach_identity(&self, handle: ConnectionId, identity: Identity) {
        let mut inner = self.locked();
        let Some(entry) = inner.connections.get_mut(&handle) else {
            debug!(target: "parley.registry", connection_id = %handle, "attach_identity on gone connection");
            return;
        };

        let previous = entry.identity.replace(identity.clone());
        let participant_id = identity.participant_id;

        // Drop the old index entry if this connection is re-announcing
        // under a different participant id and still owns the old mapping.
        if let Some(prev) = previous {
            if prev.participant_id != participant_id
                && inner.by_participant.get(&prev.participant_id) == Some(&handle)
            {
                inner.by_participant.remove(&prev.participant_id);
            }
        }

        if let Some(shadowed) = inner.by_participant.insert(participant_id.clone(), handle) {
            if shadowed != handle {
                warn!(
                    target: "parley.registry",
                    participant_id = %participant_id,
                    shadowed_connection = %shadowed,
                    connection_id = %handle,
                    "duplicate participant id registration, newer connection wins"
                );
            }
        }
    }

    /// Resolve a participant id to its most recently announced connection.
    #[must_use]
    pub fn resolve(&self, participant_id: &ParticipantId) -> Option<ConnectionId> {
        self.locked().by_participant.get(participant_id).copied()
    }

    /// Current identity of a connection, if one was attached.
    #[must_use]
    pub fn identity(&self, handle: ConnectionId) -> Option<Identity> {
        self.locked()
            .connections
            .get(&handle)
            .and_then(|entry| entry.identity.clone())
    }

    /// Associate the connection with a room.
    ///
    /// Rejected if the connection already occupies a room: a client must
    /// leave before joining elsewhere.
    pub fn set_room(&self, handle: ConnectionId, room: RoomId) -> Result<(), CoordinatorError> {
        let mut inner = self.locked();
        let entry = inner
            .connections
            .get_mut(&handle)
            .ok_or_else(|| CoordinatorError::Internal("connection gone".to_string()))?;

        if let Some(current) = &entry.room {
            return Err(CoordinatorError::AlreadyMember(format!(
                "already joined room {current}"
            )));
        }
        entry.room = Some(room);
        Ok(())
    }

    /// Atomically take the connection's room association.
    ///
    /// An explicit leave and a transport disconnect can both run cleanup;
    /// whichever takes the room first performs the leave, the other sees
    /// `None`. This is what makes implicit-leave processing exactly-once.
    #[must_use]
    pub fn take_room(&self, handle: ConnectionId) -> Option<RoomId> {
        self.locked()
            .connections
            .get_mut(&handle)
            .and_then(|entry| entry.room.take())
    }

    /// Remove the connection, returning the room it still occupied.
    pub fn unregister(&self, handle: ConnectionId) -> Option<RoomId> {
        let mut inner = self.locked();
        let entry = inner.connections.remove(&handle)?;

        // Only clear the index if this connection still owns the mapping;
        // a later registration under the same participant id keeps it.
        if let Some(identity) = &entry.identity {
            if inner.by_participant.get(&identity.participant_id) == Some(&handle) {
                inner.by_participant.remove(&identity.participant_id);
            }
        }
        drop(inner);

        let session = Utc::now().signed_duration_since(entry.connected_at);
        self.metrics.connection_closed();
        prom::record_connection_closed(session.num_seconds());
        info!(
            target: "parley.registry",
            connection_id = %handle,
            session_seconds = session.num_seconds(),
            "connection unregistered"
        );
        entry.room
    }

    /// Enqueue an event for a connection. Returns whether it was accepted.
    ///
    /// A gone or closed channel is a no-op (the member departed between
    /// snapshot and delivery). A full buffer drops the event rather than
    /// stalling the caller.
    pub fn deliver(&self, handle: ConnectionId, event: ServerEvent) -> bool {
        let sender = {
            let inner = self.locked();
            match inner.connections.get(&handle) {
                Some(entry) => entry.sender.clone(),
                None => return false,
            }
        };

        match sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.event_dropped();
                prom::record_event_dropped();
                warn!(
                    target: "parley.registry",
                    connection_id = %handle,
                    "outbound buffer full, event dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(
                    target: "parley.registry",
                    connection_id = %handle,
                    "delivery to closed channel skipped"
                );
                false
            }
        }
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locked().connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locked().connections.is_empty()
    }
}
