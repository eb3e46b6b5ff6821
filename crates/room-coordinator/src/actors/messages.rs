//! Message types for actor communication.
//!
//! All inter-actor communication uses strongly-typed message passing via
//! `tokio::sync::mpsc`; request-reply uses `tokio::sync::oneshot`.

use crate::errors::CoordinatorError;
use crate::events::ServerEvent;
use chrono::{DateTime, Utc};
use common::types::{ConnectionId, Identity, ParticipantId, RoomId};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::room::RoomHandle;

/// Messages sent to the `CoordinatorActor`.
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// Resolve a room handle, creating the room if it does not exist.
    GetOrCreateRoom {
        room_id: RoomId,
        /// Response channel for the room handle and whether it was created.
        respond_to: oneshot::Sender<Result<(RoomHandle, bool), CoordinatorError>>,
    },

    /// Resolve an existing room handle without creating one.
    GetRoom {
        room_id: RoomId,
        respond_to: oneshot::Sender<Option<RoomHandle>>,
    },

    /// A room's last member left; remove it from the directory.
    ///
    /// Sent by the emptied `RoomActor` *before* it answers any queued join
    /// with `RoomClosed`, so a retried join always sees the removal first.
    RoomEmptied { room_id: RoomId },

    /// Get current directory status (for health/status endpoints).
    GetStatus {
        respond_to: oneshot::Sender<CoordinatorStatus>,
    },

    /// Initiate graceful shutdown: stop accepting joins, drain rooms.
    Shutdown {
        respond_to: oneshot::Sender<()>,
    },
}

/// Messages sent to a `RoomActor`.
#[derive(Debug)]
pub enum RoomMessage {
    /// A connection joins this room.
    Join {
        connection_id: ConnectionId,
        identity: Identity,
        /// Response channel for the join result.
        respond_to: oneshot::Sender<Result<JoinResult, CoordinatorError>>,
    },

    /// A connection leaves this room (explicit leave or channel close).
    ///
    /// Idempotent: leaving a room one is not a member of is a no-op.
    Leave {
        connection_id: ConnectionId,
        /// Response channel for the remaining member count. Callers may
        /// drop the receiver to fire-and-forget.
        respond_to: oneshot::Sender<usize>,
    },

    /// Broadcast a chat message from a member.
    Chat {
        connection_id: ConnectionId,
        text: String,
    },

    /// Ordered snapshot of the current member list (fan-out targets).
    Members {
        respond_to: oneshot::Sender<Vec<MemberInfo>>,
    },

    /// Current room state (for tests and status inspection).
    GetState {
        respond_to: oneshot::Sender<RoomStateSnapshot>,
    },
}

// ----------------------------------------------------------------------------
// Supporting Types
// ----------------------------------------------------------------------------

/// One member of a room, as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub connection_id: ConnectionId,
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub role: String,
}

/// Result of a successful join.
///
/// `members` lists who was already present (the joiner excluded, in
/// arrival order). The join acknowledgement and history replay are
/// enqueued into the joiner's channel by the room actor itself, before
/// any later live event, so this value is bookkeeping for the transport.
#[derive(Debug, Clone)]
pub struct JoinResult {
    /// Whether this join created the room.
    pub is_new_room: bool,
    /// Members present before this join, in arrival order.
    pub members: Vec<MemberInfo>,
    /// Number of history messages replayed to the joiner.
    pub replayed: usize,
}

/// An immutable chat message held in a room's bounded history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Sender display name at send time.
    pub sender: String,
    /// Sender connection handle, for correlating sent/received.
    pub sender_connection: ConnectionId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// The wire event for this message (live delivery and history replay
    /// use the same shape).
    #[must_use]
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::ChatMessage {
            sender: self.sender.clone(),
            sender_connection: self.sender_connection,
            text: self.text.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// A signaling envelope in flight between two participants.
///
/// `kind` and `payload` are opaque to the coordinator: they are routed,
/// never inspected.
#[derive(Debug, Clone)]
pub struct SignalEnvelope {
    pub target: ParticipantId,
    pub kind: String,
    pub payload: serde_json::Value,
}

/// Current state of a room (for tests and status inspection).
#[derive(Debug, Clone)]
pub struct RoomStateSnapshot {
    pub room_id: RoomId,
    pub members: Vec<MemberInfo>,
    pub history_len: usize,
    pub closed: bool,
    pub created_at: DateTime<Utc>,
}

/// Status of the `CoordinatorActor`.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorStatus {
    /// Active rooms in the directory.
    pub room_count: usize,
    /// Whether new joins are accepted (false while draining).
    pub accepting_new: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_event_carries_all_fields() {
        let msg = ChatMessage {
            sender: "Alice".to_string(),
            sender_connection: ConnectionId::new(),
            text: "hello".to_string(),
            timestamp: Utc::now(),
        };

        let event = msg.to_event();
        let ServerEvent::ChatMessage {
            sender,
            sender_connection,
            text,
            timestamp,
        } = event
        else {
            unreachable!("to_event always builds a chat-message event");
        };

        assert_eq!(sender, msg.sender);
        assert_eq!(sender_connection, msg.sender_connection);
        assert_eq!(text, msg.text);
        assert_eq!(timestamp, msg.timestamp);
    }

    #[test]
    fn member_info_serializes_for_the_wire() {
        let info = MemberInfo {
            connection_id: ConnectionId::new(),
            participant_id: ParticipantId::from("alice"),
            display_name: "Alice".to_string(),
            role: "host".to_string(),
        };

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(
            value.get("participant_id").and_then(|v| v.as_str()),
            Some("alice")
        );
    }
}
