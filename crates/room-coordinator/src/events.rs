//! Client/server wire event vocabulary.
//!
//! Events are JSON objects tagged by a `type` field. Signaling payloads are
//! carried as uninterpreted JSON values: the coordinator routes them by
//! target participant id and never looks inside.

use crate::actors::messages::MemberInfo;
use chrono::{DateTime, Utc};
use common::types::{ConnectionId, ParticipantId};
use serde::{Deserialize, Serialize};

/// Events a client may send to the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Join (or create) a named room.
    JoinRoom {
        room_id: String,
        participant_id: String,
    },

    /// Leave the current room. Closing the channel has the same effect.
    LeaveRoom,

    /// Broadcast a chat message to the current room.
    SendMessage { text: String },

    /// Relay a signaling envelope to one named participant.
    SendSignal {
        target: String,
        kind: String,
        payload: serde_json::Value,
    },
}

/// Events the coordinator sends to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Join acknowledgement: the room and who was already there.
    ///
    /// Followed immediately by the room's replayed chat history, which is
    /// enqueued before any live event becomes visible to the joiner.
    RoomJoined {
        room_id: String,
        members: Vec<MemberInfo>,
    },

    /// Another participant joined the room.
    ParticipantJoined { member: MemberInfo },

    /// A participant left the room (or its channel closed).
    ParticipantLeft {
        connection_id: ConnectionId,
        participant_id: ParticipantId,
    },

    /// A chat message, live or replayed from history.
    ChatMessage {
        sender: String,
        sender_connection: ConnectionId,
        text: String,
        timestamp: DateTime<Utc>,
    },

    /// A relayed signaling envelope. `payload` is forwarded unmodified.
    Signal {
        from: ConnectionId,
        from_participant: Option<ParticipantId>,
        kind: String,
        payload: serde_json::Value,
    },

    /// An operation was rejected. Codes follow `CoordinatorError::error_code`.
    Error { code: i32, message: String },
}
