//! Durable participation/transcript store interface.
//!
//! Writes are fire-and-forget from the coordinator's perspective: failures
//! are logged and counted, never retried, and never allowed to block or
//! fail the live event path.

use crate::types::{ParticipantId, RoomId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write was attempted and rejected or lost.
    #[error("store write failed: {0}")]
    Write(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Write-only analytics store for room membership and chat transcripts.
#[async_trait]
pub trait ParticipationStore: Send + Sync {
    /// Record a participant's presence in a room.
    ///
    /// Called with `left_at = None` on join and `left_at = Some(..)` on
    /// leave; the two calls bracket one participation interval.
    async fn record_participation(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        joined_at: DateTime<Utc>,
        left_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Record one chat message for the room transcript.
    async fn record_message(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        text: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Record that a room emptied and was removed from the directory.
    async fn record_room_closed(
        &self,
        room_id: &RoomId,
        closed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
