//! Room coordinator error types.
//!
//! Errors map to numeric error codes for client `error` events. Internal
//! details are logged server-side but not exposed to clients. Failed
//! delivery to a closed channel is deliberately *not* an error: delivery
//! returns a bool and a gone channel is a no-op.

use thiserror::Error;

/// Room coordinator error type.
///
/// Maps to client error codes:
/// - `RoomNotFound`, `ParticipantNotFound`: `NOT_FOUND` (4)
/// - `AlreadyMember`: `CONFLICT` (5)
/// - `RoomClosed`, `StoreWrite`, `Internal`: `INTERNAL_ERROR` (6)
/// - `Draining`: `UNAVAILABLE` (7)
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Room lookup failed.
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// Participant id could not be resolved to a live connection.
    #[error("Participant not found: {0}")]
    ParticipantNotFound(String),

    /// Duplicate join by a handle that is already a member.
    #[error("Already a member: {0}")]
    AlreadyMember(String),

    /// The room emptied and closed while an operation was queued.
    ///
    /// Internal coordination signal: the caller retries against a fresh
    /// room exactly once; clients never see this variant.
    #[error("Room closed")]
    RoomClosed,

    /// Durable store write failed.
    #[error("Store write failed: {0}")]
    StoreWrite(String),

    /// The coordinator is shutting down and rejects new joins.
    #[error("Coordinator is draining")]
    Draining,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoordinatorError {
    /// Returns the numeric error code sent to clients.
    #[must_use]
    pub fn error_code(&self) -> i32 {
        match self {
            CoordinatorError::RoomNotFound(_) | CoordinatorError::ParticipantNotFound(_) => 4,
            CoordinatorError::AlreadyMember(_) => 5,
            CoordinatorError::RoomClosed
            | CoordinatorError::StoreWrite(_)
            | CoordinatorError::Internal(_) => 6,
            CoordinatorError::Draining => 7,
        }
    }

    /// Returns a client-safe error message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            CoordinatorError::RoomNotFound(_) => "Room not found".to_string(),
            CoordinatorError::ParticipantNotFound(_) => "Participant not found".to_string(),
            CoordinatorError::AlreadyMember(msg) => msg.clone(),
            CoordinatorError::RoomClosed
            | CoordinatorError::StoreWrite(_)
            | CoordinatorError::Internal(_) => "An internal error occurred".to_string(),
            CoordinatorError::Draining => "Server is shutting down, please reconnect".to_string(),
        }
    }
}
