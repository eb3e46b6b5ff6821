//! Identity lookup collaborator interface.
//!
//! The identity service maps a participant identifier to a display name and
//! role. It is consumed as a black box: a lookup failure never fails a join,
//! it degrades to a synthesized placeholder identity instead.

use crate::types::{ConnectionId, Identity, ParticipantId};
use async_trait::async_trait;
use thiserror::Error;

/// Role assigned when the identity service cannot resolve a participant.
pub const FALLBACK_ROLE: &str = "guest";

/// Errors from the identity lookup service.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The participant identifier is not known to the service.
    #[error("participant unknown")]
    Unknown,

    /// The service could not be reached or answered unexpectedly.
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

/// Read-only identity resolution.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Resolve a participant identifier to a display name and role.
    async fn resolve_identity(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Identity, IdentityError>;
}

/// Placeholder identity used when resolution fails.
///
/// The display name is derived from the connection handle so that it stays
/// stable for the lifetime of the channel and distinct between guests.
#[must_use]
pub fn fallback_identity(handle: ConnectionId, participant_id: &ParticipantId) -> Identity {
    Identity {
        participant_id: participant_id.clone(),
        display_name: format!("guest-{}", handle.short()),
        role: FALLBACK_ROLE.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn fallback_identity_is_stable_per_handle() {
        let handle = ConnectionId::new();
        let pid = ParticipantId::from("user-1");

        let a = fallback_identity(handle, &pid);
        let b = fallback_identity(handle, &pid);

        assert_eq!(a, b);
        assert!(a.display_name.starts_with("guest-"));
        assert_eq!(a.role, FALLBACK_ROLE);
        assert_eq!(a.participant_id, pid);
    }

    #[test]
    fn fallback_identity_differs_between_handles() {
        let pid = ParticipantId::from("user-1");
        let a = fallback_identity(ConnectionId::new(), &pid);
        let b = fallback_identity(ConnectionId::new(), &pid);
        assert_ne!(a.display_name, b.display_name);
    }
}
