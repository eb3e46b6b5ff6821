//! In-memory identity service mock.
//!
//! Resolves only the participants registered with [`MockIdentityService::with_user`];
//! everything else answers `Unknown`, which exercises the coordinator's
//! placeholder-identity fallback.

use async_trait::async_trait;
use common::identity::{IdentityError, IdentityLookup};
use common::types::{Identity, ParticipantId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Mock identity service with a builder-style user directory.
#[derive(Debug, Clone, Default)]
pub struct MockIdentityService {
    users: Arc<Mutex<HashMap<ParticipantId, Identity>>>,
    lookups: Arc<AtomicU64>,
}

impl MockIdentityService {
    /// Create an empty mock; every lookup answers `Unknown`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolvable participant.
    #[must_use]
    pub fn with_user(self, participant_id: &str, display_name: &str, role: &str) -> Self {
        let pid = ParticipantId::from(participant_id);
        let identity = Identity {
            participant_id: pid.clone(),
            display_name: display_name.to_string(),
            role: role.to_string(),
        };
        self.locked().insert(pid, identity);
        self
    }

    /// Number of lookups performed so far.
    #[must_use]
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, HashMap<ParticipantId, Identity>> {
        self.users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl IdentityLookup for MockIdentityService {
    async fn resolve_identity(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Identity, IdentityError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.locked()
            .get(participant_id)
            .cloned()
            .ok_or(IdentityError::Unknown)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_registered_users() {
        let service = MockIdentityService::new().with_user("alice", "Alice", "host");

        let identity = service
            .resolve_identity(&ParticipantId::from("alice"))
            .await
            .unwrap();

        assert_eq!(identity.display_name, "Alice");
        assert_eq!(identity.role, "host");
        assert_eq!(service.lookup_count(), 1);
    }

    #[tokio::test]
    async fn unknown_participant_errors() {
        let service = MockIdentityService::new();

        let result = service.resolve_identity(&ParticipantId::from("ghost")).await;

        assert!(matches!(result, Err(IdentityError::Unknown)));
    }
}
