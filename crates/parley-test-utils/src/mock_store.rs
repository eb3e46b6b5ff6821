//! In-memory durable-store mock.
//!
//! Records every write the coordinator attempts, and can be switched into
//! a failing mode where each write is still recorded as attempted but
//! returns an error - the shape needed to prove that store failures never
//! block live broadcast.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::store::{ParticipationStore, StoreError};
use common::types::{ParticipantId, RoomId};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded store write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreRecord {
    Participation {
        room_id: RoomId,
        participant_id: ParticipantId,
        joined_at: DateTime<Utc>,
        left_at: Option<DateTime<Utc>>,
    },
    Message {
        room_id: RoomId,
        participant_id: ParticipantId,
        text: String,
        timestamp: DateTime<Utc>,
    },
    RoomClosed {
        room_id: RoomId,
        closed_at: DateTime<Utc>,
    },
}

/// Recording mock of the durable store.
#[derive(Debug, Clone, Default)]
pub struct MockParticipationStore {
    records: Arc<Mutex<Vec<StoreRecord>>>,
    fail_writes: Arc<AtomicBool>,
    attempts: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
}

impl MockParticipationStore {
    /// Create a mock where every write succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock where every write fails (but is still recorded as
    /// attempted).
    #[must_use]
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }

    /// Flip the failure mode at runtime.
    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of successfully recorded writes, in arrival order.
    #[must_use]
    pub fn records(&self) -> Vec<StoreRecord> {
        self.locked().clone()
    }

    /// Total writes attempted, including failed ones.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Total writes that returned an error.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` writes have been attempted.
    ///
    /// Store writes are dispatched as detached tasks, so tests must poll
    /// rather than assume the write landed before the broadcast returned.
    /// Returns false if the count is not reached within `timeout`.
    pub async fn wait_for_attempts(&self, n: u64, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.attempts() < n {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, Vec<StoreRecord>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self, record: StoreRecord) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Write("simulated store failure".to_string()));
        }
        self.locked().push(record);
        Ok(())
    }
}

#[async_trait]
impl ParticipationStore for MockParticipationStore {
    async fn record_participation(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        joined_at: DateTime<Utc>,
        left_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.write(StoreRecord::Participation {
            room_id: room_id.clone(),
            participant_id: participant_id.clone(),
            joined_at,
            left_at,
        })
    }

    async fn record_message(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        text: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.write(StoreRecord::Message {
            room_id: room_id.clone(),
            participant_id: participant_id.clone(),
            text: text.to_string(),
            timestamp,
        })
    }

    async fn record_room_closed(
        &self,
        room_id: &RoomId,
        closed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.write(StoreRecord::RoomClosed {
            room_id: room_id.clone(),
            closed_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_writes_in_order() {
        let store = MockParticipationStore::new();
        let room = RoomId::from("r1");
        let alice = ParticipantId::from("alice");
        let now = Utc::now();

        store
            .record_participation(&room, &alice, now, None)
            .await
            .unwrap();
        store
            .record_message(&room, &alice, "hi", now)
            .await
            .unwrap();

        let records = store.records();
        assert_eq!(records.len(), 2);
        assert!(matches!(
            records.first(),
            Some(StoreRecord::Participation { .. })
        ));
        assert_eq!(store.attempts(), 2);
        assert_eq!(store.failures(), 0);
    }

    #[tokio::test]
    async fn failing_mode_counts_attempts() {
        let store = MockParticipationStore::failing();
        let room = RoomId::from("r1");

        let result = store.record_room_closed(&room, Utc::now()).await;

        assert!(matches!(result, Err(StoreError::Write(_))));
        assert_eq!(store.attempts(), 1);
        assert_eq!(store.failures(), 1);
        assert!(store.records().is_empty());
    }
}
