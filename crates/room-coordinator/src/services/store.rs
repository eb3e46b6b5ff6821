//! Postgres-backed participation store.
//!
//! Analytics writes for room membership history and chat transcripts.
//! All queries are parameterized. Every call is timed and counted; the
//! pool is created lazily so a down database degrades durability without
//! preventing startup - the live event path never depends on these
//! writes succeeding.

use crate::observability::metrics as prom;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::store::{ParticipationStore, StoreError};
use common::types::{ParticipantId, RoomId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Instant;
use tracing::instrument;

/// Maximum pooled connections for analytics writes.
const MAX_CONNECTIONS: u32 = 5;

/// Postgres participation store.
#[derive(Debug, Clone)]
pub struct PgParticipationStore {
    pool: PgPool,
}

impl PgParticipationStore {
    /// Create a store with a lazily-connected pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection URL cannot be parsed.
    pub fn connect_lazy(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_lazy(database_url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool (for tests against a live database).
    #[must_use]
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipationStore for PgParticipationStore {
    #[instrument(skip_all, name = "parley.store.participation", fields(room_id = %room_id))]
    async fn record_participation(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        joined_at: DateTime<Utc>,
        left_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let start = Instant::now();

        let result = match left_at {
            None => {
                sqlx::query(
                    r"
                    INSERT INTO room_participation (room_id, participant_id, joined_at)
                    VALUES ($1, $2, $3)
                    ",
                )
                .bind(room_id.as_str())
                .bind(participant_id.as_str())
                .bind(joined_at)
                .execute(&self.pool)
                .await
            }
            Some(left) => {
                sqlx::query(
                    r"
                    UPDATE room_participation
                    SET left_at = $4
                    WHERE room_id = $1 AND participant_id = $2 AND joined_at = $3
                      AND left_at IS NULL
                    ",
                )
                .bind(room_id.as_str())
                .bind(participant_id.as_str())
                .bind(joined_at)
                .bind(left)
                .execute(&self.pool)
                .await
            }
        };

        prom::record_store_write("participation", result.is_ok(), start.elapsed());
        result
            .map(|_| ())
            .map_err(|e| StoreError::Write(e.to_string()))
    }

    #[instrument(skip_all, name = "parley.store.message", fields(room_id = %room_id))]
    async fn record_message(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        text: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let start = Instant::now();

        let result = sqlx::query(
            r"
            INSERT INTO room_messages (room_id, participant_id, body, sent_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(room_id.as_str())
        .bind(participant_id.as_str())
        .bind(text)
        .bind(timestamp)
        .execute(&self.pool)
        .await;

        prom::record_store_write("message", result.is_ok(), start.elapsed());
        result
            .map(|_| ())
            .map_err(|e| StoreError::Write(e.to_string()))
    }

    #[instrument(skip_all, name = "parley.store.room_closed", fields(room_id = %room_id))]
    async fn record_room_closed(
        &self,
        room_id: &RoomId,
        closed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let start = Instant::now();

        let result = sqlx::query(
            r"
            INSERT INTO room_closures (room_id, closed_at)
            VALUES ($1, $2)
            ",
        )
        .bind(room_id.as_str())
        .bind(closed_at)
        .execute(&self.pool)
        .await;

        prom::record_store_write("room_closed", result.is_ok(), start.elapsed());
        result
            .map(|_| ())
            .map_err(|e| StoreError::Write(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_lazy_accepts_a_valid_url() {
        let store = PgParticipationStore::connect_lazy("postgres://localhost/parley");
        assert!(store.is_ok());
    }
}
