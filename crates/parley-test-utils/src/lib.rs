//! Test doubles for Parley's external collaborators.
//!
//! Provides in-memory, recording implementations of the identity-lookup
//! and durable-store interfaces so unit and integration tests can observe
//! exactly what the coordinator asked the outside world to do - including
//! a failing store mode for durability-degradation tests.

pub mod mock_identity;
pub mod mock_store;

pub use mock_identity::MockIdentityService;
pub use mock_store::{MockParticipationStore, StoreRecord};
