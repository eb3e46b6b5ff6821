//! Parley Room Coordinator Library
//!
//! Core functionality for the Parley room coordinator - a stateful
//! WebSocket server responsible for:
//!
//! - Tracking live client connections and their room membership
//! - Room lifecycle (created on first join, removed when the last member leaves)
//! - Presence and chat fan-out with bounded history replay for late joiners
//! - Relaying opaque WebRTC signaling envelopes between two participants
//! - Fire-and-forget durable writes of membership history and transcripts
//!
//! # Architecture
//!
//! Shared state splits into a registry and an actor hierarchy:
//!
//! ```text
//! ConnectionRegistry (one mutex, short holds)
//! └── channel, identity, and room association per connection
//!
//! CoordinatorActor (singleton)
//! ├── owns the room directory (room id -> RoomActor)
//! └── supervises N RoomActors
//!     └── RoomActor (one per active room)
//!         ├── ordered member list + bounded chat history
//!         └── serializes every mutation of its room
//! ```
//!
//! # Key Design Decisions
//!
//! - **One task per connection**: the WebSocket read loop is the
//!   connection's logical worker; all of its events are handled in order.
//! - **Room-level serialization**: each room is a single-writer actor, so
//!   concurrent joins/leaves on one room linearize while distinct rooms
//!   proceed independently.
//! - **No I/O under room serialization**: durable-store writes are
//!   detached tasks; a store outage degrades durability, never liveness.
//! - **Opaque signaling**: envelopes are routed by target participant id
//!   and never parsed, so signaling formats can evolve freely.
//!
//! # Modules
//!
//! - [`registry`] - connection registry (channels, identity, room links)
//! - [`actors`] - coordinator and room actors
//! - [`relay`] - signaling envelope relay
//! - [`events`] - client/server wire event vocabulary
//! - [`transport`] - axum WebSocket endpoint
//! - [`services`] - identity-lookup and durable-store implementations
//! - [`config`] - service configuration from environment
//! - [`errors`] - error types with client-safe error codes
//! - [`observability`] - health endpoints and Prometheus metrics

pub mod actors;
pub mod config;
pub mod errors;
pub mod events;
pub mod observability;
pub mod registry;
pub mod relay;
pub mod services;
pub mod transport;
