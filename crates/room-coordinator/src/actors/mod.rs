//! Actor model for room coordination.
//!
//! All inter-actor communication uses typed message passing over
//! `tokio::sync::mpsc`, with `tokio::sync::oneshot` for request-reply.
//! The hierarchy:
//!
//! ```text
//! CoordinatorActor (singleton, owns the room directory)
//! └── supervises N RoomActors
//!     └── RoomActor (one per active room, single writer for its state)
//! ```
//!
//! Room actors serialize every mutation of their room; the coordinator
//! only creates, resolves, and removes rooms, so distinct rooms never
//! block each other.

pub mod coordinator;
pub mod messages;
pub mod metrics;
pub mod room;

pub use coordinator::CoordinatorHandle;
pub use messages::{ChatMessage, JoinResult, MemberInfo, SignalEnvelope};
pub use metrics::CoordinatorMetrics;
pub use room::RoomHandle;
