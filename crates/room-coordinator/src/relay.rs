//! Signaling relay - forwards opaque envelopes between two participants.
//!
//! The relay is a pure forwarding hop: it resolves the target participant
//! id through the connection registry and enqueues the envelope into the
//! target's channel unmodified. It never parses, validates, or interprets
//! envelope contents, so signaling formats can evolve without touching
//! this code.
//!
//! An unresolved target is a silent drop: stale signaling after a peer
//! has left is expected and harmless, and the originating client owns
//! timeout/retry.
//!
//! Ordering: each connection's read task invokes `relay` sequentially and
//! enqueueing is synchronous, so envelopes from one sender to one target
//! arrive in send order. No ordering holds across different pairs.

use crate::actors::messages::SignalEnvelope;
use crate::actors::metrics::CoordinatorMetrics;
use crate::events::ServerEvent;
use crate::observability::metrics as prom;
use crate::registry::ConnectionRegistry;
use common::types::ConnectionId;
use std::sync::Arc;
use tracing::debug;

/// Forwards signaling envelopes through the connection registry.
#[derive(Clone)]
pub struct SignalRelay {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<CoordinatorMetrics>,
}

impl SignalRelay {
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, metrics: Arc<CoordinatorMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Relay one envelope from `from` to its named target.
    pub fn relay(&self, from: ConnectionId, envelope: SignalEnvelope) {
        let Some(target) = self.registry.resolve(&envelope.target) else {
            debug!(
                target: "parley.relay",
                from = %from,
                target_participant = %envelope.target,
                "signal target unresolved, dropping"
            );
            self.metrics.signal_dropped();
            prom::record_signal_dropped();
            return;
        };

        let from_participant = self
            .registry
            .identity(from)
            .map(|identity| identity.participant_id);

        let delivered = self.registry.deliver(
            target,
            ServerEvent::Signal {
                from,
                from_participant,
                kind: envelope.kind,
                payload: envelope.payload,
            },
        );

        if delivered {
            self.metrics.signal_relayed();
            prom::record_signal_relayed();
        } else {
            // Target channel gone between resolve and deliver: same as
            // unresolved, a no-op.
            self.metrics.signal_dropped();
            prom::record_signal_dropped();
        }
    }
}
