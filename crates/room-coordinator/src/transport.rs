//! WebSocket transport for client channels.
//!
//! Each accepted socket becomes one registered connection: a write task
//! drains the connection's outbound event channel into the socket, and
//! the read loop - the connection's logical worker - dispatches parsed
//! client events in order. Closing the channel is an implicit leave.
//!
//! Malformed frames are logged and skipped; rejected operations are
//! answered with an `error` event carrying a client-safe code/message.

use crate::actors::messages::SignalEnvelope;
use crate::actors::{CoordinatorHandle, RoomHandle};
use crate::errors::CoordinatorError;
use crate::events::{ClientEvent, ServerEvent};
use crate::registry::ConnectionRegistry;
use crate::relay::SignalRelay;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use common::identity::{fallback_identity, IdentityLookup};
use common::types::{ConnectionId, ParticipantId, RoomId};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared state for the client endpoint.
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub coordinator: CoordinatorHandle,
    pub relay: SignalRelay,
    pub identity: Arc<dyn IdentityLookup>,
    /// Outbound event buffer per connection.
    pub client_buffer: usize,
}

/// Build the client-facing router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one client channel from open to close.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(state.client_buffer);
    let connection_id = state.registry.register(tx);

    info!(target: "parley.transport", connection_id = %connection_id, "client connected");

    let mut write_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut session = ClientSession {
        connection_id,
        state: Arc::clone(&state),
        room: None,
    };

    loop {
        tokio::select! {
            _ = &mut write_task => break,

            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => session.handle_frame(&text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // binary/ping/pong ignored
                    Some(Err(e)) => {
                        debug!(
                            target: "parley.transport",
                            connection_id = %connection_id,
                            error = %e,
                            "socket read error"
                        );
                        break;
                    }
                }
            }
        }
    }

    session.disconnect().await;
    write_task.abort();
    info!(target: "parley.transport", connection_id = %connection_id, "client disconnected");
}

/// Per-connection dispatch state.
struct ClientSession {
    connection_id: ConnectionId,
    state: Arc<AppState>,
    /// Handle of the currently joined room, if any.
    room: Option<RoomHandle>,
}

impl ClientSession {
    /// Parse and dispatch one text frame.
    async fn handle_frame(&mut self, text: &str) {
        let event: ClientEvent = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(e) => {
                debug!(
                    target: "parley.transport",
                    connection_id = %self.connection_id,
                    error = %e,
                    "malformed client event skipped"
                );
                return;
            }
        };

        match event {
            ClientEvent::JoinRoom {
                room_id,
                participant_id,
            } => self.handle_join(room_id, participant_id).await,
            ClientEvent::LeaveRoom => self.handle_leave().await,
            ClientEvent::SendMessage { text } => self.handle_chat(text).await,
            ClientEvent::SendSignal {
                target,
                kind,
                payload,
            } => {
                self.state.relay.relay(
                    self.connection_id,
                    SignalEnvelope {
                        target: ParticipantId::from(target),
                        kind,
                        payload,
                    },
                );
            }
        }
    }

    async fn handle_join(&mut self, room_id: String, participant_id: String) {
        let participant = ParticipantId::from(participant_id);

        // Identity resolution happens here, outside any room
        // serialization; failure degrades to a placeholder.
        let identity = match self.state.identity.resolve_identity(&participant).await {
            Ok(identity) => identity,
            Err(e) => {
                debug!(
                    target: "parley.transport",
                    connection_id = %self.connection_id,
                    participant_id = %participant,
                    error = %e,
                    "identity lookup degraded to placeholder"
                );
                fallback_identity(self.connection_id, &participant)
            }
        };
        // Attach before the join attempt: a re-sent join refreshes the
        // announced identity even when the join itself is rejected.
        self.state
            .registry
            .attach_identity(self.connection_id, identity.clone());

        let room_id = RoomId::from(room_id);
        if let Err(e) = self
            .state
            .registry
            .set_room(self.connection_id, room_id.clone())
        {
            self.reject(&e);
            return;
        }

        match self
            .state
            .coordinator
            .join_room(room_id.clone(), self.connection_id, identity)
            .await
        {
            Ok((_result, room)) => {
                // Ack and history replay were already enqueued by the room.
                self.room = Some(room);
            }
            Err(e) => {
                let _ = self.state.registry.take_room(self.connection_id);
                warn!(
                    target: "parley.transport",
                    connection_id = %self.connection_id,
                    room_id = %room_id,
                    error = %e,
                    "join rejected"
                );
                self.reject(&e);
            }
        }
    }

    async fn handle_leave(&mut self) {
        // take_room yields at most once, so an explicit leave racing the
        // disconnect cleanup still runs exactly one room leave.
        if self.state.registry.take_room(self.connection_id).is_some() {
            if let Some(room) = self.room.take() {
                let _ = room.leave(self.connection_id).await;
            }
        }
    }

    async fn handle_chat(&mut self, text: String) {
        match &self.room {
            Some(room) => room.chat(self.connection_id, text).await,
            None => self.reject(&CoordinatorError::RoomNotFound(
                "not in a room".to_string(),
            )),
        }
    }

    /// Implicit leave and unregistration on channel close.
    async fn disconnect(&mut self) {
        if let Some(room_id) = self.state.registry.unregister(self.connection_id) {
            if let Some(room) = self.room.take() {
                let _ = room.leave(self.connection_id).await;
            } else if let Some(room) = self.state.coordinator.room(room_id).await {
                let _ = room.leave(self.connection_id).await;
            }
        }
    }

    /// Send a client-safe error event.
    fn reject(&self, error: &CoordinatorError) {
        let _ = self.state.registry.deliver(
            self.connection_id,
            ServerEvent::Error {
                code: error.error_code(),
                message: error.client_message(),
            },
        );
    }
}
