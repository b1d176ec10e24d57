use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use showroom_agent::conversation::ConversationEngine;
use showroom_core::errors::ServiceError;

use crate::envelope::{
    generate_request_id, Action, BroadcastFrame, ChatFrame, EchoFrame, ResponseFrame,
    WelcomeFrame,
};
use crate::handlers::ActionHandlers;
use crate::room::{ConnectionIdentity, RoomRegistry};
use crate::session::ConnectionSession;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport receive failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
}

/// One live, bidirectional connection as the gateway sees it. `None`
/// from `next_frame` means the peer closed.
#[async_trait]
pub trait FrameTransport: Send {
    async fn next_frame(&mut self) -> Result<Option<String>, TransportError>;
    async fn send_frame(&mut self, frame: String) -> Result<(), TransportError>;
}

enum Inbound {
    Frame(Option<String>),
    Broadcast(Result<String, broadcast::error::RecvError>),
}

/// Pumps one connection: welcome on start, then frames processed
/// strictly in arrival order. A malformed frame or a failed handler
/// produces an error envelope and the loop continues; only transport
/// failure or peer close ends it.
pub struct ConnectionDriver<T: FrameTransport> {
    transport: T,
    handlers: Arc<ActionHandlers>,
    engine: Arc<ConversationEngine>,
    rooms: Arc<RoomRegistry>,
    session: ConnectionSession,
}

impl<T: FrameTransport> ConnectionDriver<T> {
    pub fn new(
        transport: T,
        handlers: Arc<ActionHandlers>,
        engine: Arc<ConversationEngine>,
        rooms: Arc<RoomRegistry>,
        identity: ConnectionIdentity,
    ) -> Self {
        Self { transport, handlers, engine, rooms, session: ConnectionSession::new(identity) }
    }

    /// Runs the connection to completion and returns the final session
    /// state (the caller logs its statistics).
    pub async fn run(mut self) -> Result<ConnectionSession, TransportError> {
        let (broadcast_sender, mut broadcast_receiver) = self.rooms.join(&self.session.room);

        info!(
            event_name = "gateway.connection.opened",
            user = %self.session.user_label(),
            room = %self.session.room,
            "connection joined its room"
        );
        self.send_json(&WelcomeFrame::new(self.session.user_label(), self.session.room.clone()))
            .await?;

        loop {
            let inbound = tokio::select! {
                frame = self.transport.next_frame() => Inbound::Frame(frame?),
                received = broadcast_receiver.recv() => Inbound::Broadcast(received),
            };

            match inbound {
                Inbound::Frame(Some(text)) => self.process_frame(&text, &broadcast_sender).await?,
                Inbound::Frame(None) => break,
                Inbound::Broadcast(Ok(frame)) => self.transport.send_frame(frame).await?,
                Inbound::Broadcast(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    warn!(
                        event_name = "gateway.connection.broadcast_lagged",
                        room = %self.session.room,
                        skipped,
                        "connection fell behind on room broadcasts"
                    );
                }
                Inbound::Broadcast(Err(broadcast::error::RecvError::Closed)) => {}
            }
        }

        info!(
            event_name = "gateway.connection.closed",
            user = %self.session.user_label(),
            room = %self.session.room,
            total_searches = self.session.search_count(),
            "connection closed"
        );
        Ok(self.session)
    }

    async fn process_frame(
        &mut self,
        text: &str,
        broadcast_sender: &broadcast::Sender<String>,
    ) -> Result<(), TransportError> {
        let parsed: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(parse_error) => {
                let error = ServiceError::Input(format!("invalid JSON: {parse_error}"));
                return self.send_json(&ResponseFrame::error(None, &error)).await;
            }
        };

        let frame_type =
            parsed.get("type").and_then(Value::as_str).unwrap_or("message").to_string();
        match frame_type.as_str() {
            "mcp_request" => self.handle_protocol_request(&parsed).await,
            "chat" => self.handle_chat(&parsed).await,
            "broadcast" => self.handle_broadcast(text, &parsed, &frame_type, broadcast_sender).await,
            _ => self.handle_echo(text, &parsed, &frame_type).await,
        }
    }

    async fn handle_protocol_request(&mut self, parsed: &Value) -> Result<(), TransportError> {
        let request_id = parsed
            .get("request_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(generate_request_id);
        let data = parsed.get("data").cloned().unwrap_or_else(|| Value::Object(Default::default()));
        let action_name = data.get("action").and_then(Value::as_str).unwrap_or("");

        let response = match Action::parse(action_name) {
            Some(action) => {
                match self.handlers.handle_action(action, &data, &mut self.session).await {
                    Ok(payload) => ResponseFrame::success(Some(request_id), payload),
                    Err(error) => {
                        debug!(
                            event_name = "gateway.request.failed",
                            action = action.name(),
                            code = error.code(),
                            "protocol request ended in an error envelope"
                        );
                        ResponseFrame::error(Some(request_id), &error)
                    }
                }
            }
            None => {
                let label =
                    if action_name.is_empty() { "(missing)".to_string() } else { action_name.to_string() };
                ResponseFrame::error(Some(request_id), &ServiceError::UnsupportedAction(label))
            }
        };

        self.send_json(&response).await
    }

    async fn handle_chat(&mut self, parsed: &Value) -> Result<(), TransportError> {
        let message = parsed.get("message").and_then(Value::as_str).unwrap_or("");
        let reply = self.engine.take_turn(&mut self.session.conversation, message).await;
        self.send_json(&ChatFrame::new(reply)).await
    }

    async fn handle_broadcast(
        &mut self,
        raw_text: &str,
        parsed: &Value,
        frame_type: &str,
        broadcast_sender: &broadcast::Sender<String>,
    ) -> Result<(), TransportError> {
        self.handle_echo(raw_text, parsed, frame_type).await?;

        let message = parsed.get("message").or_else(|| parsed.get("data")).cloned().unwrap_or(
            Value::String(raw_text.to_string()),
        );
        let frame = BroadcastFrame::new(message, self.session.user_label(), self.session.room.clone());
        let serialized =
            serde_json::to_string(&frame).map_err(|error| TransportError::Send(error.to_string()))?;

        // No subscribers is fine; the sender side never fails the
        // connection over it.
        let _ = broadcast_sender.send(serialized);
        Ok(())
    }

    async fn handle_echo(
        &mut self,
        raw_text: &str,
        parsed: &Value,
        frame_type: &str,
    ) -> Result<(), TransportError> {
        let content =
            parsed.get("data").cloned().unwrap_or_else(|| Value::String(raw_text.to_string()));
        let frame = EchoFrame::new(
            content,
            frame_type.to_string(),
            self.session.user_label(),
            self.session.room.clone(),
        );
        self.send_json(&frame).await
    }

    async fn send_json<F: Serialize>(&mut self, frame: &F) -> Result<(), TransportError> {
        let text =
            serde_json::to_string(frame).map_err(|error| TransportError::Send(error.to_string()))?;
        self.transport.send_frame(text).await
    }
}
