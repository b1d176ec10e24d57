use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tracing::{info, warn};
use uuid::Uuid;

use showroom_agent::conversation::ConversationEngine;
use showroom_gateway::{
    ActionHandlers, ConnectionDriver, ConnectionIdentity, FrameTransport, RoomRegistry,
    TransportError,
};

/// Shared, read-only wiring handed to every connection task.
#[derive(Clone)]
pub struct GatewayState {
    pub handlers: Arc<ActionHandlers>,
    pub engine: Arc<ConversationEngine>,
    pub rooms: Arc<RoomRegistry>,
}

pub fn router(state: GatewayState) -> Router {
    Router::new().route("/ws", get(upgrade)).with_state(state)
}

async fn upgrade(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    websocket: WebSocketUpgrade,
) -> Response {
    let identity = resolve_identity(&params, &headers);
    websocket.on_upgrade(move |socket| drive_connection(socket, state, identity))
}

/// One lightweight task per connection; frames from the same connection
/// are processed serially inside the driver.
async fn drive_connection(socket: WebSocket, state: GatewayState, identity: ConnectionIdentity) {
    let driver = ConnectionDriver::new(
        SocketTransport { socket },
        state.handlers,
        state.engine,
        state.rooms,
        identity,
    );

    match driver.run().await {
        Ok(session) => info!(
            event_name = "server.ws.closed",
            user = %session.user_label(),
            room = %session.room,
            total_searches = session.search_count(),
            "websocket connection finished"
        ),
        Err(error) => warn!(
            event_name = "server.ws.transport_failed",
            error = %error,
            "websocket connection ended on a transport failure"
        ),
    }
}

/// Identity material comes from collaborators we do not implement: an
/// upstream auth layer (user id), a long-lived cookie (anonymous id),
/// and the transport session (key). A fresh key is minted when the
/// client brings none, so only truly header-less clients share the
/// fallback room.
fn resolve_identity(params: &HashMap<String, String>, headers: &HeaderMap) -> ConnectionIdentity {
    let user_id = header_value(headers, "x-user-id")
        .or_else(|| params.get("user_id").cloned())
        .filter(|value| !value.trim().is_empty());

    let anonymous_id = cookie_value(headers, "anon_id")
        .or_else(|| params.get("anon_id").cloned())
        .filter(|value| !value.trim().is_empty());

    let session_key = params
        .get("session_key")
        .cloned()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(Uuid::new_v4().to_string()));

    ConnectionIdentity { user_id, anonymous_id, session_key }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    cookies.split(';').map(str::trim).find_map(|pair| {
        pair.strip_prefix(name).and_then(|rest| rest.strip_prefix('=')).map(str::to_string)
    })
}

struct SocketTransport {
    socket: WebSocket,
}

#[async_trait]
impl FrameTransport for SocketTransport {
    async fn next_frame(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.socket.recv().await {
                None => return Ok(None),
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Close(_))) => return Ok(None),
                // Binary frames and keepalives are not part of the
                // protocol; keep reading.
                Some(Ok(_)) => continue,
                Some(Err(error)) => return Err(TransportError::Receive(error.to_string())),
            }
        }
    }

    async fn send_frame(&mut self, frame: String) -> Result<(), TransportError> {
        self.socket
            .send(Message::Text(frame.into()))
            .await
            .map_err(|error| TransportError::Send(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::http::header::COOKIE;
    use axum::http::{HeaderMap, HeaderValue};

    use super::resolve_identity;

    #[test]
    fn authenticated_header_takes_priority() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("42"));
        headers.insert(COOKIE, HeaderValue::from_static("anon_id=anon-7; theme=dark"));

        let identity = resolve_identity(&HashMap::new(), &headers);
        assert_eq!(identity.user_id.as_deref(), Some("42"));
        assert_eq!(identity.anonymous_id.as_deref(), Some("anon-7"));
    }

    #[test]
    fn anonymous_cookie_is_parsed_out_of_the_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; anon_id=visitor-9"));

        let identity = resolve_identity(&HashMap::new(), &headers);
        assert_eq!(identity.user_id, None);
        assert_eq!(identity.anonymous_id.as_deref(), Some("visitor-9"));
    }

    #[test]
    fn a_session_key_is_minted_when_the_client_brings_none() {
        let identity = resolve_identity(&HashMap::new(), &HeaderMap::new());
        assert!(identity.session_key.is_some());

        let mut params = HashMap::new();
        params.insert("session_key".to_string(), "sess-1".to_string());
        let explicit = resolve_identity(&params, &HeaderMap::new());
        assert_eq!(explicit.session_key.as_deref(), Some("sess-1"));
    }
}
