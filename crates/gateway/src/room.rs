use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;

/// Room shared by connections that could not be identified at all.
pub const FALLBACK_ROOM: &str = "general";

const ROOM_CHANNEL_CAPACITY: usize = 64;

/// What the transport layer learned about the peer. All fields are
/// optional; resolution order decides the room.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionIdentity {
    /// Authenticated account id, when an upstream auth layer provided one.
    pub user_id: Option<String>,
    /// Persistent anonymous id (long-lived cookie).
    pub anonymous_id: Option<String>,
    /// Transport-session key, scoped to this connection's session.
    pub session_key: Option<String>,
}

impl ConnectionIdentity {
    pub fn user_label(&self) -> String {
        if let Some(user_id) = nonempty(&self.user_id) {
            return format!("user:{user_id}");
        }
        "anonymous".to_string()
    }
}

/// Resolves the correlation scope for a connection, in fixed priority:
/// authenticated id, then persistent anonymous id, then the transport
/// session key, then the shared fallback room.
pub fn assign_room(identity: &ConnectionIdentity) -> String {
    if let Some(user_id) = nonempty(&identity.user_id) {
        let session = nonempty(&identity.session_key).unwrap_or("default");
        return format!("user_{user_id}_{session}");
    }

    if let Some(anonymous_id) = nonempty(&identity.anonymous_id) {
        return format!("anonymous_{anonymous_id}");
    }

    if let Some(session_key) = nonempty(&identity.session_key) {
        return format!("anonymous_{session_key}");
    }

    FALLBACK_ROOM.to_string()
}

fn nonempty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|text| !text.is_empty())
}

/// Broadcast fan-out per room. Connections in the same room see each
/// other's broadcast frames; rooms are created lazily on first join.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, room: &str) -> (broadcast::Sender<String>, broadcast::Receiver<String>) {
        let mut rooms = self.rooms.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let sender = rooms
            .entry(room.to_string())
            .or_insert_with(|| {
                debug!(event_name = "gateway.room.created", room, "room channel created");
                broadcast::channel(ROOM_CHANNEL_CAPACITY).0
            })
            .clone();
        let receiver = sender.subscribe();
        (sender, receiver)
    }
}
