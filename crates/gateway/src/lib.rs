//! Wire-level protocol gateway.
//!
//! Frames a fixed action vocabulary inside request/response envelopes
//! over a long-lived, bidirectional connection: welcome handshake on
//! connect, correlation ids on every exchange, room assignment for
//! broadcast visibility, and per-connection conversational state. The
//! transport itself is a trait seam ([`connection::FrameTransport`]);
//! the server crate binds it to real WebSockets.

pub mod connection;
pub mod envelope;
pub mod handlers;
pub mod room;
pub mod session;

pub use connection::{ConnectionDriver, FrameTransport, TransportError};
pub use envelope::{Action, ResponseFrame, WelcomeFrame, PROTOCOL_VERSION};
pub use handlers::{ActionHandlers, StoreSearcher};
pub use room::{assign_room, ConnectionIdentity, RoomRegistry, FALLBACK_ROOM};
pub use session::ConnectionSession;
