#![doc(html_root_url = "https://docs.rs/pocketio/latest")]
//! Public API for the `pocketio` library.
//!
//! A blocking Engine.IO/Socket.IO client: an HTTP long-polling handshake,
//! an in-place upgrade to WebSocket framing, heartbeat scheduling, and an
//! emit/namespace/close surface on top.

pub mod client;
pub mod engine;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod metrics;
pub mod options;
pub mod packet;
pub mod session;
pub mod transport;
pub mod upgrade;
pub mod url;

pub use client::Client;
pub use engine::{Engine, SocketIo, SocketIoBuilder};
pub use error::{EngineError, Result};
pub use handshake::{HandshakeReply, HandshakeRequest, HandshakeTransport, HttpHandshake};
pub use options::{EngineOptions, Transport};
pub use packet::{EnginePacketType, Packet, SocketPacket, SocketPacketType};
pub use session::{Clock, Session, SystemClock};
pub use transport::{Connector, MaybeTlsStream, TcpConnector};
pub use url::UrlDescriptor;
