//! Test doubles for driving `pocketio` engines without a network.
//!
//! A [`ScriptedConnector`] hands the engine a [`ScriptedStream`] whose
//! inbound bytes are fixed up front, a [`ScriptedHandshake`] stands in for
//! the polling request, and a [`ManualClock`] makes heartbeats
//! deterministic.
//!
//! ```rust
//! use pocketio::{Engine, SocketIo};
//! use pocketio_testing::{
//!     ManualClock, ScriptedConnector, ScriptedHandshake, ScriptedStream, client_output,
//!     upgrade_then,
//! };
//!
//! let stream = ScriptedStream::new(upgrade_then(&[]));
//! let mut engine = SocketIo::builder()
//!     .connector(ScriptedConnector::new(stream.clone()))
//!     .handshake(ScriptedHandshake::accepting("abc", 25_000, 60_000))
//!     .clock(ManualClock::new())
//!     .build("http://localhost:1337")
//!     .expect("valid url");
//! engine.connect().expect("connect");
//!
//! let (request, frames) = client_output(&stream.written());
//! assert!(request.contains("sid=abc"));
//! assert_eq!(frames, ["5"]);
//! ```

pub mod clock;
pub mod handshake;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod stream;

pub use clock::ManualClock;
pub use handshake::ScriptedHandshake;
pub use logging::{LoggerHandle, logger};
pub use metrics::{capture_metrics, counter_total};
pub use server::{
    UPGRADE_RESPONSE,
    client_output,
    handshake_body,
    server_close_frame,
    server_text_frame,
    upgrade_then,
};
pub use stream::{ScriptedConnector, ScriptedStream};
