//! Builder for [`SocketIo`] engines with injectable collaborators.

use super::SocketIo;
use crate::{
    error::Result,
    handshake::{HandshakeTransport, HttpHandshake},
    options::EngineOptions,
    session::{Clock, SystemClock},
    transport::{Connector, TcpConnector},
    url::UrlDescriptor,
};

/// Rebuilds `SocketIoBuilder` with one collaborator replaced.
///
/// Replacing a collaborator changes a type parameter, so struct update
/// syntax (`..self`) cannot be used and fields are moved explicitly.
macro_rules! builder_field_update {
    ($self:expr,connector = $value:expr) => {
        SocketIoBuilder {
            options: $self.options,
            connector: $value,
            handshake: $self.handshake,
            clock: $self.clock,
        }
    };
    ($self:expr,handshake = $value:expr) => {
        SocketIoBuilder {
            options: $self.options,
            connector: $self.connector,
            handshake: $value,
            clock: $self.clock,
        }
    };
    ($self:expr,clock = $value:expr) => {
        SocketIoBuilder {
            options: $self.options,
            connector: $self.connector,
            handshake: $self.handshake,
            clock: $value,
        }
    };
}

/// Builder for [`SocketIo`].
///
/// The builder supports three generic type parameters:
/// - `C`: opens the socket (default: [`TcpConnector`])
/// - `H`: performs the handshake request (default: [`HttpHandshake`])
/// - `K`: supplies time for heartbeats (default: [`SystemClock`])
///
/// # Examples
///
/// ```
/// use pocketio::{EngineOptions, SocketIoBuilder};
///
/// let engine = SocketIoBuilder::new()
///     .options(EngineOptions::default().version(4))
///     .build("http://localhost:1337")
///     .expect("valid url");
/// assert!(!engine.is_connected());
/// ```
pub struct SocketIoBuilder<C = TcpConnector, H = HttpHandshake, K = SystemClock> {
    options: EngineOptions,
    connector: C,
    handshake: H,
    clock: K,
}

impl SocketIoBuilder {
    /// Create a builder with default collaborators and options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: EngineOptions::default(),
            connector: TcpConnector::default(),
            handshake: HttpHandshake::default(),
            clock: SystemClock,
        }
    }
}

impl Default for SocketIoBuilder {
    fn default() -> Self { Self::new() }
}

impl<C, H, K> SocketIoBuilder<C, H, K> {
    /// Replace the engine options.
    #[must_use]
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Use `connector` to open the socket.
    #[must_use]
    pub fn connector<C2: Connector>(self, connector: C2) -> SocketIoBuilder<C2, H, K> {
        builder_field_update!(self, connector = connector)
    }

    /// Use `handshake` for the polling handshake request.
    #[must_use]
    pub fn handshake<H2: HandshakeTransport>(self, handshake: H2) -> SocketIoBuilder<C, H2, K> {
        builder_field_update!(self, handshake = handshake)
    }

    /// Use `clock` for heartbeat decisions.
    #[must_use]
    pub fn clock<K2: Clock>(self, clock: K2) -> SocketIoBuilder<C, H, K2> {
        builder_field_update!(self, clock = clock)
    }

    /// Build a disconnected engine for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::MalformedUrl`] if `url` cannot be parsed.
    pub fn build(self, url: &str) -> Result<SocketIo<C, H, K>>
    where
        C: Connector,
        H: HandshakeTransport,
        K: Clock,
    {
        let url = UrlDescriptor::parse(url)?;
        Ok(SocketIo::from_parts(
            url,
            self.options,
            self.connector,
            self.handshake,
            self.clock,
        ))
    }
}
