//! Socket.IO engine over an upgraded WebSocket connection.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{Engine, SocketIoBuilder};
use crate::{
    error::{EngineError, Result},
    frame::{Frame, Opcode, WebSocketCodec},
    handshake::{HandshakeTransport, HttpHandshake, Negotiated, negotiate},
    metrics,
    options::EngineOptions,
    packet::{EnginePacketType, Packet, connect_body, event_body},
    session::{Clock, Session, SystemClock},
    transport::{Connection, Connector, TcpConnector},
    upgrade::upgrade,
    url::UrlDescriptor,
};

/// Socket.IO engine: polling handshake, WebSocket upgrade, masked text
/// frames and heartbeat scheduling.
///
/// The engine exclusively owns its socket. Dropping a connected engine
/// closes it.
///
/// # Examples
///
/// ```no_run
/// use pocketio::{Engine, EngineOptions, SocketIo};
/// use serde_json::json;
///
/// # fn main() -> pocketio::Result<()> {
/// let mut engine = SocketIo::new("http://localhost:1337", EngineOptions::default())?;
/// engine.connect()?;
/// engine.emit("broadcast", &json!({"foo": "bar"}))?;
/// engine.close()?;
/// # Ok(())
/// # }
/// ```
pub struct SocketIo<C = TcpConnector, H = HttpHandshake, K = SystemClock>
where
    C: Connector,
{
    url: UrlDescriptor,
    options: EngineOptions,
    connector: C,
    handshake: H,
    clock: K,
    connection: Option<Connection<C::Stream>>,
    session: Option<Session>,
    cookies: Vec<String>,
    namespace: String,
}

impl SocketIo {
    /// Engine for `url` with the default connector, handshake and clock.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MalformedUrl`] if `url` cannot be parsed.
    pub fn new(url: &str, options: EngineOptions) -> Result<Self> {
        SocketIoBuilder::new().options(options).build(url)
    }

    /// Start configuring an engine.
    #[must_use]
    pub fn builder() -> SocketIoBuilder { SocketIoBuilder::new() }
}

impl<C, H, K> SocketIo<C, H, K>
where
    C: Connector,
    H: HandshakeTransport,
    K: Clock,
{
    pub(super) fn from_parts(
        url: UrlDescriptor,
        options: EngineOptions,
        connector: C,
        handshake: H,
        clock: K,
    ) -> Self {
        Self {
            url,
            options,
            connector,
            handshake,
            clock,
            connection: None,
            session: None,
            cookies: Vec::new(),
            namespace: String::new(),
        }
    }

    /// Parsed connection URL.
    #[must_use]
    pub fn url(&self) -> &UrlDescriptor { &self.url }

    /// Engine options.
    #[must_use]
    pub fn options(&self) -> &EngineOptions { &self.options }

    /// Negotiated session, present from handshake until close.
    #[must_use]
    pub fn session(&self) -> Option<&Session> { self.session.as_ref() }

    /// Cookies captured by the handshake.
    #[must_use]
    pub fn cookies(&self) -> &[String] { &self.cookies }

    /// Active namespace, empty for the root namespace.
    #[must_use]
    pub fn namespace(&self) -> &str { &self.namespace }

    /// Whether the WebSocket connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool { self.connection.is_some() }

    /// Emit `event` with any serialisable `args` on the active namespace.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotConnected`] before [`Engine::connect`],
    /// [`EngineError::Json`] if `args` cannot be serialised, and write
    /// errors from the socket.
    pub fn emit_serialized<T>(&mut self, event: &str, args: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.ensure_connected()?;
        self.keep_alive()?;
        let body = event_body(&self.namespace, event, args)?;
        debug!(event, namespace = %self.namespace, "emitting event");
        self.write(EnginePacketType::Message, Some(&body))?;
        Ok(())
    }

    /// Block until one frame arrives.
    ///
    /// A heartbeat is sent first when one is due.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotConnected`] before [`Engine::connect`], and
    /// read or decode errors otherwise.
    pub fn read_frame(&mut self) -> Result<Frame> {
        self.ensure_connected()?;
        self.keep_alive()?;
        let connection = self.connection.as_mut().ok_or(EngineError::NotConnected)?;
        let frame = record(connection.read_frame())?;
        metrics::inc_frames(metrics::Direction::Inbound);
        debug!(opcode = ?frame.opcode(), len = frame.payload().len(), "frame received");
        Ok(frame)
    }

    /// Read one frame and parse it as an Engine.IO packet.
    ///
    /// A server PING is answered with a PONG carrying the same body. A
    /// server CLOSE, at either protocol layer, releases the connection
    /// without writing anything further.
    ///
    /// # Errors
    ///
    /// See [`SocketIo::read_frame`] and [`Packet::parse`].
    pub fn read_packet(&mut self) -> Result<Packet> {
        let frame = self.read_frame()?;
        if frame.opcode() == Opcode::Close {
            self.release("server closed the websocket");
            return Ok(Packet::new(EnginePacketType::Close, None));
        }

        let packet = record(Packet::parse(&payload_text(&frame)?))?;
        match packet.kind() {
            EnginePacketType::Ping => {
                self.write(EnginePacketType::Pong, packet.body())?;
            }
            EnginePacketType::Close => self.release("server closed the session"),
            _ => {}
        }
        Ok(packet)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connection.is_some() {
            Ok(())
        } else {
            Err(EngineError::NotConnected)
        }
    }

    fn handshake(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }
        let Negotiated { session, cookies } =
            negotiate(&self.handshake, &self.url, &self.options, self.clock.now())?;
        self.session = Some(session);
        self.cookies = cookies;
        Ok(())
    }

    fn open(&mut self) -> Result<Connection<C::Stream>> {
        self.handshake()?;
        let session = self.session.as_ref().ok_or(EngineError::NotConnected)?;
        let stream = self
            .connector
            .connect(&self.url, self.options.timeout_value())?;
        let mut connection = Connection::new(
            stream,
            WebSocketCodec::new(self.options.max_payload_length_value()),
            self.options.wait_value(),
        );
        upgrade(
            &mut connection,
            &self.url,
            session,
            &self.cookies,
            &self.options,
        )?;
        Ok(connection)
    }

    fn release(&mut self, reason: &str) {
        if self.connection.take().is_some() {
            metrics::dec_connections();
            info!(reason, "connection released");
        }
        self.session = None;
        self.cookies.clear();
        self.namespace.clear();
    }
}

fn record<T>(result: Result<T>) -> Result<T> {
    if result.is_err() {
        metrics::inc_errors();
    }
    result
}

fn payload_text(frame: &Frame) -> Result<String> {
    String::from_utf8(frame.payload().to_vec())
        .map_err(|e| EngineError::ProtocolViolation(format!("payload is not UTF-8: {e}")))
}

impl<C, H, K> Engine for SocketIo<C, H, K>
where
    C: Connector,
    H: HandshakeTransport,
    K: Clock,
{
    fn name(&self) -> String { format!("SocketIO Version {}.X", self.options.version_value()) }

    fn connect(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }
        match self.open() {
            Ok(connection) => {
                self.connection = Some(connection);
                metrics::inc_connections();
                info!(
                    url = %self.url.authority(),
                    sid = self.session.as_ref().map(Session::id),
                    "connected"
                );
                Ok(())
            }
            // the negotiated session survives a failed socket, so the next
            // attempt goes straight to the upgrade
            Err(error) => {
                metrics::inc_errors();
                warn!(%error, "connect failed");
                Err(error)
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.connection.is_none() {
            self.release("close requested");
            return Ok(());
        }
        let result = self.write(EnginePacketType::Close, None);
        self.release("close requested");
        result.map(|_| ())
    }

    fn read(&mut self) -> Result<String> {
        let frame = self.read_frame()?;
        record(payload_text(&frame))
    }

    fn write(&mut self, kind: EnginePacketType, message: Option<&str>) -> Result<usize> {
        let Some(connection) = self.connection.as_mut() else {
            return Ok(0);
        };
        let text = Packet::new(kind, message.map(str::to_owned)).encode();
        let written = record(connection.send_text(&text))?;
        metrics::inc_frames(metrics::Direction::Outbound);
        debug!(packet = %kind, bytes = written, "packet written");
        Ok(written)
    }

    fn emit(&mut self, event: &str, args: &Value) -> Result<()> { self.emit_serialized(event, args) }

    fn of(&mut self, namespace: &str) -> Result<()> {
        self.ensure_connected()?;
        self.keep_alive()?;
        namespace.clone_into(&mut self.namespace);
        debug!(namespace, "switching namespace");
        self.write(EnginePacketType::Message, Some(&connect_body(namespace)))?;
        Ok(())
    }

    fn keep_alive(&mut self) -> Result<()> {
        let now = self.clock.now();
        let due = self
            .session
            .as_mut()
            .is_some_and(|session| session.needs_heartbeat(now));
        if due && self.connection.is_some() {
            metrics::inc_heartbeats();
            debug!("sending heartbeat");
            self.write(EnginePacketType::Ping, None)?;
        }
        Ok(())
    }
}

impl<C, H, K> Drop for SocketIo<C, H, K>
where
    C: Connector,
{
    fn drop(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };
        let close = Packet::new(EnginePacketType::Close, None).encode();
        if let Err(error) = connection.send_text(&close) {
            warn!(%error, "failed to send close packet while dropping engine");
        }
        metrics::dec_connections();
    }
}

impl<C, H, K> fmt::Debug for SocketIo<C, H, K>
where
    C: Connector,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketIo")
            .field("url", &self.url)
            .field("options", &self.options)
            .field("connected", &self.connection.is_some())
            .field("session", &self.session)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn engine() -> SocketIo {
        SocketIo::new("http://localhost:1337", EngineOptions::default()).expect("valid url")
    }

    #[test]
    fn name_reports_protocol_version() {
        assert_eq!(engine().name(), "SocketIO Version 3.X");
        let v4 = SocketIo::new("http://localhost", EngineOptions::default().version(4)).expect("url");
        assert_eq!(v4.name(), "SocketIO Version 4.X");
    }

    #[test]
    fn disconnected_writes_are_no_ops() {
        let mut engine = engine();
        assert_eq!(engine.write(EnginePacketType::Ping, None).expect("no-op"), 0);
        engine.keep_alive().expect("no session, nothing due");
    }

    #[test]
    fn operations_need_a_connection() {
        let mut engine = engine();
        assert!(matches!(
            engine.emit("broadcast", &json!({})),
            Err(EngineError::NotConnected)
        ));
        assert!(matches!(engine.of("/chat"), Err(EngineError::NotConnected)));
        assert!(matches!(engine.read(), Err(EngineError::NotConnected)));
        assert_eq!(engine.namespace(), "");
    }

    #[test]
    fn closing_a_fresh_engine_is_a_no_op() {
        let mut engine = engine();
        engine.close().expect("first close");
        engine.close().expect("second close");
        assert!(!engine.is_connected());
        assert!(engine.session().is_none());
    }

    #[test]
    fn malformed_urls_are_rejected() {
        let err = SocketIo::new("http://[::1", EngineOptions::default()).expect_err("bad url");
        assert!(matches!(err, EngineError::MalformedUrl { .. }));
    }
}
