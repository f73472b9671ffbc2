//! Raw socket establishment and the framed connection built on top of it.
//!
//! A [`Connector`] opens the byte stream (plain TCP or TLS over TCP). The
//! resulting [`Connection`] owns a buffered reader in front of that stream
//! and speaks masked WebSocket text frames.

use std::{
    fmt,
    io::{self, BufReader, Read, Write},
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    sync::Arc,
    thread,
    time::Duration,
};

use bytes::BytesMut;
use rustls::{
    ClientConfig,
    ClientConnection,
    RootCertStore,
    StreamOwned,
    pki_types::ServerName,
};

use crate::{
    error::{EngineError, Result},
    frame::{Frame, FrameReader, MaskKey, WebSocketCodec, encode_into},
    url::UrlDescriptor,
};

/// Opens the byte stream the WebSocket connection runs over.
pub trait Connector {
    /// Stream type produced by this connector.
    type Stream: Read + Write;

    /// Connect to the host and port of `url`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Socket`] when the stream cannot be opened.
    fn connect(&self, url: &UrlDescriptor, timeout: Duration) -> Result<Self::Stream>;
}

/// Plain TCP or TLS-over-TCP stream.
pub enum MaybeTlsStream {
    /// Unencrypted TCP.
    Plain(TcpStream),
    /// TLS session over TCP.
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl fmt::Debug for MaybeTlsStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(stream) => f.debug_tuple("Plain").field(stream).finish(),
            Self::Tls(stream) => f.debug_tuple("Tls").field(&stream.sock).finish(),
        }
    }
}

impl Read for MaybeTlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.read(buf),
            Self::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for MaybeTlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.write(buf),
            Self::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(stream) => stream.flush(),
            Self::Tls(stream) => stream.flush(),
        }
    }
}

/// [`Connector`] for `host:port` over TCP, wrapped in TLS for `https` URLs.
///
/// TLS uses the ring provider and the Mozilla root set from `webpki-roots`
/// unless a custom [`ClientConfig`] is supplied.
#[derive(Clone, Debug, Default)]
pub struct TcpConnector {
    tls: Option<Arc<ClientConfig>>,
}

impl TcpConnector {
    /// Connector using the built-in TLS configuration.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Connector using `config` for secured URLs.
    #[must_use]
    pub fn with_tls_config(config: Arc<ClientConfig>) -> Self { Self { tls: Some(config) } }

    fn tls_config(&self) -> Result<Arc<ClientConfig>> {
        if let Some(config) = &self.tls {
            return Ok(Arc::clone(config));
        }
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        let config =
            ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
                .with_safe_default_protocol_versions()
                .map_err(|e| tls_failure(&e))?
                .with_root_certificates(roots)
                .with_no_client_auth();
        Ok(Arc::new(config))
    }
}

fn tls_failure(error: &rustls::Error) -> EngineError {
    EngineError::Socket {
        code: None,
        message: error.to_string(),
    }
}

fn connect_tcp(addrs: &[SocketAddr], timeout: Duration) -> io::Result<TcpStream> {
    let mut last_error = None;
    for addr in addrs {
        let attempt = if timeout.is_zero() {
            TcpStream::connect(addr)
        } else {
            TcpStream::connect_timeout(addr, timeout)
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(error) => last_error = Some(error),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
    }))
}

impl Connector for TcpConnector {
    type Stream = MaybeTlsStream;

    fn connect(&self, url: &UrlDescriptor, timeout: Duration) -> Result<Self::Stream> {
        let addrs: Vec<SocketAddr> = (url.host(), url.port())
            .to_socket_addrs()
            .map_err(|e| EngineError::socket(&e))?
            .collect();
        let stream = connect_tcp(&addrs, timeout).map_err(|e| EngineError::socket(&e))?;

        let io_timeout = (!timeout.is_zero()).then_some(timeout);
        stream
            .set_read_timeout(io_timeout)
            .and_then(|()| stream.set_write_timeout(io_timeout))
            .and_then(|()| stream.set_nodelay(true))
            .map_err(|e| EngineError::socket(&e))?;
        tracing::debug!(host = url.host(), port = url.port(), secured = url.secured(), "socket opened");

        if !url.secured() {
            return Ok(MaybeTlsStream::Plain(stream));
        }
        let name = ServerName::try_from(url.host().to_owned()).map_err(|e| EngineError::Socket {
            code: None,
            message: e.to_string(),
        })?;
        let session = ClientConnection::new(self.tls_config()?, name).map_err(|e| tls_failure(&e))?;
        Ok(MaybeTlsStream::Tls(Box::new(StreamOwned::new(session, stream))))
    }
}

/// Framed WebSocket connection over a buffered stream.
#[derive(Debug)]
pub struct Connection<S> {
    reader: BufReader<S>,
    frames: FrameReader,
    wait: Duration,
}

impl<S: Read + Write> Connection<S> {
    /// Wrap `stream`, decoding inbound frames with `codec` and pausing for
    /// `wait` after every write.
    #[must_use]
    pub fn new(stream: S, codec: WebSocketCodec, wait: Duration) -> Self {
        Self {
            reader: BufReader::new(stream),
            frames: FrameReader::new(codec),
            wait,
        }
    }

    /// Buffered reader in front of the stream, used during the HTTP upgrade.
    pub fn reader_mut(&mut self) -> &mut BufReader<S> { &mut self.reader }

    /// Whether bytes already read from the stream are waiting in the buffer.
    #[must_use]
    pub fn has_buffered_data(&self) -> bool { !self.reader.buffer().is_empty() }

    /// Write raw bytes and flush.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::WriteFailure`] when the stream accepts no
    /// bytes and [`EngineError::Io`] for other write errors.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        match stream.write_all(bytes).and_then(|()| stream.flush()) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::WriteZero => Err(EngineError::WriteFailure),
            Err(error) => Err(error.into()),
        }
    }

    /// Send `text` as one masked text frame, returning the bytes written.
    ///
    /// # Errors
    ///
    /// See [`Connection::write_raw`].
    pub fn send_text(&mut self, text: &str) -> Result<usize> {
        let frame = Frame::text(text.to_owned()).masked(MaskKey::random());
        let mut wire = BytesMut::with_capacity(text.len() + 14);
        encode_into(&frame, &mut wire);
        self.write_raw(&wire)?;
        if !self.wait.is_zero() {
            thread::sleep(self.wait);
        }
        Ok(wire.len())
    }

    /// Block until one frame arrives.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] on read failure or EOF, and codec errors
    /// for malformed frames.
    pub fn read_frame(&mut self) -> Result<Frame> { self.frames.read_frame(&mut self.reader) }

    /// Release the underlying stream.
    pub fn into_inner(self) -> S { self.reader.into_inner() }
}
