//! In-memory sockets standing in for a Socket.IO server.

use std::{
    io::{self, Read, Write},
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use pocketio::{Connector, EngineError, UrlDescriptor};

#[derive(Debug, Default)]
struct Wire {
    inbound: Vec<u8>,
    position: usize,
    written: Vec<u8>,
    refuse_writes: bool,
}

/// Duplex stream replaying scripted server bytes and recording client writes.
///
/// Clones share the same buffers, so a test can keep one handle while the
/// engine owns another. Reads past the script return EOF.
#[derive(Clone, Debug, Default)]
pub struct ScriptedStream {
    wire: Arc<Mutex<Wire>>,
}

impl ScriptedStream {
    /// Stream that will serve `inbound` to the reader.
    #[must_use]
    pub fn new(inbound: impl Into<Vec<u8>>) -> Self {
        let stream = Self::default();
        stream.push_inbound(inbound.into());
        stream
    }

    fn wire(&self) -> MutexGuard<'_, Wire> { self.wire.lock().expect("scripted stream poisoned") }

    /// Append bytes to the server script.
    pub fn push_inbound(&self, bytes: impl AsRef<[u8]>) {
        self.wire().inbound.extend_from_slice(bytes.as_ref());
    }

    /// Everything the client has written so far.
    #[must_use]
    pub fn written(&self) -> Vec<u8> { self.wire().written.clone() }

    /// Make every subsequent write accept zero bytes.
    pub fn refuse_writes(&self) { self.wire().refuse_writes = true; }

    /// Scripted bytes the client has not read yet.
    #[must_use]
    pub fn unread(&self) -> usize {
        let wire = self.wire();
        wire.inbound.len() - wire.position
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut wire = self.wire();
        let start = wire.position;
        let len = buf.len().min(wire.inbound.len() - start);
        buf[..len].copy_from_slice(&wire.inbound[start..start + len]);
        wire.position += len;
        Ok(len)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut wire = self.wire();
        if wire.refuse_writes {
            return Ok(0);
        }
        wire.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

/// [`Connector`] handing out a shared [`ScriptedStream`].
#[derive(Clone, Debug, Default)]
pub struct ScriptedConnector {
    stream: ScriptedStream,
    attempts: Arc<AtomicUsize>,
    refusals: usize,
}

impl ScriptedConnector {
    /// Connector returning `stream` on every connect.
    #[must_use]
    pub fn new(stream: ScriptedStream) -> Self {
        Self {
            stream,
            ..Self::default()
        }
    }

    /// Connector failing every connect with `ECONNREFUSED`-like details.
    #[must_use]
    pub fn refusing() -> Self {
        Self {
            refusals: usize::MAX,
            ..Self::default()
        }
    }

    /// Connector refusing the first `refusals` connects, then handing out
    /// `stream`.
    #[must_use]
    pub fn refusing_first(refusals: usize, stream: ScriptedStream) -> Self {
        Self {
            stream,
            refusals,
            ..Self::default()
        }
    }

    /// Number of connect calls made so far.
    #[must_use]
    pub fn attempts(&self) -> usize { self.attempts.load(Ordering::SeqCst) }

    /// The shared stream.
    #[must_use]
    pub fn stream(&self) -> &ScriptedStream { &self.stream }
}

impl Connector for ScriptedConnector {
    type Stream = ScriptedStream;

    fn connect(&self, _url: &UrlDescriptor, _timeout: Duration) -> pocketio::Result<Self::Stream> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.refusals {
            return Err(EngineError::Socket {
                code: Some(111),
                message: "connection refused".to_owned(),
            });
        }
        Ok(self.stream.clone())
    }
}
