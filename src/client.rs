//! Caller-facing wrapper around an [`Engine`].
//!
//! [`Client`] tracks whether it initialised the engine and closes it when
//! dropped, so a connection never outlives the value that opened it.

use serde::Serialize;
use tracing::warn;

use crate::{engine::Engine, error::Result};

/// Chaining façade over an engine.
///
/// # Examples
///
/// ```no_run
/// use pocketio::{Client, EngineOptions, SocketIo};
/// use serde_json::json;
///
/// # fn main() -> pocketio::Result<()> {
/// let engine = SocketIo::new("http://localhost:1337", EngineOptions::default())?;
/// let mut client = Client::new(engine);
/// client
///     .initialize()?
///     .of("/chat")?
///     .emit("message", &json!({"text": "hello"}))?;
/// client.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client<E: Engine> {
    engine: E,
    connected: bool,
}

impl<E: Engine> Client<E> {
    /// Wrap `engine` without connecting.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            connected: false,
        }
    }

    /// Connect the engine.
    ///
    /// # Errors
    ///
    /// Propagates [`Engine::connect`] failures.
    pub fn initialize(&mut self) -> Result<&mut Self> {
        self.engine.connect()?;
        self.connected = true;
        Ok(self)
    }

    /// Read one frame payload.
    ///
    /// # Errors
    ///
    /// Propagates [`Engine::read`] failures.
    pub fn read(&mut self) -> Result<String> { self.engine.read() }

    /// Emit `event` with `args` on the active namespace.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::Json`] if `args` cannot be converted to
    /// JSON and propagates [`Engine::emit`] failures.
    pub fn emit<T>(&mut self, event: &str, args: &T) -> Result<&mut Self>
    where
        T: Serialize + ?Sized,
    {
        let args = serde_json::to_value(args)?;
        self.engine.emit(event, &args)?;
        Ok(self)
    }

    /// Switch to `namespace`.
    ///
    /// # Errors
    ///
    /// Propagates [`Engine::of`] failures.
    pub fn of(&mut self, namespace: &str) -> Result<&mut Self> {
        self.engine.of(namespace)?;
        Ok(self)
    }

    /// Close the engine.
    ///
    /// # Errors
    ///
    /// Propagates [`Engine::close`] failures; the client counts as
    /// disconnected either way.
    pub fn close(&mut self) -> Result<&mut Self> {
        self.connected = false;
        self.engine.close()?;
        Ok(self)
    }

    /// Whether [`Client::initialize`] succeeded and no close followed.
    #[must_use]
    pub fn is_connected(&self) -> bool { self.connected }

    /// Borrow the engine.
    #[must_use]
    pub fn engine(&self) -> &E { &self.engine }

    /// Mutably borrow the engine.
    pub fn engine_mut(&mut self) -> &mut E { &mut self.engine }
}

impl<E: Engine> Drop for Client<E> {
    fn drop(&mut self) {
        if !self.connected {
            return;
        }
        if let Err(error) = self.engine.close() {
            warn!(%error, engine = %self.engine.name(), "failed to close engine on drop");
        }
    }
}
