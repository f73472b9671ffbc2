//! Engine capability interface and its Socket.IO implementation.
//!
//! An [`Engine`] exposes the operations a caller drives a connection with.
//! Variants implement what they support; the provided methods reject every
//! other operation with [`EngineError::UnsupportedAction`].

use serde_json::Value;

use crate::{
    error::{EngineError, Result},
    packet::EnginePacketType,
};

mod builder;
mod socketio;

pub use builder::SocketIoBuilder;
pub use socketio::SocketIo;

/// Operations shared by every engine variant.
pub trait Engine {
    /// Human-readable engine name.
    fn name(&self) -> String;

    /// Establish the connection. Calling this on a connected engine is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedAction`] unless overridden.
    fn connect(&mut self) -> Result<()> { Err(unsupported(self, "connect")) }

    /// Close the connection. Closing a disconnected engine is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedAction`] unless overridden.
    fn close(&mut self) -> Result<()> { Err(unsupported(self, "close")) }

    /// Block until one frame arrives and return its payload.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedAction`] unless overridden.
    fn read(&mut self) -> Result<String> { Err(unsupported(self, "read")) }

    /// Write one Engine.IO packet, returning the bytes put on the wire.
    ///
    /// # Errors
    ///
    /// Implementations fail when the packet cannot be delivered.
    fn write(&mut self, kind: EnginePacketType, message: Option<&str>) -> Result<usize>;

    /// Emit `event` with `args` on the active namespace.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedAction`] unless overridden.
    fn emit(&mut self, event: &str, args: &Value) -> Result<()> {
        let _ = (event, args);
        Err(unsupported(self, "emit"))
    }

    /// Switch the active namespace.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedAction`] unless overridden.
    fn of(&mut self, namespace: &str) -> Result<()> {
        let _ = namespace;
        Err(unsupported(self, "of"))
    }

    /// Send a heartbeat if one is due.
    ///
    /// # Errors
    ///
    /// Implementations fail when the heartbeat cannot be written.
    fn keep_alive(&mut self) -> Result<()> { Ok(()) }
}

fn unsupported<E: Engine + ?Sized>(engine: &E, action: &'static str) -> EngineError {
    EngineError::UnsupportedAction {
        engine: engine.name(),
        action,
    }
}
