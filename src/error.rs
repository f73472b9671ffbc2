//! Error taxonomy for Engine.IO client operations.
//!
//! Every failure is surfaced to the caller as a distinct [`EngineError`]
//! variant. Nothing in this crate retries on its own.

use std::io;

/// Errors emitted by engines, codecs, and the [`crate::Client`] façade.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The connection URL could not be parsed.
    #[error("malformed url: {url}")]
    MalformedUrl {
        /// The rejected input.
        url: String,
    },

    /// The handshake HTTP request could not be completed.
    #[error("an error occurred while trying to establish a connection to the server{}", fmt_detail(.message.as_deref()))]
    ServerConnectionFailure {
        /// Message reported by the HTTP layer, when one is available.
        message: Option<String>,
    },

    /// The server does not offer the requested transport upgrade.
    #[error("transport \"{0}\" is not supported by the server")]
    UnsupportedTransport(String),

    /// The handshake response body did not contain a usable JSON object.
    #[error("malformed handshake response: {0}")]
    MalformedHandshake(String),

    /// Opening the raw socket failed.
    #[error("there was an error while attempting to open a connection to the socket (err #{}: {message})", .code.unwrap_or(0))]
    Socket {
        /// OS error number, when the failure came from the OS.
        code: Option<i32>,
        /// Human-readable description.
        message: String,
    },

    /// The engine does not implement the requested operation.
    #[error("the action \"{action}\" is not supported by the engine \"{engine}\"")]
    UnsupportedAction {
        /// Name of the engine that rejected the call.
        engine: String,
        /// The operation that was attempted.
        action: &'static str,
    },

    /// The peer broke the WebSocket or Engine.IO protocol.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A 64-bit extended payload length does not fit in this host's `usize`.
    #[error("64 bits unsigned integers are not supported on this architecture")]
    ArchitectureLimitation,

    /// Zero bytes were written to the socket.
    #[error("message was not delivered")]
    WriteFailure,

    /// An inbound frame announced a payload larger than the configured limit.
    #[error("frame payload exceeds max length: {size} > {max}")]
    FrameTooLarge {
        /// Announced payload size.
        size: u64,
        /// Configured maximum.
        max: usize,
    },

    /// An Engine.IO or Socket.IO packet type code outside the known range.
    #[error("wrong message type {0} when trying to write on the socket")]
    InvalidPacketType(u8),

    /// A caller-supplied header line is not of the form `Name: value`.
    #[error("invalid header line: {0}")]
    InvalidHeader(String),

    /// The operation requires an established connection.
    #[error("engine is not connected")]
    NotConnected,

    /// An event payload could not be serialised or parsed as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level I/O failure.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

fn fmt_detail(message: Option<&str>) -> String {
    message.map(|m| format!(": {m}")).unwrap_or_default()
}

impl EngineError {
    /// Build a [`EngineError::Socket`] from an OS-level connect failure.
    #[must_use]
    pub fn socket(error: &io::Error) -> Self {
        Self::Socket {
            code: error.raw_os_error(),
            message: error.to_string(),
        }
    }

    /// Returns true when the error was raised by the peer's behaviour rather
    /// than by local configuration or I/O.
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::ProtocolViolation(_)
                | Self::FrameTooLarge { .. }
                | Self::UnsupportedTransport(_)
                | Self::MalformedHandshake(_)
        )
    }
}

/// Canonical result alias used by `pocketio` public APIs.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use std::io;

    use rstest::rstest;

    use super::EngineError;

    #[rstest]
    #[case::with_message(
        EngineError::ServerConnectionFailure { message: Some("connection refused".into()) },
        "an error occurred while trying to establish a connection to the server: connection refused"
    )]
    #[case::without_message(
        EngineError::ServerConnectionFailure { message: None },
        "an error occurred while trying to establish a connection to the server"
    )]
    #[case::transport(
        EngineError::UnsupportedTransport("websocket".into()),
        "transport \"websocket\" is not supported by the server"
    )]
    #[case::action(
        EngineError::UnsupportedAction { engine: "Null".into(), action: "emit" },
        "the action \"emit\" is not supported by the engine \"Null\""
    )]
    fn error_messages(#[case] error: EngineError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn socket_error_carries_os_code() {
        let error = EngineError::socket(&io::Error::from_raw_os_error(111));
        match error {
            EngineError::Socket { code, .. } => assert_eq!(code, Some(111)),
            other => panic!("expected socket error, got {other:?}"),
        }
    }

    #[test]
    fn protocol_errors_are_classified() {
        assert!(EngineError::ProtocolViolation("bad".into()).is_protocol_error());
        assert!(!EngineError::WriteFailure.is_protocol_error());
    }
}
