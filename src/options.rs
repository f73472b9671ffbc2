//! Engine configuration.
//!
//! [`EngineOptions`] can be assembled with its builder-style setters or
//! deserialised from JSON; every field has a default.

use std::time::Duration;

use serde::Deserialize;

use crate::{
    error::{EngineError, Result},
    frame::DEFAULT_MAX_PAYLOAD_LENGTH,
};

/// Transport requested for the initial handshake.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// HTTP long-polling, later upgraded to WebSocket.
    #[default]
    Polling,
}

impl Transport {
    /// Query-string value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Polling => "polling",
        }
    }
}

/// Options shared by the handshake, the upgrade and the framed connection.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use pocketio::EngineOptions;
///
/// let options = EngineOptions::default()
///     .version(4)
///     .wait(Duration::from_millis(10))
///     .header("Authorization: Bearer token");
/// assert_eq!(options.version_value(), 4);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineOptions {
    version: u8,
    use_b64: bool,
    transport: Transport,
    #[serde(with = "millis")]
    wait: Duration,
    #[serde(with = "millis")]
    timeout: Duration,
    headers: Vec<String>,
    max_payload_length: usize,
    verify_accept_key: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            version: 3,
            use_b64: false,
            transport: Transport::Polling,
            wait: Duration::ZERO,
            timeout: Duration::from_secs(60),
            headers: Vec::new(),
            max_payload_length: DEFAULT_MAX_PAYLOAD_LENGTH,
            verify_accept_key: true,
        }
    }
}

impl EngineOptions {
    /// Parse options from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Json`] for invalid JSON or unknown fields.
    pub fn from_json(json: &str) -> Result<Self> { Ok(serde_json::from_str(json)?) }

    /// Engine.IO protocol version sent as `EIO`.
    #[must_use]
    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Ask the server for base64-encoded binary payloads.
    #[must_use]
    pub fn use_b64(mut self, enabled: bool) -> Self {
        self.use_b64 = enabled;
        self
    }

    /// Transport for the initial handshake.
    #[must_use]
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Pause after every write.
    #[must_use]
    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// I/O timeout for the handshake request and the socket.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a `Name: value` header to the handshake request.
    #[must_use]
    pub fn header(mut self, line: impl Into<String>) -> Self {
        self.headers.push(line.into());
        self
    }

    /// Reject inbound payloads larger than `len` bytes.
    #[must_use]
    pub fn max_payload_length(mut self, len: usize) -> Self {
        self.max_payload_length = len;
        self
    }

    /// Check `Sec-WebSocket-Accept` when the server sends one.
    #[must_use]
    pub fn verify_accept_key(mut self, enabled: bool) -> Self {
        self.verify_accept_key = enabled;
        self
    }

    /// Configured protocol version.
    #[must_use]
    pub fn version_value(&self) -> u8 { self.version }

    /// Whether base64 payloads are requested.
    #[must_use]
    pub fn use_b64_value(&self) -> bool { self.use_b64 }

    /// Configured handshake transport.
    #[must_use]
    pub fn transport_value(&self) -> Transport { self.transport }

    /// Post-write pause.
    #[must_use]
    pub fn wait_value(&self) -> Duration { self.wait }

    /// I/O timeout.
    #[must_use]
    pub fn timeout_value(&self) -> Duration { self.timeout }

    /// Raw header lines.
    #[must_use]
    pub fn headers(&self) -> &[String] { &self.headers }

    /// Inbound payload ceiling.
    #[must_use]
    pub fn max_payload_length_value(&self) -> usize { self.max_payload_length }

    /// Whether the accept key is checked.
    #[must_use]
    pub fn verify_accept_key_value(&self) -> bool { self.verify_accept_key }

    /// Header lines split into trimmed name/value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidHeader`] for a line without a colon or
    /// with an empty name.
    pub fn parsed_headers(&self) -> Result<Vec<(&str, &str)>> {
        self.headers
            .iter()
            .map(|line| match line.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
                _ => Err(EngineError::InvalidHeader(line.clone())),
            })
            .collect()
    }

    /// Value of the caller-supplied `Origin` header, if any.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            let value = value.trim();
            (name.trim().eq_ignore_ascii_case("origin") && !value.is_empty()).then_some(value)
        })
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
