//! Switching a negotiated session from long-polling to WebSocket.
//!
//! The upgrade is a hand-written HTTP/1.1 request on the raw socket. Once
//! the server answers `101`, the engine confirms with an Engine.IO UPGRADE
//! packet and the stream carries WebSocket frames from then on.

use std::io::{BufRead, Read, Write};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use sha1::{Digest, Sha1};
use url::form_urlencoded;

use crate::{
    error::{EngineError, Result},
    handshake::WEBSOCKET_TRANSPORT,
    options::EngineOptions,
    packet::EnginePacketType,
    session::Session,
    transport::Connection,
    url::UrlDescriptor,
};

/// RFC 6455 GUID appended to the key when computing the accept value.
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Status line prefix of a successful upgrade.
pub const SWITCHING_PROTOCOLS: &[u8; 12] = b"HTTP/1.1 101";

const DEFAULT_ORIGIN: &str = "*";

/// Generate a `Sec-WebSocket-Key`.
///
/// The key is the base64 SHA-1 digest of random bytes: all 20 digest bytes
/// for protocol version 2, the first 16 otherwise.
#[must_use]
pub fn generate_key(version: u8) -> String {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    let digest = Sha1::digest(seed);
    let len = if version == 2 { digest.len() } else { 16 };
    STANDARD.encode(&digest[..len])
}

/// `Sec-WebSocket-Accept` value a compliant server derives from `key`.
///
/// # Examples
///
/// ```
/// use pocketio::upgrade::expected_accept;
///
/// assert_eq!(
///     expected_accept("dGhlIHNhbXBsZSBub25jZQ=="),
///     "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
/// );
/// ```
#[must_use]
pub fn expected_accept(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Render the HTTP upgrade request.
#[must_use]
pub fn build_upgrade_request(
    url: &UrlDescriptor,
    session_id: &str,
    options: &EngineOptions,
    key: &str,
    cookies: &[String],
) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("sid", session_id)
        .append_pair("EIO", &options.version_value().to_string())
        .append_pair("transport", WEBSOCKET_TRANSPORT);
    if options.version_value() == 2 {
        query.append_pair("use_b64", if options.use_b64_value() { "1" } else { "0" });
    }

    let origin = options.origin().unwrap_or(DEFAULT_ORIGIN);
    let mut request = format!(
        "GET /{}/?{} HTTP/1.1\r\n\
         Host: {}\r\n\
         Upgrade: WebSocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Origin: {origin}\r\n",
        url.path(),
        query.finish(),
        url.authority(),
    );
    if !cookies.is_empty() {
        request.push_str("Cookie: ");
        request.push_str(&cookies.join("; "));
        request.push_str("\r\n");
    }
    request.push_str("\r\n");
    request
}

/// Consume the server's answer to an upgrade request.
///
/// Exactly twelve bytes are read and compared with `HTTP/1.1 101`; header
/// lines are then discarded up to the blank line. A `Sec-WebSocket-Accept`
/// header is checked against `key` when `verify_accept` is set.
///
/// # Errors
///
/// Returns [`EngineError::ProtocolViolation`] for any other status, a
/// mismatched accept value, or a stream that ends inside the headers.
pub fn read_upgrade_response<R: BufRead>(reader: &mut R, key: &str, verify_accept: bool) -> Result<()> {
    let mut status = [0u8; SWITCHING_PROTOCOLS.len()];
    reader.read_exact(&mut status)?;
    if &status != SWITCHING_PROTOCOLS {
        return Err(EngineError::ProtocolViolation(format!(
            "the server returned an unexpected value: expected \"HTTP/1.1 101\", had {:?}",
            String::from_utf8_lossy(&status)
        )));
    }

    let expected = expected_accept(key);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Err(EngineError::ProtocolViolation(
                "connection closed during upgrade".to_owned(),
            ));
        }
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            return Ok(());
        }
        let Some(colon) = trimmed.iter().position(|&b| b == b':') else {
            continue;
        };
        let (name, value) = (trimmed[..colon].trim_ascii(), trimmed[colon + 1..].trim_ascii());
        if verify_accept
            && name.eq_ignore_ascii_case(b"sec-websocket-accept")
            && value != expected.as_bytes()
        {
            return Err(EngineError::ProtocolViolation(format!(
                "invalid Sec-WebSocket-Accept: expected {expected}, got {}",
                String::from_utf8_lossy(value)
            )));
        }
    }
}

/// Upgrade `connection` to WebSocket for `session`.
///
/// After the `101` answer an UPGRADE packet is written. Protocol version 2
/// servers immediately push a namespace CONNECT; when bytes for it are
/// already buffered, one frame is read and discarded.
///
/// # Errors
///
/// See [`read_upgrade_response`] and [`Connection::send_text`].
pub fn upgrade<S: Read + Write>(
    connection: &mut Connection<S>,
    url: &UrlDescriptor,
    session: &Session,
    cookies: &[String],
    options: &EngineOptions,
) -> Result<()> {
    let key = generate_key(options.version_value());
    let request = build_upgrade_request(url, session.id(), options, &key, cookies);
    tracing::debug!(sid = session.id(), "requesting websocket upgrade");

    connection.write_raw(request.as_bytes())?;
    read_upgrade_response(connection.reader_mut(), &key, options.verify_accept_key_value())?;
    connection.send_text(&EnginePacketType::Upgrade.code().to_string())?;

    if options.version_value() == 2 && connection.has_buffered_data() {
        let stray = connection.read_frame()?;
        tracing::trace!(len = stray.payload().len(), "discarded post-upgrade frame");
    }
    tracing::info!(sid = session.id(), "transport upgraded to websocket");
    Ok(())
}
