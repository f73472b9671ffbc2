//! Server-side wire fixtures: handshake bodies, upgrade responses, frames.

use bytes::BytesMut;
use pocketio::frame::{Opcode, WebSocketCodec, encode_frame};
use tokio_util::codec::Decoder;

/// Successful upgrade response without an accept header.
pub const UPGRADE_RESPONSE: &str = "HTTP/1.1 101 Switching Protocols\r\n\
                                    Upgrade: websocket\r\n\
                                    Connection: Upgrade\r\n\
                                    \r\n";

/// Handshake body as a long-polling server sends it, with the JSON object
/// wrapped in payload framing.
#[must_use]
pub fn handshake_body(sid: &str, ping_interval_ms: u64, ping_timeout_ms: u64, upgrades: &[&str]) -> String {
    let json = serde_json::json!({
        "sid": sid,
        "upgrades": upgrades,
        "pingInterval": ping_interval_ms,
        "pingTimeout": ping_timeout_ms,
    })
    .to_string();
    format!("{}:0{json}2:40", json.len() + 1)
}

/// Unmasked text frame as a server writes it.
#[must_use]
pub fn server_text_frame(text: &str) -> Vec<u8> { encode_frame(text.as_bytes(), Opcode::Text, false).to_vec() }

/// Unmasked close frame.
#[must_use]
pub fn server_close_frame() -> Vec<u8> { encode_frame(&[], Opcode::Close, false).to_vec() }

/// Upgrade response followed by `frames` as server text frames.
#[must_use]
pub fn upgrade_then(frames: &[&str]) -> Vec<u8> {
    let mut script = UPGRADE_RESPONSE.as_bytes().to_vec();
    for frame in frames {
        script.extend_from_slice(&server_text_frame(frame));
    }
    script
}

/// Split client output into the HTTP upgrade request and the text payloads
/// of the frames that followed it.
///
/// # Panics
///
/// Panics if the output holds no complete HTTP request or a frame is
/// malformed.
#[must_use]
pub fn client_output(written: &[u8]) -> (String, Vec<String>) {
    let text = String::from_utf8_lossy(written);
    let end = text
        .find("\r\n\r\n")
        .expect("client wrote an HTTP upgrade request")
        + 4;
    let request = text[..end].to_owned();

    let mut buf = BytesMut::from(&written[end..]);
    let mut codec = WebSocketCodec::default();
    let mut frames = Vec::new();
    while let Some(frame) = codec.decode(&mut buf).expect("client frame decodes") {
        assert!(frame.mask_key().is_some(), "client frames must be masked");
        frames.push(String::from_utf8(frame.payload().to_vec()).expect("UTF-8 payload"));
    }
    assert!(buf.is_empty(), "trailing partial frame in client output");
    (request, frames)
}
