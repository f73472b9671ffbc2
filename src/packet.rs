//! Engine.IO packets and the Socket.IO packets carried inside them.
//!
//! An Engine.IO packet is a one-digit type code followed by an optional body.
//! A MESSAGE body is itself a Socket.IO packet: a one-digit type code, an
//! optional `/namespace,` prefix, an optional acknowledgement id, and JSON
//! data.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::{EngineError, Result};

/// Engine.IO packet types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnginePacketType {
    /// Sent by the server when a transport opens.
    Open,
    /// Request to close the transport.
    Close,
    /// Heartbeat probe.
    Ping,
    /// Heartbeat answer.
    Pong,
    /// Carries a Socket.IO packet.
    Message,
    /// Confirms the switch to a new transport.
    Upgrade,
    /// No operation.
    Noop,
}

impl EnginePacketType {
    /// Wire code, `0`..=`6`.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Close => 1,
            Self::Ping => 2,
            Self::Pong => 3,
            Self::Message => 4,
            Self::Upgrade => 5,
            Self::Noop => 6,
        }
    }
}

impl TryFrom<u8> for EnginePacketType {
    type Error = EngineError;

    fn try_from(code: u8) -> Result<Self> {
        Ok(match code {
            0 => Self::Open,
            1 => Self::Close,
            2 => Self::Ping,
            3 => Self::Pong,
            4 => Self::Message,
            5 => Self::Upgrade,
            6 => Self::Noop,
            other => return Err(EngineError::InvalidPacketType(other)),
        })
    }
}

impl fmt::Display for EnginePacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Message => "message",
            Self::Upgrade => "upgrade",
            Self::Noop => "noop",
        };
        f.write_str(name)
    }
}

/// Socket.IO packet types carried inside an Engine.IO MESSAGE.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SocketPacketType {
    /// Join a namespace.
    Connect,
    /// Leave a namespace.
    Disconnect,
    /// Named event with arguments.
    Event,
    /// Acknowledgement of an event.
    Ack,
    /// Error raised by the server, typically a refused namespace.
    Error,
    /// Event with binary attachments.
    BinaryEvent,
    /// Acknowledgement with binary attachments.
    BinaryAck,
}

impl SocketPacketType {
    /// Wire code, `0`..=`6`.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Connect => 0,
            Self::Disconnect => 1,
            Self::Event => 2,
            Self::Ack => 3,
            Self::Error => 4,
            Self::BinaryEvent => 5,
            Self::BinaryAck => 6,
        }
    }

    fn has_attachments(self) -> bool { matches!(self, Self::BinaryEvent | Self::BinaryAck) }
}

impl TryFrom<u8> for SocketPacketType {
    type Error = EngineError;

    fn try_from(code: u8) -> Result<Self> {
        Ok(match code {
            0 => Self::Connect,
            1 => Self::Disconnect,
            2 => Self::Event,
            3 => Self::Ack,
            4 => Self::Error,
            5 => Self::BinaryEvent,
            6 => Self::BinaryAck,
            other => return Err(EngineError::InvalidPacketType(other)),
        })
    }
}

/// One Engine.IO packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    kind: EnginePacketType,
    body: Option<String>,
}

impl Packet {
    /// Build a packet from its parts.
    #[must_use]
    pub fn new(kind: EnginePacketType, body: Option<String>) -> Self { Self { kind, body } }

    /// Packet type.
    #[must_use]
    pub fn kind(&self) -> EnginePacketType { self.kind }

    /// Packet body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> { self.body.as_deref() }

    /// Text form: the type digit followed by the body.
    ///
    /// # Examples
    ///
    /// ```
    /// use pocketio::packet::{EnginePacketType, Packet};
    ///
    /// let packet = Packet::new(EnginePacketType::Message, Some("2[\"ping\"]".into()));
    /// assert_eq!(packet.encode(), "42[\"ping\"]");
    /// ```
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = self.kind.code().to_string();
        if let Some(body) = &self.body {
            out.push_str(body);
        }
        out
    }

    /// Parse the text payload of a frame.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ProtocolViolation`] for an empty payload or a
    /// non-digit type, and [`EngineError::InvalidPacketType`] for an unknown
    /// digit.
    pub fn parse(text: &str) -> Result<Self> {
        let (code, rest) = split_type_digit(text)?;
        let kind = EnginePacketType::try_from(code)?;
        let body = (!rest.is_empty()).then(|| rest.to_owned());
        Ok(Self { kind, body })
    }

    /// Decode the Socket.IO packet carried by a MESSAGE.
    ///
    /// Returns `Ok(None)` for every other packet type.
    ///
    /// # Errors
    ///
    /// See [`SocketPacket::parse`].
    pub fn socket_packet(&self) -> Result<Option<SocketPacket>> {
        match (self.kind, self.body.as_deref()) {
            (EnginePacketType::Message, Some(body)) => SocketPacket::parse(body).map(Some),
            _ => Ok(None),
        }
    }
}

/// A decoded Socket.IO packet.
#[derive(Clone, Debug, PartialEq)]
pub struct SocketPacket {
    kind: SocketPacketType,
    namespace: String,
    ack_id: Option<u64>,
    data: Option<Value>,
}

impl SocketPacket {
    /// Parse a MESSAGE body.
    ///
    /// The attachment count of binary packets is skipped; attachments
    /// themselves are not reassembled.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPacketType`] or
    /// [`EngineError::ProtocolViolation`] for a bad type digit and
    /// [`EngineError::Json`] when the data is not valid JSON.
    pub fn parse(body: &str) -> Result<Self> {
        let (code, mut rest) = split_type_digit(body)?;
        let kind = SocketPacketType::try_from(code)?;

        if kind.has_attachments() {
            if let Some((count, tail)) = rest.split_once('-') {
                if !count.is_empty() && count.bytes().all(|b| b.is_ascii_digit()) {
                    rest = tail;
                }
            }
        }

        let mut namespace = String::new();
        if rest.starts_with('/') {
            let (ns, tail) = rest.split_once(',').unwrap_or((rest, ""));
            namespace = ns.to_owned();
            rest = tail;
        }

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let id = rest[..digits].parse().ok();
            rest = &rest[digits..];
            id
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest)?)
        };

        Ok(Self {
            kind,
            namespace,
            ack_id,
            data,
        })
    }

    /// Packet type.
    #[must_use]
    pub fn kind(&self) -> SocketPacketType { self.kind }

    /// Namespace, empty for the root namespace.
    #[must_use]
    pub fn namespace(&self) -> &str { &self.namespace }

    /// Acknowledgement id requested by the sender.
    #[must_use]
    pub fn ack_id(&self) -> Option<u64> { self.ack_id }

    /// JSON data following the header.
    #[must_use]
    pub fn data(&self) -> Option<&Value> { self.data.as_ref() }

    /// Event name of an EVENT packet.
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        match self.kind {
            SocketPacketType::Event | SocketPacketType::BinaryEvent => {
                self.data.as_ref()?.get(0)?.as_str()
            }
            _ => None,
        }
    }

    /// Arguments following the event name.
    #[must_use]
    pub fn event_args(&self) -> &[Value] {
        match (&self.data, self.event_name()) {
            (Some(Value::Array(items)), Some(_)) => &items[1..],
            _ => &[],
        }
    }
}

fn split_type_digit(text: &str) -> Result<(u8, &str)> {
    let Some(first) = text.bytes().next() else {
        return Err(EngineError::ProtocolViolation("empty packet".to_owned()));
    };
    if !first.is_ascii_digit() {
        return Err(EngineError::ProtocolViolation(format!(
            "packet type must be a digit, had {:?}",
            char::from(first)
        )));
    }
    Ok((first - b'0', &text[1..]))
}

fn namespace_prefix(namespace: &str) -> String {
    if namespace.is_empty() {
        String::new()
    } else {
        format!("{namespace},")
    }
}

/// Body of a MESSAGE emitting `event` with `args` on `namespace`.
///
/// # Errors
///
/// Returns [`EngineError::Json`] if `args` cannot be serialised.
///
/// # Examples
///
/// ```
/// use pocketio::packet::event_body;
///
/// let body = event_body("", "broadcast", &serde_json::json!({"foo": "bar"})).expect("serialise");
/// assert_eq!(body, r#"2["broadcast",{"foo":"bar"}]"#);
///
/// let body = event_body("/chat", "hello", &()).expect("serialise");
/// assert_eq!(body, r#"2/chat,["hello",null]"#);
/// ```
pub fn event_body<T>(namespace: &str, event: &str, args: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(&(event, args))?;
    Ok(format!(
        "{}{}{json}",
        SocketPacketType::Event.code(),
        namespace_prefix(namespace)
    ))
}

/// Body of a MESSAGE joining `namespace`.
#[must_use]
pub fn connect_body(namespace: &str) -> String {
    format!("{}{namespace}", SocketPacketType::Connect.code())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case::open(0, EnginePacketType::Open)]
    #[case::close(1, EnginePacketType::Close)]
    #[case::ping(2, EnginePacketType::Ping)]
    #[case::pong(3, EnginePacketType::Pong)]
    #[case::message(4, EnginePacketType::Message)]
    #[case::upgrade(5, EnginePacketType::Upgrade)]
    #[case::noop(6, EnginePacketType::Noop)]
    fn engine_codes_match_protocol(#[case] code: u8, #[case] kind: EnginePacketType) {
        assert_eq!(kind.code(), code);
        assert_eq!(EnginePacketType::try_from(code).expect("known code"), kind);
    }

    #[test]
    fn out_of_range_engine_code_is_rejected() {
        let err = EnginePacketType::try_from(7).expect_err("7 is not a packet type");
        assert!(matches!(err, EngineError::InvalidPacketType(7)));
    }

    #[test]
    fn emits_root_namespace_event() {
        let body = event_body("", "broadcast", &json!({"foo": "bar"})).expect("serialise");
        let packet = Packet::new(EnginePacketType::Message, Some(body));
        assert_eq!(packet.encode(), r#"42["broadcast",{"foo":"bar"}]"#);
    }

    #[test]
    fn namespaced_event_carries_comma_terminated_prefix() {
        let body = event_body("/namespace", "broadcast", &json!({"foo": "bar"})).expect("serialise");
        assert_eq!(body, r#"2/namespace,["broadcast",{"foo":"bar"}]"#);
    }

    #[test]
    fn connect_body_has_no_trailing_comma() {
        assert_eq!(connect_body("/namespace"), "0/namespace");
        assert_eq!(connect_body(""), "0");
    }

    #[rstest]
    #[case::bare_ping("2", EnginePacketType::Ping, None)]
    #[case::probe("3probe", EnginePacketType::Pong, Some("probe"))]
    #[case::message("40", EnginePacketType::Message, Some("0"))]
    fn parses_engine_packets(
        #[case] text: &str,
        #[case] kind: EnginePacketType,
        #[case] body: Option<&str>,
    ) {
        let packet = Packet::parse(text).expect("parse");
        assert_eq!(packet.kind(), kind);
        assert_eq!(packet.body(), body);
    }

    #[rstest]
    #[case::empty("")]
    #[case::letter("x1")]
    fn rejects_malformed_engine_packets(#[case] text: &str) {
        assert!(matches!(
            Packet::parse(text),
            Err(EngineError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn parses_namespaced_event_with_ack_id() {
        let packet = SocketPacket::parse(r#"2/chat,17["message",{"text":"hi"},3]"#).expect("parse");
        assert_eq!(packet.kind(), SocketPacketType::Event);
        assert_eq!(packet.namespace(), "/chat");
        assert_eq!(packet.ack_id(), Some(17));
        assert_eq!(packet.event_name(), Some("message"));
        assert_eq!(packet.event_args(), &[json!({"text": "hi"}), json!(3)]);
    }

    #[test]
    fn parses_namespace_connect_without_data() {
        let packet = SocketPacket::parse("0/admin,").expect("parse");
        assert_eq!(packet.kind(), SocketPacketType::Connect);
        assert_eq!(packet.namespace(), "/admin");
        assert!(packet.data().is_none());
    }

    #[test]
    fn skips_binary_attachment_count() {
        let packet = SocketPacket::parse(r#"51-["file",{"_placeholder":true,"num":0}]"#).expect("parse");
        assert_eq!(packet.kind(), SocketPacketType::BinaryEvent);
        assert_eq!(packet.event_name(), Some("file"));
    }

    #[test]
    fn message_packets_expose_socket_packets() {
        let packet = Packet::parse(r#"42["news",{"hello":"world"}]"#).expect("parse");
        let inner = packet.socket_packet().expect("parse inner").expect("message");
        assert_eq!(inner.event_name(), Some("news"));

        let ping = Packet::parse("2").expect("parse");
        assert!(ping.socket_packet().expect("not a message").is_none());
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = SocketPacket::parse("2[\"broken").expect_err("bad json");
        assert!(matches!(err, EngineError::Json(_)));
    }
}
