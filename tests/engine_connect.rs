//! Connection establishment: handshake, upgrade and their failure modes.

use pocketio::{Engine, EngineError, EngineOptions, SocketIo};
use pocketio_testing::{
    ManualClock,
    ScriptedConnector,
    ScriptedHandshake,
    ScriptedStream,
    client_output,
    handshake_body,
    upgrade_then,
};
use rstest::rstest;

type TestEngine = SocketIo<ScriptedConnector, ScriptedHandshake, ManualClock>;

fn engine(
    handshake: &ScriptedHandshake,
    connector: &ScriptedConnector,
    options: EngineOptions,
) -> TestEngine {
    SocketIo::builder()
        .options(options)
        .connector(connector.clone())
        .handshake(handshake.clone())
        .clock(ManualClock::new())
        .build("http://localhost:1337")
        .expect("valid url")
}

#[test]
fn handshake_then_upgrade_on_the_same_stream() {
    let handshake = ScriptedHandshake::accepting("abc123", 25_000, 60_000)
        .with_cookie("io=abc123; Path=/; HttpOnly");
    let connector = ScriptedConnector::new(ScriptedStream::new(upgrade_then(&[])));
    let options = EngineOptions::default()
        .header("Origin: https://app.test")
        .header("X-Token: t");
    let mut engine = engine(&handshake, &connector, options);

    engine.connect().expect("connect");

    assert!(engine.is_connected());
    assert_eq!(engine.session().map(|s| s.id()), Some("abc123"));
    assert_eq!(engine.cookies(), ["io=abc123"]);

    let requests = handshake.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].url,
        "http://localhost:1337/socket.io/?use_b64=0&EIO=3&transport=polling"
    );
    assert!(requests[0]
        .headers
        .contains(&("X-Token".to_owned(), "t".to_owned())));

    let (request, frames) = client_output(&connector.stream().written());
    assert!(request.starts_with("GET /socket.io/?sid=abc123&EIO=3&transport=websocket HTTP/1.1\r\n"));
    assert!(request.contains("Host: localhost:1337\r\n"));
    assert!(request.contains("Upgrade: WebSocket\r\n"));
    assert!(request.contains("Sec-WebSocket-Version: 13\r\n"));
    assert!(request.contains("Origin: https://app.test\r\n"));
    assert!(request.contains("Cookie: io=abc123\r\n"));
    assert_eq!(frames, ["5"]);
}

#[test]
fn connecting_twice_is_a_no_op() {
    let handshake = ScriptedHandshake::accepting("abc", 25_000, 60_000);
    let connector = ScriptedConnector::new(ScriptedStream::new(upgrade_then(&[])));
    let mut engine = engine(&handshake, &connector, EngineOptions::default());

    engine.connect().expect("first connect");
    engine.connect().expect("second connect");

    assert_eq!(handshake.requests().len(), 1);
    assert_eq!(connector.attempts(), 1);
}

#[test]
fn missing_websocket_upgrade_fails_before_opening_a_socket() {
    let handshake = ScriptedHandshake::with_body(handshake_body("x", 25_000, 5_000, &["polling"]));
    let connector = ScriptedConnector::new(ScriptedStream::default());
    let mut engine = engine(&handshake, &connector, EngineOptions::default());

    let err = engine.connect().expect_err("websocket not offered");

    assert!(matches!(err, EngineError::UnsupportedTransport(ref t) if t == "websocket"));
    assert_eq!(connector.attempts(), 0);
    assert!(engine.session().is_none());
    assert!(!engine.is_connected());
}

#[test]
fn handshake_transfer_failure_carries_the_message() {
    let handshake = ScriptedHandshake::failing("connection refused");
    let connector = ScriptedConnector::new(ScriptedStream::default());
    let mut engine = engine(&handshake, &connector, EngineOptions::default());

    let err = engine.connect().expect_err("server unreachable");

    assert!(matches!(
        err,
        EngineError::ServerConnectionFailure { message: Some(ref m) } if m == "connection refused"
    ));
    assert_eq!(connector.attempts(), 0);
}

#[test]
fn socket_failure_is_reported_with_its_code() {
    let handshake = ScriptedHandshake::accepting("abc", 25_000, 60_000);
    let mut engine = engine(&handshake, &ScriptedConnector::refusing(), EngineOptions::default());

    let err = engine.connect().expect_err("socket refused");

    assert!(matches!(err, EngineError::Socket { code: Some(111), .. }));
    assert!(!engine.is_connected());
    assert_eq!(engine.session().map(|s| s.id()), Some("abc"));
}

#[test]
fn retry_after_socket_failure_reuses_the_session() {
    let handshake = ScriptedHandshake::accepting("abc", 25_000, 60_000)
        .with_cookie("io=abc; Path=/");
    let connector = ScriptedConnector::refusing_first(1, ScriptedStream::new(upgrade_then(&[])));
    let mut engine = engine(&handshake, &connector, EngineOptions::default());

    engine.connect().expect_err("first attempt refused");
    engine.connect().expect("second attempt upgrades");

    assert!(engine.is_connected());
    assert_eq!(handshake.requests().len(), 1);
    assert_eq!(connector.attempts(), 2);
    let (request, _) = client_output(&connector.stream().written());
    assert!(request.starts_with("GET /socket.io/?sid=abc&EIO=3&transport=websocket HTTP/1.1\r\n"));
    assert!(request.contains("Cookie: io=abc\r\n"));
}

#[rstest]
#[case::bad_request("HTTP/1.1 400 Bad Request\r\n\r\n")]
#[case::redirect("HTTP/1.1 302 Found\r\nLocation: /\r\n\r\n")]
fn non_101_upgrade_response_is_a_protocol_violation(#[case] response: &str) {
    let handshake = ScriptedHandshake::accepting("abc", 25_000, 60_000);
    let connector = ScriptedConnector::new(ScriptedStream::new(response));
    let mut engine = engine(&handshake, &connector, EngineOptions::default());

    let err = engine.connect().expect_err("upgrade refused");

    assert!(matches!(err, EngineError::ProtocolViolation(ref m) if m.contains("HTTP/1.1 101")));
    assert!(!engine.is_connected());
}

#[rstest]
#[case::verified(true, false)]
#[case::unverified(false, true)]
fn accept_key_mismatch_depends_on_verification(#[case] verify: bool, #[case] connects: bool) {
    let handshake = ScriptedHandshake::accepting("abc", 25_000, 60_000);
    let connector = ScriptedConnector::new(ScriptedStream::new(
        "HTTP/1.1 101 Switching Protocols\r\nSec-WebSocket-Accept: bogus\r\n\r\n",
    ));
    let options = EngineOptions::default().verify_accept_key(verify);
    let mut engine = engine(&handshake, &connector, options);

    assert_eq!(engine.connect().is_ok(), connects);
}

#[test]
fn version_2_discards_the_eager_connect_packet() {
    let handshake = ScriptedHandshake::accepting("abc", 25_000, 60_000);
    let connector = ScriptedConnector::new(ScriptedStream::new(upgrade_then(&[
        "40",
        r#"42["hello"]"#,
    ])));
    let mut engine = engine(&handshake, &connector, EngineOptions::default().version(2));

    engine.connect().expect("connect");

    assert_eq!(engine.read().expect("read"), r#"42["hello"]"#);
    let (request, _) = client_output(&connector.stream().written());
    assert!(request.starts_with("GET /socket.io/?sid=abc&EIO=2&transport=websocket&use_b64=0 HTTP/1.1\r\n"));
}

#[test]
fn later_versions_keep_the_first_frame() {
    let handshake = ScriptedHandshake::accepting("abc", 25_000, 60_000);
    let connector = ScriptedConnector::new(ScriptedStream::new(upgrade_then(&["40"])));
    let mut engine = engine(&handshake, &connector, EngineOptions::default());

    engine.connect().expect("connect");

    assert_eq!(engine.read().expect("read"), "40");
}

#[test]
fn handshake_query_merges_url_parameters() {
    let handshake = ScriptedHandshake::accepting("abc", 25_000, 60_000);
    let connector = ScriptedConnector::new(ScriptedStream::new(upgrade_then(&[])));
    let mut engine = SocketIo::builder()
        .connector(connector)
        .handshake(handshake.clone())
        .clock(ManualClock::new())
        .build("http://example.test:8080/custom/?token=secret")
        .expect("valid url");

    engine.connect().expect("connect");

    assert_eq!(
        handshake.requests()[0].url,
        "http://example.test:8080/custom/?use_b64=0&EIO=3&transport=polling&token=secret"
    );
}
