//! Engine.IO handshake over HTTP long-polling.
//!
//! The handshake is a plain `GET` whose response body embeds a JSON object
//! with the session id, heartbeat timings and the transports the session may
//! upgrade to. Cookies set by the response are replayed on the upgrade.

use std::time::{Duration, Instant};

use reqwest::{blocking::Client as HttpClient, header::SET_COOKIE};
use serde::Deserialize;
use url::form_urlencoded;

use crate::{
    error::{EngineError, Result},
    options::EngineOptions,
    session::Session,
    url::UrlDescriptor,
};

/// Transport the engine upgrades to.
pub const WEBSOCKET_TRANSPORT: &str = "websocket";

/// A prepared handshake request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Absolute URL including the protocol query string.
    pub url: String,
    /// Caller-supplied headers.
    pub headers: Vec<(String, String)>,
    /// Transfer timeout.
    pub timeout: Duration,
}

/// Raw handshake response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HandshakeReply {
    /// Response body.
    pub body: String,
    /// Every `Set-Cookie` header value, unparsed.
    pub set_cookies: Vec<String>,
}

/// Performs the handshake HTTP exchange.
///
/// Closures taking a [`HandshakeRequest`] implement this trait, which keeps
/// test doubles short.
pub trait HandshakeTransport {
    /// Send `request` and return the response.
    ///
    /// # Errors
    ///
    /// Implementations return [`EngineError::ServerConnectionFailure`] when
    /// the transfer cannot be completed.
    fn fetch(&self, request: &HandshakeRequest) -> Result<HandshakeReply>;
}

impl<F> HandshakeTransport for F
where
    F: Fn(&HandshakeRequest) -> Result<HandshakeReply>,
{
    fn fetch(&self, request: &HandshakeRequest) -> Result<HandshakeReply> { self(request) }
}

/// [`HandshakeTransport`] backed by a blocking `reqwest` client.
#[derive(Clone, Debug, Default)]
pub struct HttpHandshake {
    client: Option<HttpClient>,
}

impl HttpHandshake {
    /// Build a fresh client per handshake, honouring the request timeout.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Reuse a preconfigured client (proxies, TLS roots, timeouts).
    #[must_use]
    pub fn with_client(client: HttpClient) -> Self {
        Self {
            client: Some(client),
        }
    }
}

fn connection_failure(error: &reqwest::Error) -> EngineError {
    EngineError::ServerConnectionFailure {
        message: Some(error.to_string()),
    }
}

impl HandshakeTransport for HttpHandshake {
    fn fetch(&self, request: &HandshakeRequest) -> Result<HandshakeReply> {
        let client = match &self.client {
            Some(client) => client.clone(),
            None => HttpClient::builder()
                .timeout(request.timeout)
                .build()
                .map_err(|e| connection_failure(&e))?,
        };

        let mut builder = client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| connection_failure(&e))?;

        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_owned)
            .collect();
        let body = response.text().map_err(|e| connection_failure(&e))?;

        Ok(HandshakeReply { body, set_cookies })
    }
}

/// JSON object embedded in the handshake response.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeResponse {
    /// Session id.
    pub sid: String,
    /// Heartbeat interval in milliseconds.
    pub ping_interval: u64,
    /// Heartbeat timeout in milliseconds.
    pub ping_timeout: u64,
    /// Transports the session may upgrade to.
    pub upgrades: Vec<String>,
}

/// Outcome of a successful handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Negotiated {
    /// The new session.
    pub session: Session,
    /// `name=value` cookie pairs to replay on the upgrade request.
    pub cookies: Vec<String>,
}

/// Build the handshake URL.
///
/// Protocol parameters come first; parameters from the connection URL are
/// appended, replacing protocol parameters of the same name in place.
///
/// # Examples
///
/// ```
/// use pocketio::{EngineOptions, handshake::handshake_url, url::UrlDescriptor};
///
/// let url = UrlDescriptor::parse("http://localhost:1337").expect("valid url");
/// assert_eq!(
///     handshake_url(&url, &EngineOptions::default()),
///     "http://localhost:1337/socket.io/?use_b64=0&EIO=3&transport=polling"
/// );
/// ```
#[must_use]
pub fn handshake_url(url: &UrlDescriptor, options: &EngineOptions) -> String {
    let mut params: Vec<(String, String)> = vec![
        (
            "use_b64".to_owned(),
            u8::from(options.use_b64_value()).to_string(),
        ),
        ("EIO".to_owned(), options.version_value().to_string()),
        (
            "transport".to_owned(),
            options.transport_value().as_str().to_owned(),
        ),
    ];
    for (key, value) in url.query() {
        match params.iter_mut().find(|(existing, _)| existing == key) {
            Some(slot) => slot.1.clone_from(value),
            None => params.push((key.clone(), value.clone())),
        }
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();

    format!(
        "{}://{}/{}/?{query}",
        url.scheme(),
        url.authority(),
        url.path()
    )
}

/// Slice the JSON object out of a handshake body: from the first `{` to the
/// last `}`.
///
/// # Errors
///
/// Returns [`EngineError::MalformedHandshake`] when no such span exists.
pub fn extract_json(body: &str) -> Result<&str> {
    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&body[start..=end]),
        _ => Err(EngineError::MalformedHandshake(format!(
            "no JSON object in response body {body:?}"
        ))),
    }
}

/// Cookie pair of a `Set-Cookie` value: everything before the first `;`.
#[must_use]
pub fn cookie_pair(set_cookie: &str) -> &str {
    set_cookie
        .split_once(';')
        .map_or(set_cookie, |(pair, _)| pair)
        .trim()
}

/// Run the handshake and build the session.
///
/// # Errors
///
/// - [`EngineError::InvalidHeader`] for a malformed caller header.
/// - [`EngineError::ServerConnectionFailure`] when the transfer fails or the body is empty.
/// - [`EngineError::MalformedHandshake`] when the body holds no valid handshake object.
/// - [`EngineError::UnsupportedTransport`] when `websocket` is not among the upgrades.
pub fn negotiate<H>(
    transport: &H,
    url: &UrlDescriptor,
    options: &EngineOptions,
    now: Instant,
) -> Result<Negotiated>
where
    H: HandshakeTransport + ?Sized,
{
    let headers = options
        .parsed_headers()?
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .collect();
    let request = HandshakeRequest {
        url: handshake_url(url, options),
        headers,
        timeout: options.timeout_value(),
    };
    tracing::debug!(url = %request.url, "sending handshake request");

    let reply = transport.fetch(&request)?;
    if reply.body.is_empty() {
        return Err(EngineError::ServerConnectionFailure { message: None });
    }

    let response: HandshakeResponse = serde_json::from_str(extract_json(&reply.body)?)
        .map_err(|e| EngineError::MalformedHandshake(e.to_string()))?;
    if !response.upgrades.iter().any(|u| u == WEBSOCKET_TRANSPORT) {
        return Err(EngineError::UnsupportedTransport(
            WEBSOCKET_TRANSPORT.to_owned(),
        ));
    }

    let cookies = reply
        .set_cookies
        .iter()
        .map(|value| cookie_pair(value).to_owned())
        .filter(|pair| !pair.is_empty())
        .collect();
    tracing::debug!(
        sid = %response.sid,
        ping_interval_ms = response.ping_interval,
        ping_timeout_ms = response.ping_timeout,
        "handshake accepted"
    );

    let session = Session::new(
        response.sid,
        Duration::from_millis(response.ping_interval),
        Duration::from_millis(response.ping_timeout),
        response.upgrades,
        now,
    );
    Ok(Negotiated { session, cookies })
}
