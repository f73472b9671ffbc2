//! Connection URL parsing.
//!
//! [`UrlDescriptor`] is built once when an engine is constructed and never
//! mutated afterwards. Missing parts fall back to `http://localhost/socket.io`
//! with the scheme's well-known port.

use std::collections::BTreeMap;

use url::Url;

use crate::error::{EngineError, Result};

/// Path used when the URL carries none (or only `/`).
pub const DEFAULT_PATH: &str = "socket.io";

/// Parsed connection URL.
///
/// # Examples
///
/// ```
/// use pocketio::url::UrlDescriptor;
///
/// let url = UrlDescriptor::parse("http://localhost:1337").expect("valid url");
/// assert_eq!(url.port(), 1337);
/// assert_eq!(url.path(), "socket.io");
/// assert!(!url.secured());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlDescriptor {
    scheme: String,
    host: String,
    port: u16,
    path: String,
    query: BTreeMap<String, String>,
    secured: bool,
}

impl UrlDescriptor {
    /// Parse `input` into a descriptor, applying defaults for omitted parts.
    ///
    /// Inputs without a scheme (`localhost:1337`) are treated as `http`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MalformedUrl`] when the input cannot be parsed
    /// or names no host.
    pub fn parse(input: &str) -> Result<Self> {
        let malformed = || EngineError::MalformedUrl {
            url: input.to_owned(),
        };
        let trimmed = input.trim();
        let parsed = if trimmed.contains("://") {
            Url::parse(trimmed)
        } else {
            Url::parse(&format!("http://{trimmed}"))
        }
        .map_err(|_| malformed())?;

        let scheme = parsed.scheme().to_owned();
        let secured = scheme == "https";
        let host = match parsed.host_str() {
            Some("") => "localhost".to_owned(),
            Some(host) => host.trim_matches(['[', ']']).to_owned(),
            None => return Err(malformed()),
        };
        let port = parsed
            .port()
            .unwrap_or(if secured { 443 } else { 80 });
        let path = match parsed.path().trim_matches('/') {
            "" => DEFAULT_PATH.to_owned(),
            path => path.to_owned(),
        };
        let query = parsed.query_pairs().into_owned().collect();

        Ok(Self {
            scheme,
            host,
            port,
            path,
            query,
            secured,
        })
    }

    /// URL scheme, for example `http`.
    #[must_use]
    pub fn scheme(&self) -> &str { &self.scheme }

    /// Host name or address literal, without IPv6 brackets.
    #[must_use]
    pub fn host(&self) -> &str { &self.host }

    /// Explicit port, or 80/443 depending on [`secured`](Self::secured).
    #[must_use]
    pub fn port(&self) -> u16 { self.port }

    /// Path with leading and trailing slashes removed.
    #[must_use]
    pub fn path(&self) -> &str { &self.path }

    /// Query parameters carried by the original URL.
    #[must_use]
    pub fn query(&self) -> &BTreeMap<String, String> { &self.query }

    /// Whether the connection must be wrapped in TLS.
    #[must_use]
    pub fn secured(&self) -> bool { self.secured }

    /// `host:port` as used in the `Host` header, bracketing IPv6 literals.
    #[must_use]
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::UrlDescriptor;
    use crate::error::EngineError;

    #[test]
    fn parses_explicit_port_with_default_path() {
        let url = UrlDescriptor::parse("http://localhost:1337").expect("parse url");
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host(), "localhost");
        assert_eq!(url.port(), 1337);
        assert_eq!(url.path(), "socket.io");
        assert!(!url.secured());
        assert!(url.query().is_empty());
    }

    #[test]
    fn https_defaults_to_secured_443() {
        let url = UrlDescriptor::parse("https://host").expect("parse url");
        assert_eq!(url.port(), 443);
        assert!(url.secured());
        assert_eq!(url.authority(), "host:443");
    }

    #[rstest]
    #[case::root("http://example.com/", "socket.io")]
    #[case::custom("http://example.com/realtime/", "realtime")]
    #[case::nested("http://example.com/a/b", "a/b")]
    fn normalises_path(#[case] input: &str, #[case] expected: &str) {
        let url = UrlDescriptor::parse(input).expect("parse url");
        assert_eq!(url.path(), expected);
    }

    #[test]
    fn scheme_less_input_defaults_to_http() {
        let url = UrlDescriptor::parse("127.0.0.1:8080").expect("parse url");
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host(), "127.0.0.1");
        assert_eq!(url.port(), 8080);
    }

    #[test]
    fn collects_query_parameters() {
        let url = UrlDescriptor::parse("http://localhost:1337/?token=abc&room=1").expect("parse url");
        assert_eq!(url.query().get("token").map(String::as_str), Some("abc"));
        assert_eq!(url.query().get("room").map(String::as_str), Some("1"));
    }

    #[test]
    fn ipv6_authority_is_bracketed() {
        let url = UrlDescriptor::parse("http://[::1]:3000").expect("parse url");
        assert_eq!(url.host(), "::1");
        assert_eq!(url.authority(), "[::1]:3000");
    }

    #[test]
    fn rejects_garbage() {
        let err = UrlDescriptor::parse("http://exa mple.com").expect_err("must fail");
        assert!(matches!(err, EngineError::MalformedUrl { .. }));
    }
}
