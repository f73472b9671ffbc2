//! Scripted handshake transport.

use std::sync::{Arc, Mutex};

use pocketio::{EngineError, HandshakeReply, HandshakeRequest, HandshakeTransport};

use crate::server::handshake_body;

/// [`HandshakeTransport`] answering every request with a fixed reply and
/// recording what was asked.
#[derive(Clone, Debug)]
pub struct ScriptedHandshake {
    reply: Result<HandshakeReply, String>,
    requests: Arc<Mutex<Vec<HandshakeRequest>>>,
}

impl ScriptedHandshake {
    /// Reply with `body` verbatim.
    #[must_use]
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            reply: Ok(HandshakeReply {
                body: body.into(),
                set_cookies: Vec::new(),
            }),
            requests: Arc::default(),
        }
    }

    /// Accept with a websocket-capable session.
    #[must_use]
    pub fn accepting(sid: &str, ping_interval_ms: u64, ping_timeout_ms: u64) -> Self {
        Self::with_body(handshake_body(sid, ping_interval_ms, ping_timeout_ms, &["websocket"]))
    }

    /// Fail every request as an unreachable server would.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            requests: Arc::default(),
        }
    }

    /// Add a `Set-Cookie` header to the reply.
    #[must_use]
    pub fn with_cookie(mut self, set_cookie: impl Into<String>) -> Self {
        if let Ok(reply) = &mut self.reply {
            reply.set_cookies.push(set_cookie.into());
        }
        self
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HandshakeRequest> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

impl HandshakeTransport for ScriptedHandshake {
    fn fetch(&self, request: &HandshakeRequest) -> pocketio::Result<HandshakeReply> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .push(request.clone());
        self.reply
            .clone()
            .map_err(|message| EngineError::ServerConnectionFailure {
                message: Some(message),
            })
    }
}
