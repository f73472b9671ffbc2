//! Negotiated session state and heartbeat scheduling.
//!
//! A [`Session`] is created once per connection from the handshake response
//! and dropped when the connection closes. Only the heartbeat timestamp
//! changes during its lifetime.

use std::{
    collections::BTreeSet,
    time::{Duration, Instant},
};

/// Pings are sent this long before the server's interval elapses so they
/// arrive inside its timeout window.
pub const HEARTBEAT_MARGIN: Duration = Duration::from_secs(5);

/// Source of monotonic time for heartbeat decisions.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant { Instant::now() }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant { (**self).now() }
}

/// Handshake state for one connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    id: String,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
    last_heartbeat: Instant,
    upgrades: BTreeSet<String>,
}

impl Session {
    /// Start a session whose heartbeat clock begins at `now`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        heartbeat_interval: Duration,
        heartbeat_timeout: Duration,
        upgrades: impl IntoIterator<Item = String>,
        now: Instant,
    ) -> Self {
        Self {
            id: id.into(),
            heartbeat_interval,
            heartbeat_timeout,
            last_heartbeat: now,
            upgrades: upgrades.into_iter().collect(),
        }
    }

    /// Session id assigned by the server.
    #[must_use]
    pub fn id(&self) -> &str { &self.id }

    /// Interval between heartbeats.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration { self.heartbeat_interval }

    /// Time the server waits for a heartbeat before dropping the session.
    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration { self.heartbeat_timeout }

    /// Instant of the last heartbeat judged due.
    #[must_use]
    pub fn last_heartbeat(&self) -> Instant { self.last_heartbeat }

    /// Transports the server allows upgrading to.
    #[must_use]
    pub fn upgrades(&self) -> &BTreeSet<String> { &self.upgrades }

    /// Whether the server accepts an upgrade to `transport`.
    #[must_use]
    pub fn supports_upgrade(&self, transport: &str) -> bool { self.upgrades.contains(transport) }

    /// Decide whether a ping is due at `now`, recording it when it is.
    ///
    /// A ping is due once `now` passes `last_heartbeat + interval - 5s`. A
    /// zero interval disables heartbeats. Callers must send a PING exactly
    /// when this returns `true`.
    pub fn needs_heartbeat(&mut self, now: Instant) -> bool {
        if self.heartbeat_interval.is_zero() {
            return false;
        }
        let elapsed = now.saturating_duration_since(self.last_heartbeat);
        if elapsed + HEARTBEAT_MARGIN > self.heartbeat_interval {
            self.last_heartbeat = now;
            return true;
        }
        false
    }
}
