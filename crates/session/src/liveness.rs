//! # Connection Liveness
//!
//! Decides when a keep-alive ping is due and when a server has gone quiet
//! for too long. Pure bookkeeping over [`Instant`]s; the session does the
//! sending and picks the reaction.
//!
//! Any inbound message counts as a reply, from the moment it is received
//! rather than dispatched. A timeout needs an unanswered ping, so roles
//! without a ping message never time out, and is reported once per silence.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Liveness {
    interval: Duration,
    timeout: Duration,
    last_sent: Option<Instant>,
    last_reply: Instant,
    reported: bool,
}

impl Liveness {
    pub fn new(interval: Duration, timeout: Duration, now: Instant) -> Self {
        Self {
            interval,
            timeout,
            last_sent: None,
            last_reply: now,
            reported: false,
        }
    }

    /// Whether a ping should go out at `now`
    pub fn ping_due(&self, now: Instant) -> bool {
        let since = self.last_sent.unwrap_or(self.last_reply);
        now.saturating_duration_since(since) >= self.interval
    }

    pub fn record_ping(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }

    /// Note traffic from the server; older instants are ignored
    pub fn record_reply(&mut self, at: Instant) {
        if at > self.last_reply {
            self.last_reply = at;
            self.reported = false;
        }
    }

    /// How long the server has been silent
    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_reply)
    }

    fn awaiting_reply(&self) -> bool {
        matches!(self.last_sent, Some(sent) if sent >= self.last_reply)
    }

    /// Silence that should be reported now, if any
    ///
    /// Returns `Some` at most once until the next reply.
    pub fn check_timeout(&mut self, now: Instant) -> Option<Duration> {
        if self.reported || !self.awaiting_reply() {
            return None;
        }

        let silence = self.silence(now);
        if silence < self.timeout {
            return None;
        }
        self.reported = true;
        Some(silence)
    }
}
