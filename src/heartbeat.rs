//! Heartbeat negotiation and liveness tracking.
//!
//! The client asks for `heart-beat:<send>,<receive>` in CONNECT and the
//! server answers with its own pair in CONNECTED. Once negotiated, the
//! client sends a bare `"\n"` every send interval and watches the time
//! since the last inbound message; if that exceeds
//! [`TIMEOUT_MULTIPLIER_NUM`]/[`TIMEOUT_MULTIPLIER_DEN`] times the server
//! interval, the session is considered dead.

use std::fmt;
use std::future;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Liveness timeout as a fraction of the negotiated server interval (2.5x).
pub const TIMEOUT_MULTIPLIER_NUM: u64 = 5;
pub const TIMEOUT_MULTIPLIER_DEN: u64 = 2;

/// Upper bound for a negotiated interval (one day). Larger values from
/// either side are clamped so timer deadlines stay representable.
pub const MAX_INTERVAL_MS: u64 = 86_400_000;

/// Requested heartbeat intervals in milliseconds, as sent in CONNECT.
///
/// `send_ms` is how often the client promises to send, `receive_ms` how
/// often it wants to hear from the server. `0` disables that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub send_ms: u64,
    pub receive_ms: u64,
}

impl Heartbeat {
    pub fn new(send_ms: u64, receive_ms: u64) -> Self {
        Self {
            send_ms,
            receive_ms,
        }
    }

    /// Heartbeats off in both directions.
    pub fn disabled() -> Self {
        Self::new(0, 0)
    }

    /// Same interval in both directions.
    pub fn from_duration(interval: Duration) -> Self {
        let ms = interval.as_millis() as u64;
        Self::new(ms, ms)
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(10_000, 10_000)
    }
}

impl fmt::Display for Heartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.send_ms, self.receive_ms)
    }
}

/// Parse the STOMP `heart-beat` header value (format: "cx,cy").
///
/// Parameters
/// - `header`: header string from the server or client (for example
///   "10000,10000"). The values represent milliseconds.
///
/// Returns a tuple `(cx, cy)`. Missing or invalid fields default to `0`.
pub fn parse_heartbeat_header(header: &str) -> (u64, u64) {
    let mut parts = header.split(',');
    let cx = parts
        .next()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let cy = parts
        .next()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    (cx, cy)
}

/// Negotiate heartbeat intervals between client and server.
///
/// Parameters
/// - `client_out`: how often the client offers to send (ms).
/// - `client_in`: how often the client wants to receive (ms).
/// - `server_out`: how often the server offers to send (ms), i.e. the
///   first value of the CONNECTED `heart-beat` header.
/// - `server_in`: how often the server wants to receive (ms), the second
///   value of that header.
///
/// Returns `(outgoing, incoming)`. A direction is enabled only when both
/// of its values are non-zero, and then runs at the larger of the two,
/// capped at [`MAX_INTERVAL_MS`].
pub fn negotiate_heartbeats(
    client_out: u64,
    client_in: u64,
    server_out: u64,
    server_in: u64,
) -> (Option<Duration>, Option<Duration>) {
    (negotiate_one(client_out, server_in), negotiate_one(client_in, server_out))
}

fn negotiate_one(ours: u64, theirs: u64) -> Option<Duration> {
    if ours == 0 || theirs == 0 {
        None
    } else {
        Some(Duration::from_millis(ours.max(theirs).min(MAX_INTERVAL_MS)))
    }
}

/// Effective heartbeat settings for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval at which the client sends pings (0 = disabled).
    pub client_interval_ms: u64,
    /// Interval at which the server is expected to send (0 = unmonitored).
    pub server_interval_ms: u64,
    /// When the last inbound ping or frame arrived.
    pub last_server_beat_at: Option<Instant>,
}

impl HeartbeatConfig {
    fn from_request(requested: Heartbeat) -> Self {
        Self {
            client_interval_ms: requested.send_ms,
            server_interval_ms: requested.receive_ms,
            last_server_beat_at: None,
        }
    }
}

/// Owns the negotiated intervals and the two periodic timers.
///
/// The timers are plain `Interval`s polled by the connection driver, so
/// stopping them is just dropping them: nothing can fire afterwards.
pub struct HeartbeatController {
    requested: Heartbeat,
    config: HeartbeatConfig,
    pub(crate) send_timer: Option<Interval>,
    pub(crate) liveness_timer: Option<Interval>,
}

impl HeartbeatController {
    pub fn new(requested: Heartbeat) -> Self {
        Self {
            requested,
            config: HeartbeatConfig::from_request(requested),
            send_timer: None,
            liveness_timer: None,
        }
    }

    /// The values the client puts in its CONNECT frame.
    pub fn requested(&self) -> Heartbeat {
        self.requested
    }

    pub fn config(&self) -> HeartbeatConfig {
        self.config
    }

    /// Apply the server's `heart-beat` header. A missing header means the
    /// server does not do heartbeats (`0,0`).
    pub fn negotiate(&mut self, server_header: Option<&str>) {
        let (server_out, server_in) = parse_heartbeat_header(server_header.unwrap_or("0,0"));
        let (outgoing, incoming) = negotiate_heartbeats(
            self.requested.send_ms,
            self.requested.receive_ms,
            server_out,
            server_in,
        );
        self.config.client_interval_ms = outgoing.map_or(0, |d| d.as_millis() as u64);
        self.config.server_interval_ms = incoming.map_or(0, |d| d.as_millis() as u64);
        tracing::debug!(
            server = server_header.unwrap_or("<none>"),
            client_send_ms = self.config.client_interval_ms,
            server_send_ms = self.config.server_interval_ms,
            "heartbeat negotiated"
        );
    }

    /// Arm the send timer and the liveness monitor for whichever
    /// directions are enabled. Restarts any timers already running.
    pub fn start(&mut self, now: Instant) {
        self.stop();

        if self.config.client_interval_ms > 0 {
            let period = Duration::from_millis(self.config.client_interval_ms);
            let mut timer = tokio::time::interval_at(now + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.send_timer = Some(timer);
        }

        if let Some(timeout) = self.timeout() {
            self.config.last_server_beat_at = Some(now);
            let mut timer = tokio::time::interval_at(now + timeout, timeout);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.liveness_timer = Some(timer);
        }
    }

    pub fn stop(&mut self) {
        self.send_timer = None;
        self.liveness_timer = None;
    }

    /// Stop the timers and forget the negotiated values.
    pub fn reset(&mut self) {
        self.stop();
        self.config = HeartbeatConfig::from_request(self.requested);
    }

    pub fn is_running(&self) -> bool {
        self.send_timer.is_some() || self.liveness_timer.is_some()
    }

    /// Note that something (ping or frame) arrived from the server.
    pub fn record_beat(&mut self, now: Instant) {
        self.config.last_server_beat_at = Some(now);
    }

    /// How long the server may stay silent, if monitoring is enabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.config.server_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(
                ms.saturating_mul(TIMEOUT_MULTIPLIER_NUM) / TIMEOUT_MULTIPLIER_DEN,
            )),
        }
    }

    pub fn is_timed_out(&self, now: Instant) -> bool {
        match (self.timeout(), self.config.last_server_beat_at) {
            (Some(timeout), Some(last)) => now.saturating_duration_since(last) > timeout,
            _ => false,
        }
    }
}

/// Wait for the next tick of an optional timer; never resolves when the
/// timer is not armed.
pub(crate) async fn tick(timer: &mut Option<Interval>) -> Instant {
    match timer {
        Some(interval) => interval.tick().await,
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiate_takes_max_when_both_enabled() {
        let mut hb = HeartbeatController::new(Heartbeat::new(10_000, 10_000));
        hb.negotiate(Some("20000,5000"));
        assert_eq!(hb.config().client_interval_ms, 10_000);
        assert_eq!(hb.config().server_interval_ms, 20_000);
    }

    #[test]
    fn missing_server_header_disables_both_directions() {
        let mut hb = HeartbeatController::new(Heartbeat::default());
        hb.negotiate(None);
        assert_eq!(hb.config().client_interval_ms, 0);
        assert_eq!(hb.config().server_interval_ms, 0);
        assert_eq!(hb.timeout(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn start_arms_only_enabled_directions() {
        let mut hb = HeartbeatController::new(Heartbeat::new(10_000, 0));
        hb.negotiate(Some("10000,10000"));
        hb.start(Instant::now());
        assert!(hb.send_timer.is_some());
        assert!(hb.liveness_timer.is_none());

        hb.stop();
        assert!(!hb.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn send_timer_first_tick_is_one_period_out() {
        let mut hb = HeartbeatController::new(Heartbeat::new(1_000, 0));
        hb.negotiate(Some("0,1000"));
        let start = Instant::now();
        hb.start(start);
        let fired = tick(&mut hb.send_timer).await;
        assert_eq!(fired - start, Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_two_and_a_half_intervals() {
        let mut hb = HeartbeatController::new(Heartbeat::new(0, 4_000));
        hb.negotiate(Some("4000,0"));
        let start = Instant::now();
        hb.start(start);
        assert_eq!(hb.timeout(), Some(Duration::from_millis(10_000)));
        assert!(!hb.is_timed_out(start + Duration::from_millis(10_000)));
        assert!(hb.is_timed_out(start + Duration::from_millis(10_001)));

        hb.record_beat(start + Duration::from_millis(9_000));
        assert!(!hb.is_timed_out(start + Duration::from_millis(15_000)));
    }
}
