//! Heartbeat-based liveness detection.
//!
//! Once connected, the client sends a `HeartBeat` frame right away and
//! then once per interval. Every inbound frame, of any type, refreshes
//! the "last response" timestamp. If a tick finds the peer silent for
//! longer than the timeout, the session is torn down.
//!
//! Time comes from `tokio::time`, so tests can pause the clock and
//! step it with `tokio::time::advance`.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::{SessionConfig, SessionError};

/// Tracks when the peer was last heard from.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    timeout: Duration,
    last_response: Mutex<Instant>,
}

impl HeartbeatMonitor {
    /// Creates a monitor whose "last response" is now.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            last_response: Mutex::new(Instant::now()),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.heartbeat_interval, config.heartbeat_timeout)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn last(&self) -> MutexGuard<'_, Instant> {
        // An Instant cannot be left half-written, so a poisoned lock is
        // still safe to read.
        self.last_response
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records that the peer just said something.
    pub fn touch(&self) {
        *self.last() = Instant::now();
    }

    /// Time since the last [`touch`](Self::touch) (or construction).
    pub fn since_last_response(&self) -> Duration {
        Instant::now().saturating_duration_since(*self.last())
    }

    /// Checks liveness.
    ///
    /// # Errors
    /// [`SessionError::HeartbeatTimeout`] if the silence has lasted
    /// strictly longer than the timeout.
    pub fn check(&self) -> Result<(), SessionError> {
        let elapsed = self.since_last_response();
        if elapsed > self.timeout {
            return Err(SessionError::HeartbeatTimeout { elapsed });
        }
        Ok(())
    }

    /// A ticker whose first tick fires one interval from now.
    ///
    /// The immediate heartbeat on connect is sent by the caller; the
    /// ticker only drives the recurring ones. Missed ticks are delayed
    /// rather than bunched up.
    pub fn ticker(&self) -> Interval {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> HeartbeatMonitor {
        HeartbeatMonitor::new(Duration::from_millis(1000), Duration::from_millis(5000))
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_fresh_monitor_is_alive() {
        let hb = monitor();
        assert!(hb.check().is_ok());
        assert_eq!(hb.since_last_response(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_at_exact_timeout_is_still_alive() {
        let hb = monitor();
        time::advance(Duration::from_millis(5000)).await;
        assert!(hb.check().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_past_timeout_returns_heartbeat_timeout() {
        let hb = monitor();
        time::advance(Duration::from_millis(5001)).await;
        match hb.check() {
            Err(SessionError::HeartbeatTimeout { elapsed }) => {
                assert_eq!(elapsed, Duration::from_millis(5001));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_resets_the_silence_window() {
        let hb = monitor();
        time::advance(Duration::from_millis(4000)).await;
        hb.touch();
        time::advance(Duration::from_millis(4000)).await;
        assert!(hb.check().is_ok());
        assert_eq!(hb.since_last_response(), Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_first_tick_is_one_interval_out() {
        let hb = monitor();
        let start = Instant::now();
        let mut ticker = hb.ticker();

        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_times_out_on_sixth_tick() {
        let hb = monitor();
        let mut ticker = hb.ticker();
        let mut ticks = 0;
        loop {
            ticker.tick().await;
            ticks += 1;
            if hb.check().is_err() {
                break;
            }
        }
        // 5000 ms is not yet "exceeded"; 6000 ms is.
        assert_eq!(ticks, 6);
    }

    #[test]
    fn test_from_config_copies_durations() {
        let config = SessionConfig {
            heartbeat_interval: Duration::from_millis(50),
            heartbeat_timeout: Duration::from_millis(200),
            max_auth_failures: 0,
        };
        let hb = HeartbeatMonitor::from_config(&config);
        assert_eq!(hb.interval(), Duration::from_millis(50));
        assert_eq!(hb.timeout(), Duration::from_millis(200));
    }
}
