//! Retransmission timer.
//!
//! Reliable delivery requires that unacknowledged frames are re-sent when
//! no ACK arrives within a bounded time.  Each ARQ sender owns exactly one
//! [`RetransmitTimer`] — Stop-and-Wait times the single outstanding frame,
//! Go-Back-N times the oldest frame of the window — and drives its main
//! loop by using [`RetransmitTimer::remaining`] as the `recv` timeout, so
//! waiting for a frame and waiting for the timer are a single suspension
//! point.
//!
//! The timeout is a fixed, configured duration.  The acoustic channel's
//! latency is dominated by the constant on-air time of a frame, so there
//! is no RTT estimation here.

use std::time::Duration;

use tokio::time::Instant;

/// A one-shot retransmission timer with a fixed timeout.
#[derive(Debug)]
pub struct RetransmitTimer {
    rto: Duration,
    deadline: Option<Instant>,
}

impl RetransmitTimer {
    /// Create a disarmed timer that will run for `rto` once armed.
    pub fn new(rto: Duration) -> Self {
        Self {
            rto,
            deadline: None,
        }
    }

    /// (Re)start the timer: it expires `rto` from now.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.rto);
    }

    /// Disarm the timer.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// `true` while a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// `true` once the armed deadline has passed.  A disarmed timer never
    /// expires.
    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left until expiry: `None` when disarmed, zero when already
    /// expired.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    #[tokio::test(start_paused = true)]
    async fn starts_disarmed() {
        let timer = RetransmitTimer::new(Duration::from_millis(100));
        assert!(!timer.is_armed());
        assert!(!timer.expired());
        assert_eq!(timer.remaining(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_rto() {
        let mut timer = RetransmitTimer::new(Duration::from_millis(100));
        timer.arm();
        assert!(!timer.expired());

        time::advance(Duration::from_millis(99)).await;
        assert!(!timer.expired());

        time::advance(Duration::from_millis(1)).await;
        assert!(timer.expired());
        assert_eq!(timer.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_pushes_the_deadline() {
        let mut timer = RetransmitTimer::new(Duration::from_millis(100));
        timer.arm();
        time::advance(Duration::from_millis(80)).await;

        timer.arm();
        time::advance(Duration::from_millis(80)).await;
        assert!(!timer.expired());

        time::advance(Duration::from_millis(20)).await;
        assert!(timer.expired());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_clears_the_deadline() {
        let mut timer = RetransmitTimer::new(Duration::from_millis(100));
        timer.arm();
        timer.cancel();
        time::advance(Duration::from_secs(1)).await;
        assert!(!timer.expired());
        assert_eq!(timer.remaining(), None);
    }
}
