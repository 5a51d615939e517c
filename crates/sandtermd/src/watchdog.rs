use std::{future::pending, pin::Pin, time::Duration};

use tokio::time::{Instant, Sleep, sleep};

/// Single re-armable idle timer owned by one session.
///
/// Expiry is observed by awaiting [`Watchdog::expired`] inside the session's
/// event loop, so at most one timer is ever live.
#[derive(Debug, Default)]
pub struct Watchdog {
    timer: Option<Pin<Box<Sleep>>>,
    duration: Duration,
}

impl Watchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the timer, replacing any pending deadline.
    pub fn arm(&mut self, duration: Duration) {
        self.duration = duration;
        let deadline = Instant::now() + duration;
        match &mut self.timer {
            Some(timer) => timer.as_mut().reset(deadline),
            None => self.timer = Some(Box::pin(sleep(duration))),
        }
    }

    /// Pushes the deadline out by the armed duration. No-op when disarmed.
    pub fn reset(&mut self) {
        if self.timer.is_some() {
            self.arm(self.duration);
        }
    }

    /// Disarms the timer; a cancelled watchdog never expires.
    pub fn cancel(&mut self) {
        self.timer = None;
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Completes when the armed deadline passes; pends forever while disarmed.
    pub async fn expired(&mut self) {
        match &mut self.timer {
            Some(timer) => timer.as_mut().await,
            None => pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::{Instant, sleep, timeout};

    use super::Watchdog;

    const IDLE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn fires_after_armed_duration() {
        let start = Instant::now();
        let mut watchdog = Watchdog::new();
        watchdog.arm(IDLE);

        watchdog.expired().await;
        assert_eq!(start.elapsed(), IDLE);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_pushes_deadline_from_now() {
        let start = Instant::now();
        let mut watchdog = Watchdog::new();
        watchdog.arm(IDLE);

        sleep(Duration::from_secs(45)).await;
        watchdog.reset();

        watchdog.expired().await;
        assert_eq!(start.elapsed(), Duration::from_secs(105));
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_pending_timer() {
        let start = Instant::now();
        let mut watchdog = Watchdog::new();
        watchdog.arm(Duration::from_secs(5));
        watchdog.arm(IDLE);

        watchdog.expired().await;
        assert_eq!(start.elapsed(), IDLE);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_watchdog_never_fires() {
        let mut watchdog = Watchdog::new();
        watchdog.arm(IDLE);
        watchdog.cancel();
        assert!(!watchdog.is_armed());

        watchdog.reset();
        assert!(!watchdog.is_armed());
        assert!(timeout(IDLE * 10, watchdog.expired()).await.is_err());
    }
}
