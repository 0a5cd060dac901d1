// src/utils.rs

//! Small helpers shared by the stores and pipelines

use std::time::{Duration, Instant};

pub mod time;

pub use time::Time;

/// Rounds a money amount to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Timer-gated trigger used to coalesce bursts of form input.
///
/// Every `trigger` pushes the deadline out by `delay`; `poll` fires once the
/// deadline has passed and then disarms.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arms (or re-arms) the trigger relative to `now`
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left before the trigger fires
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Returns true exactly once when the deadline has been reached
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Sleeps until the pending deadline, if any, and disarms
    pub async fn settle(&mut self) -> bool {
        match self.deadline.take() {
            Some(deadline) => {
                tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1169.0), 1169.0);
        assert_eq!(round2(10.005_1), 10.01);
        assert_eq!(round2(0.124), 0.12);
    }

    #[test]
    fn test_debouncer_coalesces_bursts() {
        let start = Instant::now();
        let mut debouncer = Debouncer::from_millis(120);

        debouncer.trigger(start);
        debouncer.trigger(start + Duration::from_millis(100));

        assert!(!debouncer.poll(start + Duration::from_millis(150)));
        assert_eq!(
            debouncer.remaining(start + Duration::from_millis(150)),
            Some(Duration::from_millis(70))
        );
        assert!(debouncer.poll(start + Duration::from_millis(220)));
        assert!(!debouncer.poll(start + Duration::from_millis(400)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_debouncer_settle() {
        let mut debouncer = Debouncer::from_millis(5);
        assert!(!tokio_test::block_on(debouncer.settle()));

        debouncer.trigger(Instant::now());
        assert!(tokio_test::block_on(debouncer.settle()));
        assert!(!debouncer.is_pending());
    }
}
