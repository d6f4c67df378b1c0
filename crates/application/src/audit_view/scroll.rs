use std::time::Duration;

use tokio::time::Instant;

/// Scroll position reported by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSignal {
    /// Pixels between the visible bottom edge and the end of the list.
    pub distance_from_bottom_px: u32,
}

impl ScrollSignal {
    /// Creates a signal.
    #[must_use]
    pub fn new(distance_from_bottom_px: u32) -> Self {
        Self {
            distance_from_bottom_px,
        }
    }

    /// Returns whether the position is within `threshold_px` of the end.
    #[must_use]
    pub fn is_near_bottom(&self, threshold_px: u32) -> bool {
        self.distance_from_bottom_px <= threshold_px
    }
}

/// Keeps the latest scroll signal of a fixed window.
#[derive(Debug, Clone)]
pub struct ScrollCoalescer {
    interval: Duration,
    pending: Option<ScrollSignal>,
    deadline: Option<Instant>,
}

impl ScrollCoalescer {
    /// Creates a coalescer with the given window length.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
            deadline: None,
        }
    }

    /// Records a signal; the first signal of a window opens it.
    pub fn offer(&mut self, signal: ScrollSignal, now: Instant) {
        self.pending = Some(signal);
        if self.deadline.is_none() {
            self.deadline = Some(now + self.interval);
        }
    }

    /// Returns when the open window closes.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Closes a window whose deadline has passed and returns its latest signal.
    pub fn take_due(&mut self, now: Instant) -> Option<ScrollSignal> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }
}
