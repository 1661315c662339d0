//! Caller-driven countdown for the `Transition` hold.
//!
//! The core has no clock. The host starts this timer when a transition is
//! requested, advances it from its frame loop, and resolves the transition
//! when it reports expiry.

/// Countdown for one world transition at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTimer {
    duration: f32,
    remaining: Option<f32>,
}

impl TransitionTimer {
    /// Create an idle timer that runs for `duration_secs` once started.
    #[must_use]
    pub fn new(duration_secs: f32) -> Self {
        Self {
            duration: duration_secs.max(0.0),
            remaining: None,
        }
    }

    /// Start, or restart when a request supersedes the running one.
    pub fn start(&mut self) {
        self.remaining = Some(self.duration);
    }

    /// Stop without expiring.
    pub fn cancel(&mut self) {
        self.remaining = None;
    }

    /// Advance by `dt` seconds. Returns `true` on the tick it expires.
    pub fn advance(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.remaining else {
            return false;
        };
        let left = remaining - dt.max(0.0);
        if left <= 0.0 {
            self.remaining = None;
            true
        } else {
            self.remaining = Some(left);
            false
        }
    }

    /// Whether the countdown is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.remaining.is_some()
    }

    /// Seconds left, if running.
    #[must_use]
    pub fn remaining(&self) -> Option<f32> {
        self.remaining
    }

    /// Fraction elapsed in `[0, 1]`, if running. Used to drive fades.
    #[must_use]
    pub fn progress(&self) -> Option<f32> {
        self.remaining.map(|left| {
            if self.duration <= 0.0 {
                1.0
            } else {
                (1.0 - left / self.duration).clamp(0.0, 1.0)
            }
        })
    }

    /// Configured hold length.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration
    }
}

impl Default for TransitionTimer {
    fn default() -> Self {
        Self::new(2.0)
    }
}
