//! Memory resonance: a cooldown-gated pulse that reveals hidden memories.
//!
//! Activating resonance opens a reveal window of `duration_secs`. While the
//! window is open the session reveals every resonance-hidden gate whose
//! requirement is met, including gates whose required memory is collected
//! mid-window. The next activation is allowed `cooldown_secs` after the
//! previous one started.

use serde::{Deserialize, Serialize};

/// Resonance timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceConfig {
    /// Seconds between activations.
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: f32,
    /// Seconds the reveal window stays open.
    #[serde(default = "default_duration")]
    pub duration_secs: f32,
}

impl Default for ResonanceConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown(),
            duration_secs: default_duration(),
        }
    }
}

fn default_cooldown() -> f32 {
    10.0
}

fn default_duration() -> f32 {
    5.0
}

/// Caller-driven resonance timers.
#[derive(Debug, Clone, PartialEq)]
pub struct Resonance {
    cooldown: f32,
    duration: f32,
    cooldown_remaining: f32,
    active_remaining: f32,
}

impl Resonance {
    /// Ready to activate.
    #[must_use]
    pub fn new(config: &ResonanceConfig) -> Self {
        Self {
            cooldown: config.cooldown_secs.max(0.0),
            duration: config.duration_secs.max(0.0),
            cooldown_remaining: 0.0,
            active_remaining: 0.0,
        }
    }

    /// Open the reveal window. Returns `false` while cooling down.
    pub fn activate(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.cooldown_remaining = self.cooldown;
        self.active_remaining = self.duration;
        true
    }

    /// Advance both timers by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
        self.active_remaining = (self.active_remaining - dt).max(0.0);
    }

    /// Close the window and clear the cooldown.
    pub fn reset(&mut self) {
        self.cooldown_remaining = 0.0;
        self.active_remaining = 0.0;
    }

    /// Whether an activation would succeed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.cooldown_remaining <= 0.0
    }

    /// Whether the reveal window is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active_remaining > 0.0
    }

    /// Seconds until the next activation is allowed.
    #[must_use]
    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown_remaining
    }
}

impl Default for Resonance {
    fn default() -> Self {
        Self::new(&ResonanceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_closes_before_cooldown_ends() {
        let mut resonance = Resonance::default();
        assert!(resonance.activate());
        assert!(resonance.is_active());
        assert!(!resonance.activate());

        resonance.advance(6.0);
        assert!(!resonance.is_active());
        assert!(!resonance.is_ready());
        assert!((resonance.cooldown_remaining() - 4.0).abs() < 1e-5);

        resonance.advance(4.0);
        assert!(resonance.is_ready());
        assert!(resonance.activate());
    }

    #[test]
    fn reset_makes_it_ready() {
        let mut resonance = Resonance::default();
        resonance.activate();
        resonance.reset();
        assert!(resonance.is_ready());
        assert!(!resonance.is_active());
    }
}
