//! Host configuration.
//!
//! Wraps the core [`ShatterConfig`] with the settings only the host cares
//! about: how long the world transition is held, how logs are formatted,
//! memory resonance timings, and which sleep points, dream exits and hidden
//! triggers are gated.
//!
//! ```toml
//! [session]
//! transition_duration_secs = 2.0
//! log_format = "json"
//!
//! [resonance]
//! cooldown_secs = 10.0
//! duration_secs = 5.0
//!
//! [core.stats]
//! base_max_health = 120.0
//!
//! [[gates]]
//! id = "lighthouse_portal"
//! name = "Lighthouse Portal"
//! kind = "dream_exit"
//! required_memory = "core_lighthouse"
//! ```

use serde::{Deserialize, Serialize};
use shatter_core::ShatterError;
use shatter_core::config::ShatterConfig;

use crate::gates::MemoryGate;
use crate::resonance::ResonanceConfig;
use crate::telemetry::LogFormat;

/// Full host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Progression core settings.
    #[serde(default)]
    pub core: ShatterConfig,
    /// Session loop settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Memory resonance timings.
    #[serde(default)]
    pub resonance: ResonanceConfig,
    /// Gated interaction points.
    #[serde(default)]
    pub gates: Vec<MemoryGate>,
}

impl HostConfig {
    /// Parse from a TOML string.
    ///
    /// # Errors
    /// Returns `ShatterError::Config` if the TOML is invalid or a value is
    /// out of range.
    pub fn from_toml(toml_str: &str) -> shatter_core::Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ShatterError::Config(e.to_string()))?;
        config.core.validate()?;
        let duration = config.session.transition_duration_secs;
        if duration.is_nan() || duration < 0.0 {
            return Err(ShatterError::Config(
                "session.transition_duration_secs must be non-negative".to_string(),
            ));
        }
        let resonance = &config.resonance;
        if [resonance.cooldown_secs, resonance.duration_secs]
            .iter()
            .any(|v| v.is_nan() || *v < 0.0)
        {
            return Err(ShatterError::Config(
                "resonance timings must be non-negative".to_string(),
            ));
        }
        Ok(config)
    }

    /// Parse from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> shatter_core::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

/// Settings for the session loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds the `Transition` state is held before it resolves.
    #[serde(default = "default_transition_duration")]
    pub transition_duration_secs: f32,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transition_duration_secs: default_transition_duration(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_transition_duration() -> f32 {
    2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::GateKind;

    #[test]
    fn defaults_hold_transition_for_two_seconds() {
        let config = HostConfig::from_toml("").expect("parse");
        assert!((config.session.transition_duration_secs - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.session.log_format, LogFormat::Compact);
        assert!(config.gates.is_empty());
        assert!((config.resonance.cooldown_secs - 10.0).abs() < f32::EPSILON);
        assert!((config.resonance.duration_secs - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn parses_core_overrides_and_gates() {
        let config = HostConfig::from_toml(
            r#"
            [session]
            transition_duration_secs = 0.5
            log_format = "json"

            [core.stats]
            base_max_health = 120.0

            [[gates]]
            id = "portal"
            name = "Portal"
            kind = "dream_exit"
            required_memory = "core_a"
            "#,
        )
        .expect("parse");
        assert_eq!(config.session.log_format, LogFormat::Json);
        assert!((config.core.stats.base_max_health - 120.0).abs() < f32::EPSILON);
        assert_eq!(config.gates[0].kind, GateKind::DreamExit);
        assert!(config.gates[0].unlocked);
    }

    #[test]
    fn resonance_gate_flag_parses() {
        let config = HostConfig::from_toml(
            r#"
            [resonance]
            cooldown_secs = 3.0

            [[gates]]
            id = "shrine"
            kind = "hidden_trigger"
            requires_resonance = true
            "#,
        )
        .expect("parse");
        assert!(config.gates[0].requires_resonance);
        assert!((config.resonance.cooldown_secs - 3.0).abs() < f32::EPSILON);
        assert!(HostConfig::from_toml("[resonance]\nduration_secs = -1.0\n").is_err());
    }

    #[test]
    fn negative_duration_is_rejected() {
        let err = HostConfig::from_toml("[session]\ntransition_duration_secs = -1.0\n");
        assert!(matches!(err, Err(ShatterError::Config(_))));
    }
}
