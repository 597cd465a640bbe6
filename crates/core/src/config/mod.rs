use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{boss::EncounterConfig, Result, ScriptError};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub script: ScriptConfig,
    pub playback: PlaybackConfig,
    pub encounter: EncounterConfig,
}

impl AppConfig {
    pub fn from_json(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.script.validate()?;
        self.playback.validate()
    }
}

/// Timing parameters of a single script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub start_beat: f64,
    pub beat_runahead: f64,
    pub seed: u64,
    /// Upper bound on entries consumed by one drain. `None` leaves loops
    /// without rests unguarded.
    pub max_drain_steps: Option<usize>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            start_beat: 8.0,
            beat_runahead: 2.0,
            seed: 0x5eed,
            max_drain_steps: Some(10_000),
        }
    }
}

impl ScriptConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.start_beat.is_finite() {
            return Err(ScriptError::msg("start_beat must be finite"));
        }
        if !self.beat_runahead.is_finite() || self.beat_runahead < 0.0 {
            return Err(ScriptError::msg(format!(
                "beat_runahead must be a non-negative number of beats, got {}",
                self.beat_runahead
            )));
        }
        if self.max_drain_steps == Some(0) {
            return Err(ScriptError::msg("max_drain_steps must be at least 1"));
        }
        Ok(())
    }
}

/// How the command line runner drives the host clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub bpm: f64,
    /// Clock advance per host tick, in beats.
    pub tick_beats: f64,
    pub length_beats: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            bpm: 128.0,
            tick_beats: 0.25,
            length_beats: 96.0,
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(ScriptError::msg("bpm must be positive"));
        }
        if !(self.tick_beats.is_finite() && self.tick_beats > 0.0) {
            return Err(ScriptError::msg("tick_beats must be positive"));
        }
        if self.length_beats.is_nan() || self.length_beats < 0.0 {
            return Err(ScriptError::msg("length_beats must not be negative"));
        }
        Ok(())
    }

    /// Wall-clock length of one tick at the configured tempo.
    pub fn tick_seconds(&self) -> f64 {
        self.tick_beats * 60.0 / self.bpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_fall_back_to_defaults() {
        let config = AppConfig::from_json(r#"{ "script": { "beat_runahead": 1.0 } }"#).unwrap();
        assert_eq!(config.script.beat_runahead, 1.0);
        assert_eq!(config.script.start_beat, 8.0);
        assert_eq!(config.playback.tick_beats, 0.25);
        assert_eq!(config.encounter.loops, Some(4));
    }

    #[test]
    fn rejects_negative_runahead() {
        let err = AppConfig::from_json(r#"{ "script": { "beat_runahead": -2.0 } }"#).unwrap_err();
        assert!(format!("{err}").contains("beat_runahead"));
    }

    #[test]
    fn rejects_zero_tick() {
        let err = AppConfig::from_json(r#"{ "playback": { "tick_beats": 0.0 } }"#).unwrap_err();
        assert!(format!("{err}").contains("tick_beats"));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = AppConfig::from_json("{ script: ").unwrap_err();
        assert!(matches!(err, ScriptError::Json(_)));
    }

    #[test]
    fn tick_seconds_follow_tempo() {
        let playback = PlaybackConfig {
            bpm: 120.0,
            tick_beats: 1.0,
            length_beats: 4.0,
        };
        assert_eq!(playback.tick_seconds(), 0.5);
    }
}
