use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::fx::EffectsBusState;
use crate::record::DEFAULT_CHUNK_SECS;
use crate::sequencer::{
    DEFAULT_BPM, DEFAULT_PATTERN_LENGTH, DEFAULT_POLL_INTERVAL, DEFAULT_SCHEDULE_AHEAD,
    INITIAL_TRACKS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Realtime,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    pub root: String,
    pub mode: String,
    pub start_octave: i32,
    pub octaves: usize,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            root: "C".to_string(),
            mode: "minor".to_string(),
            start_octave: 2,
            octaves: 4,
        }
    }
}

/// Engine settings. Every field has a default, so a config file only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bpm: f64,
    pub pattern_length: usize,
    pub swing: f64,
    pub schedule_ahead_secs: f64,
    pub poll_interval_secs: f64,
    pub scale: ScaleConfig,
    /// Template ids of the tracks a new project starts with
    pub tracks: Vec<String>,
    pub bus: EffectsBusState,
    pub recording_chunk_secs: f64,
    /// Fixed seed for noise, arpeggios and randomization
    pub seed: Option<u64>,
    pub offline_sample_rate: u32,
    pub output: OutputMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            pattern_length: DEFAULT_PATTERN_LENGTH,
            swing: 0.0,
            schedule_ahead_secs: DEFAULT_SCHEDULE_AHEAD,
            poll_interval_secs: DEFAULT_POLL_INTERVAL,
            scale: ScaleConfig::default(),
            tracks: INITIAL_TRACKS.iter().map(|s| s.to_string()).collect(),
            bus: EffectsBusState::default(),
            recording_chunk_secs: DEFAULT_CHUNK_SECS,
            seed: None,
            offline_sample_rate: 44100,
            output: OutputMode::Realtime,
        }
    }
}

impl EngineConfig {
    /// Defaults with the offline renderer selected
    pub fn offline() -> Self {
        Self {
            output: OutputMode::Offline,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "bpm": 140, "scale": { "mode": "dorian" } }"#).unwrap();
        assert_eq!(config.bpm, 140.0);
        assert_eq!(config.scale.mode, "dorian");
        assert_eq!(config.scale.root, "C");
        assert_eq!(config.pattern_length, 16);
        assert_eq!(config.tracks.len(), 8);
        assert_eq!(config.bus.master_gain, 0.92);
        assert_eq!(config.output, OutputMode::Realtime);
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("chipgrid-config-{}.json", std::process::id()));
        let config = EngineConfig {
            seed: Some(9),
            output: OutputMode::Offline,
            ..EngineConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = EngineConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
