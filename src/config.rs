//! Configuration management for the metronome
//!
//! This module provides runtime configuration loading from JSON files so
//! tempo limits, the beat sample, and engine queue sizes can be tuned
//! without recompilation. Every section and field falls back to its default
//! when missing, and an unreadable or malformed file yields the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the configuration file for desktop runs
pub const DEFAULT_CONFIG_PATH: &str = "assets/metronome_config.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub metronome: MetronomeConfig,
    pub audio: AudioConfig,
    pub engine: EngineConfig,
}

/// Tempo defaults and the limits enforced by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeConfig {
    /// Tempo used when the engine is first built
    pub initial_bpm: f64,
    /// Lowest tempo the controller will request
    pub min_bpm: f64,
    /// Highest tempo the controller will request
    pub max_bpm: f64,
    /// Step for the fine +/- buttons
    pub fine_step: f64,
    /// Step for the coarse +5/-5 buttons
    pub coarse_step: f64,
    /// Beats per bar used for accent display
    pub beats_per_bar: u32,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            initial_bpm: 120.0,
            min_bpm: 40.0,
            max_bpm: 200.0,
            fine_step: 1.0,
            coarse_step: 5.0,
            beats_per_bar: 4,
        }
    }
}

/// Beat sample configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// WAV file played on each beat; `None` uses the synthesized click
    pub sample_path: Option<PathBuf>,
    /// Playback gain in [0.0, 1.0]
    pub volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_path: Some(PathBuf::from("assets/sounds/metronome-regular.wav")),
            volume: 0.7,
        }
    }
}

/// Engine task sizing and retune behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of the command queue feeding the engine task
    pub command_queue_size: usize,
    /// Capacity of the telemetry broadcast channel
    pub telemetry_buffer: usize,
    /// Pause between cancelling the old timer and starting the new one on retune
    pub retune_grace_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_queue_size: 64,
            telemetry_buffer: 128,
            retune_grace_ms: 0,
        }
    }
}

impl EngineConfig {
    pub fn retune_grace(&self) -> Duration {
        Duration::from_millis(self.retune_grace_ms)
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file doesn't exist
    /// or the JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }
}
