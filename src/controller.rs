//! UI-side adapter around [`MetronomeEngine`].
//!
//! The engine accepts any positive tempo; the controller keeps requests
//! inside the musical range, maps the popup's +/- buttons to tempo steps,
//! and turns the raw tick count into a position within the bar.

use serde::{Deserialize, Serialize};

use crate::config::MetronomeConfig;
use crate::engine::{EngineSnapshot, MetronomeEngine};
use crate::error::MetronomeError;

/// Tempo range and button step sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoLimits {
    pub min_bpm: f64,
    pub max_bpm: f64,
    pub fine_step: f64,
    pub coarse_step: f64,
}

impl Default for TempoLimits {
    fn default() -> Self {
        Self::from(&MetronomeConfig::default())
    }
}

impl From<&MetronomeConfig> for TempoLimits {
    fn from(config: &MetronomeConfig) -> Self {
        Self {
            min_bpm: config.min_bpm,
            max_bpm: config.max_bpm.max(config.min_bpm),
            fine_step: config.fine_step,
            coarse_step: config.coarse_step,
        }
    }
}

impl TempoLimits {
    /// Clamp a finite `bpm` into the range. Non-finite values pass through
    /// so the engine can reject them.
    pub fn clamp(&self, bpm: f64) -> f64 {
        if bpm.is_finite() {
            bpm.clamp(self.min_bpm, self.max_bpm)
        } else {
            bpm
        }
    }

    /// Tempo reached by applying `nudge` to `bpm`.
    pub fn nudged(&self, bpm: f64, nudge: TempoNudge) -> f64 {
        let delta = match nudge {
            TempoNudge::Up => self.fine_step,
            TempoNudge::Down => -self.fine_step,
            TempoNudge::UpCoarse => self.coarse_step,
            TempoNudge::DownCoarse => -self.coarse_step,
        };
        self.clamp(bpm + delta)
    }
}

/// One press of a tempo button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempoNudge {
    Up,
    Down,
    UpCoarse,
    DownCoarse,
}

/// Where the most recent beat falls within the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatPosition {
    /// 1-based beat within the bar
    pub beat: u32,
    pub beats_per_bar: u32,
    /// True on the downbeat
    pub accented: bool,
}

/// Position of beat `tick_count` in a bar of `beats_per_bar` beats.
///
/// `None` before the first beat. A zero bar length is treated as one.
pub fn beat_position(tick_count: u64, beats_per_bar: u32) -> Option<BeatPosition> {
    if tick_count == 0 {
        return None;
    }
    let beats_per_bar = beats_per_bar.max(1);
    let beat = ((tick_count - 1) % u64::from(beats_per_bar)) as u32 + 1;
    Some(BeatPosition {
        beat,
        beats_per_bar,
        accented: beat == 1,
    })
}

/// Tempo control surface shared by the CLI and the debug HTTP server.
pub struct MetronomeController {
    engine: MetronomeEngine,
    limits: TempoLimits,
    beats_per_bar: u32,
}

impl MetronomeController {
    pub fn new(engine: MetronomeEngine, limits: TempoLimits, beats_per_bar: u32) -> Self {
        Self {
            engine,
            limits,
            beats_per_bar: beats_per_bar.max(1),
        }
    }

    pub fn from_config(engine: MetronomeEngine, config: &MetronomeConfig) -> Self {
        Self::new(engine, TempoLimits::from(config), config.beats_per_bar)
    }

    pub fn engine(&self) -> &MetronomeEngine {
        &self.engine
    }

    pub fn limits(&self) -> TempoLimits {
        self.limits
    }

    pub fn bpm(&self) -> f64 {
        self.engine.tempo()
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.engine.snapshot()
    }

    /// Request `bpm`, clamped to the limits. Returns the tempo applied.
    pub async fn set_bpm(&self, bpm: f64) -> Result<f64, MetronomeError> {
        let applied = self.limits.clamp(bpm);
        if applied != bpm {
            tracing::debug!(requested = bpm, applied, "tempo clamped");
        }
        self.engine.set_tempo(applied).await?;
        Ok(applied)
    }

    pub async fn nudge(&self, nudge: TempoNudge) -> Result<f64, MetronomeError> {
        let target = self.limits.nudged(self.engine.tempo(), nudge);
        self.set_bpm(target).await
    }

    pub async fn start(&self) -> Result<(), MetronomeError> {
        self.engine.start().await
    }

    pub async fn stop(&self) -> Result<(), MetronomeError> {
        self.engine.stop().await
    }

    pub async fn toggle(&self) -> Result<bool, MetronomeError> {
        self.engine.toggle().await
    }

    /// Stop and release the engine; the controller is unusable afterwards.
    pub async fn shutdown(&self) -> Result<(), MetronomeError> {
        self.engine.teardown().await
    }

    pub fn beat_position(&self) -> Option<BeatPosition> {
        beat_position(self.engine.tick_count(), self.beats_per_bar)
    }
}
