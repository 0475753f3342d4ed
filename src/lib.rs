// Plectrum Metronome - practice metronome timing engine
// Drift-free beat scheduling with async sample playback

// Module declarations
pub mod audio;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
#[cfg(feature = "debug_http")]
pub mod http;

// Re-exports for convenience
pub use config::AppConfig;
pub use controller::{beat_position, BeatPosition, MetronomeController, TempoLimits, TempoNudge};
pub use engine::{
    default_backend, AudioBackend, EngineBuilder, EngineSnapshot, MetronomeEngine, SampleHandle,
    SampleStatus, StubBackend, TelemetryEvent, TelemetryEventKind, Tempo,
};
pub use error::{AudioError, ErrorCode, MetronomeError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Public surface is reachable from the crate root
        let limits = TempoLimits::default();
        assert_eq!(limits.clamp(300.0), 200.0);
        assert_eq!(Tempo::new(60.0).map(|t| t.bpm()), Ok(60.0));
    }
}
