//! Engine module housing the metronome timing core.
//!
//! `core` exposes the [`MetronomeEngine`] handle and its builder, `actor`
//! owns the serialized state machine behind it, `tempo` the BPM arithmetic
//! and `backend` the audio collaborators the engine drives.

mod actor;
pub mod backend;
pub mod core;
pub mod tempo;

pub use backend::{default_backend, AudioBackend, SampleHandle, StubBackend, StubCall};
pub use core::{
    EngineBuilder, EngineSnapshot, MetronomeEngine, SampleStatus, TelemetryEvent,
    TelemetryEventKind, TickCallback,
};
pub use tempo::Tempo;
