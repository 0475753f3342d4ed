// Metronome engine error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Metronome error code constants
///
/// Error code range: 3001-3003
pub struct MetronomeErrorCodes {}

impl MetronomeErrorCodes {
    /// BPM is zero, negative, NaN or infinite
    pub const INVALID_TEMPO: i32 = 3001;

    /// Engine was torn down
    pub const DISPOSED: i32 = 3002;

    /// No tokio runtime to host the engine task
    pub const RUNTIME_UNAVAILABLE: i32 = 3003;
}

/// Log an engine error with structured context
pub fn log_metronome_error(err: &MetronomeError, context: &str) {
    error!(
        "Metronome error in {}: code={}, component=MetronomeEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors surfaced to callers of the engine
///
/// Audio failures never appear here: they are swallowed on the tick path.
/// Only synchronous setup (tempo validation, runtime lookup) and use after
/// teardown are reported.
#[derive(Debug, Clone, PartialEq)]
pub enum MetronomeError {
    /// Tempo must be a finite, positive number of beats per minute
    InvalidTempo { bpm: f64 },

    /// Engine was torn down and no longer accepts commands
    Disposed,

    /// Engine was built outside of a tokio runtime
    RuntimeUnavailable,
}

impl ErrorCode for MetronomeError {
    fn code(&self) -> i32 {
        match self {
            MetronomeError::InvalidTempo { .. } => MetronomeErrorCodes::INVALID_TEMPO,
            MetronomeError::Disposed => MetronomeErrorCodes::DISPOSED,
            MetronomeError::RuntimeUnavailable => MetronomeErrorCodes::RUNTIME_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            MetronomeError::InvalidTempo { bpm } => {
                format!("BPM must be a finite value greater than 0 (got {})", bpm)
            }
            MetronomeError::Disposed => {
                "Metronome engine was torn down. Build a new engine.".to_string()
            }
            MetronomeError::RuntimeUnavailable => {
                "Metronome engine requires a running tokio runtime".to_string()
            }
        }
    }
}

impl fmt::Display for MetronomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MetronomeError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for MetronomeError {}
