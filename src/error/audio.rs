// Audio error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Audio error code constants
///
/// Single source of truth for the numeric codes carried by [`AudioError`].
///
/// Error code range: 1001-1007
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Sample resource could not be loaded
    pub const SAMPLE_UNAVAILABLE: i32 = 1001;

    /// Sample file could not be decoded
    pub const DECODE_FAILED: i32 = 1002;

    /// Failed to open audio stream
    pub const STREAM_OPEN_FAILED: i32 = 1003;

    /// Hardware error occurred
    pub const HARDWARE_ERROR: i32 = 1004;

    /// A play/stop/seek request was rejected
    pub const PLAYBACK_FAILED: i32 = 1005;

    /// Sample was already unloaded
    pub const SAMPLE_RELEASED: i32 = 1006;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1007;
}

/// Log an audio error with structured context
///
/// Audio errors are never fatal for the metronome (it keeps ticking
/// silently), so they are reported at warn level.
pub fn log_audio_error(err: &AudioError, context: &str) {
    warn!(
        "Audio error in {}: code={}, component=SamplePlayer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover the audio collaborator: sample loading and decoding,
/// output stream management, and per-beat playback requests.
///
/// Error code ranges: 1001-1007
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Sample resource could not be found or loaded
    SampleUnavailable { reason: String },

    /// Sample data could not be decoded
    DecodeFailed { reason: String },

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Hardware error occurred
    HardwareError { details: String },

    /// Play, stop or seek was rejected by the player
    PlaybackFailed { reason: String },

    /// The sample handle was unloaded and can no longer play
    SampleReleased,

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::SampleUnavailable { .. } => AudioErrorCodes::SAMPLE_UNAVAILABLE,
            AudioError::DecodeFailed { .. } => AudioErrorCodes::DECODE_FAILED,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::PlaybackFailed { .. } => AudioErrorCodes::PLAYBACK_FAILED,
            AudioError::SampleReleased => AudioErrorCodes::SAMPLE_RELEASED,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::SampleUnavailable { reason } => {
                format!("Sample unavailable: {}", reason)
            }
            AudioError::DecodeFailed { reason } => format!("Failed to decode sample: {}", reason),
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::HardwareError { details } => format!("Hardware error: {}", details),
            AudioError::PlaybackFailed { reason } => format!("Playback failed: {}", reason),
            AudioError::SampleReleased => "Sample already released".to_string(),
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

/// Convert from std::io::Error to AudioError
impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                AudioError::SampleUnavailable {
                    reason: io.to_string(),
                }
            }
            other => AudioError::DecodeFailed {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_codes() {
        assert_eq!(
            AudioError::SampleUnavailable {
                reason: "missing".to_string()
            }
            .code(),
            1001
        );
        assert_eq!(
            AudioError::DecodeFailed {
                reason: "bad header".to_string()
            }
            .code(),
            1002
        );
        assert_eq!(
            AudioError::StreamOpenFailed {
                reason: "no device".to_string()
            }
            .code(),
            1003
        );
        assert_eq!(
            AudioError::HardwareError {
                details: "test".to_string()
            }
            .code(),
            1004
        );
        assert_eq!(
            AudioError::PlaybackFailed {
                reason: "test".to_string()
            }
            .code(),
            1005
        );
        assert_eq!(AudioError::SampleReleased.code(), 1006);
        assert_eq!(
            AudioError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            1007
        );
    }

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::PlaybackFailed {
            reason: "device busy".to_string(),
        };
        assert!(err.to_string().contains("code 1005"));
        assert!(err.message().contains("device busy"));

        let err = AudioError::LockPoisoned {
            component: "sample_player".to_string(),
        };
        assert!(err.message().contains("sample_player"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test error");
        let audio_err: AudioError = io_err.into();

        match audio_err {
            AudioError::HardwareError { details } => {
                assert!(details.contains("test error"));
            }
            _ => panic!("Expected HardwareError variant"),
        }
    }

    #[test]
    fn test_missing_wav_maps_to_unavailable() {
        let err = hound::WavReader::open("definitely/not/here.wav").err().unwrap();
        let audio_err: AudioError = err.into();
        assert_eq!(audio_err.code(), AudioErrorCodes::SAMPLE_UNAVAILABLE);
    }
}
