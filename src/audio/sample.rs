//! Beat sample sources and decoding
//!
//! A [`SampleSource`] names what the engine should play on each beat. Backends
//! turn it into a mono [`SampleBuffer`] and then into a playable handle.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hound::{SampleFormat, WavReader};

use super::click::generate_click_sample;
use crate::config::AudioConfig;
use crate::error::AudioError;

/// Sample rate used when synthesizing the click without a device
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Decoded mono audio ready for playback
#[derive(Clone, PartialEq)]
pub struct SampleBuffer {
    pub frames: Vec<f32>,
    pub sample_rate: u32,
}

impl fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("frames", &self.frames.len())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

impl SampleBuffer {
    pub fn new(frames: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            frames,
            sample_rate,
        }
    }

    /// The synthesized 20ms click at `sample_rate`
    pub fn click(sample_rate: u32) -> Self {
        Self::new(generate_click_sample(sample_rate), sample_rate)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames.len() as f64 * 1000.0 / self.sample_rate as f64
    }

    /// Linear-interpolation resample to `target_rate`.
    ///
    /// Good enough for a percussive cue; returns a clone when the rates match.
    pub fn resampled(&self, target_rate: u32) -> Self {
        if target_rate == 0 {
            return self.clone();
        }
        if target_rate == self.sample_rate || self.sample_rate == 0 || self.frames.is_empty() {
            return Self::new(self.frames.clone(), target_rate);
        }

        let ratio = self.sample_rate as f64 / target_rate as f64;
        let out_len = ((self.frames.len() as f64) / ratio).round().max(1.0) as usize;
        let last = self.frames.len() - 1;

        let frames = (0..out_len)
            .map(|i| {
                let pos = i as f64 * ratio;
                let idx = (pos.floor() as usize).min(last);
                let next = (idx + 1).min(last);
                let frac = (pos - idx as f64) as f32;
                self.frames[idx] + (self.frames[next] - self.frames[idx]) * frac
            })
            .collect();

        Self::new(frames, target_rate)
    }
}

/// What to play on each beat
#[derive(Debug, Clone, PartialEq)]
pub enum SampleSource {
    /// A WAV file on disk
    File(PathBuf),
    /// The synthesized noise click
    Click,
    /// Already decoded audio
    Buffer(Arc<SampleBuffer>),
    /// No audio at all; the engine ticks silently
    Silent,
}

impl SampleSource {
    /// Source selected by the audio section of the configuration
    pub fn from_config(config: &AudioConfig) -> Self {
        match &config.sample_path {
            Some(path) => SampleSource::File(path.clone()),
            None => SampleSource::Click,
        }
    }

    /// Decode the source into a mono buffer.
    ///
    /// `preferred_rate` is only used for the synthesized click. `Silent`
    /// has nothing to decode and reports [`AudioError::SampleUnavailable`].
    pub fn decode(&self, preferred_rate: u32) -> Result<SampleBuffer, AudioError> {
        match self {
            SampleSource::File(path) => decode_wav(path),
            SampleSource::Click => Ok(SampleBuffer::click(preferred_rate)),
            SampleSource::Buffer(buffer) => Ok(buffer.as_ref().clone()),
            SampleSource::Silent => Err(AudioError::SampleUnavailable {
                reason: "silent source has no audio".to_string(),
            }),
        }
    }
}

/// Decode a WAV file into mono f32 frames.
///
/// Multi-channel files are downmixed by averaging; integer formats are
/// normalized to [-1.0, 1.0].
pub fn decode_wav(path: &Path) -> Result<SampleBuffer, AudioError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    if interleaved.is_empty() {
        return Err(AudioError::DecodeFailed {
            reason: format!("{} contains no audio frames", path.display()),
        });
    }

    let frames = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok(SampleBuffer::new(frames, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn temp_wav(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "plectrum_metronome_{}_{}.wav",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_decode_stereo_int16_downmixes() {
        let path = temp_wav("stereo16");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..4 {
            writer.write_sample(i16::MAX).unwrap();
            writer.write_sample(0_i16).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = decode_wav(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(buffer.sample_rate, 44_100);
        assert_eq!(buffer.len(), 4);
        for frame in &buffer.frames {
            assert!((frame - 0.5).abs() < 0.001, "expected ~0.5, got {}", frame);
        }
    }

    #[test]
    fn test_decode_float_mono() {
        let path = temp_wav("mono_f32");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 48_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for value in [0.25_f32, -0.5, 1.0] {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = decode_wav(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(buffer.frames, vec![0.25, -0.5, 1.0]);
    }

    #[test]
    fn test_decode_missing_file_is_unavailable() {
        let err = decode_wav(Path::new("assets/sounds/missing.wav")).unwrap_err();
        assert!(matches!(err, AudioError::SampleUnavailable { .. }));
    }

    #[test]
    fn test_decode_garbage_is_decode_failure() {
        let path = temp_wav("garbage");
        std::fs::write(&path, b"definitely not RIFF").unwrap();

        let err = decode_wav(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);

        assert!(matches!(err, AudioError::DecodeFailed { .. }));
    }

    #[test]
    fn test_resample_halves_length_when_doubling_rate_down() {
        let buffer = SampleBuffer::new(vec![0.0, 1.0, 0.0, -1.0], 48_000);
        let resampled = buffer.resampled(24_000);
        assert_eq!(resampled.sample_rate, 24_000);
        assert_eq!(resampled.len(), 2);
        assert_eq!(resampled.frames, vec![0.0, 0.0]);
    }

    #[test]
    fn test_resample_interpolates_when_upsampling() {
        let buffer = SampleBuffer::new(vec![0.0, 1.0], 24_000);
        let resampled = buffer.resampled(48_000);
        assert_eq!(resampled.len(), 4);
        assert_eq!(resampled.frames[0], 0.0);
        assert!((resampled.frames[1] - 0.5).abs() < 1e-6);
        assert_eq!(resampled.frames[2], 1.0);
    }

    #[test]
    fn test_resample_empty_takes_target_rate() {
        let empty = SampleBuffer::new(Vec::new(), 96_000);
        let resampled = empty.resampled(48_000);
        assert!(resampled.is_empty());
        assert_eq!(resampled.sample_rate, 48_000);
        assert_eq!(empty.resampled(0), empty);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let buffer = SampleBuffer::click(48_000);
        assert_eq!(buffer.resampled(48_000), buffer);
    }

    #[test]
    fn test_source_from_config() {
        let mut config = AudioConfig::default();
        assert!(matches!(
            SampleSource::from_config(&config),
            SampleSource::File(_)
        ));

        config.sample_path = None;
        assert_eq!(SampleSource::from_config(&config), SampleSource::Click);
    }

    #[test]
    fn test_silent_source_has_nothing_to_decode() {
        assert!(SampleSource::Silent.decode(DEFAULT_SAMPLE_RATE).is_err());
        let click = SampleSource::Click.decode(DEFAULT_SAMPLE_RATE).unwrap();
        assert!((click.duration_ms() - 20.0).abs() < 0.1);
    }
}
