//! Sample playback on a cpal output stream
//!
//! One [`SamplePlayer`] owns one output stream that plays a single decoded
//! sample on demand. The stream lives on a dedicated thread (cpal streams
//! are not `Send` on every host); the control side talks to the audio
//! callback through a lock-free rtrb queue of [`PlayerCommand`]s.
//!
//! ```text
//! SamplePlayer::open()
//!   └─> owner thread: build_output_stream() + play()
//!       └─> output callback [real-time thread]
//!           ├─> drain PlayerCommand queue (Stop / Seek / Play)
//!           └─> copy sample frames * volume into every channel
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};

use super::sample::SampleBuffer;
use crate::error::AudioError;

/// Commands are tiny; 64 slots covers far more than one beat's worth
const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Control messages consumed by the output callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Stop,
    Seek(u64),
    Play,
}

/// State shared between the control side and the audio callback
#[derive(Debug, Default)]
struct PlaybackCursor {
    /// Next frame of the sample to render
    position: AtomicU64,
    /// Whether the callback is currently rendering the sample
    playing: AtomicBool,
}

/// Plays one sample on the default output device
pub struct SamplePlayer {
    commands: Mutex<Producer<PlayerCommand>>,
    cursor: Arc<PlaybackCursor>,
    /// Dropping the sender releases the owner thread and its stream
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
    sample_rate: u32,
    frames: usize,
}

impl SamplePlayer {
    /// Open the default output device and prepare `buffer` for playback.
    ///
    /// Blocks until the stream is running or failed to open; call it from a
    /// blocking context.
    pub fn open(buffer: SampleBuffer, volume: f32) -> Result<Self, AudioError> {
        let (producer, consumer) = RingBuffer::<PlayerCommand>::new(COMMAND_QUEUE_CAPACITY);
        let cursor = Arc::new(PlaybackCursor::default());
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<u32, AudioError>>(1);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_cursor = Arc::clone(&cursor);
        let frames = buffer.len();
        thread::Builder::new()
            .name("metronome-output".to_string())
            .spawn(move || {
                let stream = match create_output_stream(buffer, volume, consumer, thread_cursor) {
                    Ok((stream, rate)) => {
                        let _ = ready_tx.send(Ok(rate));
                        stream
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                // Parks until the player is unloaded or dropped.
                let _ = shutdown_rx.recv();
                drop(stream);
            })?;

        let sample_rate = ready_rx.recv().map_err(|_| AudioError::StreamOpenFailed {
            reason: "output thread exited before the stream was ready".to_string(),
        })??;

        Ok(Self {
            commands: Mutex::new(producer),
            cursor,
            shutdown: Mutex::new(Some(shutdown_tx)),
            sample_rate,
            frames,
        })
    }

    /// Device sample rate the stream was opened with
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_released(&self) -> bool {
        self.shutdown
            .lock()
            .map(|guard| guard.is_none())
            .unwrap_or(true)
    }

    /// Queue a command for the audio callback
    pub fn send(&self, command: PlayerCommand) -> Result<(), AudioError> {
        if self.is_released() {
            return Err(AudioError::SampleReleased);
        }
        let mut producer = self.commands.lock().map_err(|_| AudioError::LockPoisoned {
            component: "sample_player".to_string(),
        })?;
        producer
            .push(command)
            .map_err(|_| AudioError::PlaybackFailed {
                reason: "player command queue full".to_string(),
            })
    }

    /// Convert a seek offset in seconds to a frame index inside the sample
    pub fn frame_at(&self, seconds: f64) -> u64 {
        let frame = (seconds * self.sample_rate as f64).round().max(0.0) as u64;
        frame.min(self.frames as u64)
    }

    /// Stop the stream and release the device. Later commands fail.
    pub fn release(&self) -> Result<(), AudioError> {
        let mut guard = self.shutdown.lock().map_err(|_| AudioError::LockPoisoned {
            component: "sample_player".to_string(),
        })?;
        match guard.take() {
            Some(sender) => {
                drop(sender);
                Ok(())
            }
            None => Err(AudioError::SampleReleased),
        }
    }
}

fn create_output_stream(
    buffer: SampleBuffer,
    volume: f32,
    mut commands: Consumer<PlayerCommand>,
    cursor: Arc<PlaybackCursor>,
) -> Result<(cpal::Stream, u32), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::StreamOpenFailed {
            reason: "No default output device found".to_string(),
        })?;

    let config = device
        .default_output_config()
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Failed to get default output config: {:?}", e),
        })?;

    let stream_config: cpal::StreamConfig = config.clone().into();
    let channels_count = stream_config.channels as usize;
    let device_rate = stream_config.sample_rate.0;
    let samples = buffer.resampled(device_rate).frames;
    let gain = volume.clamp(0.0, 1.0);

    let err_fn = |err: cpal::StreamError| tracing::warn!(error = %err, "output stream error");

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                while let Ok(command) = commands.pop() {
                    match command {
                        PlayerCommand::Stop => cursor.playing.store(false, Ordering::Relaxed),
                        PlayerCommand::Seek(frame) => {
                            cursor.position.store(frame, Ordering::Relaxed)
                        }
                        PlayerCommand::Play => cursor.playing.store(true, Ordering::Relaxed),
                    }
                }

                let mut playing = cursor.playing.load(Ordering::Relaxed);
                let mut pos = cursor.position.load(Ordering::Relaxed) as usize;

                for frame in data.chunks_mut(channels_count) {
                    let mut value = 0.0;
                    if playing {
                        if pos < samples.len() {
                            value = samples[pos] * gain;
                            pos += 1;
                        } else {
                            playing = false;
                        }
                    }
                    for out in frame.iter_mut() {
                        *out = value;
                    }
                }

                cursor.position.store(pos as u64, Ordering::Relaxed);
                cursor.playing.store(playing, Ordering::Relaxed);
            },
            err_fn,
            None,
        ),
        _ => {
            return Err(AudioError::StreamOpenFailed {
                reason: "Only F32 sample format is currently supported for output".to_string(),
            })
        }
    }
    .map_err(|e| AudioError::StreamOpenFailed {
        reason: format!("{:?}", e),
    })?;

    stream.play().map_err(|e| AudioError::HardwareError {
        details: format!("Output start failed: {}", e),
    })?;

    Ok((stream, device_rate))
}
