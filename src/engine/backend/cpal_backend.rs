use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, FutureExt};

use crate::audio::{PlayerCommand, SamplePlayer, SampleSource, DEFAULT_SAMPLE_RATE};
use crate::error::AudioError;

use super::{AudioBackend, LoadFuture, PlaybackFuture, SampleHandle};

/// Desktop backend: plays the beat sample on the default cpal output device.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for CpalBackend {
    fn load(&self, source: SampleSource, volume: f32) -> LoadFuture {
        load_player(source, volume).boxed()
    }
}

async fn load_player(
    source: SampleSource,
    volume: f32,
) -> Result<Arc<dyn SampleHandle>, AudioError> {
    let sample = tokio::task::spawn_blocking(move || open_player(&source, volume))
        .await
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("sample loader task failed: {}", e),
        })??;
    Ok(Arc::new(sample))
}

fn open_player(source: &SampleSource, volume: f32) -> Result<CpalSample, AudioError> {
    let buffer = source.decode(DEFAULT_SAMPLE_RATE)?;
    if buffer.is_empty() {
        return Err(AudioError::DecodeFailed {
            reason: "sample has no frames".to_string(),
        });
    }
    tracing::debug!(
        frames = buffer.len(),
        rate = buffer.sample_rate,
        "opening output stream for beat sample"
    );
    let player = SamplePlayer::open(buffer, volume)?;
    tracing::debug!(device_rate = player.sample_rate(), "beat sample stream running");
    Ok(CpalSample { player })
}

/// Loaded sample bound to one output stream.
pub struct CpalSample {
    player: SamplePlayer,
}

impl SampleHandle for CpalSample {
    fn play(&self) -> PlaybackFuture<'_> {
        future::ready(self.player.send(PlayerCommand::Play)).boxed()
    }

    fn stop(&self) -> PlaybackFuture<'_> {
        future::ready(self.player.send(PlayerCommand::Stop)).boxed()
    }

    fn seek(&self, position: Duration) -> PlaybackFuture<'_> {
        let frame = self.player.frame_at(position.as_secs_f64());
        future::ready(self.player.send(PlayerCommand::Seek(frame))).boxed()
    }

    fn unload(&self) -> PlaybackFuture<'_> {
        future::ready(self.player.release()).boxed()
    }
}
