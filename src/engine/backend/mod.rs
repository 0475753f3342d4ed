//! Audio collaborator abstractions for the metronome engine.
//!
//! The engine never touches audio devices directly. It asks an
//! [`AudioBackend`] to load a [`SampleSource`] once and then sequences
//! play/stop/seek calls on the returned [`SampleHandle`].

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::audio::SampleSource;
use crate::error::AudioError;

/// Future returned by every sample operation.
pub type PlaybackFuture<'a> = BoxFuture<'a, Result<(), AudioError>>;

/// Future resolving to a loaded sample.
pub type LoadFuture = BoxFuture<'static, Result<Arc<dyn SampleHandle>, AudioError>>;

/// A loaded, playable beat sample.
///
/// Implementations must tolerate overlapping calls: the engine may issue a
/// new stop/seek/play sequence before the previous one resolved.
pub trait SampleHandle: Send + Sync {
    fn play(&self) -> PlaybackFuture<'_>;
    fn stop(&self) -> PlaybackFuture<'_>;
    fn seek(&self, position: Duration) -> PlaybackFuture<'_>;
    fn unload(&self) -> PlaybackFuture<'_>;
}

/// Trait implemented by platform-specific audio backends.
pub trait AudioBackend: Send + Sync {
    /// Load `source` for repeated playback at `volume`.
    ///
    /// The returned future must not borrow the backend; the engine drives
    /// it on its own task.
    fn load(&self, source: SampleSource, volume: f32) -> LoadFuture;
}

/// Stop, rewind and play from the top. Used once per beat.
pub async fn restart(sample: &dyn SampleHandle) -> Result<(), AudioError> {
    sample.stop().await?;
    sample.seek(Duration::ZERO).await?;
    sample.play().await
}

/// Stop and rewind without playing. Used when the metronome stops.
pub async fn silence(sample: &dyn SampleHandle) -> Result<(), AudioError> {
    sample.stop().await?;
    sample.seek(Duration::ZERO).await
}

mod stub;
pub use stub::{StubBackend, StubCall, StubSample};

cfg_if::cfg_if! {
    if #[cfg(feature = "desktop-audio")] {
        mod cpal_backend;
        pub use cpal_backend::{CpalBackend, CpalSample};

        /// Backend for real playback on this platform.
        pub fn default_backend() -> Arc<dyn AudioBackend> {
            Arc::new(CpalBackend::new())
        }
    } else {
        /// Backend for real playback on this platform.
        ///
        /// Built without `desktop-audio`, so the metronome ticks silently.
        pub fn default_backend() -> Arc<dyn AudioBackend> {
            Arc::new(StubBackend::new())
        }
    }
}
