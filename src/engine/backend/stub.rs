use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{self, FutureExt};

use crate::audio::SampleSource;
use crate::error::AudioError;

use super::{AudioBackend, LoadFuture, PlaybackFuture, SampleHandle};

/// One call observed by the stub backend.
#[derive(Debug, Clone, PartialEq)]
pub enum StubCall {
    Load(SampleSource),
    Play,
    Stop,
    Seek(Duration),
    Unload,
}

/// Shared call journal plus failure switches.
#[derive(Default)]
struct StubState {
    calls: Mutex<Vec<StubCall>>,
    fail_playback: AtomicBool,
}

impl StubState {
    fn record(&self, call: StubCall) -> Result<(), AudioError> {
        self.calls
            .lock()
            .map_err(|_| AudioError::LockPoisoned {
                component: "stub_journal".to_string(),
            })?
            .push(call);
        Ok(())
    }
}

/// Desktop stub backend used for deterministic testing and CLI tooling.
///
/// No audio device is touched. Every load/play/stop/seek/unload is recorded
/// so tests can assert on the exact sequence, and failures can be injected
/// to exercise the engine's swallow-and-continue paths.
#[derive(Clone, Default)]
pub struct StubBackend {
    state: Arc<StubState>,
    load_delay: Duration,
    seek_delay: Duration,
    fail_load: bool,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every load by `delay` (uses the tokio clock).
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Hold every seek open for `delay` after recording it (uses the tokio clock).
    pub fn with_seek_delay(mut self, delay: Duration) -> Self {
        self.seek_delay = delay;
        self
    }

    /// Make every load fail with [`AudioError::SampleUnavailable`].
    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Toggle failure of play/stop/seek on all loaded samples.
    pub fn set_fail_playback(&self, fail: bool) {
        self.state.fail_playback.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<StubCall> {
        self.state
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_calls(&self) {
        self.state
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn count(&self, predicate: impl Fn(&StubCall) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    pub fn loads(&self) -> usize {
        self.count(|call| matches!(call, StubCall::Load(_)))
    }

    pub fn plays(&self) -> usize {
        self.count(|call| matches!(call, StubCall::Play))
    }

    pub fn stops(&self) -> usize {
        self.count(|call| matches!(call, StubCall::Stop))
    }

    pub fn unloads(&self) -> usize {
        self.count(|call| matches!(call, StubCall::Unload))
    }
}

impl AudioBackend for StubBackend {
    fn load(&self, source: SampleSource, _volume: f32) -> LoadFuture {
        load_stub(
            Arc::clone(&self.state),
            source,
            self.load_delay,
            self.seek_delay,
            self.fail_load,
        )
        .boxed()
    }
}

async fn load_stub(
    state: Arc<StubState>,
    source: SampleSource,
    delay: Duration,
    seek_delay: Duration,
    fail: bool,
) -> Result<Arc<dyn SampleHandle>, AudioError> {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    state.record(StubCall::Load(source.clone()))?;
    if fail {
        return Err(AudioError::SampleUnavailable {
            reason: format!("stub configured to fail loading {:?}", source),
        });
    }
    Ok(Arc::new(StubSample {
        state,
        seek_delay,
        released: AtomicBool::new(false),
    }))
}

/// Sample handle produced by [`StubBackend`].
pub struct StubSample {
    state: Arc<StubState>,
    seek_delay: Duration,
    released: AtomicBool,
}

impl StubSample {
    fn apply(&self, call: StubCall) -> Result<(), AudioError> {
        self.state.record(call)?;
        if self.released.load(Ordering::SeqCst) {
            return Err(AudioError::SampleReleased);
        }
        if self.state.fail_playback.load(Ordering::SeqCst) {
            return Err(AudioError::PlaybackFailed {
                reason: "stub configured to fail playback".to_string(),
            });
        }
        Ok(())
    }
}

impl SampleHandle for StubSample {
    fn play(&self) -> PlaybackFuture<'_> {
        future::ready(self.apply(StubCall::Play)).boxed()
    }

    fn stop(&self) -> PlaybackFuture<'_> {
        future::ready(self.apply(StubCall::Stop)).boxed()
    }

    fn seek(&self, position: Duration) -> PlaybackFuture<'_> {
        async move {
            let recorded = self.apply(StubCall::Seek(position));
            if recorded.is_ok() && !self.seek_delay.is_zero() {
                tokio::time::sleep(self.seek_delay).await;
            }
            recorded
        }
        .boxed()
    }

    fn unload(&self) -> PlaybackFuture<'_> {
        let result = if self.released.swap(true, Ordering::SeqCst) {
            Err(AudioError::SampleReleased)
        } else {
            self.state.record(StubCall::Unload)
        };
        future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::backend::{restart, silence};

    #[tokio::test]
    async fn test_load_records_source() {
        let backend = StubBackend::new();
        let sample = backend.load(SampleSource::Click, 0.7).await.unwrap();

        assert_eq!(backend.calls(), vec![StubCall::Load(SampleSource::Click)]);
        sample.play().await.unwrap();
        assert_eq!(backend.plays(), 1);
    }

    #[tokio::test]
    async fn test_failing_load() {
        let backend = StubBackend::new().failing_load();
        let result = backend.load(SampleSource::Click, 0.7).await;
        assert!(matches!(result, Err(AudioError::SampleUnavailable { .. })));
        assert_eq!(backend.loads(), 1);
    }

    #[tokio::test]
    async fn test_restart_sequence() {
        let backend = StubBackend::new();
        let sample = backend.load(SampleSource::Click, 0.7).await.unwrap();
        backend.clear_calls();

        restart(sample.as_ref()).await.unwrap();
        silence(sample.as_ref()).await.unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                StubCall::Stop,
                StubCall::Seek(Duration::ZERO),
                StubCall::Play,
                StubCall::Stop,
                StubCall::Seek(Duration::ZERO),
            ]
        );
    }

    #[tokio::test]
    async fn test_playback_failure_aborts_restart() {
        let backend = StubBackend::new();
        let sample = backend.load(SampleSource::Click, 0.7).await.unwrap();
        backend.clear_calls();
        backend.set_fail_playback(true);

        assert!(restart(sample.as_ref()).await.is_err());
        assert_eq!(backend.calls(), vec![StubCall::Stop]);
    }

    #[tokio::test]
    async fn test_unload_only_once() {
        let backend = StubBackend::new();
        let sample = backend.load(SampleSource::Click, 0.7).await.unwrap();

        sample.unload().await.unwrap();
        assert_eq!(sample.unload().await, Err(AudioError::SampleReleased));
        assert_eq!(sample.play().await, Err(AudioError::SampleReleased));
        assert_eq!(backend.unloads(), 1);
    }
}
