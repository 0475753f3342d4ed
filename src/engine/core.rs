//! MetronomeEngine: handle to the beat-producing actor.
//!
//! The handle is cheap to clone and only talks to the actor through its
//! command queue. Reads go through a watch channel so accessors never wait
//! behind an in-flight retune.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::audio::SampleSource;
use crate::config::{AudioConfig, EngineConfig};
use crate::engine::actor::{Command, EngineActor, SampleSlot};
use crate::engine::backend::{AudioBackend, SampleHandle};
use crate::engine::tempo::Tempo;
use crate::error::MetronomeError;

/// Consumer notification invoked once per beat.
pub type TickCallback = Arc<dyn Fn() + Send + Sync>;

/// Lifecycle of the beat sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Loading,
    Ready,
    Unavailable,
    Released,
}

/// Point-in-time view of the engine state published after every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub bpm: f64,
    pub running: bool,
    pub tick_count: u64,
    pub sample: SampleStatus,
    pub disposed: bool,
}

/// Telemetry event emitted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp_ms: u64,
    pub kind: TelemetryEventKind,
    pub detail: Option<String>,
}

/// Types of telemetry events supported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEventKind {
    EngineStarted { bpm: f64 },
    EngineStopped,
    TempoChanged { bpm: f64 },
    Tick { count: u64, bpm: f64 },
    SampleReady,
    SampleUnavailable,
    PlaybackFailed { beat: u64 },
    Disposed,
}

/// Handle to a running metronome actor.
///
/// All mutating operations are serialized by the actor in the order they
/// were issued. Dropping every clone of the handle tears the engine down.
#[derive(Clone)]
pub struct MetronomeEngine {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<EngineSnapshot>,
    telemetry_tx: broadcast::Sender<TelemetryEvent>,
}

impl MetronomeEngine {
    /// Start configuring an engine at `bpm` that plays through `backend`.
    pub fn builder(bpm: f64, backend: Arc<dyn AudioBackend>) -> EngineBuilder {
        EngineBuilder::new(bpm, backend)
    }

    /// Begin emitting beats. The first beat fires before this resolves.
    ///
    /// Calling it while already running restarts from beat 1.
    pub async fn start(&self) -> Result<(), MetronomeError> {
        self.request(Command::Start).await?
    }

    /// Cancel the timer and silence the sample. Idempotent, also after teardown.
    pub async fn stop(&self) -> Result<(), MetronomeError> {
        match self.request(Command::Stop).await {
            Ok(()) | Err(MetronomeError::Disposed) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Store a new tempo; when running, restart from beat 1 at that tempo.
    pub async fn set_tempo(&self, bpm: f64) -> Result<(), MetronomeError> {
        let tempo = Tempo::new(bpm)?;
        self.request(|reply| Command::SetTempo(tempo, reply)).await?
    }

    /// Stop when running, start otherwise. Returns the new run state.
    pub async fn toggle(&self) -> Result<bool, MetronomeError> {
        self.request(Command::Toggle).await?
    }

    /// Stop, release the sample and refuse further starts.
    pub async fn teardown(&self) -> Result<(), MetronomeError> {
        match self.request(Command::Teardown).await {
            Ok(()) | Err(MetronomeError::Disposed) => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub fn tempo(&self) -> f64 {
        self.state.borrow().bpm
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    pub fn tick_count(&self) -> u64 {
        self.state.borrow().tick_count
    }

    pub fn sample_status(&self) -> SampleStatus {
        self.state.borrow().sample
    }

    pub fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn watch_state(&self) -> watch::Receiver<EngineSnapshot> {
        self.state.clone()
    }

    pub fn subscribe_telemetry(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.telemetry_tx.subscribe()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, MetronomeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| MetronomeError::Disposed)?;
        reply_rx.await.map_err(|_| MetronomeError::Disposed)
    }
}

/// Configures and spawns a [`MetronomeEngine`].
pub struct EngineBuilder {
    bpm: f64,
    backend: Arc<dyn AudioBackend>,
    source: SampleSource,
    preloaded: Option<Arc<dyn SampleHandle>>,
    volume: f32,
    on_tick: Option<TickCallback>,
    config: EngineConfig,
}

impl EngineBuilder {
    fn new(bpm: f64, backend: Arc<dyn AudioBackend>) -> Self {
        let audio = AudioConfig::default();
        Self {
            bpm,
            backend,
            source: SampleSource::Click,
            preloaded: None,
            volume: audio.volume,
            on_tick: None,
            config: EngineConfig::default(),
        }
    }

    /// Sample to load right after spawning. Defaults to the synthesized click.
    pub fn sample(mut self, source: SampleSource) -> Self {
        self.source = source;
        self
    }

    /// Use an already loaded sample and skip loading entirely.
    pub fn preloaded(mut self, sample: Arc<dyn SampleHandle>) -> Self {
        self.preloaded = Some(sample);
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Take sample source and volume from the audio configuration section.
    pub fn audio(self, audio: &AudioConfig) -> Self {
        self.sample(SampleSource::from_config(audio))
            .volume(audio.volume)
    }

    pub fn on_tick<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_tick = Some(Arc::new(callback));
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the tempo, start loading the sample and spawn the actor on
    /// the current tokio runtime.
    pub fn spawn(self) -> Result<MetronomeEngine, MetronomeError> {
        let tempo = Tempo::new(self.bpm)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| MetronomeError::RuntimeUnavailable)?;

        let (command_tx, command_rx) = mpsc::channel(self.config.command_queue_size.max(1));
        let (telemetry_tx, _) = broadcast::channel(self.config.telemetry_buffer.max(1));

        let (sample, load) = match (self.preloaded, self.source) {
            (Some(handle), _) => (SampleSlot::Ready(handle), None),
            (None, SampleSource::Silent) => (SampleSlot::Unavailable, None),
            (None, source) => {
                tracing::debug!(?source, "loading beat sample");
                let load = runtime.spawn(self.backend.load(source, self.volume));
                (SampleSlot::Loading, Some(load))
            }
        };

        let (state_tx, state_rx) = watch::channel(EngineSnapshot {
            bpm: tempo.bpm(),
            running: false,
            tick_count: 0,
            sample: sample.status(),
            disposed: false,
        });

        let actor = EngineActor {
            tempo,
            timer: None,
            tick_count: 0,
            sample,
            load,
            playback: None,
            on_tick: self.on_tick,
            retune_grace: self.config.retune_grace(),
            disposed: false,
            state: state_tx,
            telemetry: telemetry_tx.clone(),
            epoch: Instant::now(),
        };
        runtime.spawn(actor.run(command_rx));

        tracing::info!(bpm = tempo.bpm(), "metronome engine spawned");
        Ok(MetronomeEngine {
            commands: command_tx,
            state: state_rx,
            telemetry_tx,
        })
    }
}
