//! The task that owns all metronome state.
//!
//! Commands, sample-load completion and timer ticks are multiplexed in one
//! biased `select!`, commands first. A tick can therefore never be observed
//! after the command that cancelled its timer has been answered.

use std::future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::engine::backend::{restart, silence, SampleHandle};
use crate::engine::core::{
    EngineSnapshot, SampleStatus, TelemetryEvent, TelemetryEventKind, TickCallback,
};
use crate::engine::tempo::Tempo;
use crate::error::{log_audio_error, AudioError, MetronomeError};

type Reply<T> = oneshot::Sender<T>;
type LoadTask = JoinHandle<Result<Arc<dyn SampleHandle>, AudioError>>;

/// Intents accepted by the actor, answered in FIFO order.
pub(crate) enum Command {
    Start(Reply<Result<(), MetronomeError>>),
    Stop(Reply<()>),
    SetTempo(Tempo, Reply<Result<(), MetronomeError>>),
    Toggle(Reply<Result<bool, MetronomeError>>),
    Teardown(Reply<()>),
}

/// Where the beat sample is in its lifecycle.
pub(crate) enum SampleSlot {
    Loading,
    Ready(Arc<dyn SampleHandle>),
    Unavailable,
    Released,
}

impl SampleSlot {
    pub(crate) fn status(&self) -> SampleStatus {
        match self {
            SampleSlot::Loading => SampleStatus::Loading,
            SampleSlot::Ready(_) => SampleStatus::Ready,
            SampleSlot::Unavailable => SampleStatus::Unavailable,
            SampleSlot::Released => SampleStatus::Released,
        }
    }
}

pub(crate) struct EngineActor {
    pub(crate) tempo: Tempo,
    /// `Some` exactly while running.
    pub(crate) timer: Option<Interval>,
    pub(crate) tick_count: u64,
    pub(crate) sample: SampleSlot,
    pub(crate) load: Option<LoadTask>,
    /// In-flight per-beat restart. At most one exists; a newer beat or a halt aborts it.
    pub(crate) playback: Option<JoinHandle<()>>,
    pub(crate) on_tick: Option<TickCallback>,
    pub(crate) retune_grace: Duration,
    pub(crate) disposed: bool,
    pub(crate) state: watch::Sender<EngineSnapshot>,
    pub(crate) telemetry: broadcast::Sender<TelemetryEvent>,
    pub(crate) epoch: Instant,
}

impl EngineActor {
    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => {
                    let Some(command) = command else {
                        tracing::debug!("all engine handles dropped, disposing");
                        self.dispose().await;
                        break;
                    };
                    if self.handle(command).await.is_break() {
                        break;
                    }
                }
                loaded = poll_load(&mut self.load) => self.on_loaded(loaded),
                _ = next_tick(&mut self.timer) => self.tick(),
            }
        }
        tracing::debug!("metronome actor exited");
    }

    async fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Start(reply) => {
                let result = self.start().await;
                let _ = reply.send(result);
            }
            Command::Stop(reply) => {
                self.stop().await;
                let _ = reply.send(());
            }
            Command::SetTempo(tempo, reply) => {
                let result = self.set_tempo(tempo).await;
                let _ = reply.send(result);
            }
            Command::Toggle(reply) => {
                let result = if self.timer.is_some() {
                    self.stop().await;
                    Ok(false)
                } else {
                    self.start().await.map(|()| true)
                };
                let _ = reply.send(result);
            }
            Command::Teardown(reply) => {
                self.dispose().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn start(&mut self) -> Result<(), MetronomeError> {
        if self.disposed {
            return Err(MetronomeError::Disposed);
        }
        if self.timer.is_some() {
            self.halt().await;
        }
        self.begin();
        Ok(())
    }

    async fn stop(&mut self) {
        let was_running = self.halt().await;
        self.publish();
        if was_running {
            tracing::info!("metronome stopped");
            self.emit(TelemetryEventKind::EngineStopped, None);
        }
    }

    async fn set_tempo(&mut self, tempo: Tempo) -> Result<(), MetronomeError> {
        if self.disposed {
            return Err(MetronomeError::Disposed);
        }
        let was_running = self.halt().await;
        self.tempo = tempo;
        self.publish();
        tracing::info!(bpm = tempo.bpm(), was_running, "tempo changed");
        self.emit(TelemetryEventKind::TempoChanged { bpm: tempo.bpm() }, None);

        if was_running {
            if !self.retune_grace.is_zero() {
                time::sleep(self.retune_grace).await;
            }
            self.begin();
        }
        Ok(())
    }

    /// Install a fresh timer and fire beat 1 immediately.
    fn begin(&mut self) {
        let period = self.tempo.period();
        let mut timer = time::interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.timer = Some(timer);
        self.tick_count = 0;

        tracing::info!(bpm = self.tempo.bpm(), ?period, "metronome started");
        self.emit(
            TelemetryEventKind::EngineStarted {
                bpm: self.tempo.bpm(),
            },
            None,
        );
        self.tick();
    }

    /// Drop the timer and silence the sample. Returns whether a timer was active.
    async fn halt(&mut self) -> bool {
        let was_running = self.timer.take().is_some();
        self.tick_count = 0;
        if let Some(playback) = self.playback.take() {
            playback.abort();
        }
        if let SampleSlot::Ready(sample) = &self.sample {
            if let Err(err) = silence(sample.as_ref()).await {
                tracing::debug!(error = %err, "failed to silence beat sample");
            }
        }
        was_running
    }

    fn tick(&mut self) {
        self.tick_count += 1;
        let beat = self.tick_count;
        self.publish();

        if let SampleSlot::Ready(sample) = &self.sample {
            let sample = Arc::clone(sample);
            let telemetry = self.telemetry.clone();
            let epoch = self.epoch;
            let playback = tokio::spawn(async move {
                if let Err(err) = restart(sample.as_ref()).await {
                    tracing::debug!(beat, error = %err, "beat sample playback failed");
                    send_event(
                        &telemetry,
                        epoch,
                        TelemetryEventKind::PlaybackFailed { beat },
                        Some(err.to_string()),
                    );
                }
            });
            if let Some(previous) = self.playback.replace(playback) {
                previous.abort();
            }
        }

        if let Some(on_tick) = &self.on_tick {
            on_tick();
        }

        tracing::trace!(beat, "tick");
        self.emit(
            TelemetryEventKind::Tick {
                count: beat,
                bpm: self.tempo.bpm(),
            },
            None,
        );
    }

    fn on_loaded(&mut self, loaded: Result<Arc<dyn SampleHandle>, AudioError>) {
        match loaded {
            Ok(sample) => {
                tracing::info!("beat sample ready");
                self.sample = SampleSlot::Ready(sample);
                self.emit(TelemetryEventKind::SampleReady, None);
            }
            Err(err) => {
                log_audio_error(&err, "beat sample load");
                self.sample = SampleSlot::Unavailable;
                self.emit(TelemetryEventKind::SampleUnavailable, Some(err.to_string()));
            }
        }
        self.publish();
    }

    /// Teardown path, shared by explicit teardown and dropped handles.
    async fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let was_running = self.halt().await;
        if let Some(load) = self.load.take() {
            load.abort();
        }
        let previous = std::mem::replace(&mut self.sample, SampleSlot::Released);
        if let SampleSlot::Ready(sample) = previous {
            if let Err(err) = sample.unload().await {
                tracing::debug!(error = %err, "failed to unload beat sample");
            }
        }
        self.disposed = true;
        self.publish();

        if was_running {
            self.emit(TelemetryEventKind::EngineStopped, None);
        }
        tracing::info!("metronome disposed");
        self.emit(TelemetryEventKind::Disposed, None);
    }

    fn publish(&self) {
        let snapshot = EngineSnapshot {
            bpm: self.tempo.bpm(),
            running: self.timer.is_some(),
            tick_count: self.tick_count,
            sample: self.sample.status(),
            disposed: self.disposed,
        };
        self.state.send_replace(snapshot);
    }

    fn emit(&self, kind: TelemetryEventKind, detail: Option<String>) {
        send_event(&self.telemetry, self.epoch, kind, detail);
    }
}

fn send_event(
    tx: &broadcast::Sender<TelemetryEvent>,
    epoch: Instant,
    kind: TelemetryEventKind,
    detail: Option<String>,
) {
    let timestamp_ms = Instant::now().saturating_duration_since(epoch).as_millis() as u64;
    let _ = tx.send(TelemetryEvent {
        timestamp_ms,
        kind,
        detail,
    });
}

async fn poll_load(load: &mut Option<LoadTask>) -> Result<Arc<dyn SampleHandle>, AudioError> {
    let Some(task) = load.as_mut() else {
        return future::pending().await;
    };
    let result = task.await;
    *load = None;
    result.unwrap_or_else(|err| {
        Err(AudioError::SampleUnavailable {
            reason: format!("sample loader task failed: {}", err),
        })
    })
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => future::pending().await,
    }
}
