use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plectrum_metronome::config::AppConfig;
use plectrum_metronome::controller::{beat_position, MetronomeController};
use plectrum_metronome::engine::{
    default_backend, AudioBackend, MetronomeEngine, StubBackend, TelemetryEvent,
    TelemetryEventKind,
};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "metronome_cli",
    about = "Run and inspect the practice metronome engine"
)]
struct Cli {
    /// Configuration file (defaults to assets/metronome_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tick at one tempo and print a JSON line per beat
    Run {
        /// Tempo in BPM, clamped to the configured range
        #[arg(long)]
        bpm: Option<f64>,
        #[arg(long, default_value_t = 8)]
        beats: u64,
        /// WAV file to play instead of the configured sample
        #[arg(long)]
        sample: Option<PathBuf>,
        /// Tick without opening an audio device
        #[arg(long)]
        silent: bool,
    },
    /// Retune through several tempos while running
    Sweep {
        #[arg(long, value_delimiter = ',', required = true)]
        tempos: Vec<f64>,
        #[arg(long, default_value_t = 4)]
        beats: u64,
        #[arg(long)]
        silent: bool,
    },
    /// Print the effective configuration as JSON
    Config,
    /// Serve the debug HTTP API (needs the debug_http feature)
    Serve {
        #[arg(long, default_value = "127.0.0.1:8787")]
        addr: SocketAddr,
        #[arg(long)]
        silent: bool,
    },
}

/// One printed beat.
#[derive(Debug, Serialize)]
struct TickLine {
    tick: u64,
    beat: u32,
    accented: bool,
    bpm: f64,
    elapsed_ms: u64,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Run {
                bpm,
                beats,
                sample,
                silent,
            } => run_ticks(config, bpm, beats, sample, silent).await,
            Commands::Sweep {
                tempos,
                beats,
                silent,
            } => run_sweep(config, &tempos, beats, silent).await,
            Commands::Config => run_config(&config),
            Commands::Serve { addr, silent } => run_serve(config, addr, silent).await,
        }
    })
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn build_controller(config: &AppConfig, silent: bool) -> Result<MetronomeController> {
    let backend: Arc<dyn AudioBackend> = if silent {
        Arc::new(StubBackend::new())
    } else {
        default_backend()
    };
    let engine = MetronomeEngine::builder(config.metronome.initial_bpm, backend)
        .audio(&config.audio)
        .config(config.engine.clone())
        .spawn()
        .context("spawning metronome engine")?;
    Ok(MetronomeController::from_config(engine, &config.metronome))
}

async fn run_ticks(
    mut config: AppConfig,
    bpm: Option<f64>,
    beats: u64,
    sample: Option<PathBuf>,
    silent: bool,
) -> Result<ExitCode> {
    if sample.is_some() {
        config.audio.sample_path = sample;
    }
    let controller = build_controller(&config, silent)?;
    let mut events = controller.engine().subscribe_telemetry();

    let requested = bpm.unwrap_or(config.metronome.initial_bpm);
    let applied = controller
        .set_bpm(requested)
        .await
        .with_context(|| format!("applying tempo {}", requested))?;
    controller.start().await.context("starting metronome")?;

    let mut printer = TickPrinter::new(config.metronome.beats_per_bar);
    printer.collect(&mut events, applied, beats).await?;

    controller.shutdown().await.context("shutting down metronome")?;
    Ok(ExitCode::from(0))
}

async fn run_sweep(config: AppConfig, tempos: &[f64], beats: u64, silent: bool) -> Result<ExitCode> {
    let controller = build_controller(&config, silent)?;
    let mut events = controller.engine().subscribe_telemetry();
    let mut printer = TickPrinter::new(config.metronome.beats_per_bar);

    for (index, &requested) in tempos.iter().enumerate() {
        while events.try_recv().is_ok() {}
        let applied = controller
            .set_bpm(requested)
            .await
            .with_context(|| format!("applying tempo {}", requested))?;
        if index == 0 {
            controller.start().await.context("starting metronome")?;
        }
        printer.collect(&mut events, applied, beats).await?;
    }

    controller.shutdown().await.context("shutting down metronome")?;
    Ok(ExitCode::from(0))
}

fn run_config(config: &AppConfig) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(ExitCode::from(0))
}

#[cfg(feature = "debug_http")]
async fn run_serve(config: AppConfig, addr: SocketAddr, silent: bool) -> Result<ExitCode> {
    let controller = Arc::new(build_controller(&config, silent)?);
    let token = plectrum_metronome::http::token_from_env();

    tokio::select! {
        result = plectrum_metronome::http::serve(Arc::clone(&controller), addr, token) => result?,
        signal = tokio::signal::ctrl_c() => signal.context("waiting for ctrl-c")?,
    }

    controller.shutdown().await.context("shutting down metronome")?;
    Ok(ExitCode::from(0))
}

#[cfg(not(feature = "debug_http"))]
async fn run_serve(_config: AppConfig, _addr: SocketAddr, _silent: bool) -> Result<ExitCode> {
    anyhow::bail!("metronome_cli was built without the debug_http feature")
}

/// Prints tick telemetry as JSON lines.
struct TickPrinter {
    beats_per_bar: u32,
    first_timestamp: Option<u64>,
}

impl TickPrinter {
    fn new(beats_per_bar: u32) -> Self {
        Self {
            beats_per_bar,
            first_timestamp: None,
        }
    }

    /// Print `beats` ticks at `bpm`, starting from the beat that opened it.
    async fn collect(
        &mut self,
        events: &mut broadcast::Receiver<TelemetryEvent>,
        bpm: f64,
        beats: u64,
    ) -> Result<()> {
        let mut printed = 0;
        let mut aligned = false;
        while printed < beats {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "telemetry receiver lagged");
                    continue;
                }
                Err(RecvError::Closed) => anyhow::bail!("metronome engine stopped unexpectedly"),
            };
            let TelemetryEventKind::Tick { count, bpm: tick_bpm } = event.kind else {
                continue;
            };
            if tick_bpm != bpm || (!aligned && count != 1) {
                continue;
            }
            aligned = true;

            let first = *self.first_timestamp.get_or_insert(event.timestamp_ms);
            let Some(position) = beat_position(count, self.beats_per_bar) else {
                continue;
            };
            let line = TickLine {
                tick: count,
                beat: position.beat,
                accented: position.accented,
                bpm: tick_bpm,
                elapsed_ms: event.timestamp_ms.saturating_sub(first),
            };
            println!("{}", serde_json::to_string(&line)?);
            printed += 1;
        }
        Ok(())
    }
}
