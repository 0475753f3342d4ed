//! Debug HTTP server surfaced only in `debug_http` feature builds.
//!
//! A lightweight Axum server exposing health, engine state, start/stop/tempo
//! controls and an SSE telemetry stream. Every route requires the debug token.

mod routes;
mod sse;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::controller::MetronomeController;

pub use routes::{build_router, run_http_server, DebugHttpState, HttpServerError};

/// Token used when `METRONOME_DEBUG_TOKEN` is unset.
pub const DEFAULT_TOKEN: &str = "metronome-debug";

pub fn token_from_env() -> String {
    std::env::var("METRONOME_DEBUG_TOKEN").unwrap_or_else(|_| DEFAULT_TOKEN.to_string())
}

/// Serve the debug API for `controller` until the listener fails.
pub async fn serve(
    controller: Arc<MetronomeController>,
    addr: SocketAddr,
    token: String,
) -> anyhow::Result<()> {
    let preview = token.chars().take(4).collect::<String>();
    log::info!(
        "Debug HTTP server binding {} (token prefix {}***)",
        addr,
        preview
    );
    run_http_server(DebugHttpState::new(controller, token), addr).await
}
