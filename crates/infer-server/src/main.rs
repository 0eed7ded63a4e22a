//! Edge-Infer server – entry point.
//!
//! Wires configuration, the engine context, and the TCP listener
//! together and runs the accept loop until Ctrl-C.
//!
//! # Startup sequence
//!
//! ```text
//! main()
//!  └─ load ServerConfig      -- TOML file + CLI/env overrides
//!  └─ build engine           -- mock engine, or the platform runtime
//!  └─ EngineContext          -- validate model metadata, warmup runs
//!  └─ Server::bind + serve   -- accept loop, one worker per connection
//! ```
//!
//! Model metadata is validated *before* the listener binds: a corrupt
//! model would fail every request, so the process refuses to serve at
//! all.
//!
//! # Usage
//!
//! ```text
//! infer-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>        TOML configuration file
//!   --port <PORT>          TCP listener port [default: 1234]
//!   --bind <ADDR>          bind address [default: 0.0.0.0]
//!   --threshold <SCORE>    significance threshold [default: 0.0]
//!   --warmup-runs <N>      startup warmup invocations [default: 10]
//!   --engine <KIND>        engine implementation [default: mock]
//!   --input-elements <N>   mock model input size [default: 784]
//!   --output-elements <N>  mock model output size [default: 10]
//! ```
//!
//! CLI defaults can be overridden with `EDGE_INFER_*` environment
//! variables; explicit CLI args take precedence when both are present.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use infer_server::domain::ServerConfig;
use infer_server::engine::mock::MockEngine;
use infer_server::engine::{EngineContext, InferenceEngine};
use infer_server::infrastructure::net::Server;
use infer_server::infrastructure::watchdog::Watchdog;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Engine implementation to serve with.
///
/// The platform runtime (FFI-backed) registers here when the device
/// build enables it; the mock engine is always available for bring-up
/// and protocol testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineKind {
    /// Deterministic in-process echo engine.
    Mock,
}

/// Edge-Infer on-device inference server.
#[derive(Debug, Parser)]
#[command(
    name = "infer-server",
    about = "On-device inference server: raw sensor data in, scores + latency out",
    version
)]
struct Cli {
    /// Path to a TOML configuration file. CLI arguments override values
    /// from the file.
    #[arg(long, env = "EDGE_INFER_CONFIG")]
    config: Option<PathBuf>,

    /// TCP port for the inference listener.
    #[arg(long, env = "EDGE_INFER_PORT")]
    port: Option<u16>,

    /// IP address to bind the listener to. `0.0.0.0` accepts
    /// connections from any interface.
    #[arg(long, env = "EDGE_INFER_BIND")]
    bind: Option<String>,

    /// Minimum score a prediction needs to be included in the response.
    #[arg(long, env = "EDGE_INFER_THRESHOLD")]
    threshold: Option<f32>,

    /// Number of warmup invocations before serving.
    #[arg(long, env = "EDGE_INFER_WARMUP_RUNS")]
    warmup_runs: Option<u32>,

    /// Engine implementation.
    #[arg(long, value_enum, default_value = "mock")]
    engine: EngineKind,

    /// Input element count for the mock engine (28x28 image by default).
    #[arg(long, default_value_t = 784)]
    input_elements: usize,

    /// Output element count for the mock engine.
    #[arg(long, default_value_t = 10)]
    output_elements: usize,
}

impl Cli {
    /// Resolves the effective configuration: file values first, then CLI
    /// and environment overrides on top.
    fn resolve_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load_from_path(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(bind) = &self.bind {
            config.network.bind_address = bind.clone();
        }
        if let Some(threshold) = self.threshold {
            config.inference.score_threshold = threshold;
        }
        if let Some(runs) = self.warmup_runs {
            config.inference.warmup_runs = runs;
        }
        Ok(config)
    }

    fn build_engine(&self) -> Box<dyn InferenceEngine> {
        match self.engine {
            EngineKind::Mock => Box::new(MockEngine::float_model(
                self.input_elements,
                self.output_elements,
            )),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging. Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    info!("Edge-Infer server starting");

    let watchdog = Watchdog::new(
        config.default_watchdog_budget(),
        config.inference_watchdog_budget(),
    );
    let ctx = Arc::new(EngineContext::new(cli.build_engine(), watchdog));

    // A corrupt model fails every request; refuse to serve it at all.
    ctx.validate()
        .await
        .context("model metadata validation failed")?;

    info!(runs = config.inference.warmup_runs, "performing warmup runs");
    ctx.warmup(config.inference.warmup_runs)
        .await
        .context("engine warmup failed")?;

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let server = Server::bind(&config, ctx).await?;
    server.serve(shutdown_rx).await?;

    info!("Edge-Infer server stopped");
    Ok(())
}
