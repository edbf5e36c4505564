//! eloquent-tts - main entry point
//!
//! Loads configuration, restores the compiled-model cache, starts engine
//! warm-up and the cache sync loop, then serves the job API until Ctrl-C or
//! SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use eloquent_common::config::{default_config_path, load_toml_or_default};
use eloquent_common::{FsObjectStore, ObjectStore};
use eloquent_tts::cache_sync::{CacheSyncConfig, CacheSyncCoordinator};
use eloquent_tts::config::{ConfigOverrides, ServiceConfig, TomlConfig, CONFIG_FILE_NAME};
use eloquent_tts::engine::{warm_up, EngineReadiness, HttpEngine, SynthesisEngine};
use eloquent_tts::pipeline::{BusyFlag, Orchestrator, OrchestratorSettings};
use eloquent_tts::voice::{ResolverConfig, VoiceResolver};
use eloquent_tts::{build_router, AppState};

/// Engine health poll interval during warm-up
const WARM_UP_POLL: Duration = Duration::from_secs(2);

/// Command-line arguments for eloquent-tts
#[derive(Parser, Debug)]
#[command(name = "eloquent-tts")]
#[command(about = "Long-form text-to-speech orchestration service")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "ELOQUENT_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "ELOQUENT_PORT")]
    port: Option<u16>,

    /// Base URL of the inference server
    #[arg(long, env = "ELOQUENT_ENGINE_URL")]
    engine_url: Option<String>,

    /// Directory holding the object storage bucket
    #[arg(long, env = "ELOQUENT_STORAGE_ROOT")]
    storage_root: Option<PathBuf>,

    /// Compiled-model cache directory to back up
    #[arg(long, env = "ELOQUENT_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise the TOML log level is applied once loaded
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| service_filter("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting eloquent-tts v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let toml_path = args
        .config
        .clone()
        .or_else(|| default_config_path(CONFIG_FILE_NAME));
    let toml: TomlConfig = load_toml_or_default(toml_path.as_deref());

    let config = ServiceConfig::resolve(
        toml,
        ConfigOverrides {
            port: args.port,
            engine_url: args.engine_url,
            storage_root: args.storage_root,
            cache_dir: args.cache_dir,
        },
    );

    if !filter_from_env {
        if let Err(e) = filter_handle.reload(service_filter(&config.log_level)) {
            warn!("Failed to apply log level {:?}: {}", config.log_level, e);
        }
    }

    let store: Option<Arc<dyn ObjectStore>> = config.storage_root.as_ref().map(|root| {
        let store = FsObjectStore::new(root);
        info!("Object storage: {}", store.root().display());
        Arc::new(store) as Arc<dyn ObjectStore>
    });
    if store.is_none() {
        info!("No object storage configured; remote voices and cache sync disabled");
    }

    let busy = BusyFlag::new();
    let readiness = EngineReadiness::new();
    let shutdown = CancellationToken::new();

    let engine: Arc<dyn SynthesisEngine> = Arc::new(
        HttpEngine::new(&config.engine_url, config.engine_request_timeout)
            .context("Failed to create engine client")?,
    );
    info!("Engine: {}", config.engine_url);

    let resolver = VoiceResolver::new(
        store.clone(),
        ResolverConfig {
            reference_prefix: config.reference_prefix.clone(),
            cache_dir: config.voice_cache_dir.clone(),
            presets_dir: config.presets_dir.clone(),
        },
    );

    let mut orchestrator = Orchestrator::new(
        engine.clone(),
        resolver,
        busy.clone(),
        readiness.clone(),
        OrchestratorSettings {
            min_text_chars: config.min_text_chars,
            engine_ready_timeout: config.engine_ready_timeout,
        },
    );

    let mut sync_handle = None;
    if let (Some(settings), Some(store)) = (&config.cache_sync, &store) {
        let coordinator = Arc::new(CacheSyncCoordinator::new(
            store.clone(),
            busy.clone(),
            CacheSyncConfig {
                cache_dir: settings.cache_dir.clone(),
                archive_key: settings.archive_key.clone(),
                interval: settings.interval,
            },
        ));
        coordinator.restore().await;
        sync_handle = Some(coordinator.clone().spawn(shutdown.child_token()));
        orchestrator = orchestrator.with_cache_sync(coordinator);
    }

    tokio::spawn(warm_up(
        engine,
        readiness,
        WARM_UP_POLL,
        shutdown.child_token(),
    ));

    let app = build_router(AppState::new(Arc::new(orchestrator)));

    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_addr, config.port))?;
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    shutdown.cancel();
    if let Some(handle) = sync_handle {
        if let Err(e) = handle.await {
            warn!("Cache sync task ended abnormally: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Default filter for the service crates at `level`
fn service_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "eloquent_tts={},eloquent_common={},tower_http=info",
        level, level
    ))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
