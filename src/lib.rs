pub mod api;
pub mod models;
pub mod services;

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use api::{create_router, AppState};
use services::{
    AppConfig, BatchOptions, ConfigStore, LlmExplainer, ModelSlot, ProviderClient,
};

static PROCESS_START: OnceLock<Instant> = OnceLock::new();
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn startup_elapsed_ms() -> u128 {
    PROCESS_START
        .get()
        .map(|t| t.elapsed().as_millis())
        .unwrap_or(0)
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

/// Stream the console log layer writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleOutput {
    #[default]
    Stdout,
    /// For tools that print results on stdout
    Stderr,
}

impl ConsoleOutput {
    fn writer(self) -> BoxMakeWriter {
        match self {
            ConsoleOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            ConsoleOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        }
    }
}

/// Initialize logging with a per-session log file plus console output
pub fn init_logging() {
    init_logging_to(ConsoleOutput::Stdout);
}

/// Same as `init_logging` with an explicit console stream
pub fn init_logging_to(console: ConsoleOutput) {
    let disable_file_log = env_flag("REVIEWTRUST_DISABLE_FILE_LOG");
    let disable_cleanup = env_flag("REVIEWTRUST_DISABLE_LOG_CLEANUP");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if disable_file_log {
        init_console_only_logging(env_filter);
        info!("File logging disabled via REVIEWTRUST_DISABLE_FILE_LOG");
        return;
    }

    let logs_dir = match std::env::var("REVIEWTRUST_LOG_DIR") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => get_logs_dir(),
    };

    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("Failed to create logs directory: {}", e);
        init_console_only_logging(env_filter);
        info!("Falling back to console-only logging (log dir not writable)");
        return;
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("reviewtrust_{}.log", timestamp);

    let file_appender = rolling::never(&logs_dir, &log_filename);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(file_guard);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(console.writer())
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    info!("=== ReviewTrust Started ===");
    info!("Log file: {}/{}", logs_dir.display(), log_filename);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Best-effort cleanup off the startup path
    if !disable_cleanup {
        std::thread::spawn(move || {
            cleanup_old_logs(&logs_dir, 30);
        });
    }
}

fn get_logs_dir() -> PathBuf {
    #[cfg(debug_assertions)]
    {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("logs")
    }

    #[cfg(not(debug_assertions))]
    {
        if let Some(data_dir) = dirs::data_local_dir() {
            return data_dir.join("reviewtrust").join("logs");
        }
        PathBuf::from("logs")
    }
}

fn cleanup_old_logs(logs_dir: &Path, keep: usize) {
    let mut entries: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return,
    };

    entries.retain(|e| {
        let name = e.file_name().to_string_lossy().to_string();
        name.starts_with("reviewtrust_") && name.ends_with(".log")
    });

    if entries.len() <= keep {
        return;
    }

    entries.sort_by_key(|e| {
        e.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });

    let remove_count = entries.len().saturating_sub(keep);
    for entry in entries.into_iter().take(remove_count) {
        let _ = fs::remove_file(entry.path());
    }
}

fn init_console_only_logging(env_filter: EnvFilter) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

/// Load the classifier and build the explainer from configuration.
/// A classifier load failure leaves the slot unavailable; a bad provider
/// configuration is an error.
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let http = reqwest::Client::new();
    let model = ModelSlot::load(&config.model, &http).await;

    let provider = ProviderClient::new(config.llm.clone())
        .context("failed to build explanation provider client")?;
    info!(
        "[STARTUP] explanation provider format={:?} endpoint={}",
        config.llm.format,
        provider.endpoint()
    );

    Ok(AppState::new(
        model,
        Arc::new(LlmExplainer::new(provider)),
        BatchOptions::from(&config.detection),
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("=== ReviewTrust Shutting Down ===");
}

/// Server entry point
pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    PROCESS_START.get_or_init(Instant::now);

    let store = ConfigStore::from_env();
    if args.iter().any(|a| a == "--init-config") {
        store
            .save(&AppConfig::default())
            .map_err(anyhow::Error::msg)?;
        println!("Wrote default config to {}", store.config_file().display());
        return Ok(());
    }

    let logging_t0 = Instant::now();
    init_logging();
    info!(
        startup_ms = startup_elapsed_ms(),
        logging_ms = logging_t0.elapsed().as_millis(),
        "logging.initialized"
    );

    let config = store.resolve().map_err(anyhow::Error::msg)?;
    info!("[STARTUP] config file {}", store.config_file().display());

    let state = build_state(&config).await?;
    if !state.model.is_loaded() {
        warn!("[STARTUP] serving without a classifier; /detect will return 500");
    }

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    info!(
        startup_ms = startup_elapsed_ms(),
        "[STARTUP] listening on {}",
        config.server.bind_addr
    );

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("=== ReviewTrust Exited ===");
    Ok(())
}
