//! faceroll server binary.
//!
//! Reads `faceroll.toml` (or the path specified with `--config`) layered under
//! `FACEROLL_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use faceroll_api::{AppState, ServerConfig};
use faceroll_engine::{
  Compositor, DeliveryWorker, EnrollmentService, EventPublisher, HttpDetector, HttpSegmenter,
  LogNotifier,
};
use faceroll_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "faceroll enrollment and recognition server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "faceroll.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("FACEROLL"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.validate().context("invalid configuration")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // External services.
  let detector = HttpDetector::new(&server_cfg.detect_url, server_cfg.detector_timeout())
    .context("failed to build detector client")?;
  let segmenter = server_cfg
    .segment_url
    .as_deref()
    .map(|url| HttpSegmenter::new(url, server_cfg.detector_timeout()))
    .transpose()
    .context("failed to build segmenter client")?;

  // Outbound notifications.
  let (publisher, events) = EventPublisher::channel(server_cfg.delivery_queue);
  let delivery = DeliveryWorker::spawn(events, LogNotifier, server_cfg.delivery_retries);

  let mut enrollment = EnrollmentService::new(
    Arc::new(store),
    Arc::new(detector),
    server_cfg.enrollment_config(),
  )
  .with_optional_segmenter(segmenter)
  .with_publisher(publisher);

  if let Some(dir) = &server_cfg.overlay_dir {
    let dir = expand_tilde(dir);
    let compositor = Compositor::load_dir(&dir)
      .with_context(|| format!("failed to load overlay assets from {dir:?}"))?;
    enrollment = enrollment.with_compositor(compositor);
  }

  let state = AppState::new(enrollment, server_cfg.clone());
  let app = faceroll_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  // The router held the last publisher; the worker drains and exits.
  let stats = delivery.await.context("delivery worker panicked")?;
  tracing::info!(
    delivered = stats.delivered,
    failed = stats.failed,
    "shut down"
  );

  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!(error = %e, "failed to listen for Ctrl+C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut signal) => {
        signal.recv().await;
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => tracing::info!("received Ctrl+C"),
    _ = terminate => tracing::info!("received terminate signal"),
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
