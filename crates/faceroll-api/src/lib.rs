//! JSON HTTP API for faceroll.
//!
//! Exposes an axum [`Router`] over an [`EnrollmentService`] and the
//! [`FaceStore`] behind it. Auth, TLS, and transport concerns are the caller's
//! responsibility.

pub mod attendance;
pub mod enroll;
pub mod error;
pub mod identities;
pub mod matching;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Json, Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use faceroll_core::{
  attendance::AttendanceRecorder,
  detector::{FaceDetector, Segmenter},
  matcher::DEFAULT_REJECTION_CEILING,
  store::FaceStore,
};
use faceroll_engine::{EnrollmentConfig, EnrollmentService, Passthrough};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `faceroll.toml` and
/// `FACEROLL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  pub detect_url:          String,
  pub segment_url:         Option<String>,
  /// Directory holding `glasses.png`, `dog.png`, `cat.png`, `raccoon.png`.
  pub overlay_dir:         Option<PathBuf>,
  pub rejection_ceiling:   f32,
  pub detector_timeout_ms: u64,
  pub store_timeout_ms:    u64,
  pub store_retries:       u32,
  pub retry_backoff_ms:    u64,
  pub strict_single_face:  bool,
  /// Largest accepted image, after base64 decoding.
  pub max_image_bytes:     usize,
  pub delivery_queue:      usize,
  pub delivery_retries:    u32,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                "127.0.0.1".to_string(),
      port:                8080,
      store_path:          PathBuf::from("~/.local/share/faceroll/faceroll.db"),
      detect_url:          "http://127.0.0.1:5000/detect".to_string(),
      segment_url:         None,
      overlay_dir:         None,
      rejection_ceiling:   DEFAULT_REJECTION_CEILING,
      detector_timeout_ms: 10_000,
      store_timeout_ms:    5_000,
      store_retries:       2,
      retry_backoff_ms:    50,
      strict_single_face:  false,
      max_image_bytes:     8 * 1024 * 1024,
      delivery_queue:      64,
      delivery_retries:    3,
    }
  }
}

impl ServerConfig {
  /// Reject settings that would make the server misbehave silently.
  pub fn validate(&self) -> anyhow::Result<()> {
    if !self.rejection_ceiling.is_finite() || self.rejection_ceiling <= 0.0 {
      anyhow::bail!(
        "rejection_ceiling must be a positive number, got {}",
        self.rejection_ceiling
      );
    }
    if self.max_image_bytes == 0 {
      anyhow::bail!("max_image_bytes must be greater than zero");
    }
    if self.delivery_queue == 0 {
      anyhow::bail!("delivery_queue must be greater than zero");
    }
    Ok(())
  }

  pub fn detector_timeout(&self) -> Duration { Duration::from_millis(self.detector_timeout_ms) }

  pub fn enrollment_config(&self) -> EnrollmentConfig {
    EnrollmentConfig {
      detector_timeout:   self.detector_timeout(),
      store_timeout:      Duration::from_millis(self.store_timeout_ms),
      store_retries:      self.store_retries,
      retry_backoff:      Duration::from_millis(self.retry_backoff_ms),
      strict_single_face: self.strict_single_face,
      rejection_ceiling:  self.rejection_ceiling,
    }
  }

  /// Request body cap: a base64 image of `max_image_bytes` plus JSON framing.
  fn body_limit(&self) -> usize { self.max_image_bytes / 3 * 4 + 64 * 1024 }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, D, G = Passthrough> {
  pub store:      Arc<S>,
  pub enrollment: EnrollmentService<S, D, G>,
  pub config:     Arc<ServerConfig>,
}

impl<S, D, G> Clone for AppState<S, D, G> {
  fn clone(&self) -> Self {
    Self {
      store:      self.store.clone(),
      enrollment: self.enrollment.clone(),
      config:     self.config.clone(),
    }
  }
}

impl<S, D, G> AppState<S, D, G> {
  pub fn new(enrollment: EnrollmentService<S, D, G>, config: ServerConfig) -> Self {
    Self {
      store: enrollment.store().clone(),
      enrollment,
      config: Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router.
pub fn router<S, D, G>(state: AppState<S, D, G>) -> Router
where
  S: FaceStore + AttendanceRecorder + 'static,
  D: FaceDetector + 'static,
  G: Segmenter + 'static,
{
  let body_limit = state.config.body_limit();

  Router::new()
    .route("/health", get(health))
    // Identities
    .route("/identities", get(identities::list::<S, D, G>).post(identities::create::<S, D, G>))
    .route("/identities/{id}", get(identities::get_one::<S, D, G>))
    .route("/identities/{id}/descriptors", get(identities::descriptors::<S, D, G>))
    // Face pipeline
    .route("/enroll", post(enroll::handler::<S, D, G>))
    .route("/match", post(matching::handler::<S, D, G>))
    // Attendance
    .route(
      "/attendance",
      get(attendance::list::<S, D, G>).post(attendance::record::<S, D, G>),
    )
    .layer(DefaultBodyLimit::max(body_limit))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

/// Decode a base64 image field, enforcing the configured size cap.
pub(crate) fn decode_image(
  field: &'static str,
  value: &str,
  max_bytes: usize,
) -> Result<Vec<u8>, ApiError> {
  let bytes = STANDARD
    .decode(value.trim().as_bytes())
    .map_err(|e| ApiError::BadRequest(format!("{field} is not valid base64: {e}")))?;
  if bytes.is_empty() {
    return Err(ApiError::BadRequest(format!("{field} is empty")));
  }
  if bytes.len() > max_bytes {
    return Err(ApiError::PayloadTooLarge { field, limit: max_bytes });
  }
  Ok(bytes)
}
