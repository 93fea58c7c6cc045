//! Handlers for `/identities` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/identities` | Creation order |
//! | `POST` | `/identities` | Body: `{"display_name":"…","email":"…","phone":"…"}` |
//! | `GET`  | `/identities/:id` | 404 if not found |
//! | `GET`  | `/identities/:id/descriptors` | Enrollment history, newest first, without vectors |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use faceroll_core::{
  descriptor::FaceDescriptor,
  identity::{Identity, NewIdentity},
  store::FaceStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /identities`
pub async fn list<S, D, G>(
  State(state): State<AppState<S, D, G>>,
) -> Result<Json<Vec<Identity>>, ApiError>
where
  S: FaceStore,
{
  let identities = state.store.list_identities().await.map_err(ApiError::store)?;
  Ok(Json(identities))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /identities`
pub async fn create<S, D, G>(
  State(state): State<AppState<S, D, G>>,
  Json(body): Json<NewIdentity>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FaceStore,
{
  let input = body
    .normalized()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let identity = state
    .store
    .create_identity(input)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(identity_id = %identity.identity_id, "identity created");
  Ok((StatusCode::CREATED, Json(identity)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /identities/:id`
pub async fn get_one<S, D, G>(
  State(state): State<AppState<S, D, G>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Identity>, ApiError>
where
  S: FaceStore,
{
  let identity = state
    .store
    .get_identity(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("identity {id} not found")))?;
  Ok(Json(identity))
}

// ─── Descriptor history ───────────────────────────────────────────────────────

/// One enrollment as shown to clients. The vector itself never leaves the
/// server.
#[derive(Debug, Serialize)]
pub struct DescriptorSummary {
  pub descriptor_id: Uuid,
  pub identity_id:   Uuid,
  pub image_sha256:  String,
  pub active:        bool,
  pub created_at:    DateTime<Utc>,
}

impl From<FaceDescriptor> for DescriptorSummary {
  fn from(d: FaceDescriptor) -> Self {
    Self {
      descriptor_id: d.descriptor_id,
      identity_id:   d.identity_id,
      image_sha256:  d.image_sha256,
      active:        d.active,
      created_at:    d.created_at,
    }
  }
}

/// `GET /identities/:id/descriptors`
pub async fn descriptors<S, D, G>(
  State(state): State<AppState<S, D, G>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<DescriptorSummary>>, ApiError>
where
  S: FaceStore,
{
  state
    .store
    .get_identity(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("identity {id} not found")))?;

  let history = state
    .store
    .descriptor_history(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(history.into_iter().map(DescriptorSummary::from).collect()))
}
