//! Attendance endpoints.
//!
//! `POST /attendance` takes an event from an attendance point (a camera client
//! running its own recognition). `GET /attendance[?identity_id=…&kind=…&limit=…]`
//! lists events newest first. Snapshot bytes stay in the store; each event
//! carries only the snapshot's digest.

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use faceroll_core::{
  attendance::{
    AttendanceEvent, AttendanceKind, AttendanceQuery, AttendanceRecorder, NewAttendanceEvent,
    REASON_UNREGISTERED,
  },
  store::FaceStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, decode_image, error::ApiError};

const MAX_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct RecordBody {
  pub kind:        AttendanceKind,
  #[serde(default)]
  pub identity_id: Option<Uuid>,
  /// Base64 frame captured when the face was seen.
  pub snapshot:    String,
  #[serde(default)]
  pub reason:      Option<String>,
  pub device_code: String,
}

/// `POST /attendance`
pub async fn record<S, D, G>(
  State(state): State<AppState<S, D, G>>,
  Json(body): Json<RecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FaceStore + AttendanceRecorder,
{
  let device_code = body.device_code.trim();
  if device_code.is_empty() {
    return Err(ApiError::BadRequest("device_code is empty".into()));
  }
  let snapshot = decode_image("snapshot", &body.snapshot, state.config.max_image_bytes)?;

  let event = match (body.kind, body.identity_id) {
    (AttendanceKind::Entry, Some(id)) => NewAttendanceEvent::entry(id, snapshot, device_code),
    (AttendanceKind::Exit, Some(id)) => NewAttendanceEvent::exit(id, snapshot, device_code),
    (AttendanceKind::FailedAttempt, None) => NewAttendanceEvent::failed_attempt(
      body.reason.unwrap_or_else(|| REASON_UNREGISTERED.to_owned()),
      snapshot,
      device_code,
    ),
    // Inconsistent pairing; `validate` names what is wrong.
    (kind, identity_id) => NewAttendanceEvent {
      identity_id,
      kind,
      occurred_at: Utc::now(),
      snapshot,
      reason: body.reason,
      device_code: device_code.to_owned(),
    },
  };
  event
    .validate()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  if let Some(id) = event.identity_id {
    let known = FaceStore::get_identity(state.store.as_ref(), id)
      .await
      .map_err(ApiError::store)?;
    if known.is_none() {
      return Err(ApiError::NotFound(format!("identity {id}")));
    }
  }

  let recorded = AttendanceRecorder::record(state.store.as_ref(), event)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    event_id = %recorded.event_id,
    kind = %recorded.kind,
    device_code = %recorded.device_code,
    "attendance recorded"
  );
  Ok((StatusCode::CREATED, Json(recorded)))
}

/// `GET /attendance`
pub async fn list<S, D, G>(
  State(state): State<AppState<S, D, G>>,
  Query(mut query): Query<AttendanceQuery>,
) -> Result<Json<Vec<AttendanceEvent>>, ApiError>
where
  S: FaceStore,
{
  query.limit = query.limit.map(|l| l.min(MAX_LIMIT));
  let events = state
    .store
    .list_attendance(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(events))
}
