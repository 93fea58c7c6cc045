//! `POST /enroll`: register a reference photo as an identity's active face.
//!
//! Body: `{"identity_id": "…", "reference_image": "<base64>", "overlay": "glasses"}`.
//! `overlay` is optional; `none`/`ninguno` mean the same as leaving it out.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use faceroll_core::{
  detector::{FaceDetector, Segmenter},
  overlay::OverlayKind,
  store::FaceStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, decode_image, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct EnrollBody {
  pub identity_id:     Uuid,
  pub reference_image: String,
  #[serde(default)]
  pub overlay:         Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
  pub descriptor_id:   Uuid,
  pub identity_id:     Uuid,
  pub encoded_image:   String,
  pub decorated_image: Option<String>,
}

/// `POST /enroll`
pub async fn handler<S, D, G>(
  State(state): State<AppState<S, D, G>>,
  Json(body): Json<EnrollBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FaceStore,
  D: FaceDetector,
  G: Segmenter,
{
  let overlay = match body.overlay.as_deref() {
    Some(name) => {
      OverlayKind::parse_optional(name).map_err(|e| ApiError::BadRequest(e.to_string()))?
    }
    None => None,
  };
  let image = decode_image(
    "reference_image",
    &body.reference_image,
    state.config.max_image_bytes,
  )?;

  let enrollment = state
    .enrollment
    .enroll(body.identity_id, &image, overlay)
    .await?;

  Ok((
    StatusCode::CREATED,
    Json(EnrollResponse {
      descriptor_id:   enrollment.descriptor.descriptor_id,
      identity_id:     enrollment.descriptor.identity_id,
      encoded_image:   STANDARD.encode(&enrollment.encoded_image),
      decorated_image: enrollment.decorated_image.map(|png| STANDARD.encode(png)),
    }),
  ))
}
