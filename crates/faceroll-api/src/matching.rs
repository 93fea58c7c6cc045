//! `POST /match`: identify the face in a probe photo.
//!
//! A rejected probe answers 200 with `identity_id: null`. The distance is only
//! reported for an accepted match.

use axum::{Json, extract::State};
use faceroll_core::{
  detector::{FaceDetector, Segmenter},
  matcher::MatchResult,
  store::FaceStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, decode_image, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct MatchBody {
  pub probe_image: String,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
  pub identity_id: Option<Uuid>,
  pub distance:    Option<f32>,
  pub accepted:    bool,
}

impl From<MatchResult> for MatchResponse {
  fn from(result: MatchResult) -> Self {
    if result.accepted {
      Self {
        identity_id: result.identity_id,
        distance:    Some(result.distance),
        accepted:    true,
      }
    } else {
      Self { identity_id: None, distance: None, accepted: false }
    }
  }
}

/// `POST /match`
pub async fn handler<S, D, G>(
  State(state): State<AppState<S, D, G>>,
  Json(body): Json<MatchBody>,
) -> Result<Json<MatchResponse>, ApiError>
where
  S: FaceStore,
  D: FaceDetector,
  G: Segmenter,
{
  let probe = decode_image("probe_image", &body.probe_image, state.config.max_image_bytes)?;
  let result = state.enrollment.identify(&probe).await?;
  Ok(Json(result.into()))
}
