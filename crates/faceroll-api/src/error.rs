//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body is `{"error": <message>}`. Failures that belong to a
//! pipeline stage also carry `"stage"`, so a client can tell "no face in that
//! photo" from "the database is down".

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use faceroll_engine::EnrollmentError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("{field} exceeds {limit} bytes")]
  PayloadTooLarge { field: &'static str, limit: usize },

  #[error(transparent)]
  Enrollment(#[from] EnrollmentError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  fn status(&self) -> StatusCode {
    match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
      Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Self::Enrollment(e) => match e {
        EnrollmentError::InvalidImage(_) => StatusCode::BAD_REQUEST,
        EnrollmentError::IdentityNotFound(_) => StatusCode::NOT_FOUND,
        EnrollmentError::NoFaceDetected | EnrollmentError::MultipleFacesAmbiguous(_) => {
          StatusCode::UNPROCESSABLE_ENTITY
        }
        EnrollmentError::DetectorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        EnrollmentError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  fn stage(&self) -> Option<&'static str> {
    match self {
      Self::Enrollment(e) => Some(e.stage()),
      Self::Store(_) => Some("storage"),
      _ => None,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let mut body = json!({ "error": self.to_string() });
    if let Some(stage) = self.stage() {
      body["stage"] = json!(stage);
    }
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn body(resp: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[tokio::test]
  async fn detection_failures_are_unprocessable_with_stage() {
    let resp = ApiError::from(EnrollmentError::NoFaceDetected).into_response();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body(resp).await;
    assert_eq!(json["stage"], "detection");
    assert!(json["error"].as_str().unwrap().contains("no face"));
  }

  #[tokio::test]
  async fn detector_outage_is_service_unavailable() {
    let resp = ApiError::from(EnrollmentError::DetectorUnavailable("refused".into())).into_response();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body(resp).await["stage"], "detection");
  }

  #[tokio::test]
  async fn persistence_failure_is_storage_stage() {
    let resp = ApiError::from(EnrollmentError::PersistenceFailure("locked".into())).into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(resp).await["stage"], "storage");
  }

  #[tokio::test]
  async fn plain_errors_have_no_stage() {
    let resp = ApiError::BadRequest("nope".into()).into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body(resp).await.get("stage").is_none());
  }
}
