//! Error type for the enrollment and identification pipeline.

use thiserror::Error;
use uuid::Uuid;

/// Failure of one enrollment or identification request.
///
/// Each variant belongs to exactly one pipeline stage (see [`Self::stage`]) so
/// a caller can tell a bad photo from a storage outage.
#[derive(Debug, Error)]
pub enum EnrollmentError {
  #[error("image could not be decoded: {0}")]
  InvalidImage(String),

  #[error("identity not found: {0}")]
  IdentityNotFound(Uuid),

  #[error("no face detected in the image")]
  NoFaceDetected,

  #[error("{0} faces detected; exactly one is required")]
  MultipleFacesAmbiguous(usize),

  #[error("face detector unavailable: {0}")]
  DetectorUnavailable(String),

  #[error("descriptor could not be persisted: {0}")]
  PersistenceFailure(String),
}

impl EnrollmentError {
  pub fn stage(&self) -> &'static str {
    match self {
      Self::InvalidImage(_) => "image",
      Self::IdentityNotFound(_) => "identity",
      Self::NoFaceDetected
      | Self::MultipleFacesAmbiguous(_)
      | Self::DetectorUnavailable(_) => "detection",
      Self::PersistenceFailure(_) => "storage",
    }
  }
}
