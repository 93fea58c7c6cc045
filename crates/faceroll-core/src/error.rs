//! Error types for `faceroll-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("descriptor must have {expected} components, got {actual}")]
  DescriptorLength { expected: usize, actual: usize },

  #[error("descriptor component {index} is not a finite number")]
  NonFiniteDescriptor { index: usize },

  #[error("malformed stored descriptor: {0}")]
  MalformedDescriptor(String),

  #[error("display name must not be empty")]
  EmptyDisplayName,

  #[error("unknown overlay kind: {0:?}")]
  UnknownOverlayKind(String),

  #[error("attendance event is inconsistent: {0}")]
  InvalidAttendance(&'static str),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
