//! Seams for the external face detector/encoder and the optional face
//! segmentation service.
//!
//! Neither network is implemented here; callers plug in an implementation
//! (an HTTP client in production, a fixed fake in tests).

use std::future::Future;

use thiserror::Error;

use crate::detection::Detection;

#[derive(Debug, Error)]
pub enum DetectorError {
  /// Transport failure, timeout or non-success status.
  #[error("detector unavailable: {0}")]
  Unavailable(String),

  /// The service answered but the payload could not be understood.
  #[error("detector returned an invalid response: {0}")]
  InvalidResponse(String),
}

/// Runs face detection, landmarking and encoding over one encoded image.
///
/// Returns every face found; an empty list is a valid answer.
pub trait FaceDetector: Send + Sync {
  fn detect<'a>(
    &'a self,
    image: &'a [u8],
  ) -> impl Future<Output = Result<Vec<Detection>, DetectorError>> + Send + 'a;
}

/// Crops/segments the face region out of a photo before encoding.
pub trait Segmenter: Send + Sync {
  fn segment<'a>(
    &'a self,
    image: &'a [u8],
  ) -> impl Future<Output = Result<Vec<u8>, DetectorError>> + Send + 'a;
}
