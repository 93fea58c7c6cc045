//! The face pipeline: enrollment, identification, continuous recognition,
//! overlay compositing and outbound event delivery.
//!
//! Everything here is written against the traits in `faceroll-core`, so the
//! same services run over SQLite in production and over fakes in tests.

pub mod compositor;
pub mod delivery;
pub mod enrollment;
pub mod error;
pub mod http_detector;
pub mod imaging;
pub mod recognition;

pub use compositor::Compositor;
pub use delivery::{
  DeliveryStats, DeliveryWorker, EnrollmentEvent, EventPublisher, LogNotifier, Notifier, NotifyError,
};
pub use enrollment::{Enrollment, EnrollmentConfig, EnrollmentService, Passthrough};
pub use error::EnrollmentError;
pub use http_detector::{HttpDetector, HttpSegmenter};
pub use recognition::{
  AttendanceMode, CaptureError, CaptureSource, LoopConfig, LoopState, LoopSummary,
  RecognitionHandle, RecognitionLoop, RecognitionSession, RecordOutcome,
};

#[cfg(test)]
mod testing;
