//! Fakes and fixtures shared by the engine's unit tests.

use std::{
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use faceroll_core::{
  attendance::{AttendanceEvent, AttendanceRecorder, NewAttendanceEvent},
  descriptor::DESCRIPTOR_LEN,
  detection::{BoundingBox, Detection, Landmarks, Point},
  detector::{DetectorError, FaceDetector, Segmenter},
};
use image::{DynamicImage, Rgba, RgbaImage};
use uuid::Uuid;

use crate::imaging::encode_png;

/// A small opaque PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
  let img = RgbaImage::from_pixel(width, height, Rgba([120, 110, 100, 255]));
  encode_png(&DynamicImage::ImageRgba8(img)).unwrap()
}

pub fn descriptor_values(seed: f32) -> Vec<f32> {
  (0..DESCRIPTOR_LEN).map(|i| seed + i as f32 * 1e-3).collect()
}

/// Eyes level at y=40, outer corners at x=40 and x=60, chin at y=80.
pub fn landmarks() -> Landmarks {
  let eye = |x0: f32| -> Vec<Point> { (0..6).map(|i| Point::new(x0 + i as f32, 40.0)).collect() };
  let mut right = eye(55.0);
  right[3] = Point::new(60.0, 40.0);
  let mut jaw: Vec<Point> = (0..17).map(|i| Point::new(30.0 + i as f32 * 2.5, 60.0)).collect();
  jaw[8] = Point::new(50.0, 80.0);
  Landmarks { left_eye: eye(40.0), right_eye: right, nose: vec![], mouth: vec![], jaw }
}

pub fn face(seed: f32, size: f32) -> Detection {
  Detection {
    bounding_box: BoundingBox { x: 10.0, y: 10.0, width: size, height: size, confidence: 0.9 },
    landmarks:    Some(landmarks()),
    descriptor:   descriptor_values(seed),
  }
}

// ─── Detector ────────────────────────────────────────────────────────────────

pub enum Behaviour {
  Faces(Vec<Detection>),
  Down,
  Hang,
}

/// Answers every call the same way and counts calls.
pub struct FakeDetector {
  behaviour: Behaviour,
  pub calls: AtomicUsize,
}

impl FakeDetector {
  pub fn faces(faces: Vec<Detection>) -> Self { Self::new(Behaviour::Faces(faces)) }

  pub fn down() -> Self { Self::new(Behaviour::Down) }

  pub fn hang() -> Self { Self::new(Behaviour::Hang) }

  fn new(behaviour: Behaviour) -> Self { Self { behaviour, calls: AtomicUsize::new(0) } }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl FaceDetector for FakeDetector {
  async fn detect(&self, _image: &[u8]) -> Result<Vec<Detection>, DetectorError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    match &self.behaviour {
      Behaviour::Faces(faces) => Ok(faces.clone()),
      Behaviour::Down => Err(DetectorError::Unavailable("connection refused".into())),
      Behaviour::Hang => {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(vec![])
      }
    }
  }
}

/// Returns a fixed image regardless of input.
pub struct FixedSegmenter(pub Vec<u8>);

impl Segmenter for FixedSegmenter {
  async fn segment(&self, _image: &[u8]) -> Result<Vec<u8>, DetectorError> { Ok(self.0.clone()) }
}

// ─── Recorder ────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("recorder offline")]
pub struct RecorderOffline;

/// Keeps every event in memory; optionally refuses them all.
#[derive(Clone, Default)]
pub struct MemoryRecorder {
  pub events: Arc<Mutex<Vec<NewAttendanceEvent>>>,
  pub offline: bool,
}

impl MemoryRecorder {
  pub fn offline() -> Self { Self { offline: true, ..Self::default() } }

  pub fn events(&self) -> Vec<NewAttendanceEvent> { self.events.lock().unwrap().clone() }
}

impl AttendanceRecorder for MemoryRecorder {
  type Error = RecorderOffline;

  async fn record(&self, event: NewAttendanceEvent) -> Result<AttendanceEvent, RecorderOffline> {
    if self.offline {
      return Err(RecorderOffline);
    }
    let recorded = AttendanceEvent {
      event_id:        Uuid::new_v4(),
      identity_id:     event.identity_id,
      kind:            event.kind,
      occurred_at:     event.occurred_at,
      reason:          event.reason.clone(),
      device_code:     event.device_code.clone(),
      snapshot_sha256: String::new(),
    };
    self.events.lock().unwrap().push(event);
    Ok(recorded)
  }
}
