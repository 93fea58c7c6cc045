//! Detector output: bounding boxes, landmark groups and raw descriptors.
//!
//! A [`Detection`] lives for one request only and is never persisted.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{Result, descriptor::Descriptor};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
  pub x: f32,
  pub y: f32,
}

impl Point {
  pub const fn new(x: f32, y: f32) -> Self { Self { x, y } }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
  pub x:          f32,
  pub y:          f32,
  pub width:      f32,
  pub height:     f32,
  #[serde(default)]
  pub confidence: f32,
}

impl BoundingBox {
  pub fn area(&self) -> f32 { self.width.max(0.0) * self.height.max(0.0) }
}

/// Landmark groups in the 68-point layout.
///
/// `jaw` has 17 points (index 8 is the chin); each eye has 6 points, where
/// `left_eye[0]` and `right_eye[3]` are the outer corners.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmarks {
  pub left_eye:  Vec<Point>,
  pub right_eye: Vec<Point>,
  #[serde(default)]
  pub nose:      Vec<Point>,
  #[serde(default)]
  pub mouth:     Vec<Point>,
  pub jaw:       Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub bounding_box: BoundingBox,
  #[serde(default)]
  pub landmarks:    Option<Landmarks>,
  /// Raw encoder output; validated on use.
  pub descriptor:   Vec<f32>,
}

impl Detection {
  pub fn descriptor(&self) -> Result<Descriptor> {
    Descriptor::new(self.descriptor.clone())
  }
}

/// Pick one detection out of many.
///
/// Largest box area wins. Ties go to higher confidence, then to the box whose
/// top-left corner comes first in reading order, then to input order.
pub fn select_primary(detections: Vec<Detection>) -> Option<Detection> {
  detections
    .into_iter()
    .enumerate()
    .min_by(|(ia, a), (ib, b)| rank(a, b).then(ia.cmp(ib)))
    .map(|(_, d)| d)
}

/// `Less` means `a` is preferred over `b`.
fn rank(a: &Detection, b: &Detection) -> Ordering {
  let (ba, bb) = (&a.bounding_box, &b.bounding_box);
  bb.area()
    .total_cmp(&ba.area())
    .then(bb.confidence.total_cmp(&ba.confidence))
    .then(ba.y.total_cmp(&bb.y))
    .then(ba.x.total_cmp(&bb.x))
}
