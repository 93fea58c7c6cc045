//! Face descriptors: fixed-length vectors summarising one face.
//!
//! Descriptors are append-only. Re-enrolling an identity never rewrites a
//! stored vector; it inserts a new row and flips the previous row's `active`
//! flag off, so the full enrollment history stays on record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Number of components in every descriptor produced by the encoder.
pub const DESCRIPTOR_LEN: usize = 128;

/// A validated 128-dimension face descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Descriptor(Vec<f32>);

impl Descriptor {
  /// Validate length and finiteness.
  pub fn new(values: Vec<f32>) -> Result<Self> {
    if values.len() != DESCRIPTOR_LEN {
      return Err(Error::DescriptorLength {
        expected: DESCRIPTOR_LEN,
        actual:   values.len(),
      });
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
      return Err(Error::NonFiniteDescriptor { index });
    }
    Ok(Self(values))
  }

  pub fn values(&self) -> &[f32] { &self.0 }

  pub fn into_inner(self) -> Vec<f32> { self.0 }

  /// Euclidean distance between two descriptors.
  pub fn distance(&self, other: &Descriptor) -> f32 {
    self
      .0
      .iter()
      .zip(other.0.iter())
      .map(|(a, b)| (a - b).powi(2))
      .sum::<f32>()
      .sqrt()
  }

  /// Storage encoding: a compact JSON array of numbers.
  pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string(&self.0)?) }

  /// Parse the storage encoding back, re-running validation.
  pub fn from_json(raw: &str) -> Result<Self> {
    let values: Vec<f32> = serde_json::from_str(raw)
      .map_err(|e| Error::MalformedDescriptor(e.to_string()))?;
    Self::new(values)
  }
}

impl<'de> Deserialize<'de> for Descriptor {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    let values = Vec::<f32>::deserialize(deserializer)?;
    Descriptor::new(values).map_err(serde::de::Error::custom)
  }
}

/// One persisted enrollment: a descriptor owned by an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceDescriptor {
  pub descriptor_id: Uuid,
  pub identity_id:   Uuid,
  pub descriptor:    Descriptor,
  /// Hex SHA-256 of the reference image the descriptor was computed from.
  pub image_sha256:  String,
  pub active:        bool,
  pub created_at:    DateTime<Utc>,
}

/// An active descriptor as read from the store, not yet validated.
///
/// The matcher decodes `raw` itself so that one corrupt row is skipped with a
/// warning instead of failing the whole read.
#[derive(Debug, Clone)]
pub struct StoredDescriptor {
  pub descriptor_id: Uuid,
  pub identity_id:   Uuid,
  pub raw:           String,
}

impl StoredDescriptor {
  pub fn decode(&self) -> Result<Descriptor> { Descriptor::from_json(&self.raw) }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn filled(v: f32) -> Vec<f32> { vec![v; DESCRIPTOR_LEN] }

  #[test]
  fn rejects_wrong_length() {
    let err = Descriptor::new(vec![0.0; 127]).unwrap_err();
    assert!(matches!(
      err,
      Error::DescriptorLength { expected: 128, actual: 127 }
    ));
  }

  #[test]
  fn rejects_nan() {
    let mut values = filled(0.1);
    values[42] = f32::NAN;
    let err = Descriptor::new(values).unwrap_err();
    assert!(matches!(err, Error::NonFiniteDescriptor { index: 42 }));
  }

  #[test]
  fn distance_to_self_is_zero() {
    let d = Descriptor::new(filled(0.3)).unwrap();
    assert_eq!(d.distance(&d), 0.0);
  }

  #[test]
  fn distance_is_euclidean() {
    let a = Descriptor::new(filled(0.0)).unwrap();
    let mut shifted = filled(0.0);
    shifted[0] = 0.3;
    shifted[1] = 0.4;
    let b = Descriptor::new(shifted).unwrap();
    assert!((a.distance(&b) - 0.5).abs() < 1e-6);
  }

  #[test]
  fn json_encoding_revalidates() {
    let d = Descriptor::new(filled(-0.25)).unwrap();
    let raw = d.to_json().unwrap();
    assert!(raw.starts_with('['));
    assert_eq!(Descriptor::from_json(&raw).unwrap(), d);

    assert!(matches!(
      Descriptor::from_json("[1.0, 2.0]"),
      Err(Error::DescriptorLength { .. })
    ));
    assert!(matches!(
      Descriptor::from_json("not json"),
      Err(Error::MalformedDescriptor(_))
    ));
  }
}
