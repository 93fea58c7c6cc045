//! Nearest-descriptor matching with a rejection ceiling.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::descriptor::{Descriptor, StoredDescriptor};

/// Distance at or above which a probe is reported as unknown.
pub const DEFAULT_REJECTION_CEILING: f32 = 0.85;

/// Outcome of comparing one probe against the active descriptor pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
  pub identity_id:   Option<Uuid>,
  pub descriptor_id: Option<Uuid>,
  /// Best distance found, or the ceiling when nothing came closer.
  pub distance:      f32,
  pub accepted:      bool,
}

impl MatchResult {
  pub fn unknown(ceiling: f32) -> Self {
    Self {
      identity_id:   None,
      descriptor_id: None,
      distance:      ceiling,
      accepted:      false,
    }
  }
}

/// Strategy for finding the enrolled face nearest to a probe.
pub trait Matcher {
  fn best_match(&self, probe: &Descriptor, pool: &[StoredDescriptor]) -> MatchResult;
}

/// Exact linear scan over every stored descriptor.
///
/// Always visits the whole pool; there is no early exit and no index.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanMatcher {
  pub ceiling: f32,
}

impl Default for EuclideanMatcher {
  fn default() -> Self { Self { ceiling: DEFAULT_REJECTION_CEILING } }
}

impl EuclideanMatcher {
  pub fn with_ceiling(ceiling: f32) -> Self { Self { ceiling } }
}

impl Matcher for EuclideanMatcher {
  fn best_match(&self, probe: &Descriptor, pool: &[StoredDescriptor]) -> MatchResult {
    let mut best_distance = self.ceiling;
    let mut best: Option<&StoredDescriptor> = None;

    for candidate in pool {
      let stored = match candidate.decode() {
        Ok(d) => d,
        Err(e) => {
          tracing::warn!(
            descriptor_id = %candidate.descriptor_id,
            identity_id = %candidate.identity_id,
            error = %e,
            "skipping malformed stored descriptor"
          );
          continue;
        }
      };

      let distance = probe.distance(&stored);
      if distance < best_distance {
        best_distance = distance;
        best = Some(candidate);
      }
    }

    match best {
      Some(c) => MatchResult {
        identity_id:   Some(c.identity_id),
        descriptor_id: Some(c.descriptor_id),
        distance:      best_distance,
        accepted:      true,
      },
      None => MatchResult::unknown(self.ceiling),
    }
  }
}
