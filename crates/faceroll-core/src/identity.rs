//! Identity: a person enrolled in the system.
//!
//! Creating an identity is the job of the outer registration flow; the face
//! pipeline only ever references an existing one by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub identity_id:  Uuid,
  pub created_at:   DateTime<Utc>,
  pub display_name: String,
  pub email:        Option<String>,
  pub phone:        Option<String>,
}

/// Input for creating an [`Identity`]. The store assigns id and timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewIdentity {
  pub display_name: String,
  #[serde(default)]
  pub email:        Option<String>,
  #[serde(default)]
  pub phone:        Option<String>,
}

impl NewIdentity {
  pub fn new(display_name: impl Into<String>) -> Self {
    Self { display_name: display_name.into(), ..Self::default() }
  }

  /// Trim every field and reject an empty display name. Blank contact fields
  /// collapse to `None`.
  pub fn normalized(self) -> Result<Self> {
    let display_name = self.display_name.trim().to_owned();
    if display_name.is_empty() {
      return Err(Error::EmptyDisplayName);
    }
    let clean = |v: Option<String>| {
      v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
    };
    Ok(Self {
      display_name,
      email: clean(self.email),
      phone: clean(self.phone),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalized_trims_and_drops_blank_contacts() {
    let input = NewIdentity {
      display_name: "  Ana Lucía Pérez ".into(),
      email:        Some(" ana@example.edu ".into()),
      phone:        Some("   ".into()),
    };
    let out = input.normalized().unwrap();
    assert_eq!(out.display_name, "Ana Lucía Pérez");
    assert_eq!(out.email.as_deref(), Some("ana@example.edu"));
    assert!(out.phone.is_none());
  }

  #[test]
  fn normalized_rejects_empty_name() {
    let err = NewIdentity::new("   ").normalized().unwrap_err();
    assert!(matches!(err, Error::EmptyDisplayName));
  }
}
