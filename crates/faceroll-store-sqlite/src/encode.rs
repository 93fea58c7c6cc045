//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! descriptors a compact JSON array.

use chrono::{DateTime, Utc};
use faceroll_core::{
  attendance::{AttendanceEvent, AttendanceKind},
  descriptor::{Descriptor, FaceDescriptor, StoredDescriptor},
  identity::Identity,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_kind(s: &str) -> Result<AttendanceKind> {
  s.parse().map_err(Error::UnknownEventKind)
}

/// Hex SHA-256 of a blob.
pub fn digest(bytes: &[u8]) -> String { hex::encode(Sha256::digest(bytes)) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `identities` row.
pub struct RawIdentity {
  pub identity_id:  String,
  pub created_at:   String,
  pub display_name: String,
  pub email:        Option<String>,
  pub phone:        Option<String>,
}

impl RawIdentity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      identity_id:  row.get(0)?,
      created_at:   row.get(1)?,
      display_name: row.get(2)?,
      email:        row.get(3)?,
      phone:        row.get(4)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      identity_id:  decode_uuid(&self.identity_id)?,
      created_at:   decode_dt(&self.created_at)?,
      display_name: self.display_name,
      email:        self.email,
      phone:        self.phone,
    })
  }
}

/// Raw strings read from a `face_descriptors` row (without the image blob).
pub struct RawFaceDescriptor {
  pub descriptor_id:   String,
  pub identity_id:     String,
  pub descriptor_json: String,
  pub image_sha256:    String,
  pub active:          bool,
  pub created_at:      String,
}

impl RawFaceDescriptor {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      descriptor_id:   row.get(0)?,
      identity_id:     row.get(1)?,
      descriptor_json: row.get(2)?,
      image_sha256:    row.get(3)?,
      active:          row.get(4)?,
      created_at:      row.get(5)?,
    })
  }

  pub fn into_face_descriptor(self) -> Result<FaceDescriptor> {
    Ok(FaceDescriptor {
      descriptor_id: decode_uuid(&self.descriptor_id)?,
      identity_id:   decode_uuid(&self.identity_id)?,
      descriptor:    Descriptor::from_json(&self.descriptor_json)?,
      image_sha256:  self.image_sha256,
      active:        self.active,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// An active row destined for the matcher; the vector stays undecoded.
pub struct RawStoredDescriptor {
  pub descriptor_id:   String,
  pub identity_id:     String,
  pub descriptor_json: String,
}

impl RawStoredDescriptor {
  /// Only the ids must parse here. A bad vector is the matcher's problem.
  pub fn into_stored(self) -> Result<StoredDescriptor> {
    Ok(StoredDescriptor {
      descriptor_id: decode_uuid(&self.descriptor_id)?,
      identity_id:   decode_uuid(&self.identity_id)?,
      raw:           self.descriptor_json,
    })
  }
}

/// Raw strings read from an `attendance_events` row (without the snapshot).
pub struct RawAttendanceEvent {
  pub event_id:        String,
  pub identity_id:     Option<String>,
  pub kind:            String,
  pub occurred_at:     String,
  pub reason:          Option<String>,
  pub device_code:     String,
  pub snapshot_sha256: String,
}

impl RawAttendanceEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:        row.get(0)?,
      identity_id:     row.get(1)?,
      kind:            row.get(2)?,
      occurred_at:     row.get(3)?,
      reason:          row.get(4)?,
      device_code:     row.get(5)?,
      snapshot_sha256: row.get(6)?,
    })
  }

  pub fn into_event(self) -> Result<AttendanceEvent> {
    Ok(AttendanceEvent {
      event_id:        decode_uuid(&self.event_id)?,
      identity_id:     self.identity_id.as_deref().map(decode_uuid).transpose()?,
      kind:            decode_kind(&self.kind)?,
      occurred_at:     decode_dt(&self.occurred_at)?,
      reason:          self.reason,
      device_code:     self.device_code,
      snapshot_sha256: self.snapshot_sha256,
    })
  }
}
