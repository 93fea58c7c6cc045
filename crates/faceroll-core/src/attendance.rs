//! Attendance events emitted by the recognition loop.
//!
//! The recorder is an outside collaborator; this module only fixes the shape
//! of what it receives.

use std::{fmt, future::Future, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Reason attached to a failed attempt by an unrecognised face.
pub const REASON_UNREGISTERED: &str = "unregistered";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceKind {
  Entry,
  Exit,
  FailedAttempt,
}

impl AttendanceKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Entry => "entry",
      Self::Exit => "exit",
      Self::FailedAttempt => "failed_attempt",
    }
  }
}

impl fmt::Display for AttendanceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for AttendanceKind {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s {
      "entry" => Ok(Self::Entry),
      "exit" => Ok(Self::Exit),
      "failed_attempt" => Ok(Self::FailedAttempt),
      other => Err(other.to_owned()),
    }
  }
}

/// An event on its way to the recorder. Build it with one of the constructors
/// so the identity/reason pairing stays consistent.
#[derive(Debug, Clone)]
pub struct NewAttendanceEvent {
  pub identity_id: Option<Uuid>,
  pub kind:        AttendanceKind,
  pub occurred_at: DateTime<Utc>,
  /// Encoded frame captured when the face was seen.
  pub snapshot:    Vec<u8>,
  pub reason:      Option<String>,
  pub device_code: String,
}

impl NewAttendanceEvent {
  pub fn entry(identity_id: Uuid, snapshot: Vec<u8>, device_code: impl Into<String>) -> Self {
    Self::recognised(AttendanceKind::Entry, identity_id, snapshot, device_code.into())
  }

  pub fn exit(identity_id: Uuid, snapshot: Vec<u8>, device_code: impl Into<String>) -> Self {
    Self::recognised(AttendanceKind::Exit, identity_id, snapshot, device_code.into())
  }

  pub fn failed_attempt(
    reason: impl Into<String>,
    snapshot: Vec<u8>,
    device_code: impl Into<String>,
  ) -> Self {
    Self {
      identity_id: None,
      kind:        AttendanceKind::FailedAttempt,
      occurred_at: Utc::now(),
      snapshot,
      reason:      Some(reason.into()),
      device_code: device_code.into(),
    }
  }

  fn recognised(
    kind: AttendanceKind,
    identity_id: Uuid,
    snapshot: Vec<u8>,
    device_code: String,
  ) -> Self {
    Self {
      identity_id: Some(identity_id),
      kind,
      occurred_at: Utc::now(),
      snapshot,
      reason: None,
      device_code,
    }
  }

  /// Check the identity/reason pairing for events built by hand.
  pub fn validate(&self) -> Result<()> {
    match (self.kind, self.identity_id, &self.reason) {
      (AttendanceKind::FailedAttempt, Some(_), _) => {
        Err(Error::InvalidAttendance("failed attempt must not name an identity"))
      }
      (AttendanceKind::FailedAttempt, None, None) => {
        Err(Error::InvalidAttendance("failed attempt needs a reason"))
      }
      (AttendanceKind::Entry | AttendanceKind::Exit, None, _) => {
        Err(Error::InvalidAttendance("entry and exit need an identity"))
      }
      _ => Ok(()),
    }
  }
}

/// A recorded attendance event. Snapshot bytes stay in the store; only their
/// digest travels with the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEvent {
  pub event_id:        Uuid,
  pub identity_id:     Option<Uuid>,
  pub kind:            AttendanceKind,
  pub occurred_at:     DateTime<Utc>,
  pub reason:          Option<String>,
  pub device_code:     String,
  pub snapshot_sha256: String,
}

/// Filter for listing recorded events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceQuery {
  pub identity_id: Option<Uuid>,
  pub kind:        Option<AttendanceKind>,
  pub limit:       Option<usize>,
}

/// Sink for attendance events.
pub trait AttendanceRecorder: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn record(
    &self,
    event: NewAttendanceEvent,
  ) -> impl Future<Output = Result<AttendanceEvent, Self::Error>> + Send + '_;
}
