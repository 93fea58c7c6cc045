//! [`SqliteStore`]: the SQLite implementation of [`FaceStore`] and
//! [`AttendanceRecorder`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use faceroll_core::{
  attendance::{AttendanceEvent, AttendanceQuery, AttendanceRecorder, NewAttendanceEvent},
  descriptor::{Descriptor, FaceDescriptor, StoredDescriptor},
  identity::{Identity, NewIdentity},
  store::{CommitGate, FaceStore},
};

use crate::{
  Error, Result,
  encode::{
    RawAttendanceEvent, RawFaceDescriptor, RawIdentity, RawStoredDescriptor, digest,
    encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

const IDENTITY_COLUMNS: &str = "identity_id, created_at, display_name, email, phone";

const DESCRIPTOR_COLUMNS: &str =
  "descriptor_id, identity_id, descriptor_json, image_sha256, active, created_at";

const ATTENDANCE_COLUMNS: &str =
  "event_id, identity_id, kind, occurred_at, reason, device_code, snapshot_sha256";

// ─── Store ───────────────────────────────────────────────────────────────────

enum Replaced {
  Committed(usize),
  NoIdentity,
  Abandoned,
}

/// A faceroll store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Snapshot bytes of a recorded attendance event.
  pub async fn attendance_snapshot(&self, event_id: Uuid) -> Result<Option<Vec<u8>>> {
    let id_str = encode_uuid(event_id);
    let blob = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT snapshot FROM attendance_events WHERE event_id = ?1",
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(blob)
  }
}

// ─── FaceStore impl ──────────────────────────────────────────────────────────

impl FaceStore for SqliteStore {
  type Error = Error;

  // ── Identities ────────────────────────────────────────────────────────────

  async fn create_identity(&self, input: NewIdentity) -> Result<Identity> {
    let input = input.normalized()?;
    let identity = Identity {
      identity_id:  Uuid::new_v4(),
      created_at:   Utc::now(),
      display_name: input.display_name,
      email:        input.email,
      phone:        input.phone,
    };

    let id_str = encode_uuid(identity.identity_id);
    let at_str = encode_dt(identity.created_at);
    let name   = identity.display_name.clone();
    let email  = identity.email.clone();
    let phone  = identity.phone.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO identities (identity_id, created_at, display_name, email, phone)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, at_str, name, email, phone],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(identity_id = %identity.identity_id, "identity created");
    Ok(identity)
  }

  async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE identity_id = ?1"),
              rusqlite::params![id_str],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn list_identities(&self) -> Result<Vec<Identity>> {
    let raws: Vec<RawIdentity> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {IDENTITY_COLUMNS} FROM identities ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map([], RawIdentity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIdentity::into_identity).collect()
  }

  // ── Descriptors ───────────────────────────────────────────────────────────

  async fn active_descriptors(&self) -> Result<Vec<StoredDescriptor>> {
    let raws: Vec<RawStoredDescriptor> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT descriptor_id, identity_id, descriptor_json
           FROM face_descriptors
           WHERE active = 1
           ORDER BY created_at, rowid",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawStoredDescriptor {
              descriptor_id:   row.get(0)?,
              identity_id:     row.get(1)?,
              descriptor_json: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    // A row whose ids don't parse can't be attributed to anyone; drop it here
    // rather than failing every match.
    Ok(
      raws
        .into_iter()
        .filter_map(|raw| match raw.into_stored() {
          Ok(stored) => Some(stored),
          Err(e) => {
            tracing::warn!(error = %e, "skipping descriptor row with unreadable ids");
            None
          }
        })
        .collect(),
    )
  }

  async fn replace_active_descriptor(
    &self,
    identity_id:     Uuid,
    descriptor:      Descriptor,
    reference_image: Vec<u8>,
    gate:            CommitGate,
  ) -> Result<FaceDescriptor> {
    let record = FaceDescriptor {
      descriptor_id: Uuid::new_v4(),
      identity_id,
      image_sha256: digest(&reference_image),
      descriptor,
      active: true,
      created_at: Utc::now(),
    };

    let desc_id_str = encode_uuid(record.descriptor_id);
    let ident_str   = encode_uuid(identity_id);
    let json        = record.descriptor.to_json()?;
    let sha         = record.image_sha256.clone();
    let at_str      = encode_dt(record.created_at);

    let outcome = self
      .conn
      .call(move |conn| {
        if gate.is_abandoned() {
          return Ok(Replaced::Abandoned);
        }
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let found = tx
          .query_row(
            "SELECT 1 FROM identities WHERE identity_id = ?1",
            rusqlite::params![ident_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if !found {
          return Ok(Replaced::NoIdentity);
        }

        let deactivated = tx.execute(
          "UPDATE face_descriptors SET active = 0 WHERE identity_id = ?1 AND active = 1",
          rusqlite::params![ident_str],
        )?;

        tx.execute(
          "INSERT INTO face_descriptors (
             descriptor_id, identity_id, descriptor_json,
             reference_image, image_sha256, active, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
          rusqlite::params![desc_id_str, ident_str, json, reference_image, sha, at_str],
        )?;

        // Dropping `tx` rolls both statements back.
        if !gate.try_commit() {
          return Ok(Replaced::Abandoned);
        }
        tx.commit()?;
        Ok(Replaced::Committed(deactivated))
      })
      .await?;

    let deactivated = match outcome {
      Replaced::Committed(n) => n,
      Replaced::NoIdentity => return Err(Error::IdentityNotFound(identity_id)),
      Replaced::Abandoned => {
        tracing::warn!(identity_id = %identity_id, "descriptor write abandoned; rolled back");
        return Err(Error::WriteAbandoned);
      }
    };

    tracing::debug!(
      identity_id = %identity_id,
      descriptor_id = %record.descriptor_id,
      deactivated,
      "active descriptor replaced"
    );
    Ok(record)
  }

  async fn descriptor_history(&self, identity_id: Uuid) -> Result<Vec<FaceDescriptor>> {
    let ident_str = encode_uuid(identity_id);

    let raws: Vec<RawFaceDescriptor> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DESCRIPTOR_COLUMNS} FROM face_descriptors
           WHERE identity_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![ident_str], RawFaceDescriptor::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      raws
        .into_iter()
        .filter_map(|raw| {
          let descriptor_id = raw.descriptor_id.clone();
          match raw.into_face_descriptor() {
            Ok(record) => Some(record),
            Err(e) => {
              tracing::warn!(%descriptor_id, error = %e, "skipping unreadable descriptor row");
              None
            }
          }
        })
        .collect(),
    )
  }

  async fn reference_image(&self, descriptor_id: Uuid) -> Result<Option<Vec<u8>>> {
    let id_str = encode_uuid(descriptor_id);
    let blob = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT reference_image FROM face_descriptors WHERE descriptor_id = ?1",
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(blob)
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  async fn list_attendance(&self, query: &AttendanceQuery) -> Result<Vec<AttendanceEvent>> {
    let ident_str = query.identity_id.map(encode_uuid);
    let kind_str  = query.kind.map(|k| k.as_str().to_owned());
    let limit_val = query.limit.unwrap_or(100) as i64;

    let raws: Vec<RawAttendanceEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTENDANCE_COLUMNS} FROM attendance_events
           WHERE (?1 IS NULL OR identity_id = ?1)
             AND (?2 IS NULL OR kind = ?2)
           ORDER BY occurred_at DESC, rowid DESC
           LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![ident_str, kind_str, limit_val],
            RawAttendanceEvent::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttendanceEvent::into_event).collect()
  }
}

// ─── AttendanceRecorder impl ─────────────────────────────────────────────────

impl AttendanceRecorder for SqliteStore {
  type Error = Error;

  async fn record(&self, event: NewAttendanceEvent) -> Result<AttendanceEvent> {
    event.validate()?;

    let recorded = AttendanceEvent {
      event_id:        Uuid::new_v4(),
      identity_id:     event.identity_id,
      kind:            event.kind,
      occurred_at:     event.occurred_at,
      reason:          event.reason,
      device_code:     event.device_code,
      snapshot_sha256: digest(&event.snapshot),
    };

    let event_id_str = encode_uuid(recorded.event_id);
    let ident_str    = recorded.identity_id.map(encode_uuid);
    let kind_str     = recorded.kind.as_str().to_owned();
    let at_str       = encode_dt(recorded.occurred_at);
    let reason       = recorded.reason.clone();
    let device       = recorded.device_code.clone();
    let snapshot     = event.snapshot;
    let sha          = recorded.snapshot_sha256.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO attendance_events (
             event_id, identity_id, kind, occurred_at,
             reason, device_code, snapshot, snapshot_sha256
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![event_id_str, ident_str, kind_str, at_str, reason, device, snapshot, sha],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(
      event_id = %recorded.event_id,
      kind = %recorded.kind,
      "attendance recorded"
    );
    Ok(recorded)
  }
}
