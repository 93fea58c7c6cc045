//! The `FaceStore` trait.
//!
//! Implemented by storage backends (e.g. `faceroll-store-sqlite`). The engine
//! and API crates depend on this abstraction, not on any concrete backend.

use std::{
  future::Future,
  sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
  },
};

use uuid::Uuid;

use crate::{
  attendance::{AttendanceEvent, AttendanceQuery},
  descriptor::{Descriptor, FaceDescriptor, StoredDescriptor},
  identity::{Identity, NewIdentity},
};

/// Lets callers decide whether a failed store call is worth retrying.
pub trait TransientError {
  fn is_transient(&self) -> bool { false }
}

impl TransientError for std::convert::Infallible {}

// ─── Commit gate ─────────────────────────────────────────────────────────────

const GATE_OPEN: u8 = 0;
const GATE_COMMITTING: u8 = 1;
const GATE_ABANDONED: u8 = 2;

/// Decides, exactly once, whether a queued write commits or is rolled back.
///
/// The caller holds one clone and the backend the other. Before committing, the
/// backend calls [`CommitGate::try_commit`]; a caller that gave up calls
/// [`CommitGate::abandon`]. Whichever runs first wins, so a caller that saw
/// `abandon() == true` knows the write never became visible.
#[derive(Debug, Clone, Default)]
pub struct CommitGate(Arc<AtomicU8>);

impl CommitGate {
  pub fn new() -> Self { Self::default() }

  /// Claim the right to commit. `false` once the caller has abandoned the write.
  pub fn try_commit(&self) -> bool { self.transition(GATE_COMMITTING) }

  /// Give up on the write. `false` if the backend already started committing.
  pub fn abandon(&self) -> bool { self.transition(GATE_ABANDONED) }

  pub fn is_abandoned(&self) -> bool { self.0.load(Ordering::Acquire) == GATE_ABANDONED }

  fn transition(&self, to: u8) -> bool {
    match self
      .0
      .compare_exchange(GATE_OPEN, to, Ordering::AcqRel, Ordering::Acquire)
    {
      Ok(_) => true,
      Err(current) => current == to,
    }
  }
}

// ─── Store trait ─────────────────────────────────────────────────────────────

/// Abstraction over identity and descriptor persistence.
///
/// Descriptor rows are append-only: the only mutation ever applied to an
/// existing row is clearing its `active` flag during re-enrollment.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait FaceStore: Send + Sync {
  type Error: std::error::Error + TransientError + Send + Sync + 'static;

  // ── Identities ────────────────────────────────────────────────────────

  fn create_identity(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Returns `None` if not found.
  fn get_identity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  fn list_identities(
    &self,
  ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + '_;

  // ── Descriptors ───────────────────────────────────────────────────────

  /// Snapshot of every active descriptor, undecoded.
  fn active_descriptors(
    &self,
  ) -> impl Future<Output = Result<Vec<StoredDescriptor>, Self::Error>> + Send + '_;

  /// Deactivate the identity's current descriptor (if any) and insert
  /// `descriptor` as the new active one, both inside one transaction.
  ///
  /// Fails without writing anything if the identity does not exist, or if
  /// `gate` was abandoned before the transaction reached its commit.
  fn replace_active_descriptor(
    &self,
    identity_id: Uuid,
    descriptor: Descriptor,
    reference_image: Vec<u8>,
    gate: CommitGate,
  ) -> impl Future<Output = Result<FaceDescriptor, Self::Error>> + Send + '_;

  /// Every descriptor ever enrolled for the identity, newest first.
  fn descriptor_history(
    &self,
    identity_id: Uuid,
  ) -> impl Future<Output = Result<Vec<FaceDescriptor>, Self::Error>> + Send + '_;

  fn reference_image(
    &self,
    descriptor_id: Uuid,
  ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send + '_;

  // ── Attendance ────────────────────────────────────────────────────────

  fn list_attendance<'a>(
    &'a self,
    query: &'a AttendanceQuery,
  ) -> impl Future<Output = Result<Vec<AttendanceEvent>, Self::Error>> + Send + 'a;
}
