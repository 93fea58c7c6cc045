//! Error type for `faceroll-store-sqlite`.

use faceroll_core::store::TransientError;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] faceroll_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("identity not found: {0}")]
  IdentityNotFound(uuid::Uuid),

  #[error("write abandoned before commit")]
  WriteAbandoned,

  #[error("unknown attendance kind: {0:?}")]
  UnknownEventKind(String),
}

impl TransientError for Error {
  /// Busy/locked database errors clear up on their own; everything else won't.
  fn is_transient(&self) -> bool {
    match self {
      Error::Database(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))) => {
        matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
      }
      _ => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
