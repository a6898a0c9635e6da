//! Error type for `aula-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown enum value in column: {0:?}")]
  UnknownColumnValue(String),

  #[error("session not found: {0}")]
  SessionNotFound(uuid::Uuid),

  /// The partial unique index on in-progress sessions fired.
  #[error("teacher {0} already has a session in progress")]
  TeacherBusy(uuid::Uuid),
}

impl From<Error> for aula_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::SessionNotFound(id) => aula_core::Error::SessionNotFound(id),
      Error::TeacherBusy(id) => aula_core::Error::TeacherBusy(id),
      other => aula_core::Error::Storage(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
