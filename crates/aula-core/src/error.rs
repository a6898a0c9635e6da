//! Error types for `aula-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::session::SessionStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("session not found: {0}")]
  SessionNotFound(Uuid),

  #[error("teacher {0} already has a session in progress")]
  TeacherBusy(Uuid),

  #[error("session {session_id} is not in progress (status: {status})")]
  SessionNotInProgress {
    session_id: Uuid,
    status:     SessionStatus,
  },

  #[error("session {session_id} is already {status} and cannot be cancelled")]
  SessionTerminal {
    session_id: Uuid,
    status:     SessionStatus,
  },

  #[error("teacher {teacher_id} does not own session {session_id}")]
  NotSessionOwner {
    session_id: Uuid,
    teacher_id: Uuid,
  },

  #[error("invalid telemetry: {0}")]
  InvalidTelemetry(String),

  #[error("storage error: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
