//! Session — one scheduled or occurring class meeting.
//!
//! A session owns the attendance records and snapshots recorded against it.
//! Sessions are never physically deleted; cancellation is a status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle state of a session.
///
/// Transitions: `Pending → InProgress → {Finished, Closed}`; `Cancelled` is
/// reachable from `Pending` or `InProgress` only. `Finished`, `Closed`, and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
  Pending,
  InProgress,
  Finished,
  Closed,
  Cancelled,
}

impl SessionStatus {
  /// No further lifecycle transitions are possible from a terminal state.
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Finished | Self::Closed | Self::Cancelled)
  }

  /// The snake_case form stored in database columns and shown in errors.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::InProgress => "in_progress",
      Self::Finished => "finished",
      Self::Closed => "closed",
      Self::Cancelled => "cancelled",
    }
  }
}

impl std::fmt::Display for SessionStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// One class meeting for a group, owned by a teacher in a classroom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub session_id:      Uuid,
  pub group_id:        Uuid,
  pub teacher_id:      Uuid,
  pub classroom_id:    Uuid,
  /// The vision device assigned to the classroom, if any.
  pub device_id:       Option<Uuid>,
  pub scheduled_start: DateTime<Utc>,
  pub scheduled_end:   DateTime<Utc>,
  pub actual_start:    Option<DateTime<Utc>>,
  pub actual_end:      Option<DateTime<Utc>>,
  pub status:          SessionStatus,
  pub created_by:      Uuid,
  pub updated_by:      Uuid,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

// ─── NewSession ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::AttendanceStore::create_session`].
/// `session_id`, `created_at`, and `updated_at` are always set by the store.
#[derive(Debug, Clone)]
pub struct NewSession {
  pub group_id:        Uuid,
  pub teacher_id:      Uuid,
  pub classroom_id:    Uuid,
  pub device_id:       Option<Uuid>,
  pub scheduled_start: DateTime<Utc>,
  pub scheduled_end:   DateTime<Utc>,
  pub actual_start:    Option<DateTime<Utc>>,
  pub status:          SessionStatus,
  pub created_by:      Uuid,
  pub updated_by:      Uuid,
}
