//! Manual corrections — the human override path.
//!
//! Every correction sets the `manual_correction` freeze flag, even when the
//! new status coincides with the automated one, and blends provenance:
//! an automated record becomes `Mixed` the first time a human touches it.
//! This is the only write path allowed to change a frozen record.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use aula_core::{
  Error, Result,
  record::{AttendanceRecord, AttendanceStatus},
  roster::EnrollmentProvider,
  store::AttendanceStore,
};

use crate::Engine;

/// Input to [`Engine::correct_attendance`].
#[derive(Debug, Clone)]
pub struct Correction {
  pub status:       AttendanceStatus,
  /// Updated only when provided; an omitted arrival leaves the existing
  /// value untouched.
  pub arrival_time: Option<DateTime<Utc>>,
}

impl<S, R> Engine<S, R>
where
  S: AttendanceStore,
  R: EnrollmentProvider,
{
  /// Apply a teacher/admin override for one student.
  ///
  /// Accepted in any session state — a teacher may fix the register after
  /// class has finished. Creates the record with origin `Manual` when none
  /// exists yet.
  pub async fn correct_attendance(
    &self,
    session_id: Uuid,
    student_id: Uuid,
    correction: Correction,
  ) -> Result<AttendanceRecord> {
    self
      .store
      .get_session(session_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::SessionNotFound(session_id))?;

    let record = self
      .store
      .apply_correction(
        session_id,
        student_id,
        correction.status,
        correction.arrival_time,
      )
      .await
      .map_err(Into::into)?;

    tracing::info!(
      %session_id,
      %student_id,
      status = ?record.status,
      origin = ?record.origin,
      "manual correction applied"
    );
    Ok(record)
  }
}
