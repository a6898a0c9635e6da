//! Session lifecycle — opening, finishing, cancelling, and lookups.
//!
//! The one true race in this system is two concurrent opens for the same
//! teacher; it is settled by the storage layer's uniqueness constraint, never
//! by a check-then-insert here. Finishing runs the reconciliation batch
//! best-effort: a teacher must always be able to close their session.

use chrono::Utc;
use uuid::Uuid;

use aula_core::{
  Error, Result,
  record::{AttendanceRecord, RecordOutcome},
  roster::EnrollmentProvider,
  session::{NewSession, Session, SessionStatus},
  store::{AttendanceStore, SessionQuery},
};

use crate::{Engine, finalize};

// ─── OpenSession ─────────────────────────────────────────────────────────────

/// Input to [`Engine::open_session`].
#[derive(Debug, Clone)]
pub struct OpenSession {
  pub group_id:        Uuid,
  pub teacher_id:      Uuid,
  pub classroom_id:    Uuid,
  pub device_id:       Option<Uuid>,
  /// Defaults to the moment the session is opened.
  pub scheduled_start: Option<chrono::DateTime<Utc>>,
  /// Defaults to `scheduled_start` plus the configured session length.
  pub scheduled_end:   Option<chrono::DateTime<Utc>>,
  /// Acting user when an admin opens on the teacher's behalf; defaults to
  /// the teacher.
  pub opened_by:       Option<Uuid>,
}

// ─── Lifecycle operations ────────────────────────────────────────────────────

impl<S, R> Engine<S, R>
where
  S: AttendanceStore,
  R: EnrollmentProvider,
{
  /// Open a session for a teacher, transitioning it straight to
  /// [`SessionStatus::InProgress`] with `actual_start = now`.
  ///
  /// Returns [`Error::TeacherBusy`] when the teacher already has an
  /// in-progress session anywhere in the system.
  pub async fn open_session(&self, input: OpenSession) -> Result<Session> {
    let now = Utc::now();
    let scheduled_start = input.scheduled_start.unwrap_or(now);
    let scheduled_end = input
      .scheduled_end
      .unwrap_or(scheduled_start + self.policy.default_session_length());
    let actor = input.opened_by.unwrap_or(input.teacher_id);

    let session = self
      .store
      .create_session(NewSession {
        group_id: input.group_id,
        teacher_id: input.teacher_id,
        classroom_id: input.classroom_id,
        device_id: input.device_id,
        scheduled_start,
        scheduled_end,
        actual_start: Some(now),
        status: SessionStatus::InProgress,
        created_by: actor,
        updated_by: actor,
      })
      .await
      .map_err(Into::into)?;

    tracing::info!(
      session_id = %session.session_id,
      teacher_id = %session.teacher_id,
      group_id = %session.group_id,
      "session opened"
    );
    Ok(session)
  }

  /// Finish a session: reconcile the snapshot history, fill roster gaps,
  /// and transition to [`SessionStatus::Finished`].
  ///
  /// Only the owning teacher may finish. The reconciliation batch is
  /// applied together with the status flip in one store transaction; if the
  /// batch cannot be computed or applied, the failure is logged and the
  /// session is closed without it.
  pub async fn finish_session(
    &self,
    session_id: Uuid,
    requesting_teacher_id: Uuid,
    finished_by: Option<Uuid>,
  ) -> Result<Session> {
    let session = self
      .store
      .get_session(session_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::SessionNotFound(session_id))?;

    if session.teacher_id != requesting_teacher_id {
      return Err(Error::NotSessionOwner {
        session_id,
        teacher_id: requesting_teacher_id,
      });
    }
    if session.status.is_terminal() {
      return Err(Error::SessionNotInProgress {
        session_id,
        status: session.status,
      });
    }

    let actor = finished_by.unwrap_or(requesting_teacher_id);
    let now = Utc::now();

    match self.completion_plan(&session).await {
      Ok((outcomes, absentees)) => {
        match self
          .store
          .complete_session(session_id, outcomes, absentees, now, actor)
          .await
        {
          Ok(finished) => {
            tracing::info!(%session_id, "session finished with reconciliation");
            return Ok(finished);
          }
          Err(e) => {
            let e: Error = e.into();
            tracing::error!(
              %session_id,
              error = %e,
              "applying finish batch failed; closing session without it"
            );
          }
        }
      }
      Err(e) => {
        tracing::error!(
          %session_id,
          error = %e,
          "computing finish batch failed; closing session without it"
        );
      }
    }

    self
      .store
      .set_session_status(session_id, SessionStatus::Finished, Some(now), actor)
      .await
      .map_err(Into::into)
  }

  /// Cancel a session. Allowed from `Pending` or `InProgress`; cancelling an
  /// already-cancelled session is a no-op success. Never runs
  /// reconciliation.
  pub async fn cancel_session(&self, session_id: Uuid) -> Result<Session> {
    let session = self
      .store
      .get_session(session_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::SessionNotFound(session_id))?;

    match session.status {
      SessionStatus::Finished | SessionStatus::Closed => {
        Err(Error::SessionTerminal {
          session_id,
          status: session.status,
        })
      }
      SessionStatus::Cancelled => Ok(session),
      SessionStatus::Pending | SessionStatus::InProgress => {
        let cancelled = self
          .store
          .set_session_status(
            session_id,
            SessionStatus::Cancelled,
            None,
            session.teacher_id,
          )
          .await
          .map_err(Into::into)?;
        tracing::info!(%session_id, "session cancelled");
        Ok(cancelled)
      }
    }
  }

  /// The teacher's in-progress session, or `None` — absence is a normal
  /// state, never an error.
  pub async fn active_session_for_teacher(
    &self,
    teacher_id: Uuid,
  ) -> Result<Option<Session>> {
    self
      .store
      .active_session_for_teacher(teacher_id)
      .await
      .map_err(Into::into)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn session(&self, session_id: Uuid) -> Result<Session> {
    self
      .store
      .get_session(session_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::SessionNotFound(session_id))
  }

  pub async fn sessions(&self, query: &SessionQuery) -> Result<Vec<Session>> {
    self.store.list_sessions(query).await.map_err(Into::into)
  }

  /// The read surface through which reporting and SIS-sync collaborators
  /// pull a session's attendance set.
  pub async fn attendance_for_session(
    &self,
    session_id: Uuid,
  ) -> Result<Vec<AttendanceRecord>> {
    self.session(session_id).await?;
    self
      .store
      .records_for_session(session_id)
      .await
      .map_err(Into::into)
  }

  // ── Finish batch planning ─────────────────────────────────────────────

  /// Compute everything the finish transaction will apply: reconciliation
  /// outcomes from the snapshot history plus the roster gaps to fill as
  /// absent.
  async fn completion_plan(
    &self,
    session: &Session,
  ) -> Result<(Vec<RecordOutcome>, Vec<Uuid>)> {
    let outcomes = self.compute_outcomes(session).await?;
    let roster = self
      .roster
      .roster(session.group_id)
      .await
      .map_err(Into::into)?;
    let records = self
      .store
      .records_for_session(session.session_id)
      .await
      .map_err(Into::into)?;
    let absentees = finalize::roster_gaps(&roster, &records, &outcomes);
    Ok((outcomes, absentees))
  }
}
