//! Handlers for `/sessions` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/sessions/start` | Body: [`StartBody`]; 201, or 409 when the teacher is busy |
//! | `POST`  | `/sessions/:id/finish` | Body: [`FinishBody`]; owner only |
//! | `POST`  | `/sessions/:id/cancel` | No body; rejected once finished |
//! | `PATCH` | `/sessions/:id/attendance/:student_id` | Body: [`CorrectBody`] |
//! | `GET`   | `/sessions/:id` | 404 if not found |
//! | `GET`   | `/sessions/:id/attendance` | Finalized or running record set |
//! | `GET`   | `/sessions` | Optional `teacher_id`, `group_id`, `status`, `start_date`, `end_date` |
//! | `GET`   | `/sessions/active?teacher_id=` | `{"session": ...}` with `null` when idle |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use aula_core::{
  record::{AttendanceRecord, AttendanceStatus},
  roster::EnrollmentProvider,
  session::{Session, SessionStatus},
  store::{AttendanceStore, SessionQuery},
};
use aula_engine::{Correction, OpenSession};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Start ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /sessions/start`.
#[derive(Debug, Deserialize)]
pub struct StartBody {
  pub group_id:        Uuid,
  pub teacher_id:      Uuid,
  pub classroom_id:    Uuid,
  pub device_id:       Option<Uuid>,
  pub scheduled_start: Option<DateTime<Utc>>,
  pub scheduled_end:   Option<DateTime<Utc>>,
  pub opened_by:       Option<Uuid>,
}

impl From<StartBody> for OpenSession {
  fn from(b: StartBody) -> Self {
    OpenSession {
      group_id:        b.group_id,
      teacher_id:      b.teacher_id,
      classroom_id:    b.classroom_id,
      device_id:       b.device_id,
      scheduled_start: b.scheduled_start,
      scheduled_end:   b.scheduled_end,
      opened_by:       b.opened_by,
    }
  }
}

/// `POST /sessions/start` — returns 201 + the opened [`Session`].
pub async fn start<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<StartBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AttendanceStore + EnrollmentProvider + 'static,
{
  let session = state.engine.open_session(OpenSession::from(body)).await?;
  Ok((StatusCode::CREATED, Json(session)))
}

// ─── Finish / cancel ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FinishBody {
  /// The teacher requesting the close; must own the session.
  pub teacher_id:  Uuid,
  /// Acting user when an admin closes on the teacher's behalf.
  pub finished_by: Option<Uuid>,
}

/// `POST /sessions/:id/finish`
pub async fn finish<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<FinishBody>,
) -> Result<Json<Session>, ApiError>
where
  S: AttendanceStore + EnrollmentProvider + 'static,
{
  let session = state
    .engine
    .finish_session(id, body.teacher_id, body.finished_by)
    .await?;
  Ok(Json(session))
}

/// `POST /sessions/:id/cancel`
pub async fn cancel<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError>
where
  S: AttendanceStore + EnrollmentProvider + 'static,
{
  let session = state.engine.cancel_session(id).await?;
  Ok(Json(session))
}

// ─── Manual correction ───────────────────────────────────────────────────────

/// JSON body accepted by `PATCH /sessions/:id/attendance/:student_id`.
#[derive(Debug, Deserialize)]
pub struct CorrectBody {
  pub status:       AttendanceStatus,
  pub arrival_time: Option<DateTime<Utc>>,
}

/// `PATCH /sessions/:id/attendance/:student_id`
pub async fn correct<S>(
  State(state): State<AppState<S>>,
  Path((id, student_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<CorrectBody>,
) -> Result<Json<AttendanceRecord>, ApiError>
where
  S: AttendanceStore + EnrollmentProvider + 'static,
{
  let record = state
    .engine
    .correct_attendance(id, student_id, Correction {
      status:       body.status,
      arrival_time: body.arrival_time,
    })
    .await?;
  Ok(Json(record))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /sessions/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError>
where
  S: AttendanceStore + EnrollmentProvider + 'static,
{
  let session = state.engine.session(id).await?;
  Ok(Json(session))
}

/// `GET /sessions/:id/attendance`
pub async fn attendance<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError>
where
  S: AttendanceStore + EnrollmentProvider + 'static,
{
  let records = state.engine.attendance_for_session(id).await?;
  Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub teacher_id: Option<Uuid>,
  pub group_id:   Option<Uuid>,
  pub status:     Option<SessionStatus>,
  pub start_date: Option<DateTime<Utc>>,
  pub end_date:   Option<DateTime<Utc>>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

/// `GET /sessions[?teacher_id=&group_id=&status=&start_date=&end_date=]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Session>>, ApiError>
where
  S: AttendanceStore + EnrollmentProvider + 'static,
{
  let sessions = state
    .engine
    .sessions(&SessionQuery {
      teacher_id: params.teacher_id,
      group_id:   params.group_id,
      status:     params.status,
      start_date: params.start_date,
      end_date:   params.end_date,
      limit:      params.limit,
      offset:     params.offset,
    })
    .await?;
  Ok(Json(sessions))
}

#[derive(Debug, Deserialize)]
pub struct ActiveParams {
  pub teacher_id: Uuid,
}

/// `GET /sessions/active?teacher_id=<id>` — absence is a normal state, so
/// the response is always 200 with `"session": null` when the teacher has
/// nothing running.
pub async fn active<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ActiveParams>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: AttendanceStore + EnrollmentProvider + 'static,
{
  let session = state
    .engine
    .active_session_for_teacher(params.teacher_id)
    .await?;
  Ok(Json(serde_json::json!({ "session": session })))
}
