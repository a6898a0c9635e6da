//! [`SqliteStore`] — the SQLite implementation of [`AttendanceStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use aula_core::{
  record::{AttendanceRecord, AttendanceStatus, RecordOutcome},
  roster::EnrollmentProvider,
  session::{NewSession, Session, SessionStatus},
  snapshot::{NewSnapshot, Snapshot},
  store::{AttendanceStore, SessionQuery},
};

use crate::{
  encode::{
    RawRecord, RawSession, RawSnapshot, encode_attendance_status,
    encode_detections, encode_dt, encode_session_status, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Column lists ────────────────────────────────────────────────────────────

const SESSION_COLS: &str = "session_id, group_id, teacher_id, classroom_id, \
  device_id, scheduled_start, scheduled_end, actual_start, actual_end, \
  status, created_by, updated_by, created_at, updated_at";

const RECORD_COLS: &str = "record_id, session_id, student_id, status, \
  arrival_time, permanence, origin, manual_correction, source, confidence, \
  created_at, updated_at";

const SNAPSHOT_COLS: &str = "snapshot_id, session_id, device_id, \
  captured_at, detected_persons, occupancy_rate, confidence, detections, \
  recorded_at";

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn session_row(row: &rusqlite::Row) -> rusqlite::Result<RawSession> {
  Ok(RawSession {
    session_id:      row.get(0)?,
    group_id:        row.get(1)?,
    teacher_id:      row.get(2)?,
    classroom_id:    row.get(3)?,
    device_id:       row.get(4)?,
    scheduled_start: row.get(5)?,
    scheduled_end:   row.get(6)?,
    actual_start:    row.get(7)?,
    actual_end:      row.get(8)?,
    status:          row.get(9)?,
    created_by:      row.get(10)?,
    updated_by:      row.get(11)?,
    created_at:      row.get(12)?,
    updated_at:      row.get(13)?,
  })
}

fn record_row(row: &rusqlite::Row) -> rusqlite::Result<RawRecord> {
  Ok(RawRecord {
    record_id:         row.get(0)?,
    session_id:        row.get(1)?,
    student_id:        row.get(2)?,
    status:            row.get(3)?,
    arrival_time:      row.get(4)?,
    permanence:        row.get(5)?,
    origin:            row.get(6)?,
    manual_correction: row.get(7)?,
    source:            row.get(8)?,
    confidence:        row.get(9)?,
    created_at:        row.get(10)?,
    updated_at:        row.get(11)?,
  })
}

fn snapshot_row(row: &rusqlite::Row) -> rusqlite::Result<RawSnapshot> {
  Ok(RawSnapshot {
    snapshot_id:      row.get(0)?,
    session_id:       row.get(1)?,
    device_id:        row.get(2)?,
    captured_at:      row.get(3)?,
    detected_persons: row.get(4)?,
    occupancy_rate:   row.get(5)?,
    confidence:       row.get(6)?,
    detections:       row.get(7)?,
    recorded_at:      row.get(8)?,
  })
}

// ─── Pre-encoded write rows ──────────────────────────────────────────────────

/// A reconciliation outcome with all columns encoded, ready to cross into a
/// `conn.call` closure.
struct OutcomeRow {
  record_id:    String,
  student_id:   String,
  status:       &'static str,
  arrival_time: Option<String>,
  permanence:   f64,
}

fn encode_outcomes(outcomes: &[RecordOutcome]) -> Vec<OutcomeRow> {
  outcomes
    .iter()
    .map(|o| OutcomeRow {
      record_id:    encode_uuid(Uuid::new_v4()),
      student_id:   encode_uuid(o.student_id),
      status:       encode_attendance_status(o.status),
      arrival_time: o.arrival_time.map(encode_dt),
      permanence:   o.permanence,
    })
    .collect()
}

/// Upsert one reconciliation outcome. The `WHERE manual_correction = 0`
/// guard on the update arm re-checks the freeze flag in storage, so a retry
/// cannot overwrite a correction applied in between. Returns rows written
/// (0 when the record was frozen).
fn upsert_outcome(
  conn: &rusqlite::Connection,
  session_id: &str,
  row: &OutcomeRow,
  now: &str,
) -> rusqlite::Result<usize> {
  conn.execute(
    "INSERT INTO attendance_records (
       record_id, session_id, student_id, status, arrival_time, permanence,
       origin, manual_correction, source, confidence, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'ai', 0, 'camera_detection', NULL, ?7, ?7)
     ON CONFLICT(session_id, student_id) DO UPDATE SET
       status       = excluded.status,
       arrival_time = excluded.arrival_time,
       permanence   = excluded.permanence,
       origin       = 'ai',
       updated_at   = excluded.updated_at
     WHERE attendance_records.manual_correction = 0",
    rusqlite::params![
      row.record_id,
      session_id,
      row.student_id,
      row.status,
      row.arrival_time,
      row.permanence,
      now,
    ],
  )
}

/// Insert one absent record, ignoring the conflict when any record already
/// exists for the pair. Returns rows created (0 or 1).
fn insert_absent(
  conn: &rusqlite::Connection,
  session_id: &str,
  student_id: &str,
  now: &str,
) -> rusqlite::Result<usize> {
  conn.execute(
    "INSERT INTO attendance_records (
       record_id, session_id, student_id, status, arrival_time, permanence,
       origin, manual_correction, source, confidence, created_at, updated_at
     ) VALUES (?1, ?2, ?3, 'absent', NULL, 0, 'ai', 0, 'camera_detection',
               NULL, ?4, ?4)
     ON CONFLICT(session_id, student_id) DO NOTHING",
    rusqlite::params![encode_uuid(Uuid::new_v4()), session_id, student_id, now],
  )
}

fn is_constraint_violation(err: &tokio_rusqlite::Error) -> bool {
  matches!(
    err,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
      if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An attendance store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All access
/// funnels through the connection's worker thread, which serialises
/// record upserts from concurrent deliveries.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
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

  /// Seed one roster entry. Enrollment administration proper lives in the
  /// external catalog system; this is the minimal write surface needed to
  /// operate and test the engine.
  pub async fn add_enrollment(&self, group_id: Uuid, student_id: Uuid) -> Result<()> {
    let group_str   = encode_uuid(group_id);
    let student_str = encode_uuid(student_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO enrollments (group_id, student_id) VALUES (?1, ?2)",
          rusqlite::params![group_str, student_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_session(&self, id_str: String) -> Result<Option<Session>> {
    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SESSION_COLS} FROM sessions WHERE session_id = ?1"),
              rusqlite::params![id_str],
              session_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  type Error = Error;

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, input: NewSession) -> Result<Session> {
    let now = Utc::now();
    let session = Session {
      session_id:      Uuid::new_v4(),
      group_id:        input.group_id,
      teacher_id:      input.teacher_id,
      classroom_id:    input.classroom_id,
      device_id:       input.device_id,
      scheduled_start: input.scheduled_start,
      scheduled_end:   input.scheduled_end,
      actual_start:    input.actual_start,
      actual_end:      None,
      status:          input.status,
      created_by:      input.created_by,
      updated_by:      input.updated_by,
      created_at:      now,
      updated_at:      now,
    };

    let id_str        = encode_uuid(session.session_id);
    let group_str     = encode_uuid(session.group_id);
    let teacher_str   = encode_uuid(session.teacher_id);
    let classroom_str = encode_uuid(session.classroom_id);
    let device_str    = session.device_id.map(encode_uuid);
    let sched_start   = encode_dt(session.scheduled_start);
    let sched_end     = encode_dt(session.scheduled_end);
    let actual_start  = session.actual_start.map(encode_dt);
    let status_str    = encode_session_status(session.status).to_owned();
    let created_by    = encode_uuid(session.created_by);
    let updated_by    = encode_uuid(session.updated_by);
    let now_str       = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (
             session_id, group_id, teacher_id, classroom_id, device_id,
             scheduled_start, scheduled_end, actual_start, actual_end,
             status, created_by, updated_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?10, ?11, ?12, ?12)",
          rusqlite::params![
            id_str,
            group_str,
            teacher_str,
            classroom_str,
            device_str,
            sched_start,
            sched_end,
            actual_start,
            status_str,
            created_by,
            updated_by,
            now_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| {
        // The only practical constraint on this insert is the partial unique
        // index guarding one in-progress session per teacher.
        if is_constraint_violation(&e) {
          Error::TeacherBusy(session.teacher_id)
        } else {
          Error::Database(e)
        }
      })?;

    Ok(session)
  }

  async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
    self.fetch_session(encode_uuid(id)).await
  }

  async fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>> {
    let teacher_str = query.teacher_id.map(encode_uuid);
    let group_str   = query.group_id.map(encode_uuid);
    let status_str  = query.status.map(encode_session_status).map(str::to_owned);
    let start_str   = query.start_date.map(encode_dt);
    let end_str     = query.end_date.map(encode_dt);
    let limit_val   = query.limit.unwrap_or(100) as i64;
    let offset_val  = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawSession> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically; parameter numbering is fixed.
        let mut conds: Vec<&'static str> = vec![];
        if teacher_str.is_some() {
          conds.push("teacher_id = ?1");
        }
        if group_str.is_some() {
          conds.push("group_id = ?2");
        }
        if status_str.is_some() {
          conds.push("status = ?3");
        }
        if start_str.is_some() {
          conds.push("scheduled_start >= ?4");
        }
        if end_str.is_some() {
          conds.push("scheduled_start <= ?5");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {SESSION_COLS} FROM sessions
           {where_clause}
           ORDER BY scheduled_start DESC
           LIMIT ?6 OFFSET ?7"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              teacher_str.as_deref(),
              group_str.as_deref(),
              status_str.as_deref(),
              start_str.as_deref(),
              end_str.as_deref(),
              limit_val,
              offset_val,
            ],
            session_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSession::into_session).collect()
  }

  async fn active_session_for_teacher(
    &self,
    teacher_id: Uuid,
  ) -> Result<Option<Session>> {
    let teacher_str = encode_uuid(teacher_id);

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SESSION_COLS} FROM sessions
                 WHERE teacher_id = ?1 AND status = 'in_progress'"
              ),
              rusqlite::params![teacher_str],
              session_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn set_session_status(
    &self,
    id: Uuid,
    status: SessionStatus,
    actual_end: Option<DateTime<Utc>>,
    updated_by: Uuid,
  ) -> Result<Session> {
    let id_str     = encode_uuid(id);
    let status_str = encode_session_status(status).to_owned();
    let end_str    = actual_end.map(encode_dt);
    let by_str     = encode_uuid(updated_by);
    let now_str    = encode_dt(Utc::now());

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE sessions SET
             status     = ?2,
             actual_end = COALESCE(?3, actual_end),
             updated_by = ?4,
             updated_at = ?5
           WHERE session_id = ?1",
          rusqlite::params![id_str, status_str, end_str, by_str, now_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(Some(conn.query_row(
          &format!("SELECT {SESSION_COLS} FROM sessions WHERE session_id = ?1"),
          rusqlite::params![id_str],
          session_row,
        )?))
      })
      .await?;

    raw
      .ok_or(Error::SessionNotFound(id))
      .and_then(RawSession::into_session)
  }

  async fn complete_session(
    &self,
    id: Uuid,
    outcomes: Vec<RecordOutcome>,
    absentees: Vec<Uuid>,
    actual_end: DateTime<Utc>,
    updated_by: Uuid,
  ) -> Result<Session> {
    let id_str       = encode_uuid(id);
    let outcome_rows = encode_outcomes(&outcomes);
    let absent_strs: Vec<String> = absentees.iter().copied().map(encode_uuid).collect();
    let end_str      = encode_dt(actual_end);
    let by_str       = encode_uuid(updated_by);
    let now_str      = encode_dt(Utc::now());

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        for row in &outcome_rows {
          upsert_outcome(&tx, &id_str, row, &now_str)?;
        }
        for student in &absent_strs {
          insert_absent(&tx, &id_str, student, &now_str)?;
        }

        let changed = tx.execute(
          "UPDATE sessions SET
             status     = 'finished',
             actual_end = ?2,
             updated_by = ?3,
             updated_at = ?4
           WHERE session_id = ?1",
          rusqlite::params![id_str, end_str, by_str, now_str],
        )?;
        if changed == 0 {
          // Dropping the transaction rolls the batch back.
          return Ok(None);
        }

        let raw = tx.query_row(
          &format!("SELECT {SESSION_COLS} FROM sessions WHERE session_id = ?1"),
          rusqlite::params![id_str],
          session_row,
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw
      .ok_or(Error::SessionNotFound(id))
      .and_then(RawSession::into_session)
  }

  // ── Snapshots — append-only writes ────────────────────────────────────────

  async fn insert_snapshot(&self, input: NewSnapshot) -> Result<Snapshot> {
    let snapshot = Snapshot {
      snapshot_id:      Uuid::new_v4(),
      session_id:       input.session_id,
      device_id:        input.device_id,
      captured_at:      input.captured_at,
      detected_persons: input.detections.len() as u32,
      occupancy_rate:   input.occupancy_rate,
      confidence:       input.peak_confidence(),
      detections:       input.detections,
      recorded_at:      Utc::now(),
    };

    let id_str         = encode_uuid(snapshot.snapshot_id);
    let session_str    = encode_uuid(snapshot.session_id);
    let device_str     = encode_uuid(snapshot.device_id);
    let captured_str   = encode_dt(snapshot.captured_at);
    let persons        = snapshot.detected_persons;
    let occupancy      = snapshot.occupancy_rate;
    let confidence     = snapshot.confidence;
    let detections_str = encode_detections(&snapshot.detections)?;
    let recorded_str   = encode_dt(snapshot.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO snapshots (
             snapshot_id, session_id, device_id, captured_at,
             detected_persons, occupancy_rate, confidence, detections,
             recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            session_str,
            device_str,
            captured_str,
            persons,
            occupancy,
            confidence,
            detections_str,
            recorded_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(snapshot)
  }

  async fn snapshots_for_session(&self, session_id: Uuid) -> Result<Vec<Snapshot>> {
    let session_str = encode_uuid(session_id);

    let raws: Vec<RawSnapshot> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SNAPSHOT_COLS} FROM snapshots
           WHERE session_id = ?1
           ORDER BY captured_at ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![session_str], snapshot_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSnapshot::into_snapshot).collect()
  }

  // ── Attendance records ────────────────────────────────────────────────────

  async fn record_detection(
    &self,
    session_id: Uuid,
    student_id: Uuid,
    seen_at: DateTime<Utc>,
    confidence: f64,
  ) -> Result<()> {
    let session_str = encode_uuid(session_id);
    let student_str = encode_uuid(student_id);
    let record_str  = encode_uuid(Uuid::new_v4());
    let seen_str    = encode_dt(seen_at);
    let now_str     = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<(String, bool)> = tx
          .query_row(
            "SELECT status, manual_correction FROM attendance_records
             WHERE session_id = ?1 AND student_id = ?2",
            rusqlite::params![session_str, student_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        match existing {
          None => {
            tx.execute(
              "INSERT INTO attendance_records (
                 record_id, session_id, student_id, status, arrival_time,
                 permanence, origin, manual_correction, source, confidence,
                 created_at, updated_at
               ) VALUES (?1, ?2, ?3, 'present', ?4, 0, 'ai', 0,
                         'camera_detection', ?5, ?6, ?6)",
              rusqlite::params![
                record_str,
                session_str,
                student_str,
                seen_str,
                confidence,
                now_str,
              ],
            )?;
          }
          // A frozen absent record is authoritative: the teacher said the
          // student is not there, so the detection is discarded.
          Some((status, true)) if status == "absent" => {}
          // Frozen otherwise: confidence is outside the protected set and
          // may still rise; status, arrival, permanence, origin stay put.
          Some((_, true)) => {
            tx.execute(
              "UPDATE attendance_records SET
                 confidence = MAX(COALESCE(confidence, 0), ?3),
                 updated_at = ?4
               WHERE session_id = ?1 AND student_id = ?2",
              rusqlite::params![session_str, student_str, confidence, now_str],
            )?;
          }
          Some((_, false)) => {
            tx.execute(
              "UPDATE attendance_records SET
                 status       = 'present',
                 confidence   = MAX(COALESCE(confidence, 0), ?3),
                 arrival_time = COALESCE(arrival_time, ?4),
                 updated_at   = ?5
               WHERE session_id = ?1 AND student_id = ?2",
              rusqlite::params![
                session_str,
                student_str,
                confidence,
                seen_str,
                now_str,
              ],
            )?;
          }
        }

        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_record(
    &self,
    session_id: Uuid,
    student_id: Uuid,
  ) -> Result<Option<AttendanceRecord>> {
    let session_str = encode_uuid(session_id);
    let student_str = encode_uuid(student_id);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {RECORD_COLS} FROM attendance_records
                 WHERE session_id = ?1 AND student_id = ?2"
              ),
              rusqlite::params![session_str, student_str],
              record_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn records_for_session(
    &self,
    session_id: Uuid,
  ) -> Result<Vec<AttendanceRecord>> {
    let session_str = encode_uuid(session_id);

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLS} FROM attendance_records
           WHERE session_id = ?1
           ORDER BY student_id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![session_str], record_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn apply_correction(
    &self,
    session_id: Uuid,
    student_id: Uuid,
    status: AttendanceStatus,
    arrival_time: Option<DateTime<Utc>>,
  ) -> Result<AttendanceRecord> {
    let session_str = encode_uuid(session_id);
    let student_str = encode_uuid(student_id);
    let record_str  = encode_uuid(Uuid::new_v4());
    let status_str  = encode_attendance_status(status).to_owned();
    let arrival_str = arrival_time.map(encode_dt);
    let now_str     = encode_dt(Utc::now());

    let raw: RawRecord = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM attendance_records
             WHERE session_id = ?1 AND student_id = ?2",
            rusqlite::params![session_str, student_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if exists {
          // Provenance blends: an automated record becomes mixed once a
          // human touches it; manual/mixed records keep their origin.
          // The freeze flag is set unconditionally, even when the new
          // status coincides with the automated one.
          tx.execute(
            "UPDATE attendance_records SET
               status            = ?3,
               origin            = CASE origin WHEN 'ai' THEN 'mixed' ELSE origin END,
               manual_correction = 1,
               arrival_time      = COALESCE(?4, arrival_time),
               updated_at        = ?5
             WHERE session_id = ?1 AND student_id = ?2",
            rusqlite::params![
              session_str,
              student_str,
              status_str,
              arrival_str,
              now_str,
            ],
          )?;
        } else {
          tx.execute(
            "INSERT INTO attendance_records (
               record_id, session_id, student_id, status, arrival_time,
               permanence, origin, manual_correction, source, confidence,
               created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, 0, 'manual', 1, 'manual', NULL,
                       ?6, ?6)",
            rusqlite::params![
              record_str,
              session_str,
              student_str,
              status_str,
              arrival_str,
              now_str,
            ],
          )?;
        }

        let raw = tx.query_row(
          &format!(
            "SELECT {RECORD_COLS} FROM attendance_records
             WHERE session_id = ?1 AND student_id = ?2"
          ),
          rusqlite::params![session_str, student_str],
          record_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_record()
  }

  async fn apply_reconciliation(
    &self,
    session_id: Uuid,
    outcomes: Vec<RecordOutcome>,
  ) -> Result<usize> {
    let session_str  = encode_uuid(session_id);
    let outcome_rows = encode_outcomes(&outcomes);
    let now_str      = encode_dt(Utc::now());

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0;
        for row in &outcome_rows {
          written += upsert_outcome(&tx, &session_str, row, &now_str)?;
        }
        tx.commit()?;
        Ok(written)
      })
      .await?;

    Ok(written)
  }

  async fn insert_absences(
    &self,
    session_id: Uuid,
    student_ids: Vec<Uuid>,
  ) -> Result<usize> {
    let session_str = encode_uuid(session_id);
    let student_strs: Vec<String> =
      student_ids.iter().copied().map(encode_uuid).collect();
    let now_str = encode_dt(Utc::now());

    let created = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut created = 0;
        for student in &student_strs {
          created += insert_absent(&tx, &session_str, student, &now_str)?;
        }
        tx.commit()?;
        Ok(created)
      })
      .await?;

    Ok(created)
  }
}

// ─── EnrollmentProvider impl ─────────────────────────────────────────────────

impl EnrollmentProvider for SqliteStore {
  type Error = Error;

  async fn roster(&self, group_id: Uuid) -> Result<Vec<Uuid>> {
    let group_str = encode_uuid(group_id);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT student_id FROM enrollments
           WHERE group_id = ?1
           ORDER BY student_id ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![group_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids
      .iter()
      .map(|s| crate::encode::decode_uuid(s))
      .collect()
  }
}
