//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Detections are stored as
//! compact JSON. Status/origin/source enums are stored as snake_case text —
//! the same portable representation regardless of backend. UUIDs are stored
//! as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use aula_core::{
  record::{AttendanceRecord, AttendanceStatus, Origin, RecordSource},
  session::{Session, SessionStatus},
  snapshot::{Detection, Snapshot},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── SessionStatus ───────────────────────────────────────────────────────────

pub fn encode_session_status(s: SessionStatus) -> &'static str { s.as_str() }

pub fn decode_session_status(s: &str) -> Result<SessionStatus> {
  match s {
    "pending" => Ok(SessionStatus::Pending),
    "in_progress" => Ok(SessionStatus::InProgress),
    "finished" => Ok(SessionStatus::Finished),
    "closed" => Ok(SessionStatus::Closed),
    "cancelled" => Ok(SessionStatus::Cancelled),
    other => Err(Error::UnknownColumnValue(format!("session status: {other}"))),
  }
}

// ─── AttendanceStatus ────────────────────────────────────────────────────────

pub fn encode_attendance_status(s: AttendanceStatus) -> &'static str {
  match s {
    AttendanceStatus::Present => "present",
    AttendanceStatus::Late => "late",
    AttendanceStatus::Absent => "absent",
    AttendanceStatus::Excused => "excused",
  }
}

pub fn decode_attendance_status(s: &str) -> Result<AttendanceStatus> {
  match s {
    "present" => Ok(AttendanceStatus::Present),
    "late" => Ok(AttendanceStatus::Late),
    "absent" => Ok(AttendanceStatus::Absent),
    "excused" => Ok(AttendanceStatus::Excused),
    other => {
      Err(Error::UnknownColumnValue(format!("attendance status: {other}")))
    }
  }
}

// ─── Origin ──────────────────────────────────────────────────────────────────

pub fn encode_origin(o: Origin) -> &'static str {
  match o {
    Origin::Ai => "ai",
    Origin::Manual => "manual",
    Origin::Mixed => "mixed",
  }
}

pub fn decode_origin(s: &str) -> Result<Origin> {
  match s {
    "ai" => Ok(Origin::Ai),
    "manual" => Ok(Origin::Manual),
    "mixed" => Ok(Origin::Mixed),
    other => Err(Error::UnknownColumnValue(format!("origin: {other}"))),
  }
}

// ─── RecordSource ────────────────────────────────────────────────────────────

pub fn encode_source(s: RecordSource) -> &'static str {
  match s {
    RecordSource::Nfc => "nfc",
    RecordSource::CameraDetection => "camera_detection",
    RecordSource::Manual => "manual",
  }
}

pub fn decode_source(s: &str) -> Result<RecordSource> {
  match s {
    "nfc" => Ok(RecordSource::Nfc),
    "camera_detection" => Ok(RecordSource::CameraDetection),
    "manual" => Ok(RecordSource::Manual),
    other => Err(Error::UnknownColumnValue(format!("record source: {other}"))),
  }
}

// ─── Detections ──────────────────────────────────────────────────────────────

pub fn encode_detections(detections: &[Detection]) -> Result<String> {
  Ok(serde_json::to_string(detections)?)
}

pub fn decode_detections(s: &str) -> Result<Vec<Detection>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `sessions` row.
pub struct RawSession {
  pub session_id:      String,
  pub group_id:        String,
  pub teacher_id:      String,
  pub classroom_id:    String,
  pub device_id:       Option<String>,
  pub scheduled_start: String,
  pub scheduled_end:   String,
  pub actual_start:    Option<String>,
  pub actual_end:      Option<String>,
  pub status:          String,
  pub created_by:      String,
  pub updated_by:      String,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawSession {
  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      session_id:      decode_uuid(&self.session_id)?,
      group_id:        decode_uuid(&self.group_id)?,
      teacher_id:      decode_uuid(&self.teacher_id)?,
      classroom_id:    decode_uuid(&self.classroom_id)?,
      device_id:       decode_opt_uuid(self.device_id.as_deref())?,
      scheduled_start: decode_dt(&self.scheduled_start)?,
      scheduled_end:   decode_dt(&self.scheduled_end)?,
      actual_start:    decode_opt_dt(self.actual_start.as_deref())?,
      actual_end:      decode_opt_dt(self.actual_end.as_deref())?,
      status:          decode_session_status(&self.status)?,
      created_by:      decode_uuid(&self.created_by)?,
      updated_by:      decode_uuid(&self.updated_by)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `snapshots` row.
pub struct RawSnapshot {
  pub snapshot_id:      String,
  pub session_id:       String,
  pub device_id:        String,
  pub captured_at:      String,
  pub detected_persons: u32,
  pub occupancy_rate:   f64,
  pub confidence:       f64,
  pub detections:       String,
  pub recorded_at:      String,
}

impl RawSnapshot {
  pub fn into_snapshot(self) -> Result<Snapshot> {
    Ok(Snapshot {
      snapshot_id:      decode_uuid(&self.snapshot_id)?,
      session_id:       decode_uuid(&self.session_id)?,
      device_id:        decode_uuid(&self.device_id)?,
      captured_at:      decode_dt(&self.captured_at)?,
      detected_persons: self.detected_persons,
      occupancy_rate:   self.occupancy_rate,
      confidence:       self.confidence,
      detections:       decode_detections(&self.detections)?,
      recorded_at:      decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw strings read directly from an `attendance_records` row.
pub struct RawRecord {
  pub record_id:         String,
  pub session_id:        String,
  pub student_id:        String,
  pub status:            String,
  pub arrival_time:      Option<String>,
  pub permanence:        f64,
  pub origin:            String,
  pub manual_correction: bool,
  pub source:            String,
  pub confidence:        Option<f64>,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawRecord {
  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      record_id:         decode_uuid(&self.record_id)?,
      session_id:        decode_uuid(&self.session_id)?,
      student_id:        decode_uuid(&self.student_id)?,
      status:            decode_attendance_status(&self.status)?,
      arrival_time:      decode_opt_dt(self.arrival_time.as_deref())?,
      permanence:        self.permanence,
      origin:            decode_origin(&self.origin)?,
      manual_correction: self.manual_correction,
      source:            decode_source(&self.source)?,
      confidence:        self.confidence,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}
