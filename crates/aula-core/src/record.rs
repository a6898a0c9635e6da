//! Attendance record types — one record per `(session, student)` pair.
//!
//! Records carry a provenance tag (`origin`) and a freeze flag
//! (`manual_correction`). Once frozen, no automated write may alter the
//! record's status, arrival time, permanence, or origin; only another
//! explicit correction may.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Final or running classification of a student within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
  Present,
  Late,
  Absent,
  Excused,
}

impl AttendanceStatus {
  /// `Present` and `Late` both count as attended for roster gap-filling.
  pub fn counts_as_present(&self) -> bool {
    matches!(self, Self::Present | Self::Late)
  }
}

// ─── Provenance ──────────────────────────────────────────────────────────────

/// Who produced the record's current values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
  /// Automated detection only.
  Ai,
  /// Human correction only.
  Manual,
  /// Human override of a prior automated record.
  Mixed,
}

/// The channel through which the record was first established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
  Nfc,
  CameraDetection,
  Manual,
}

// ─── AttendanceRecord ────────────────────────────────────────────────────────

/// Attendance of one student in one session. Unique per
/// `(session_id, student_id)`; mutated by ingestion, reconciliation, and
/// correction; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub record_id:         Uuid,
  pub session_id:        Uuid,
  pub student_id:        Uuid,
  pub status:            AttendanceStatus,
  pub arrival_time:      Option<DateTime<Utc>>,
  /// Fraction of the session's snapshots in which the student was detected,
  /// expressed 0–100.
  pub permanence:        f64,
  pub origin:            Origin,
  /// Freeze flag: set by every manual correction, shields the record from
  /// automated recomputation.
  pub manual_correction: bool,
  pub source:            RecordSource,
  pub confidence:        Option<f64>,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

impl AttendanceRecord {
  pub fn is_frozen(&self) -> bool { self.manual_correction }
}

// ─── RecordOutcome ───────────────────────────────────────────────────────────

/// One student's computed result from a batch reconciliation pass, applied
/// via [`crate::store::AttendanceStore::apply_reconciliation`] (records with
/// `manual_correction` set are skipped at application time).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
  pub student_id:   Uuid,
  pub status:       AttendanceStatus,
  pub permanence:   f64,
  /// Earliest snapshot in which the student was detected.
  pub arrival_time: Option<DateTime<Utc>>,
}
