//! The `AttendanceStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `aula-store-sqlite`).
//! Higher layers (`aula-engine`, `aula-api`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  record::{AttendanceRecord, AttendanceStatus, RecordOutcome},
  session::{NewSession, Session, SessionStatus},
  snapshot::{NewSnapshot, Snapshot},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`AttendanceStore::list_sessions`].
#[derive(Debug, Clone, Default)]
pub struct SessionQuery {
  pub teacher_id: Option<Uuid>,
  pub group_id:   Option<Uuid>,
  pub status:     Option<SessionStatus>,
  /// Restrict to sessions scheduled to start at or after this instant.
  pub start_date: Option<DateTime<Utc>>,
  /// Restrict to sessions scheduled to start at or before this instant.
  pub end_date:   Option<DateTime<Utc>>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an attendance store backend.
///
/// Snapshots are append-only. Attendance-record writes are expressed as
/// atomic units (`record_detection`, `apply_correction`,
/// `apply_reconciliation`, `insert_absences`) so concurrent deliveries for
/// the same `(session_id, student_id)` pair cannot interleave, and every
/// automated write re-checks the `manual_correction` freeze flag at
/// application time.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AttendanceStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Create and persist a new session. When the input carries
  /// [`SessionStatus::InProgress`] and the teacher already has an
  /// in-progress session, the storage-level uniqueness constraint fires and
  /// this returns the teacher-busy error — callers never pre-check.
  fn create_session(
    &self,
    input: NewSession,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Retrieve a session by id. Returns `None` if not found.
  fn get_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// List sessions matching `query`, most recently scheduled first.
  fn list_sessions<'a>(
    &'a self,
    query: &'a SessionQuery,
  ) -> impl Future<Output = Result<Vec<Session>, Self::Error>> + Send + 'a;

  /// The teacher's in-progress session, if any. Absence is a normal state,
  /// never an error.
  fn active_session_for_teacher(
    &self,
    teacher_id: Uuid,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// Flip a session's status (and optionally set `actual_end`) without
  /// touching attendance records. Used by cancel and by the fallback close
  /// path when the finish batch fails.
  fn set_session_status(
    &self,
    id: Uuid,
    status: SessionStatus,
    actual_end: Option<DateTime<Utc>>,
    updated_by: Uuid,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Apply reconciliation outcomes, absence fills, and the `Finished` flip
  /// in a single transaction, so partial results are never externally
  /// visible. Safe to retry: outcome upserts skip frozen records and
  /// absence inserts ignore conflicts.
  fn complete_session(
    &self,
    id: Uuid,
    outcomes: Vec<RecordOutcome>,
    absentees: Vec<Uuid>,
    actual_end: DateTime<Utc>,
    updated_by: Uuid,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  // ── Snapshots — append-only writes ────────────────────────────────────

  /// Persist a snapshot and return it. `snapshot_id` and `recorded_at` are
  /// set by the store.
  fn insert_snapshot(
    &self,
    input: NewSnapshot,
  ) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + '_;

  /// All snapshots of a session, ordered by `captured_at`.
  fn snapshots_for_session(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Snapshot>, Self::Error>> + Send + '_;

  // ── Attendance records ────────────────────────────────────────────────

  /// Incremental presence upsert for one detection, as a single atomic
  /// unit:
  /// - no record → create it as present (origin AI, camera source);
  /// - frozen and absent → skip entirely;
  /// - frozen otherwise → only raise `confidence`;
  /// - unfrozen → raise `confidence`, force present, set `arrival_time`
  ///   if unset.
  fn record_detection(
    &self,
    session_id: Uuid,
    student_id: Uuid,
    seen_at: DateTime<Utc>,
    confidence: f64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve one record. Returns `None` if not found.
  fn get_record(
    &self,
    session_id: Uuid,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send + '_;

  /// All records of a session, ordered by student id.
  fn records_for_session(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Manual correction, as a single atomic unit. Creates the record with
  /// origin `Manual` when missing; otherwise blends provenance
  /// (`Ai → Mixed`, `Manual`/`Mixed` unchanged), sets the new status,
  /// updates `arrival_time` only when provided, and always sets the
  /// `manual_correction` freeze flag. This is the only write path allowed
  /// to change a frozen record.
  fn apply_correction(
    &self,
    session_id: Uuid,
    student_id: Uuid,
    status: AttendanceStatus,
    arrival_time: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<AttendanceRecord, Self::Error>> + Send + '_;

  /// Upsert batch-reconciliation outcomes with origin `Ai`, skipping any
  /// record whose freeze flag is set (re-checked in storage, not just by
  /// the caller). Returns the number of records actually written.
  fn apply_reconciliation(
    &self,
    session_id: Uuid,
    outcomes: Vec<RecordOutcome>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Insert absent records for the given students, ignoring conflicts on
  /// `(session_id, student_id)` so repeated runs create no duplicates.
  /// Returns the number of records actually created.
  fn insert_absences(
    &self,
    session_id: Uuid,
    student_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
