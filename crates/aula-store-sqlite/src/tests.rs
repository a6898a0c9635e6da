//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use aula_core::{
  record::{AttendanceStatus, Origin, RecordOutcome, RecordSource},
  roster::EnrollmentProvider,
  session::{NewSession, Session, SessionStatus},
  snapshot::{Detection, NewSnapshot},
  store::{AttendanceStore, SessionQuery},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_session(teacher_id: Uuid) -> NewSession {
  let now = Utc::now();
  NewSession {
    group_id:        Uuid::new_v4(),
    teacher_id,
    classroom_id:    Uuid::new_v4(),
    device_id:       None,
    scheduled_start: now,
    scheduled_end:   now + Duration::hours(2),
    actual_start:    Some(now),
    status:          SessionStatus::InProgress,
    created_by:      teacher_id,
    updated_by:      teacher_id,
  }
}

async fn open_session(s: &SqliteStore) -> Session {
  s.create_session(new_session(Uuid::new_v4())).await.unwrap()
}

fn detection(student_id: Uuid, confidence: f64) -> Detection {
  Detection {
    student_id: Some(student_id),
    confidence,
    bbox: None,
  }
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_session() {
  let s = store().await;

  let session = open_session(&s).await;
  assert_eq!(session.status, SessionStatus::InProgress);

  let fetched = s.get_session(session.session_id).await.unwrap().unwrap();
  assert_eq!(fetched.session_id, session.session_id);
  assert_eq!(fetched.teacher_id, session.teacher_id);
  assert_eq!(fetched.status, SessionStatus::InProgress);
  assert!(fetched.actual_end.is_none());
}

#[tokio::test]
async fn get_session_missing_returns_none() {
  let s = store().await;
  let result = s.get_session(Uuid::new_v4()).await.unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn second_in_progress_session_for_teacher_is_rejected() {
  let s = store().await;
  let teacher = Uuid::new_v4();

  s.create_session(new_session(teacher)).await.unwrap();
  let err = s.create_session(new_session(teacher)).await.unwrap_err();
  assert!(matches!(err, crate::Error::TeacherBusy(t) if t == teacher));
}

#[tokio::test]
async fn teacher_can_open_again_after_finishing() {
  let s = store().await;
  let teacher = Uuid::new_v4();

  let first = s.create_session(new_session(teacher)).await.unwrap();
  s.set_session_status(
    first.session_id,
    SessionStatus::Finished,
    Some(Utc::now()),
    teacher,
  )
  .await
  .unwrap();

  // The partial index only guards in-progress rows.
  s.create_session(new_session(teacher)).await.unwrap();
}

#[tokio::test]
async fn different_teachers_can_run_concurrent_sessions() {
  let s = store().await;
  s.create_session(new_session(Uuid::new_v4())).await.unwrap();
  s.create_session(new_session(Uuid::new_v4())).await.unwrap();
}

#[tokio::test]
async fn active_session_for_teacher_lookup() {
  let s = store().await;
  let teacher = Uuid::new_v4();

  assert!(
    s.active_session_for_teacher(teacher)
      .await
      .unwrap()
      .is_none()
  );

  let session = s.create_session(new_session(teacher)).await.unwrap();
  let active = s.active_session_for_teacher(teacher).await.unwrap().unwrap();
  assert_eq!(active.session_id, session.session_id);

  s.set_session_status(
    session.session_id,
    SessionStatus::Cancelled,
    None,
    teacher,
  )
  .await
  .unwrap();
  assert!(
    s.active_session_for_teacher(teacher)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn set_session_status_missing_errors() {
  let s = store().await;
  let err = s
    .set_session_status(Uuid::new_v4(), SessionStatus::Cancelled, None, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::SessionNotFound(_)));
}

#[tokio::test]
async fn cancel_keeps_actual_end_untouched() {
  let s = store().await;
  let session = open_session(&s).await;

  let updated = s
    .set_session_status(
      session.session_id,
      SessionStatus::Cancelled,
      None,
      session.teacher_id,
    )
    .await
    .unwrap();
  assert_eq!(updated.status, SessionStatus::Cancelled);
  assert!(updated.actual_end.is_none());
}

#[tokio::test]
async fn list_sessions_filters_by_teacher_and_status() {
  let s = store().await;
  let teacher = Uuid::new_v4();

  let mine = s.create_session(new_session(teacher)).await.unwrap();
  open_session(&s).await;
  s.set_session_status(mine.session_id, SessionStatus::Finished, Some(Utc::now()), teacher)
    .await
    .unwrap();

  let by_teacher = s
    .list_sessions(&SessionQuery {
      teacher_id: Some(teacher),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_teacher.len(), 1);
  assert_eq!(by_teacher[0].session_id, mine.session_id);

  let finished = s
    .list_sessions(&SessionQuery {
      status: Some(SessionStatus::Finished),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(finished.len(), 1);

  let in_progress = s
    .list_sessions(&SessionQuery {
      status: Some(SessionStatus::InProgress),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(in_progress.len(), 1);
}

#[tokio::test]
async fn list_sessions_date_window() {
  let s = store().await;
  let session = open_session(&s).await;

  let hits = s
    .list_sessions(&SessionQuery {
      start_date: Some(session.scheduled_start - Duration::minutes(1)),
      end_date:   Some(session.scheduled_start + Duration::minutes(1)),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);

  let misses = s
    .list_sessions(&SessionQuery {
      start_date: Some(session.scheduled_start + Duration::hours(1)),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(misses.is_empty());
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_snapshot_computes_derived_fields() {
  let s = store().await;
  let session = open_session(&s).await;

  let snap = s
    .insert_snapshot(NewSnapshot {
      session_id:     session.session_id,
      device_id:      Uuid::new_v4(),
      captured_at:    Utc::now(),
      occupancy_rate: 0.5,
      detections:     vec![
        detection(Uuid::new_v4(), 0.7),
        detection(Uuid::new_v4(), 0.9),
      ],
    })
    .await
    .unwrap();

  assert_eq!(snap.detected_persons, 2);
  assert!((snap.confidence - 0.9).abs() < f64::EPSILON);
}

#[tokio::test]
async fn snapshot_without_detections_has_zero_confidence() {
  let s = store().await;
  let session = open_session(&s).await;

  let snap = s
    .insert_snapshot(NewSnapshot {
      session_id:     session.session_id,
      device_id:      Uuid::new_v4(),
      captured_at:    Utc::now(),
      occupancy_rate: 0.0,
      detections:     vec![],
    })
    .await
    .unwrap();

  assert_eq!(snap.detected_persons, 0);
  assert_eq!(snap.confidence, 0.0);
}

#[tokio::test]
async fn snapshots_are_returned_in_capture_order() {
  let s = store().await;
  let session = open_session(&s).await;
  let device = Uuid::new_v4();
  let base = Utc::now();

  // Insert out of order; reads must sort by captured_at.
  for offset in [2i64, 0, 1] {
    s.insert_snapshot(NewSnapshot {
      session_id:     session.session_id,
      device_id:      device,
      captured_at:    base + Duration::minutes(offset),
      occupancy_rate: 0.1,
      detections:     vec![],
    })
    .await
    .unwrap();
  }

  let snaps = s.snapshots_for_session(session.session_id).await.unwrap();
  assert_eq!(snaps.len(), 3);
  assert!(snaps.windows(2).all(|w| w[0].captured_at <= w[1].captured_at));
}

#[tokio::test]
async fn detections_roundtrip_through_json_column() {
  let s = store().await;
  let session = open_session(&s).await;
  let student = Uuid::new_v4();

  s.insert_snapshot(NewSnapshot {
    session_id:     session.session_id,
    device_id:      Uuid::new_v4(),
    captured_at:    Utc::now(),
    occupancy_rate: 0.25,
    detections:     vec![Detection {
      student_id: Some(student),
      confidence: 0.8,
      bbox:       Some([1.0, 2.0, 3.0, 4.0]),
    }],
  })
  .await
  .unwrap();

  let snaps = s.snapshots_for_session(session.session_id).await.unwrap();
  let det = &snaps[0].detections[0];
  assert_eq!(det.student_id, Some(student));
  assert_eq!(det.bbox, Some([1.0, 2.0, 3.0, 4.0]));
}

// ─── Detection upserts ───────────────────────────────────────────────────────

#[tokio::test]
async fn first_detection_creates_present_record() {
  let s = store().await;
  let session = open_session(&s).await;
  let student = Uuid::new_v4();
  let seen = Utc::now();

  s.record_detection(session.session_id, student, seen, 0.6)
    .await
    .unwrap();

  let record = s
    .get_record(session.session_id, student)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(record.status, AttendanceStatus::Present);
  assert_eq!(record.origin, Origin::Ai);
  assert_eq!(record.source, RecordSource::CameraDetection);
  assert!(!record.manual_correction);
  assert_eq!(record.confidence, Some(0.6));
  assert!(record.arrival_time.is_some());
}

#[tokio::test]
async fn repeat_detection_raises_confidence_keeps_arrival() {
  let s = store().await;
  let session = open_session(&s).await;
  let student = Uuid::new_v4();
  let first_seen = Utc::now();

  s.record_detection(session.session_id, student, first_seen, 0.5)
    .await
    .unwrap();
  s.record_detection(
    session.session_id,
    student,
    first_seen + Duration::minutes(5),
    0.9,
  )
  .await
  .unwrap();
  // A lower-confidence detection never lowers the stored maximum.
  s.record_detection(
    session.session_id,
    student,
    first_seen + Duration::minutes(6),
    0.3,
  )
  .await
  .unwrap();

  let record = s
    .get_record(session.session_id, student)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(record.confidence, Some(0.9));
  let arrival = record.arrival_time.unwrap();
  assert!((arrival - first_seen).num_seconds().abs() < 2);
}

#[tokio::test]
async fn frozen_absent_record_ignores_detections() {
  let s = store().await;
  let session = open_session(&s).await;
  let student = Uuid::new_v4();

  s.apply_correction(session.session_id, student, AttendanceStatus::Absent, None)
    .await
    .unwrap();
  s.record_detection(session.session_id, student, Utc::now(), 0.95)
    .await
    .unwrap();

  let record = s
    .get_record(session.session_id, student)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(record.status, AttendanceStatus::Absent);
  assert!(record.confidence.is_none());
}

#[tokio::test]
async fn frozen_excused_record_only_gains_confidence() {
  let s = store().await;
  let session = open_session(&s).await;
  let student = Uuid::new_v4();

  s.apply_correction(session.session_id, student, AttendanceStatus::Excused, None)
    .await
    .unwrap();
  s.record_detection(session.session_id, student, Utc::now(), 0.7)
    .await
    .unwrap();

  let record = s
    .get_record(session.session_id, student)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(record.status, AttendanceStatus::Excused);
  assert_eq!(record.origin, Origin::Manual);
  assert!(record.arrival_time.is_none());
  assert_eq!(record.confidence, Some(0.7));
}

// ─── Corrections ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn correction_creates_manual_record_when_missing() {
  let s = store().await;
  let session = open_session(&s).await;
  let student = Uuid::new_v4();
  let arrival = Utc::now();

  let record = s
    .apply_correction(
      session.session_id,
      student,
      AttendanceStatus::Late,
      Some(arrival),
    )
    .await
    .unwrap();

  assert_eq!(record.status, AttendanceStatus::Late);
  assert_eq!(record.origin, Origin::Manual);
  assert_eq!(record.source, RecordSource::Manual);
  assert!(record.manual_correction);
  assert!(record.arrival_time.is_some());
}

#[tokio::test]
async fn correction_blends_ai_origin_to_mixed() {
  let s = store().await;
  let session = open_session(&s).await;
  let student = Uuid::new_v4();

  s.record_detection(session.session_id, student, Utc::now(), 0.8)
    .await
    .unwrap();
  let record = s
    .apply_correction(session.session_id, student, AttendanceStatus::Excused, None)
    .await
    .unwrap();

  assert_eq!(record.origin, Origin::Mixed);
  assert_eq!(record.status, AttendanceStatus::Excused);
  assert!(record.manual_correction);
  // Camera provenance of the original record survives.
  assert_eq!(record.source, RecordSource::CameraDetection);
}

#[tokio::test]
async fn correction_keeps_manual_and_mixed_origins() {
  let s = store().await;
  let session = open_session(&s).await;
  let manual = Uuid::new_v4();
  let mixed = Uuid::new_v4();

  s.apply_correction(session.session_id, manual, AttendanceStatus::Absent, None)
    .await
    .unwrap();
  let again = s
    .apply_correction(session.session_id, manual, AttendanceStatus::Present, None)
    .await
    .unwrap();
  assert_eq!(again.origin, Origin::Manual);
  assert_eq!(again.status, AttendanceStatus::Present);

  s.record_detection(session.session_id, mixed, Utc::now(), 0.5)
    .await
    .unwrap();
  s.apply_correction(session.session_id, mixed, AttendanceStatus::Late, None)
    .await
    .unwrap();
  let still_mixed = s
    .apply_correction(session.session_id, mixed, AttendanceStatus::Present, None)
    .await
    .unwrap();
  assert_eq!(still_mixed.origin, Origin::Mixed);
}

#[tokio::test]
async fn correction_without_arrival_preserves_existing() {
  let s = store().await;
  let session = open_session(&s).await;
  let student = Uuid::new_v4();
  let seen = Utc::now();

  s.record_detection(session.session_id, student, seen, 0.8)
    .await
    .unwrap();
  let record = s
    .apply_correction(session.session_id, student, AttendanceStatus::Late, None)
    .await
    .unwrap();

  let arrival = record.arrival_time.unwrap();
  assert!((arrival - seen).num_seconds().abs() < 2);
}

// ─── Reconciliation batch ────────────────────────────────────────────────────

fn outcome(student_id: Uuid, status: AttendanceStatus, permanence: f64) -> RecordOutcome {
  RecordOutcome {
    student_id,
    status,
    permanence,
    arrival_time: Some(Utc::now()),
  }
}

#[tokio::test]
async fn reconciliation_upserts_and_counts() {
  let s = store().await;
  let session = open_session(&s).await;
  let detected = Uuid::new_v4();
  let undetected = Uuid::new_v4();

  s.record_detection(session.session_id, detected, Utc::now(), 0.9)
    .await
    .unwrap();

  let written = s
    .apply_reconciliation(
      session.session_id,
      vec![
        outcome(detected, AttendanceStatus::Present, 90.0),
        outcome(undetected, AttendanceStatus::Absent, 40.0),
      ],
    )
    .await
    .unwrap();
  assert_eq!(written, 2);

  let record = s
    .get_record(session.session_id, detected)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(record.permanence, 90.0);
  // The ingestion-time confidence is not part of the batch write.
  assert_eq!(record.confidence, Some(0.9));

  let absent = s
    .get_record(session.session_id, undetected)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(absent.status, AttendanceStatus::Absent);
  assert_eq!(absent.permanence, 40.0);
}

#[tokio::test]
async fn reconciliation_skips_frozen_records() {
  let s = store().await;
  let session = open_session(&s).await;
  let student = Uuid::new_v4();

  s.apply_correction(session.session_id, student, AttendanceStatus::Excused, None)
    .await
    .unwrap();

  let written = s
    .apply_reconciliation(
      session.session_id,
      vec![outcome(student, AttendanceStatus::Absent, 10.0)],
    )
    .await
    .unwrap();
  assert_eq!(written, 0);

  let record = s
    .get_record(session.session_id, student)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(record.status, AttendanceStatus::Excused);
  assert_eq!(record.origin, Origin::Manual);
  assert_eq!(record.permanence, 0.0);
}

// ─── Absence fills ───────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_absences_is_idempotent() {
  let s = store().await;
  let session = open_session(&s).await;
  let students = vec![Uuid::new_v4(), Uuid::new_v4()];

  let first = s
    .insert_absences(session.session_id, students.clone())
    .await
    .unwrap();
  assert_eq!(first, 2);

  let second = s
    .insert_absences(session.session_id, students.clone())
    .await
    .unwrap();
  assert_eq!(second, 0);

  let records = s.records_for_session(session.session_id).await.unwrap();
  assert_eq!(records.len(), 2);
  assert!(records.iter().all(|r| r.status == AttendanceStatus::Absent));
}

#[tokio::test]
async fn insert_absences_never_flips_existing_records() {
  let s = store().await;
  let session = open_session(&s).await;
  let present = Uuid::new_v4();

  s.record_detection(session.session_id, present, Utc::now(), 0.9)
    .await
    .unwrap();

  let created = s
    .insert_absences(session.session_id, vec![present])
    .await
    .unwrap();
  assert_eq!(created, 0);

  let record = s
    .get_record(session.session_id, present)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(record.status, AttendanceStatus::Present);
}

// ─── Complete session ────────────────────────────────────────────────────────

#[tokio::test]
async fn complete_session_applies_batch_and_finishes() {
  let s = store().await;
  let session = open_session(&s).await;
  let detected = Uuid::new_v4();
  let missing = Uuid::new_v4();

  s.record_detection(session.session_id, detected, Utc::now(), 0.8)
    .await
    .unwrap();

  let finished = s
    .complete_session(
      session.session_id,
      vec![outcome(detected, AttendanceStatus::Present, 100.0)],
      vec![missing],
      Utc::now(),
      session.teacher_id,
    )
    .await
    .unwrap();

  assert_eq!(finished.status, SessionStatus::Finished);
  assert!(finished.actual_end.is_some());

  let records = s.records_for_session(session.session_id).await.unwrap();
  assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn complete_session_missing_errors() {
  let s = store().await;
  let err = s
    .complete_session(Uuid::new_v4(), vec![], vec![], Utc::now(), Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::SessionNotFound(_)));
}

// ─── Enrollments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn roster_roundtrip() {
  let s = store().await;
  let group = Uuid::new_v4();
  let a = Uuid::new_v4();
  let b = Uuid::new_v4();

  s.add_enrollment(group, a).await.unwrap();
  s.add_enrollment(group, b).await.unwrap();
  s.add_enrollment(group, a).await.unwrap(); // duplicate is ignored

  let roster = s.roster(group).await.unwrap();
  assert_eq!(roster.len(), 2);
  assert!(roster.contains(&a) && roster.contains(&b));
}

#[tokio::test]
async fn roster_unknown_group_is_empty() {
  let s = store().await;
  let roster = s.roster(Uuid::new_v4()).await.unwrap();
  assert!(roster.is_empty());
}
