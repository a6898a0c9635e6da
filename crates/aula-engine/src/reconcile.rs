//! Batch reconciliation — permanence arithmetic and classification.
//!
//! The batch pass recomputes every detected student's record from the full,
//! time-ordered snapshot history. It runs at session finish and can be
//! invoked on demand. Unlike incremental ingestion, it may downgrade a
//! student to absent when their permanence falls below the threshold —
//! stickiness binds the incremental path only. Frozen records are skipped at
//! application time.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use aula_core::{
  Error, Result,
  policy::ReconcilePolicy,
  record::{AttendanceStatus, RecordOutcome},
  roster::EnrollmentProvider,
  session::Session,
  snapshot::Snapshot,
  store::AttendanceStore,
};

use crate::Engine;

// ─── Pure computation ────────────────────────────────────────────────────────

struct Tally {
  detections: usize,
  first_seen: DateTime<Utc>,
}

/// Compute one outcome per student detected in at least one snapshot.
///
/// `permanence = detections / total_snapshots × 100`, where a student counts
/// at most once per snapshot. With no snapshots there is nothing to compute.
pub fn compute(
  snapshots: &[Snapshot],
  scheduled_start: DateTime<Utc>,
  policy: &ReconcilePolicy,
) -> Vec<RecordOutcome> {
  let total = snapshots.len();
  if total == 0 {
    return Vec::new();
  }

  let mut tallies: BTreeMap<Uuid, Tally> = BTreeMap::new();
  for snap in snapshots {
    let mut seen: HashSet<Uuid> = HashSet::new();
    for det in &snap.detections {
      let Some(student_id) = det.student_id else {
        continue;
      };
      // A student appearing in several detections of one frame still
      // counts once toward that frame.
      if !seen.insert(student_id) {
        continue;
      }
      tallies
        .entry(student_id)
        .and_modify(|t| {
          t.detections += 1;
          if snap.captured_at < t.first_seen {
            t.first_seen = snap.captured_at;
          }
        })
        .or_insert(Tally {
          detections: 1,
          first_seen: snap.captured_at,
        });
    }
  }

  tallies
    .into_iter()
    .map(|(student_id, tally)| {
      let permanence = tally.detections as f64 / total as f64 * 100.0;
      let status =
        classify(permanence, tally.first_seen, scheduled_start, policy);
      RecordOutcome {
        student_id,
        status,
        permanence,
        arrival_time: Some(tally.first_seen),
      }
    })
    .collect()
}

/// Classify one student: attended if permanence reaches the threshold, late
/// within that if their first detection came after the grace window.
pub fn classify(
  permanence: f64,
  first_seen: DateTime<Utc>,
  scheduled_start: DateTime<Utc>,
  policy: &ReconcilePolicy,
) -> AttendanceStatus {
  if permanence >= policy.present_threshold {
    if first_seen > scheduled_start + policy.late_after() {
      AttendanceStatus::Late
    } else {
      AttendanceStatus::Present
    }
  } else {
    AttendanceStatus::Absent
  }
}

// ─── Engine surface ──────────────────────────────────────────────────────────

impl<S, R> Engine<S, R>
where
  S: AttendanceStore,
  R: EnrollmentProvider,
{
  /// Recompute and apply attendance for the session's full snapshot
  /// history. Frozen records are skipped by the store at application time.
  /// Returns the number of records written.
  pub async fn reconcile_session(&self, session_id: Uuid) -> Result<usize> {
    let session = self
      .store
      .get_session(session_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::SessionNotFound(session_id))?;

    let outcomes = self.compute_outcomes(&session).await?;
    let written = self
      .store
      .apply_reconciliation(session_id, outcomes)
      .await
      .map_err(Into::into)?;

    tracing::info!(%session_id, written, "session reconciled");
    Ok(written)
  }

  pub(crate) async fn compute_outcomes(
    &self,
    session: &Session,
  ) -> Result<Vec<RecordOutcome>> {
    let snapshots = self
      .store
      .snapshots_for_session(session.session_id)
      .await
      .map_err(Into::into)?;
    Ok(compute(&snapshots, session.scheduled_start, &self.policy))
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
