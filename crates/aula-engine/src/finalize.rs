//! Absence finalization — closing roster gaps at session end.
//!
//! Every enrolled student who ends the session without a present/late record
//! gets an absent record with automated provenance. Idempotent: the
//! `(session_id, student_id)` uniqueness constraint turns repeat fills into
//! no-ops.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use aula_core::{
  Result,
  record::{AttendanceRecord, AttendanceStatus, RecordOutcome},
  roster::EnrollmentProvider,
  store::AttendanceStore,
};

use crate::Engine;

impl<S, R> Engine<S, R>
where
  S: AttendanceStore,
  R: EnrollmentProvider,
{
  /// Fill absent records for every enrolled student lacking a present/late
  /// record. Existing records of any status are never flipped by this pass.
  /// Returns the number of records created.
  pub async fn finalize_absences(
    &self,
    session_id: Uuid,
    group_id: Uuid,
  ) -> Result<usize> {
    let roster = self.roster.roster(group_id).await.map_err(Into::into)?;
    let records = self
      .store
      .records_for_session(session_id)
      .await
      .map_err(Into::into)?;

    let gaps = roster_gaps(&roster, &records, &[]);
    let created = self
      .store
      .insert_absences(session_id, gaps)
      .await
      .map_err(Into::into)?;

    if created > 0 {
      tracing::info!(%session_id, created, "absence records filled");
    }
    Ok(created)
  }
}

/// Roster members whose final status will not be present/late, given the
/// existing records and the reconciliation outcomes about to be applied.
/// Frozen records keep their stored status; outcomes override unfrozen ones.
pub(crate) fn roster_gaps(
  roster: &[Uuid],
  records: &[AttendanceRecord],
  outcomes: &[RecordOutcome],
) -> Vec<Uuid> {
  let mut status: HashMap<Uuid, AttendanceStatus> =
    records.iter().map(|r| (r.student_id, r.status)).collect();
  let frozen: HashSet<Uuid> = records
    .iter()
    .filter(|r| r.is_frozen())
    .map(|r| r.student_id)
    .collect();

  for outcome in outcomes {
    if !frozen.contains(&outcome.student_id) {
      status.insert(outcome.student_id, outcome.status);
    }
  }

  roster
    .iter()
    .copied()
    .filter(|student| {
      !status
        .get(student)
        .is_some_and(|st| st.counts_as_present())
    })
    .collect()
}
