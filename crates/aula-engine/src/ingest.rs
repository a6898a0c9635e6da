//! Snapshot ingestion — validation, persistence, incremental presence.
//!
//! Telemetry is validated before anything is persisted; a malformed payload
//! never reaches the store. Presence is sticky: a later snapshot that fails
//! to detect a previously-present student never downgrades the record within
//! the same session.

use chrono::Utc;

use aula_core::{
  Error, Result,
  roster::EnrollmentProvider,
  session::SessionStatus,
  snapshot::{NewSnapshot, Snapshot},
  store::AttendanceStore,
};

use crate::Engine;

impl<S, R> Engine<S, R>
where
  S: AttendanceStore,
  R: EnrollmentProvider,
{
  /// Ingest one telemetry report for an in-progress session.
  ///
  /// Rejects the payload when the session is missing, when it is in any
  /// state other than [`SessionStatus::InProgress`] (including the race
  /// where a snapshot arrives after a concurrent finish), or when a
  /// confidence or occupancy value falls outside `[0, 1]`.
  ///
  /// On success the snapshot is persisted immutably, and every detection
  /// carrying a student id is folded into that student's attendance record.
  pub async fn ingest_snapshot(&self, input: NewSnapshot) -> Result<Snapshot> {
    validate_telemetry(&input)?;

    let session = self
      .store
      .get_session(input.session_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::SessionNotFound(input.session_id))?;

    if session.status != SessionStatus::InProgress {
      return Err(Error::SessionNotInProgress {
        session_id: session.session_id,
        status:     session.status,
      });
    }

    let snapshot = self
      .store
      .insert_snapshot(input)
      .await
      .map_err(Into::into)?;

    let now = Utc::now();
    for det in &snapshot.detections {
      if let Some(student_id) = det.student_id {
        self
          .store
          .record_detection(snapshot.session_id, student_id, now, det.confidence)
          .await
          .map_err(Into::into)?;
      }
    }

    tracing::debug!(
      session_id = %snapshot.session_id,
      detections = snapshot.detections.len(),
      occupancy = snapshot.occupancy_rate,
      "snapshot ingested"
    );
    Ok(snapshot)
  }
}

fn validate_telemetry(input: &NewSnapshot) -> Result<()> {
  if !(0.0..=1.0).contains(&input.occupancy_rate) {
    return Err(Error::InvalidTelemetry(format!(
      "occupancy_rate {} outside [0, 1]",
      input.occupancy_rate
    )));
  }
  for det in &input.detections {
    if !(0.0..=1.0).contains(&det.confidence) {
      return Err(Error::InvalidTelemetry(format!(
        "detection confidence {} outside [0, 1]",
        det.confidence
      )));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use aula_core::snapshot::{Detection, NewSnapshot};
  use chrono::Utc;
  use uuid::Uuid;

  use super::validate_telemetry;

  fn snapshot(occupancy_rate: f64, confidence: f64) -> NewSnapshot {
    NewSnapshot {
      session_id: Uuid::new_v4(),
      device_id: Uuid::new_v4(),
      captured_at: Utc::now(),
      occupancy_rate,
      detections: vec![Detection {
        student_id: Some(Uuid::new_v4()),
        confidence,
        bbox: None,
      }],
    }
  }

  #[test]
  fn accepts_boundary_values() {
    assert!(validate_telemetry(&snapshot(0.0, 0.0)).is_ok());
    assert!(validate_telemetry(&snapshot(1.0, 1.0)).is_ok());
  }

  #[test]
  fn rejects_out_of_range_occupancy() {
    assert!(validate_telemetry(&snapshot(1.01, 0.5)).is_err());
    assert!(validate_telemetry(&snapshot(-0.1, 0.5)).is_err());
  }

  #[test]
  fn rejects_out_of_range_confidence() {
    assert!(validate_telemetry(&snapshot(0.5, 1.5)).is_err());
    assert!(validate_telemetry(&snapshot(0.5, -0.5)).is_err());
  }
}
