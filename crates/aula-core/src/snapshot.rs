//! Snapshot types — immutable telemetry reports from the vision pipeline.
//!
//! A snapshot is one point-in-time occupancy/detection report. Snapshots are
//! strictly append-only: never mutated, never deleted. Their `captured_at`
//! ordering is the basis of all reconciliation arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Detection ───────────────────────────────────────────────────────────────

/// One detected person within a snapshot. `student_id` is present only when
/// the vision pipeline recognised the person against the enrolled roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
  pub student_id: Option<Uuid>,
  /// Detection confidence in `[0, 1]`.
  pub confidence: f64,
  /// Bounding box `[x, y, w, h]` in frame coordinates.
  pub bbox:       Option<[f64; 4]>,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// An immutable occupancy/detection report. Once written, no field is ever
/// updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
  pub snapshot_id:      Uuid,
  pub session_id:       Uuid,
  pub device_id:        Uuid,
  /// When the device captured the frame (reported by the pipeline).
  pub captured_at:      DateTime<Utc>,
  pub detected_persons: u32,
  /// Fraction of the classroom's capacity occupied, in `[0, 1]`.
  pub occupancy_rate:   f64,
  /// Maximum confidence over all detections; 0 when there are none.
  pub confidence:       f64,
  pub detections:       Vec<Detection>,
  /// Server-assigned receipt timestamp; never changes after creation.
  pub recorded_at:      DateTime<Utc>,
}

// ─── NewSnapshot ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::AttendanceStore::insert_snapshot`].
/// `snapshot_id` and `recorded_at` are always set by the store.
#[derive(Debug, Clone)]
pub struct NewSnapshot {
  pub session_id:     Uuid,
  pub device_id:      Uuid,
  pub captured_at:    DateTime<Utc>,
  pub occupancy_rate: f64,
  pub detections:     Vec<Detection>,
}

impl NewSnapshot {
  /// Maximum confidence over all detections, defaulting to 0 when the frame
  /// contained none.
  pub fn peak_confidence(&self) -> f64 {
    self
      .detections
      .iter()
      .map(|d| d.confidence)
      .fold(0.0, f64::max)
  }
}
