//! Reconciliation policy — externally supplied thresholds.
//!
//! All business thresholds live here so policy changes and property tests
//! never require code edits. The policy is threaded explicitly through the
//! engine; there is no global mutable configuration.

use serde::{Deserialize, Serialize};

/// Thresholds governing classification and session defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilePolicy {
  /// Minimum permanence percentage (0–100) to count a student as attended.
  pub present_threshold:       f64,
  /// A first detection later than `scheduled_start + late_after_minutes`
  /// classifies the student as late rather than present.
  pub late_after_minutes:      i64,
  /// Default session length used when `scheduled_end` is omitted at open.
  pub default_session_minutes: i64,
}

impl Default for ReconcilePolicy {
  fn default() -> Self {
    Self {
      present_threshold:       80.0,
      late_after_minutes:      10,
      default_session_minutes: 120,
    }
  }
}

impl ReconcilePolicy {
  pub fn late_after(&self) -> chrono::Duration {
    chrono::Duration::minutes(self.late_after_minutes)
  }

  pub fn default_session_length(&self) -> chrono::Duration {
    chrono::Duration::minutes(self.default_session_minutes)
  }
}
