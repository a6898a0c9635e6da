//! The `EnrollmentProvider` trait — read-only roster lookup.
//!
//! Enrollment administration is owned by an external catalog system; the
//! engine only ever asks "who is enrolled in this group". Absence
//! finalization iterates the roster to fill gaps at session end.

use std::future::Future;

use uuid::Uuid;

/// Read-only access to group enrollment rosters.
pub trait EnrollmentProvider: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  /// All student ids enrolled in `group_id`. An unknown group yields an
  /// empty roster, not an error.
  fn roster(
    &self,
    group_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;
}
