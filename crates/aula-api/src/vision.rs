//! Handler for the vision telemetry webhook.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/vision/snapshots` | Shared-secret header; 400 when the session is not in progress or the payload is malformed |
//!
//! The wire format follows the vision vendor's contract (camelCase keys);
//! everything behind this handler speaks the crate's own types.

use axum::{Json, extract::State, http::HeaderMap};
use chrono::{DateTime, Utc};
use aula_core::{
  roster::EnrollmentProvider,
  snapshot::{Detection, NewSnapshot},
  store::AttendanceStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::verify_secret, error::ApiError};

/// JSON body accepted by `POST /vision/snapshots`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotBody {
  pub session_id:     Uuid,
  pub device_id:      Uuid,
  pub timestamp:      DateTime<Utc>,
  pub occupancy_rate: f64,
  #[serde(default)]
  pub detected_persons: Vec<DetectionBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionBody {
  pub student_id: Option<Uuid>,
  pub confidence: f64,
  pub bbox:       Option<[f64; 4]>,
}

impl From<SnapshotBody> for NewSnapshot {
  fn from(b: SnapshotBody) -> Self {
    NewSnapshot {
      session_id:     b.session_id,
      device_id:      b.device_id,
      captured_at:    b.timestamp,
      occupancy_rate: b.occupancy_rate,
      detections:     b
        .detected_persons
        .into_iter()
        .map(|d| Detection {
          student_id: d.student_id,
          confidence: d.confidence,
          bbox:       d.bbox,
        })
        .collect(),
    }
  }
}

/// `POST /vision/snapshots`
pub async fn ingest<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<SnapshotBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: AttendanceStore + EnrollmentProvider + 'static,
{
  verify_secret(&headers, &state.vision)?;

  state.engine.ingest_snapshot(NewSnapshot::from(body)).await?;
  Ok(Json(serde_json::json!({ "success": true })))
}
