//! JSON REST API for the Aula attendance engine.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`AttendanceStore`] and [`EnrollmentProvider`]. TLS and transport
//! concerns are the caller's responsibility.
//!
//! Two surfaces share the router: the session-management API consumed by
//! the client application, and the `/vision/snapshots` webhook through
//! which the external vision pipeline delivers telemetry.

pub mod auth;
pub mod error;
pub mod sessions;
pub mod vision;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, patch, post},
};
use aula_core::{
  policy::ReconcilePolicy, roster::EnrollmentProvider, store::AttendanceStore,
};
use aula_engine::Engine;
use serde::Deserialize;

pub use auth::VisionAuth;
pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// with `AULA_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub db_path:       PathBuf,
  /// Pre-shared secret expected from the vision pipeline.
  pub vision_secret: String,
  /// Reconciliation thresholds; defaults apply when the section is absent.
  #[serde(default)]
  pub policy:        ReconcilePolicy,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub engine: Arc<Engine<S, S>>,
  pub vision: Arc<VisionAuth>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      engine: Arc::clone(&self.engine),
      vision: Arc::clone(&self.vision),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: AttendanceStore + EnrollmentProvider + 'static,
{
  Router::new()
    // Session management
    .route("/sessions", get(sessions::list::<S>))
    .route("/sessions/start", post(sessions::start::<S>))
    .route("/sessions/active", get(sessions::active::<S>))
    .route("/sessions/{id}", get(sessions::get_one::<S>))
    .route("/sessions/{id}/finish", post(sessions::finish::<S>))
    .route("/sessions/{id}/cancel", post(sessions::cancel::<S>))
    .route("/sessions/{id}/attendance", get(sessions::attendance::<S>))
    .route(
      "/sessions/{id}/attendance/{student_id}",
      patch(sessions::correct::<S>),
    )
    // Telemetry ingress
    .route("/vision/snapshots", post(vision::ingest::<S>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
