//! aula-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite attendance store, and serves the session API plus the vision
//! telemetry webhook over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use aula_api::{AppState, ServerConfig, VisionAuth};
use aula_engine::Engine;
use aula_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Aula attendance server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("AULA"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open SQLite store; it backs both attendance and roster lookups.
  let store = Arc::new(
    SqliteStore::open(&server_cfg.db_path)
      .await
      .with_context(|| {
        format!("failed to open store at {:?}", server_cfg.db_path)
      })?,
  );

  let engine = Arc::new(Engine::new(
    store.clone(),
    store.clone(),
    server_cfg.policy,
  ));

  let state = AppState {
    engine,
    vision: Arc::new(VisionAuth {
      secret: server_cfg.vision_secret.clone(),
    }),
  };

  let app = aula_api::router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
