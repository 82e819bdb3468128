//! Server assembly for Abacus: configuration, state construction, and the
//! top-level router with request tracing.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use abacus_api::{ApiState, TokenKeys};
use abacus_store_sqlite::SqliteStore;
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ABACUS_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  /// HMAC secret used to sign access tokens.
  pub jwt_secret:        String,
  #[serde(default = "default_token_ttl_minutes")]
  pub token_ttl_minutes: i64,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8000 }

fn default_store_path() -> PathBuf { PathBuf::from("abacus.db") }

fn default_token_ttl_minutes() -> i64 { 30 }

impl ServerConfig {
  /// Reject settings that would deserialise but cannot work.
  pub fn validate(&self) -> anyhow::Result<()> {
    anyhow::ensure!(!self.jwt_secret.is_empty(), "jwt_secret must not be empty");
    anyhow::ensure!(
      self.token_ttl_minutes > 0,
      "token_ttl_minutes must be positive, got {}",
      self.token_ttl_minutes
    );
    Ok(())
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Assembly ─────────────────────────────────────────────────────────────────

/// Build handler state from a configured store.
pub fn state(config: &ServerConfig, store: SqliteStore) -> ApiState<SqliteStore> {
  ApiState {
    store:  Arc::new(store),
    tokens: Arc::new(TokenKeys::new(
      config.jwt_secret.as_bytes(),
      chrono::Duration::minutes(config.token_ttl_minutes),
    )),
  }
}

/// The full application: the API router wrapped in an HTTP trace layer.
pub fn app(state: ApiState<SqliteStore>) -> Router {
  abacus_api::api_router(state).layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
