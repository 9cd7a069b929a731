//! HTTP server wiring for Ghosthunt: configuration and the top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use ghosthunt_core::{Engine, EngineConfig, store::ContestBackend};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `GHOSTHUNT_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// Contest rules. Every field falls back to its default.
  #[serde(default)]
  pub contest:    EngineConfig,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/ghosthunt/ghosthunt.db") }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
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

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's [`Router`]: the JSON API with request tracing.
pub fn router<S>(engine: Arc<Engine<S>>) -> Router
where
  S: ContestBackend + 'static,
{
  ghosthunt_api::api_router(engine).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use chrono::Weekday;
  use ghosthunt_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = parse("");
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.contest.anchor_weekday, Weekday::Sun);
    assert_eq!(cfg.contest.anchor_hour, 20);
    assert!(cfg.contest.validate().is_ok());
  }

  #[test]
  fn contest_table_overrides_single_fields() {
    let cfg = parse(
      r#"
        port = 9000
        store_path = "/tmp/gh.db"

        [contest]
        anchor_hour = 18
        proximity_km = 0.5
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/gh.db"));
    assert_eq!(cfg.contest.anchor_hour, 18);
    assert_eq!(cfg.contest.proximity_km, 0.5);
    assert_eq!(cfg.contest.camping_distance_km, 0.1);
  }

  #[test]
  fn tilde_is_expanded_only_at_the_start() {
    let plain = PathBuf::from("/var/lib/gh.db");
    assert_eq!(expand_tilde(&plain), plain);
    let odd = PathBuf::from("data/~/gh.db");
    assert_eq!(expand_tilde(&odd), odd);
  }

  #[tokio::test]
  async fn router_serves_contest_over_sqlite() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let engine = Engine::new(store, EngineConfig::default()).unwrap();
    let req = Request::builder().uri("/contest").body(Body::empty()).unwrap();

    let resp = router(Arc::new(engine)).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["week"]["contest_id"].is_string());
  }
}
