//! JSON REST API for Ghosthunt.
//!
//! Exposes an axum [`Router`] backed by a contest [`Engine`] over any
//! [`ContestBackend`]. Auth, TLS, and transport concerns are the caller's
//! responsibility; user ids in paths and bodies are trusted.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", ghosthunt_api::api_router(engine.clone()))
//! ```

pub mod contest;
pub mod error;
pub mod posts;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use ghosthunt_core::{Engine, store::ContestBackend};

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<Engine<S>>) -> Router<()>
where
  S: ContestBackend + 'static,
{
  Router::new()
    // Contest
    .route("/contest", get(contest::snapshot::<S>))
    .route("/contest/leaderboard", get(contest::leaderboard::<S>))
    .route("/contest/captures", get(contest::captures::<S>))
    .route("/contest/assignments/{user_id}", get(contest::assignment::<S>))
    // Users
    .route("/users/{id}", put(users::upsert::<S>))
    .route("/users/{id}/location", put(users::location::<S>))
    .route("/users/{id}/contest-mode", put(users::contest_mode::<S>))
    .route("/users/{id}/inbox", get(users::inbox::<S>))
    // Posts
    .route("/posts", post(posts::create::<S>))
    .with_state(engine)
}

// ─── Integration tests ────────────────────────────────────────────────────────
