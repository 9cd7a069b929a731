//! Read-only handlers for `/contest` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/contest` | Active week and every assignment |
//! | `GET`  | `/contest/leaderboard` | Hunters by captures, ghosts by survival |
//! | `GET`  | `/contest/captures` | Oldest first |
//! | `GET`  | `/contest/assignments/:user_id` | 404 if the user is not participating |
//!
//! Each call resolves the active week first, so a request arriving after the
//! Sunday boundary opens the new week.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use ghosthunt_core::{
  Engine,
  contest::{Assignment, Capture, ContestSnapshot, Leaderboard},
  store::ContestBackend,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /contest`
pub async fn snapshot<S>(
  State(engine): State<Arc<Engine<S>>>,
) -> Result<Json<ContestSnapshot>, ApiError>
where
  S: ContestBackend + 'static,
{
  Ok(Json(engine.snapshot().await?))
}

/// `GET /contest/leaderboard`
pub async fn leaderboard<S>(
  State(engine): State<Arc<Engine<S>>>,
) -> Result<Json<Leaderboard>, ApiError>
where
  S: ContestBackend + 'static,
{
  Ok(Json(engine.leaderboard().await?))
}

/// `GET /contest/captures`
pub async fn captures<S>(
  State(engine): State<Arc<Engine<S>>>,
) -> Result<Json<Vec<Capture>>, ApiError>
where
  S: ContestBackend + 'static,
{
  Ok(Json(engine.captures().await?))
}

/// `GET /contest/assignments/:user_id`
pub async fn assignment<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<Assignment>, ApiError>
where
  S: ContestBackend + 'static,
{
  engine
    .assignment_for(user_id)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("user {user_id} is not in the active contest")))
}
