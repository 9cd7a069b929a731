//! Handlers for `/users` endpoints: the directory side of the contest.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `PUT`  | `/users/:id` | Body: `{"username":"casper"}`; creates or renames |
//! | `PUT`  | `/users/:id/location` | Body: `{"lat":..,"lng":..}`; 404 for unknown users |
//! | `PUT`  | `/users/:id/contest-mode` | Body: `{"opted_out":true}`; 404 for unknown users |
//! | `GET`  | `/users/:id/inbox` | Optional `?limit=`, newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use ghosthunt_core::{
  Engine,
  contest::Assignment,
  engine::LocationOutcome,
  geo::Coordinates,
  notification::Notification,
  store::{ContestBackend, NotificationSink, UserDirectory},
  user::User,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

const DEFAULT_INBOX_LIMIT: usize = 50;
const MAX_INBOX_LIMIT: usize = 500;

fn unknown_user(id: Uuid) -> ApiError { ApiError::NotFound(format!("user {id} not found")) }

// ─── Upsert ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpsertBody {
  pub username: String,
}

/// `PUT /users/:id` — body: `{"username":"casper"}`
pub async fn upsert<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<UpsertBody>,
) -> Result<Json<User>, ApiError>
where
  S: ContestBackend + 'static,
{
  let username = body.username.trim();
  if username.is_empty() {
    return Err(ApiError::BadRequest("username must not be empty".into()));
  }
  let user = engine
    .store()
    .upsert_user(id, username.to_owned())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(user))
}

// ─── Location ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LocationBody {
  pub lat: f64,
  pub lng: f64,
}

/// `PUT /users/:id/location`
///
/// Stores the position in the directory, then hands it to the engine for
/// camping and proximity checks. The response says what the engine did.
pub async fn location<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<LocationBody>,
) -> Result<Json<LocationOutcome>, ApiError>
where
  S: ContestBackend + 'static,
{
  if !(-90.0..=90.0).contains(&body.lat) || !(-180.0..=180.0).contains(&body.lng) {
    return Err(ApiError::BadRequest(format!(
      "coordinates out of range: {}, {}",
      body.lat, body.lng
    )));
  }
  let coordinates = Coordinates::new(body.lat, body.lng);

  engine
    .store()
    .set_location(id, Some(coordinates))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| unknown_user(id))?;

  Ok(Json(engine.process_location(id, coordinates).await?))
}

// ─── Contest mode ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ContestModeBody {
  pub opted_out: bool,
}

#[derive(Debug, Serialize)]
pub struct ContestModeResponse {
  pub user:       User,
  /// The user's assignment after the toggle was applied.
  pub assignment: Option<Assignment>,
}

/// `PUT /users/:id/contest-mode` — body: `{"opted_out":true}`
pub async fn contest_mode<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ContestModeBody>,
) -> Result<Json<ContestModeResponse>, ApiError>
where
  S: ContestBackend + 'static,
{
  let user = engine
    .store()
    .set_contest_opt_out(id, body.opted_out)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| unknown_user(id))?;

  // Resolving the week re-runs role sync, which applies the toggle.
  let assignment = engine.assignment_for(id).await?;
  Ok(Json(ContestModeResponse { user, assignment }))
}

// ─── Inbox ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InboxParams {
  pub limit: Option<usize>,
}

/// `GET /users/:id/inbox[?limit=<n>]`
pub async fn inbox<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
  Query(params): Query<InboxParams>,
) -> Result<Json<Vec<Notification>>, ApiError>
where
  S: ContestBackend + 'static,
{
  let limit = params.limit.unwrap_or(DEFAULT_INBOX_LIMIT).min(MAX_INBOX_LIMIT);
  let notifications = engine.store().inbox(id, limit).await.map_err(ApiError::store)?;
  Ok(Json(notifications))
}
