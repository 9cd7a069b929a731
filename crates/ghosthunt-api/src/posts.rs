//! `POST /posts`: the contest's view of a new post.
//!
//! Posts themselves live in the feed. This endpoint only cares about posts
//! flagged as capture evidence, which it forwards to the capture validator.
//! Anything else is acknowledged and ignored.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use ghosthunt_core::{
  Engine,
  contest::{Capture, CaptureRequest},
  store::ContestBackend,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PostBody {
  pub author_id: Uuid,
  /// Supplied by the feed when the post already exists; generated otherwise.
  pub post_id:   Option<Uuid>,
  #[serde(default)]
  pub capture:   bool,
  pub challenge: Option<String>,
  pub ghost_id:  Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
  pub post_id: Uuid,
  pub capture: Option<Capture>,
}

/// `POST /posts` — body:
/// `{"author_id":..,"capture":true,"challenge":"..","ghost_id":..}`
pub async fn create<S>(
  State(engine): State<Arc<Engine<S>>>,
  Json(body): Json<PostBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContestBackend + 'static,
{
  let post_id = body.post_id.unwrap_or_else(Uuid::new_v4);
  if !body.capture {
    return Ok((StatusCode::CREATED, Json(PostResponse { post_id, capture: None })));
  }

  let (Some(challenge), Some(ghost_id)) = (body.challenge, body.ghost_id) else {
    return Err(ApiError::BadRequest(
      "capture posts need both `challenge` and `ghost_id`".into(),
    ));
  };

  let capture = engine
    .submit_capture(CaptureRequest {
      hunter_id: body.author_id,
      ghost_id,
      evidence_post_id: post_id,
      challenge,
    })
    .await?;

  Ok((StatusCode::CREATED, Json(PostResponse { post_id, capture: Some(capture) })))
}
