//! Capture submission.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use super::Engine;
use crate::{
  Error, Result,
  contest::{Capture, CaptureRequest, Role},
  notification::{Notification, NotificationKind},
  store::ContestBackend,
};

impl<S: ContestBackend, R: Rng + Send> Engine<S, R> {
  pub async fn submit_capture(&self, request: CaptureRequest) -> Result<Capture> {
    self.submit_capture_at(Utc::now(), request).await
  }

  /// Validate and record a hunter's capture of a ghost.
  ///
  /// Checks run in order and the first failure is returned without touching
  /// any state: the claimed challenge must be this week's
  /// ([`Error::ChallengeMismatch`]), the submitter must be a hunter
  /// ([`Error::NotAHunter`]) and the target a ghost not yet captured
  /// ([`Error::NotAnActiveGhost`]).
  pub async fn submit_capture_at(
    &self,
    now: DateTime<Utc>,
    request: CaptureRequest,
  ) -> Result<Capture> {
    let week = self.ensure_active_week_at(now).await?;

    if request.challenge != week.challenge {
      return Err(Error::ChallengeMismatch {
        claimed: request.challenge,
        active:  week.challenge,
      });
    }

    let hunter = self
      .store
      .get_assignment(week.contest_id, request.hunter_id)
      .await
      .map_err(Error::store)?;
    if !hunter.is_some_and(|a| a.role == Role::Hunter) {
      return Err(Error::NotAHunter(request.hunter_id));
    }

    let ghost = self
      .store
      .get_assignment(week.contest_id, request.ghost_id)
      .await
      .map_err(Error::store)?;
    if !ghost.is_some_and(|a| a.is_active_ghost()) {
      return Err(Error::NotAnActiveGhost(request.ghost_id));
    }

    // A concurrent capture of the same ghost loses here.
    if !self
      .store
      .mark_captured(week.contest_id, request.ghost_id)
      .await
      .map_err(Error::store)?
    {
      return Err(Error::NotAnActiveGhost(request.ghost_id));
    }

    let capture = Capture {
      capture_id:       Uuid::new_v4(),
      contest_id:       week.contest_id,
      hunter_id:        request.hunter_id,
      ghost_id:         request.ghost_id,
      evidence_post_id: request.evidence_post_id,
      challenge:        request.challenge,
      created_at:       now,
    };
    self.store.record_capture(capture.clone()).await.map_err(Error::store)?;
    self
      .store
      .increment_captures(week.contest_id, capture.hunter_id)
      .await
      .map_err(Error::store)?;

    let ghost_name = self.username(capture.ghost_id).await?;
    let hunter_name = self.username(capture.hunter_id).await?;

    let confirmation = Notification::new(
      capture.hunter_id,
      capture.ghost_id,
      NotificationKind::ContestCapture,
      match ghost_name {
        Some(name) => format!("Capture confirmed: you caught @{name}!"),
        None => "Capture confirmed: you caught a ghost!".to_owned(),
      },
      now,
    )
    .with_post(capture.evidence_post_id);
    self.store.notify(confirmation).await.map_err(Error::store)?;

    let notice = Notification::new(
      capture.ghost_id,
      capture.hunter_id,
      NotificationKind::ContestCaptured,
      match hunter_name {
        Some(name) => format!("You were captured by @{name}."),
        None => "You were captured by a hunter.".to_owned(),
      },
      now,
    )
    .with_post(capture.evidence_post_id);
    self.store.notify(notice).await.map_err(Error::store)?;

    info!(
      contest_id = %capture.contest_id,
      hunter_id = %capture.hunter_id,
      ghost_id = %capture.ghost_id,
      post_id = %capture.evidence_post_id,
      "capture recorded"
    );
    Ok(capture)
  }
}
