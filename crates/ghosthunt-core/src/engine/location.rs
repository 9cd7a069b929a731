//! Location updates: camping detection for ghosts, proximity alerts for
//! hunters.
//!
//! The assignment's `last_location` is the one canonical contest position.
//! Ghost movement is measured against it and hunters are alerted against it;
//! the directory's location is never consulted here.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::Engine;
use crate::{
  Error, Result,
  contest::{Assignment, ContestWeek, MovementUpdate, Role},
  geo::{Coordinates, distance_km},
  notification::{Notification, NotificationKind},
  store::ContestBackend,
};

/// One alert sent to a hunter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProximityAlert {
  pub ghost_id:   Uuid,
  pub distance_m: u32,
}

/// What a location update did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LocationOutcome {
  /// The user holds no assignment this week.
  NotParticipating,
  Ghost {
    /// The move was long enough to reset the camping clock.
    moved:           bool,
    /// This update raised the camping flag.
    camping_flagged: bool,
  },
  Hunter { alerts: Vec<ProximityAlert> },
}

impl<S: ContestBackend, R: Rng + Send> Engine<S, R> {
  pub async fn process_location(
    &self,
    user_id: Uuid,
    location: Coordinates,
  ) -> Result<LocationOutcome> {
    self.process_location_at(Utc::now(), user_id, location).await
  }

  /// Record a participant's new position and react to it.
  ///
  /// Users without an assignment are ignored.
  pub async fn process_location_at(
    &self,
    now: DateTime<Utc>,
    user_id: Uuid,
    location: Coordinates,
  ) -> Result<LocationOutcome> {
    let week = self.ensure_active_week_at(now).await?;

    let Some(assignment) = self
      .store
      .get_assignment(week.contest_id, user_id)
      .await
      .map_err(Error::store)?
    else {
      return Ok(LocationOutcome::NotParticipating);
    };

    match assignment.role {
      Role::Ghost => self.ghost_moved(&week, assignment, location, now).await,
      Role::Hunter => self.hunter_moved(&week, assignment, location, now).await,
    }
  }

  async fn ghost_moved(
    &self,
    week: &ContestWeek,
    ghost: Assignment,
    location: Coordinates,
    now: DateTime<Utc>,
  ) -> Result<LocationOutcome> {
    let distance = distance_km(ghost.last_location, Some(location));
    let moved = distance > self.config.camping_distance_km;

    self
      .store
      .update_movement(week.contest_id, ghost.user_id, MovementUpdate {
        last_location: Some(location),
        moved_at:      (moved || ghost.last_move_at.is_none()).then_some(now),
      })
      .await
      .map_err(Error::store)?;

    // The store re-checks both conditions, so a concurrent update for the
    // same ghost can neither double-flag nor flag over a fresh move.
    let idle_since = now - self.config.camping_after();
    let camping_flagged = !moved
      && !ghost.camping_violation
      && ghost.last_move_at.is_some_and(|at| at < idle_since)
      && self
        .store
        .flag_camping(week.contest_id, ghost.user_id, idle_since)
        .await
        .map_err(Error::store)?;

    if camping_flagged {
      let hours = self.config.camping_after().num_minutes() as f64 / 60.0;
      let meters = (self.config.camping_distance_km * 1000.0).round();
      let warning = Notification::new(
        ghost.user_id,
        ghost.user_id,
        NotificationKind::ContestWarning,
        format!(
          "You haven't moved more than {meters} m in {hours} hours. Ghosts who camp get caught, \
           keep moving!"
        ),
        now,
      );
      self.store.notify(warning).await.map_err(Error::store)?;
      info!(contest_id = %week.contest_id, user_id = %ghost.user_id, "ghost flagged for camping");
    } else if moved && ghost.camping_violation {
      debug!(user_id = %ghost.user_id, "camping flag cleared");
    }

    Ok(LocationOutcome::Ghost { moved, camping_flagged })
  }

  async fn hunter_moved(
    &self,
    week: &ContestWeek,
    hunter: Assignment,
    location: Coordinates,
    now: DateTime<Utc>,
  ) -> Result<LocationOutcome> {
    self
      .store
      .update_movement(week.contest_id, hunter.user_id, MovementUpdate {
        last_location: Some(location),
        moved_at:      hunter.last_move_at.is_none().then_some(now),
      })
      .await
      .map_err(Error::store)?;

    let ghosts: Vec<Assignment> = self
      .store
      .list_assignments(week.contest_id)
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter(|a| a.user_id != hunter.user_id && a.is_active_ghost())
      .collect();

    let mut alerts = Vec::new();
    for ghost in ghosts {
      let distance = distance_km(Some(location), ghost.last_location);
      if distance > self.config.proximity_km {
        continue;
      }

      let distance_m = (distance * 1000.0).round() as u32;
      let message = match self.username(ghost.user_id).await? {
        Some(name) => format!("Ghost @{name} is {distance_m} m away!"),
        None => format!("A ghost is {distance_m} m away!"),
      };
      let alert = Notification::new(
        hunter.user_id,
        ghost.user_id,
        NotificationKind::ContestAlert,
        message,
        now,
      );
      // One alert per pair per cooldown window, decided by the store.
      if !self
        .store
        .notify_unless_recent(alert, now - self.config.alert_cooldown())
        .await
        .map_err(Error::store)?
      {
        debug!(hunter_id = %hunter.user_id, ghost_id = %ghost.user_id, "alert on cooldown");
        continue;
      }

      alerts.push(ProximityAlert { ghost_id: ghost.user_id, distance_m });
    }

    if !alerts.is_empty() {
      debug!(hunter_id = %hunter.user_id, alerts = alerts.len(), "proximity alerts sent");
    }
    Ok(LocationOutcome::Hunter { alerts })
  }
}
