//! Resolving (and lazily creating) the active contest week.

use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use tracing::{debug, info};
use uuid::Uuid;

use super::Engine;
use crate::{
  Error, Result,
  contest::ContestWeek,
  store::ContestBackend,
  window::{ContestWindow, contest_window},
};

impl<S: ContestBackend, R: Rng + Send> Engine<S, R> {
  /// The window containing `now` under this engine's anchor settings.
  pub fn window_at(&self, now: DateTime<Utc>) -> ContestWindow {
    contest_window(now, self.config.anchor_weekday, self.config.anchor_hour)
  }

  pub async fn ensure_active_week(&self) -> Result<ContestWeek> {
    self.ensure_active_week_at(Utc::now()).await
  }

  /// Resolve the week containing `now`, creating it with a random challenge
  /// if this is the first call inside the window, then sync roles.
  pub async fn ensure_active_week_at(&self, now: DateTime<Utc>) -> Result<ContestWeek> {
    let window = self.window_at(now);

    let week = match self.store.get_week(window.starts_at).await.map_err(Error::store)? {
      Some(week) => week,
      None => self.create_week(window, now).await?,
    };

    self.sync_roles_at(&week, now).await?;
    Ok(week)
  }

  async fn create_week(&self, window: ContestWindow, now: DateTime<Utc>) -> Result<ContestWeek> {
    let challenge = self
      .draw(|rng| self.config.challenges.choose(rng).cloned())
      .ok_or_else(|| Error::InvalidConfig("challenge catalog is empty".into()))?;

    let candidate = ContestWeek {
      contest_id: Uuid::new_v4(),
      starts_at: window.starts_at,
      ends_at: window.ends_at,
      challenge,
      created_at: now,
    };
    let candidate_id = candidate.contest_id;

    let week = self.store.create_week(candidate).await.map_err(Error::store)?;
    if week.contest_id == candidate_id {
      info!(
        contest_id = %week.contest_id,
        starts_at = %week.starts_at,
        challenge = %week.challenge,
        "created contest week"
      );
    } else {
      debug!(contest_id = %week.contest_id, "contest week was created concurrently");
    }
    Ok(week)
  }
}
