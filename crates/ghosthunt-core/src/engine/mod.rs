//! The weekly "Hunters vs Ghosts" contest engine.
//!
//! Every entry point first resolves the active week through
//! [`Engine::ensure_active_week_at`], which also re-runs role assignment, so
//! read paths double as consistency repair. The `*_at` variants take the
//! current instant explicitly; the plain variants use [`Utc::now`].

mod capture;
mod location;
mod registry;
mod roles;

use std::{
  collections::HashMap,
  sync::{Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use uuid::Uuid;

pub use location::{LocationOutcome, ProximityAlert};
pub use roles::SyncReport;

use crate::{
  EngineConfig, Error, Result,
  contest::{Assignment, Capture, ContestSnapshot, Leaderboard, Role, Standing},
  store::ContestBackend,
};

/// The contest engine over a backend `S` and a random source `R`.
///
/// The engine keeps no contest state of its own; the only lock it holds is
/// around `R`, and never across an `.await`.
pub struct Engine<S, R = StdRng> {
  store:  S,
  config: EngineConfig,
  rng:    Mutex<R>,
}

impl<S: ContestBackend> Engine<S, StdRng> {
  /// Build an engine seeded from the operating system.
  pub fn new(store: S, config: EngineConfig) -> Result<Self> {
    Self::with_rng(store, config, StdRng::from_entropy())
  }
}

impl<S: ContestBackend, R: Rng + Send> Engine<S, R> {
  /// Build an engine with an explicit random source, e.g. a seeded
  /// [`StdRng`] for reproducible partitions.
  pub fn with_rng(store: S, config: EngineConfig, rng: R) -> Result<Self> {
    config.validate()?;
    Ok(Self { store, config, rng: Mutex::new(rng) })
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  /// Run `f` with exclusive access to the random source.
  fn draw<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
    let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut *rng)
  }

  async fn username(&self, user_id: Uuid) -> Result<Option<String>> {
    Ok(self.store.get_user(user_id).await.map_err(Error::store)?.map(|u| u.username))
  }

  // ─── Read models ───────────────────────────────────────────────────────────

  /// The active week and all of its assignments.
  pub async fn snapshot(&self) -> Result<ContestSnapshot> { self.snapshot_at(Utc::now()).await }

  pub async fn snapshot_at(&self, now: DateTime<Utc>) -> Result<ContestSnapshot> {
    let week = self.ensure_active_week_at(now).await?;
    let assignments =
      self.store.list_assignments(week.contest_id).await.map_err(Error::store)?;
    Ok(ContestSnapshot { week, assignments })
  }

  /// The user's assignment in the active week, if they are participating.
  pub async fn assignment_for(&self, user_id: Uuid) -> Result<Option<Assignment>> {
    self.assignment_for_at(Utc::now(), user_id).await
  }

  pub async fn assignment_for_at(
    &self,
    now: DateTime<Utc>,
    user_id: Uuid,
  ) -> Result<Option<Assignment>> {
    let week = self.ensure_active_week_at(now).await?;
    self.store.get_assignment(week.contest_id, user_id).await.map_err(Error::store)
  }

  /// Captures recorded in the active week, oldest first.
  pub async fn captures(&self) -> Result<Vec<Capture>> { self.captures_at(Utc::now()).await }

  pub async fn captures_at(&self, now: DateTime<Utc>) -> Result<Vec<Capture>> {
    let week = self.ensure_active_week_at(now).await?;
    self.store.list_captures(week.contest_id).await.map_err(Error::store)
  }

  /// Weekly standings.
  pub async fn leaderboard(&self) -> Result<Leaderboard> { self.leaderboard_at(Utc::now()).await }

  pub async fn leaderboard_at(&self, now: DateTime<Utc>) -> Result<Leaderboard> {
    let ContestSnapshot { week, assignments } = self.snapshot_at(now).await?;
    let names: HashMap<Uuid, String> = self
      .store
      .list_users()
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|u| (u.user_id, u.username))
      .collect();

    let (mut hunters, mut ghosts): (Vec<_>, Vec<_>) =
      assignments.into_iter().partition(|a| a.role == Role::Hunter);
    hunters.sort_by(|a, b| b.captures.cmp(&a.captures).then(a.user_id.cmp(&b.user_id)));
    ghosts.sort_by(|a, b| b.survived.cmp(&a.survived).then(a.user_id.cmp(&b.user_id)));

    let standing = |a: Assignment| Standing {
      username:          names.get(&a.user_id).cloned(),
      user_id:           a.user_id,
      captures:          a.captures,
      survived:          a.survived,
      camping_violation: a.camping_violation,
    };

    Ok(Leaderboard {
      week,
      hunters: hunters.into_iter().map(standing).collect(),
      ghosts: ghosts.into_iter().map(standing).collect(),
    })
  }
}
