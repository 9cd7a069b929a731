//! [`MemoryStore`] — an in-process implementation of every storage trait.
//!
//! Suitable for tests and for embedding the engine without a database. Each
//! operation takes one short lock, so single-row conditional writes behave
//! the same way the SQLite backend's constraints do.

use std::{
  collections::BTreeMap,
  convert::Infallible,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  contest::{Assignment, Capture, ContestWeek, MovementUpdate, Role},
  geo::Coordinates,
  notification::Notification,
  store::{ContestStore, NotificationSink, UserDirectory},
  user::User,
};

#[derive(Default)]
struct Inner {
  weeks:         BTreeMap<DateTime<Utc>, ContestWeek>,
  assignments:   BTreeMap<(Uuid, Uuid), Assignment>,
  captures:      Vec<Capture>,
  users:         Vec<User>,
  notifications: Vec<Notification>,
}

/// Cloning is cheap — clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Every notification ever sent, oldest first.
  pub fn notifications(&self) -> Vec<Notification> { self.lock().notifications.clone() }
}

// ─── ContestStore impl ───────────────────────────────────────────────────────

impl ContestStore for MemoryStore {
  type Error = Infallible;

  async fn get_week(&self, starts_at: DateTime<Utc>) -> Result<Option<ContestWeek>, Infallible> {
    Ok(self.lock().weeks.get(&starts_at).cloned())
  }

  async fn create_week(&self, week: ContestWeek) -> Result<ContestWeek, Infallible> {
    Ok(self.lock().weeks.entry(week.starts_at).or_insert(week).clone())
  }

  async fn list_assignments(&self, contest_id: Uuid) -> Result<Vec<Assignment>, Infallible> {
    let inner = self.lock();
    let mut rows: Vec<Assignment> = inner
      .assignments
      .values()
      .filter(|a| a.contest_id == contest_id)
      .cloned()
      .collect();
    rows.sort_by_key(|a| (a.assigned_at, a.user_id));
    Ok(rows)
  }

  async fn get_assignment(
    &self,
    contest_id: Uuid,
    user_id: Uuid,
  ) -> Result<Option<Assignment>, Infallible> {
    Ok(self.lock().assignments.get(&(contest_id, user_id)).cloned())
  }

  async fn insert_assignment(&self, assignment: Assignment) -> Result<bool, Infallible> {
    let mut inner = self.lock();
    let key = (assignment.contest_id, assignment.user_id);
    if inner.assignments.contains_key(&key) {
      return Ok(false);
    }
    inner.assignments.insert(key, assignment);
    Ok(true)
  }

  async fn insert_initial_partition(
    &self,
    contest_id: Uuid,
    assignments: Vec<Assignment>,
  ) -> Result<bool, Infallible> {
    let mut inner = self.lock();
    if inner.assignments.keys().any(|(contest, _)| *contest == contest_id) {
      return Ok(false);
    }
    for assignment in assignments {
      inner.assignments.entry((assignment.contest_id, assignment.user_id)).or_insert(assignment);
    }
    Ok(true)
  }

  async fn delete_assignment(&self, contest_id: Uuid, user_id: Uuid) -> Result<bool, Infallible> {
    Ok(self.lock().assignments.remove(&(contest_id, user_id)).is_some())
  }

  async fn update_movement(
    &self,
    contest_id: Uuid,
    user_id: Uuid,
    update: MovementUpdate,
  ) -> Result<(), Infallible> {
    if let Some(row) = self.lock().assignments.get_mut(&(contest_id, user_id)) {
      row.last_location = update.last_location;
      if let Some(moved_at) = update.moved_at {
        row.last_move_at = Some(moved_at);
        row.camping_violation = false;
      }
    }
    Ok(())
  }

  async fn flag_camping(
    &self,
    contest_id: Uuid,
    ghost_id: Uuid,
    idle_since: DateTime<Utc>,
  ) -> Result<bool, Infallible> {
    match self.lock().assignments.get_mut(&(contest_id, ghost_id)) {
      Some(row)
        if row.role == Role::Ghost
          && !row.camping_violation
          && row.last_move_at.is_some_and(|at| at < idle_since) =>
      {
        row.camping_violation = true;
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn mark_captured(&self, contest_id: Uuid, ghost_id: Uuid) -> Result<bool, Infallible> {
    match self.lock().assignments.get_mut(&(contest_id, ghost_id)) {
      Some(row) if row.role == Role::Ghost && row.survived => {
        row.survived = false;
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn increment_captures(&self, contest_id: Uuid, hunter_id: Uuid) -> Result<(), Infallible> {
    if let Some(row) = self.lock().assignments.get_mut(&(contest_id, hunter_id)) {
      row.captures += 1;
    }
    Ok(())
  }

  async fn record_capture(&self, capture: Capture) -> Result<(), Infallible> {
    self.lock().captures.push(capture);
    Ok(())
  }

  async fn list_captures(&self, contest_id: Uuid) -> Result<Vec<Capture>, Infallible> {
    Ok(
      self
        .lock()
        .captures
        .iter()
        .filter(|c| c.contest_id == contest_id)
        .cloned()
        .collect(),
    )
  }
}

// ─── UserDirectory impl ──────────────────────────────────────────────────────

impl UserDirectory for MemoryStore {
  type Error = Infallible;

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Infallible> {
    Ok(self.lock().users.iter().find(|u| u.user_id == user_id).cloned())
  }

  async fn list_users(&self) -> Result<Vec<User>, Infallible> { Ok(self.lock().users.clone()) }

  async fn upsert_user(&self, user_id: Uuid, username: String) -> Result<User, Infallible> {
    let mut inner = self.lock();
    if let Some(user) = inner.users.iter_mut().find(|u| u.user_id == user_id) {
      user.username = username;
      return Ok(user.clone());
    }
    let user = User::new(user_id, username);
    inner.users.push(user.clone());
    Ok(user)
  }

  async fn set_location(
    &self,
    user_id: Uuid,
    location: Option<Coordinates>,
  ) -> Result<Option<User>, Infallible> {
    let mut inner = self.lock();
    Ok(inner.users.iter_mut().find(|u| u.user_id == user_id).map(|user| {
      user.location = location;
      user.clone()
    }))
  }

  async fn set_contest_opt_out(
    &self,
    user_id: Uuid,
    opted_out: bool,
  ) -> Result<Option<User>, Infallible> {
    let mut inner = self.lock();
    Ok(inner.users.iter_mut().find(|u| u.user_id == user_id).map(|user| {
      user.contest_opt_out = opted_out;
      user.clone()
    }))
  }
}

// ─── NotificationSink impl ───────────────────────────────────────────────────

impl NotificationSink for MemoryStore {
  type Error = Infallible;

  async fn notify(&self, notification: Notification) -> Result<(), Infallible> {
    self.lock().notifications.push(notification);
    Ok(())
  }

  async fn notify_unless_recent(
    &self,
    notification: Notification,
    since: DateTime<Utc>,
  ) -> Result<bool, Infallible> {
    let mut inner = self.lock();
    let recent = inner.notifications.iter().any(|n| {
      n.recipient_id == notification.recipient_id
        && n.sender_id == notification.sender_id
        && n.kind == notification.kind
        && n.created_at >= since
    });
    if recent {
      return Ok(false);
    }
    inner.notifications.push(notification);
    Ok(true)
  }

  async fn inbox(&self, recipient_id: Uuid, limit: usize) -> Result<Vec<Notification>, Infallible> {
    let mut rows: Vec<Notification> = self
      .lock()
      .notifications
      .iter()
      .filter(|n| n.recipient_id == recipient_id)
      .cloned()
      .collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows.truncate(limit);
    Ok(rows)
  }
}
