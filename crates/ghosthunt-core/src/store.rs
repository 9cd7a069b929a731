//! Storage traits the engine is written against.
//!
//! The traits are implemented by storage backends (e.g.
//! `ghosthunt-store-sqlite`, or [`crate::memory::MemoryStore`] in tests).
//! The engine holds no cache: every call reads through these traits, and
//! concurrent requests are kept consistent by the backend's unique keys and
//! conditional writes rather than by engine-side locks.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  contest::{Assignment, Capture, ContestWeek, MovementUpdate},
  geo::Coordinates,
  notification::Notification,
  user::User,
};

// ─── Contest records ─────────────────────────────────────────────────────────

/// Persistent contest weeks, assignments and captures.
pub trait ContestStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Weeks ─────────────────────────────────────────────────────────────

  /// Point lookup of the week starting at `starts_at`.
  fn get_week(
    &self,
    starts_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<ContestWeek>, Self::Error>> + Send + '_;

  /// Insert `week` unless a week with the same `starts_at` already exists.
  ///
  /// Returns the stored week, which is the pre-existing one if another writer
  /// got there first.
  fn create_week(
    &self,
    week: ContestWeek,
  ) -> impl Future<Output = Result<ContestWeek, Self::Error>> + Send + '_;

  // ── Assignments ───────────────────────────────────────────────────────

  /// Range scan of every assignment in a contest.
  fn list_assignments(
    &self,
    contest_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Assignment>, Self::Error>> + Send + '_;

  fn get_assignment(
    &self,
    contest_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Assignment>, Self::Error>> + Send + '_;

  /// Insert a new assignment. Returns `false` without writing if the
  /// `(contest_id, user_id)` key is already taken.
  fn insert_assignment(
    &self,
    assignment: Assignment,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Insert a week's first assignments as one unit.
  ///
  /// Writes nothing and returns `false` if the contest already has any
  /// assignment, so two concurrent partitions cannot interleave.
  fn insert_initial_partition(
    &self,
    contest_id: Uuid,
    assignments: Vec<Assignment>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `false` if there was nothing to delete.
  fn delete_assignment(
    &self,
    contest_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Record a new position. See [`MovementUpdate`] for which columns change.
  fn update_movement(
    &self,
    contest_id: Uuid,
    user_id: Uuid,
    update: MovementUpdate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Raise a ghost's camping flag.
  ///
  /// Only succeeds (returns `true`) if the flag is currently down and the
  /// ghost's last qualifying move is strictly before `idle_since`, as seen by
  /// the store at write time.
  fn flag_camping(
    &self,
    contest_id: Uuid,
    ghost_id: Uuid,
    idle_since: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Latch a ghost's survival flag to false.
  ///
  /// Only succeeds (returns `true`) if the row is a ghost that is still
  /// surviving; a second call for the same ghost returns `false`.
  fn mark_captured(
    &self,
    contest_id: Uuid,
    ghost_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn increment_captures(
    &self,
    contest_id: Uuid,
    hunter_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Captures — append-only ────────────────────────────────────────────

  fn record_capture(
    &self,
    capture: Capture,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Captures in a contest, oldest first.
  fn list_captures(
    &self,
    contest_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Capture>, Self::Error>> + Send + '_;
}

// ─── User directory ──────────────────────────────────────────────────────────

/// The external user directory: identity, location and eligibility.
pub trait UserDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users(&self) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Create the user, or refresh its username. Location and opt-out state of
  /// an existing user are left alone.
  fn upsert_user(
    &self,
    user_id: Uuid,
    username: String,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Returns `None` if the user does not exist.
  fn set_location(
    &self,
    user_id: Uuid,
    location: Option<Coordinates>,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Returns `None` if the user does not exist.
  fn set_contest_opt_out(
    &self,
    user_id: Uuid,
    opted_out: bool,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;
}

// ─── Inbox ───────────────────────────────────────────────────────────────────

/// One-way notification inbox.
pub trait NotificationSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn notify(
    &self,
    notification: Notification,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Deliver `notification` unless one of the same kind, recipient and
  /// sender was created at or after `since`. Returns whether it was
  /// delivered.
  fn notify_unless_recent(
    &self,
    notification: Notification,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// A recipient's notifications, newest first.
  fn inbox(
    &self,
    recipient_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;
}

// ─── Combined ────────────────────────────────────────────────────────────────

/// Everything the engine needs from a backend. Implemented automatically for
/// any type implementing all three traits.
pub trait ContestBackend: ContestStore + UserDirectory + NotificationSink {}

impl<T> ContestBackend for T where T: ContestStore + UserDirectory + NotificationSink {}
