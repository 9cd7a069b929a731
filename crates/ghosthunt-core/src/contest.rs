//! Contest records: weeks, role assignments and captures.
//!
//! A [`ContestWeek`] is created lazily the first time the engine runs inside
//! its window and is never mutated afterwards. [`Assignment`] rows live only
//! within their week. [`Capture`] rows are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Coordinates;

// ─── Week ────────────────────────────────────────────────────────────────────

/// One weekly contest. Unique per `starts_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestWeek {
  pub contest_id: Uuid,
  pub starts_at:  DateTime<Utc>,
  pub ends_at:    DateTime<Utc>,
  /// The photo challenge every capture this week must claim.
  pub challenge:  String,
  pub created_at: DateTime<Utc>,
}

impl ContestWeek {
  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.starts_at <= at && at < self.ends_at
  }
}

// ─── Roles ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Hunter,
  Ghost,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Hunter => "hunter",
      Self::Ghost => "ghost",
    }
  }
}

/// A user's role in one contest week, plus its running game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
  pub contest_id:        Uuid,
  pub user_id:           Uuid,
  /// Never changes once the row is written.
  pub role:              Role,
  /// Ghosts captured; only meaningful for hunters.
  pub captures:          u32,
  /// One-way latch, true until the ghost is captured.
  pub survived:          bool,
  /// Sticky notice that a ghost has not moved far enough for too long.
  pub camping_violation: bool,
  pub last_location:     Option<Coordinates>,
  /// Instant of the last movement that counted against camping.
  pub last_move_at:      Option<DateTime<Utc>>,
  pub assigned_at:       DateTime<Utc>,
}

impl Assignment {
  /// A fresh row as created by role assignment.
  pub fn new(contest_id: Uuid, user_id: Uuid, role: Role, now: DateTime<Utc>) -> Self {
    Self {
      contest_id,
      user_id,
      role,
      captures: 0,
      survived: true,
      camping_violation: false,
      last_location: None,
      last_move_at: Some(now),
      assigned_at: now,
    }
  }

  /// A ghost that can still be found and captured.
  pub fn is_active_ghost(&self) -> bool { self.role == Role::Ghost && self.survived }
}

/// A new position for an [`Assignment`].
///
/// `moved_at` is set only when the move resets the camping clock; the store
/// then also clears the camping flag. Otherwise the clock and flag are left
/// as they are in storage, whatever the caller last read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementUpdate {
  pub last_location: Option<Coordinates>,
  pub moved_at:      Option<DateTime<Utc>>,
}

// ─── Captures ────────────────────────────────────────────────────────────────

/// Immutable record of a hunter catching a ghost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
  pub capture_id:       Uuid,
  pub contest_id:       Uuid,
  pub hunter_id:        Uuid,
  pub ghost_id:         Uuid,
  /// The post carrying the photographic evidence.
  pub evidence_post_id: Uuid,
  /// The challenge string the hunter claimed.
  pub challenge:        String,
  pub created_at:       DateTime<Utc>,
}

/// Input to [`crate::Engine::submit_capture`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
  pub hunter_id:        Uuid,
  pub ghost_id:         Uuid,
  pub evidence_post_id: Uuid,
  pub challenge:        String,
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// The active week with every assignment in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestSnapshot {
  pub week:        ContestWeek,
  pub assignments: Vec<Assignment>,
}

/// One line of the weekly standings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
  pub user_id:           Uuid,
  pub username:          Option<String>,
  pub captures:          u32,
  pub survived:          bool,
  pub camping_violation: bool,
}

/// Weekly standings: hunters by captures, ghosts with survivors first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
  pub week:    ContestWeek,
  pub hunters: Vec<Standing>,
  pub ghosts:  Vec<Standing>,
}
