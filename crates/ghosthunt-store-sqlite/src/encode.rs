//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings with nanosecond
//! precision so that text ordering is time ordering. UUIDs are stored as
//! hyphenated lowercase strings, booleans as integers.

use chrono::{DateTime, SecondsFormat, Utc};
use ghosthunt_core::{
  contest::{Assignment, Capture, ContestWeek, Role},
  geo::Coordinates,
  notification::{Notification, NotificationKind},
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Role ────────────────────────────────────────────────────────────────────

pub fn encode_role(role: Role) -> &'static str { role.as_str() }

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "hunter" => Ok(Role::Hunter),
    "ghost" => Ok(Role::Ghost),
    other => Err(Error::UnknownRole(other.to_owned())),
  }
}

// ─── NotificationKind ────────────────────────────────────────────────────────

pub fn encode_kind(kind: NotificationKind) -> &'static str { kind.as_str() }

pub fn decode_kind(s: &str) -> Result<NotificationKind> {
  match s {
    "contest_warning" => Ok(NotificationKind::ContestWarning),
    "contest_alert" => Ok(NotificationKind::ContestAlert),
    "contest_capture" => Ok(NotificationKind::ContestCapture),
    "contest_captured" => Ok(NotificationKind::ContestCaptured),
    other => Err(Error::UnknownNotificationKind(other.to_owned())),
  }
}

// ─── Coordinates ─────────────────────────────────────────────────────────────

pub fn split_coordinates(c: Option<Coordinates>) -> (Option<f64>, Option<f64>) {
  (c.map(|c| c.lat), c.map(|c| c.lng))
}

fn join_coordinates(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinates> {
  Some(Coordinates::new(lat?, lng?))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const WEEK_COLUMNS: &str = "contest_id, starts_at, ends_at, challenge, created_at";

/// Raw values read directly from a `contest_weeks` row.
pub struct RawWeek {
  pub contest_id: String,
  pub starts_at:  String,
  pub ends_at:    String,
  pub challenge:  String,
  pub created_at: String,
}

impl RawWeek {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contest_id: row.get(0)?,
      starts_at:  row.get(1)?,
      ends_at:    row.get(2)?,
      challenge:  row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_week(self) -> Result<ContestWeek> {
    Ok(ContestWeek {
      contest_id: decode_uuid(&self.contest_id)?,
      starts_at:  decode_dt(&self.starts_at)?,
      ends_at:    decode_dt(&self.ends_at)?,
      challenge:  self.challenge,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const ASSIGNMENT_COLUMNS: &str = "contest_id, user_id, role, captures, survived, \
                                      camping_violation, last_lat, last_lng, last_move_at, \
                                      assigned_at";

/// Raw values read directly from a `contest_assignments` row.
pub struct RawAssignment {
  pub contest_id:        String,
  pub user_id:           String,
  pub role:              String,
  pub captures:          u32,
  pub survived:          bool,
  pub camping_violation: bool,
  pub last_lat:          Option<f64>,
  pub last_lng:          Option<f64>,
  pub last_move_at:      Option<String>,
  pub assigned_at:       String,
}

impl RawAssignment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contest_id:        row.get(0)?,
      user_id:           row.get(1)?,
      role:              row.get(2)?,
      captures:          row.get(3)?,
      survived:          row.get(4)?,
      camping_violation: row.get(5)?,
      last_lat:          row.get(6)?,
      last_lng:          row.get(7)?,
      last_move_at:      row.get(8)?,
      assigned_at:       row.get(9)?,
    })
  }

  pub fn into_assignment(self) -> Result<Assignment> {
    Ok(Assignment {
      contest_id:        decode_uuid(&self.contest_id)?,
      user_id:           decode_uuid(&self.user_id)?,
      role:              decode_role(&self.role)?,
      captures:          self.captures,
      survived:          self.survived,
      camping_violation: self.camping_violation,
      last_location:     join_coordinates(self.last_lat, self.last_lng),
      last_move_at:      self.last_move_at.as_deref().map(decode_dt).transpose()?,
      assigned_at:       decode_dt(&self.assigned_at)?,
    })
  }
}

/// An [`Assignment`] encoded into column values, ready to bind.
pub struct AssignmentRow {
  pub contest_id:        String,
  pub user_id:           String,
  pub role:              &'static str,
  pub captures:          u32,
  pub survived:          bool,
  pub camping_violation: bool,
  pub last_lat:          Option<f64>,
  pub last_lng:          Option<f64>,
  pub last_move_at:      Option<String>,
  pub assigned_at:       String,
}

impl AssignmentRow {
  pub fn new(a: &Assignment) -> Self {
    let (last_lat, last_lng) = split_coordinates(a.last_location);
    Self {
      contest_id: encode_uuid(a.contest_id),
      user_id: encode_uuid(a.user_id),
      role: encode_role(a.role),
      captures: a.captures,
      survived: a.survived,
      camping_violation: a.camping_violation,
      last_lat,
      last_lng,
      last_move_at: a.last_move_at.map(encode_dt),
      assigned_at: encode_dt(a.assigned_at),
    }
  }

  /// `INSERT .. ON CONFLICT DO NOTHING`; returns the number of rows written.
  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<usize> {
    conn.execute(
      "INSERT INTO contest_assignments (
         contest_id, user_id, role, captures, survived, camping_violation,
         last_lat, last_lng, last_move_at, assigned_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
       ON CONFLICT (contest_id, user_id) DO NOTHING",
      rusqlite::params![
        self.contest_id,
        self.user_id,
        self.role,
        self.captures,
        self.survived,
        self.camping_violation,
        self.last_lat,
        self.last_lng,
        self.last_move_at,
        self.assigned_at,
      ],
    )
  }
}

pub const CAPTURE_COLUMNS: &str =
  "capture_id, contest_id, hunter_id, ghost_id, evidence_post_id, challenge, created_at";

/// Raw values read directly from a `contest_captures` row.
pub struct RawCapture {
  pub capture_id:       String,
  pub contest_id:       String,
  pub hunter_id:        String,
  pub ghost_id:         String,
  pub evidence_post_id: String,
  pub challenge:        String,
  pub created_at:       String,
}

impl RawCapture {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      capture_id:       row.get(0)?,
      contest_id:       row.get(1)?,
      hunter_id:        row.get(2)?,
      ghost_id:         row.get(3)?,
      evidence_post_id: row.get(4)?,
      challenge:        row.get(5)?,
      created_at:       row.get(6)?,
    })
  }

  pub fn into_capture(self) -> Result<Capture> {
    Ok(Capture {
      capture_id:       decode_uuid(&self.capture_id)?,
      contest_id:       decode_uuid(&self.contest_id)?,
      hunter_id:        decode_uuid(&self.hunter_id)?,
      ghost_id:         decode_uuid(&self.ghost_id)?,
      evidence_post_id: decode_uuid(&self.evidence_post_id)?,
      challenge:        self.challenge,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

pub const USER_COLUMNS: &str = "user_id, username, lat, lng, contest_opt_out";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:         String,
  pub username:        String,
  pub lat:             Option<f64>,
  pub lng:             Option<f64>,
  pub contest_opt_out: bool,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:         row.get(0)?,
      username:        row.get(1)?,
      lat:             row.get(2)?,
      lng:             row.get(3)?,
      contest_opt_out: row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:         decode_uuid(&self.user_id)?,
      username:        self.username,
      location:        join_coordinates(self.lat, self.lng),
      contest_opt_out: self.contest_opt_out,
    })
  }
}

pub const NOTIFICATION_COLUMNS: &str =
  "notification_id, recipient_id, sender_id, post_id, kind, message, created_at";

/// Raw values read directly from a `notifications` row.
pub struct RawNotification {
  pub notification_id: String,
  pub recipient_id:    String,
  pub sender_id:       String,
  pub post_id:         Option<String>,
  pub kind:            String,
  pub message:         Option<String>,
  pub created_at:      String,
}

impl RawNotification {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      recipient_id:    row.get(1)?,
      sender_id:       row.get(2)?,
      post_id:         row.get(3)?,
      kind:            row.get(4)?,
      message:         row.get(5)?,
      created_at:      row.get(6)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: decode_uuid(&self.notification_id)?,
      recipient_id:    decode_uuid(&self.recipient_id)?,
      sender_id:       decode_uuid(&self.sender_id)?,
      post_id:         self.post_id.as_deref().map(decode_uuid).transpose()?,
      kind:            decode_kind(&self.kind)?,
      message:         self.message,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}
