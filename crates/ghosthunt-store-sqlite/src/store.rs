//! [`SqliteStore`] — the SQLite implementation of the engine's storage traits.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use ghosthunt_core::{
  contest::{Assignment, Capture, ContestWeek, MovementUpdate},
  geo::Coordinates,
  notification::Notification,
  store::{ContestStore, NotificationSink, UserDirectory},
  user::User,
};

use crate::{
  Error, Result,
  encode::{
    ASSIGNMENT_COLUMNS, AssignmentRow, CAPTURE_COLUMNS, NOTIFICATION_COLUMNS, RawAssignment,
    RawCapture, RawNotification, RawUser, RawWeek, USER_COLUMNS, WEEK_COLUMNS, encode_dt,
    encode_kind, encode_uuid, split_coordinates,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Ghosthunt store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_user(&self, user_id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
              rusqlite::params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

// ─── ContestStore impl ───────────────────────────────────────────────────────

impl ContestStore for SqliteStore {
  type Error = Error;

  // ── Weeks ─────────────────────────────────────────────────────────────────

  async fn get_week(&self, starts_at: DateTime<Utc>) -> Result<Option<ContestWeek>> {
    let starts_str = encode_dt(starts_at);

    let raw: Option<RawWeek> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {WEEK_COLUMNS} FROM contest_weeks WHERE starts_at = ?1"),
              rusqlite::params![starts_str],
              RawWeek::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawWeek::into_week).transpose()
  }

  async fn create_week(&self, week: ContestWeek) -> Result<ContestWeek> {
    let id_str      = encode_uuid(week.contest_id);
    let starts_str  = encode_dt(week.starts_at);
    let ends_str    = encode_dt(week.ends_at);
    let created_str = encode_dt(week.created_at);
    let challenge   = week.challenge;

    // The UNIQUE constraint on `starts_at` decides the winner of a race.
    let raw: Option<RawWeek> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO contest_weeks (contest_id, starts_at, ends_at, challenge, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (starts_at) DO NOTHING",
          rusqlite::params![id_str, starts_str, ends_str, challenge, created_str],
        )?;
        Ok(
          conn
            .query_row(
              &format!("SELECT {WEEK_COLUMNS} FROM contest_weeks WHERE starts_at = ?1"),
              rusqlite::params![starts_str],
              RawWeek::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .ok_or_else(|| Error::MissingWeek(week.starts_at.to_rfc3339()))?
      .into_week()
  }

  // ── Assignments ───────────────────────────────────────────────────────────

  async fn list_assignments(&self, contest_id: Uuid) -> Result<Vec<Assignment>> {
    let contest_str = encode_uuid(contest_id);

    let raws: Vec<RawAssignment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ASSIGNMENT_COLUMNS} FROM contest_assignments
           WHERE contest_id = ?1
           ORDER BY assigned_at, user_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![contest_str], RawAssignment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAssignment::into_assignment).collect()
  }

  async fn get_assignment(&self, contest_id: Uuid, user_id: Uuid) -> Result<Option<Assignment>> {
    let contest_str = encode_uuid(contest_id);
    let user_str    = encode_uuid(user_id);

    let raw: Option<RawAssignment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ASSIGNMENT_COLUMNS} FROM contest_assignments
                 WHERE contest_id = ?1 AND user_id = ?2"
              ),
              rusqlite::params![contest_str, user_str],
              RawAssignment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAssignment::into_assignment).transpose()
  }

  async fn insert_assignment(&self, assignment: Assignment) -> Result<bool> {
    let row = AssignmentRow::new(&assignment);

    let inserted = self.conn.call(move |conn| Ok(row.insert(conn)? == 1)).await?;
    Ok(inserted)
  }

  async fn insert_initial_partition(
    &self,
    contest_id:  Uuid,
    assignments: Vec<Assignment>,
  ) -> Result<bool> {
    let contest_str = encode_uuid(contest_id);
    let rows: Vec<AssignmentRow> = assignments.iter().map(AssignmentRow::new).collect();

    // IMMEDIATE takes the write lock up front, so the emptiness check and the
    // inserts see no other writer in between.
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let taken: bool = tx.query_row(
          "SELECT EXISTS (SELECT 1 FROM contest_assignments WHERE contest_id = ?1)",
          rusqlite::params![contest_str],
          |row| row.get(0),
        )?;
        if taken {
          return Ok(false);
        }
        for row in &rows {
          row.insert(&tx)?;
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(inserted)
  }

  async fn delete_assignment(&self, contest_id: Uuid, user_id: Uuid) -> Result<bool> {
    let contest_str = encode_uuid(contest_id);
    let user_str    = encode_uuid(user_id);

    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM contest_assignments WHERE contest_id = ?1 AND user_id = ?2",
          rusqlite::params![contest_str, user_str],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(deleted)
  }

  async fn update_movement(
    &self,
    contest_id: Uuid,
    user_id:    Uuid,
    update:     MovementUpdate,
  ) -> Result<()> {
    let contest_str  = encode_uuid(contest_id);
    let user_str     = encode_uuid(user_id);
    let (lat, lng)   = split_coordinates(update.last_location);
    let moved_at_str = update.moved_at.map(encode_dt);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE contest_assignments
           SET last_lat = ?3,
               last_lng = ?4,
               last_move_at = COALESCE(?5, last_move_at),
               camping_violation = CASE WHEN ?5 IS NULL THEN camping_violation ELSE 0 END
           WHERE contest_id = ?1 AND user_id = ?2",
          rusqlite::params![contest_str, user_str, lat, lng, moved_at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn flag_camping(
    &self,
    contest_id: Uuid,
    ghost_id:   Uuid,
    idle_since: DateTime<Utc>,
  ) -> Result<bool> {
    let contest_str = encode_uuid(contest_id);
    let ghost_str   = encode_uuid(ghost_id);
    let idle_str    = encode_dt(idle_since);

    let flagged = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE contest_assignments SET camping_violation = 1
           WHERE contest_id = ?1 AND user_id = ?2 AND role = 'ghost'
             AND camping_violation = 0 AND last_move_at < ?3",
          rusqlite::params![contest_str, ghost_str, idle_str],
        )?;
        Ok(n == 1)
      })
      .await?;

    Ok(flagged)
  }

  async fn mark_captured(&self, contest_id: Uuid, ghost_id: Uuid) -> Result<bool> {
    let contest_str = encode_uuid(contest_id);
    let ghost_str   = encode_uuid(ghost_id);

    let latched = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE contest_assignments SET survived = 0
           WHERE contest_id = ?1 AND user_id = ?2 AND role = 'ghost' AND survived = 1",
          rusqlite::params![contest_str, ghost_str],
        )?;
        Ok(n == 1)
      })
      .await?;

    Ok(latched)
  }

  async fn increment_captures(&self, contest_id: Uuid, hunter_id: Uuid) -> Result<()> {
    let contest_str = encode_uuid(contest_id);
    let hunter_str  = encode_uuid(hunter_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE contest_assignments SET captures = captures + 1
           WHERE contest_id = ?1 AND user_id = ?2",
          rusqlite::params![contest_str, hunter_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Captures — append-only ────────────────────────────────────────────────

  async fn record_capture(&self, capture: Capture) -> Result<()> {
    let capture_str = encode_uuid(capture.capture_id);
    let contest_str = encode_uuid(capture.contest_id);
    let hunter_str  = encode_uuid(capture.hunter_id);
    let ghost_str   = encode_uuid(capture.ghost_id);
    let post_str    = encode_uuid(capture.evidence_post_id);
    let created_str = encode_dt(capture.created_at);
    let challenge   = capture.challenge;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO contest_captures (
             capture_id, contest_id, hunter_id, ghost_id, evidence_post_id, challenge, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            capture_str,
            contest_str,
            hunter_str,
            ghost_str,
            post_str,
            challenge,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_captures(&self, contest_id: Uuid) -> Result<Vec<Capture>> {
    let contest_str = encode_uuid(contest_id);

    let raws: Vec<RawCapture> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CAPTURE_COLUMNS} FROM contest_captures
           WHERE contest_id = ?1
           ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![contest_str], RawCapture::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCapture::into_capture).collect()
  }
}

// ─── UserDirectory impl ──────────────────────────────────────────────────────

impl UserDirectory for SqliteStore {
  type Error = Error;

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> { self.fetch_user(user_id).await }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid"))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn upsert_user(&self, user_id: Uuid, username: String) -> Result<User> {
    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(Utc::now());

    let raw: RawUser = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, username, created_at) VALUES (?1, ?2, ?3)
           ON CONFLICT (user_id) DO UPDATE SET username = excluded.username",
          rusqlite::params![id_str, username, at_str],
        )?;
        Ok(conn.query_row(
          &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
          rusqlite::params![id_str],
          RawUser::from_row,
        )?)
      })
      .await?;

    raw.into_user()
  }

  async fn set_location(
    &self,
    user_id:  Uuid,
    location: Option<Coordinates>,
  ) -> Result<Option<User>> {
    let id_str     = encode_uuid(user_id);
    let (lat, lng) = split_coordinates(location);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET lat = ?2, lng = ?3 WHERE user_id = ?1",
          rusqlite::params![id_str, lat, lng],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.fetch_user(user_id).await
  }

  async fn set_contest_opt_out(&self, user_id: Uuid, opted_out: bool) -> Result<Option<User>> {
    let id_str = encode_uuid(user_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET contest_opt_out = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, opted_out],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.fetch_user(user_id).await
  }
}

// ─── NotificationSink impl ───────────────────────────────────────────────────

impl NotificationSink for SqliteStore {
  type Error = Error;

  async fn notify(&self, notification: Notification) -> Result<()> {
    let id_str        = encode_uuid(notification.notification_id);
    let recipient_str = encode_uuid(notification.recipient_id);
    let sender_str    = encode_uuid(notification.sender_id);
    let post_str      = notification.post_id.map(encode_uuid);
    let kind_str      = encode_kind(notification.kind);
    let created_str   = encode_dt(notification.created_at);
    let message       = notification.message;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (
             notification_id, recipient_id, sender_id, post_id, kind, message, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            recipient_str,
            sender_str,
            post_str,
            kind_str,
            message,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn notify_unless_recent(
    &self,
    notification: Notification,
    since:        DateTime<Utc>,
  ) -> Result<bool> {
    let id_str        = encode_uuid(notification.notification_id);
    let recipient_str = encode_uuid(notification.recipient_id);
    let sender_str    = encode_uuid(notification.sender_id);
    let post_str      = notification.post_id.map(encode_uuid);
    let kind_str      = encode_kind(notification.kind);
    let created_str   = encode_dt(notification.created_at);
    let since_str     = encode_dt(since);
    let message       = notification.message;

    // Check and insert in one statement.
    let delivered = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO notifications (
             notification_id, recipient_id, sender_id, post_id, kind, message, created_at
           )
           SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
           WHERE NOT EXISTS (
             SELECT 1 FROM notifications
             WHERE recipient_id = ?2 AND sender_id = ?3 AND kind = ?5 AND created_at >= ?8
           )",
          rusqlite::params![
            id_str,
            recipient_str,
            sender_str,
            post_str,
            kind_str,
            message,
            created_str,
            since_str,
          ],
        )?;
        Ok(n == 1)
      })
      .await?;

    Ok(delivered)
  }

  async fn inbox(&self, recipient_id: Uuid, limit: usize) -> Result<Vec<Notification>> {
    let recipient_str = encode_uuid(recipient_id);
    let limit_val     = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications
           WHERE recipient_id = ?1
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![recipient_str, limit_val], RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }
}
