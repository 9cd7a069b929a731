//! Error type for `ghosthunt-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown role: {0:?}")]
  UnknownRole(String),

  #[error("unknown notification kind: {0:?}")]
  UnknownNotificationKind(String),

  /// A conditional insert neither wrote nor found its row.
  #[error("week starting {0} vanished after insert")]
  MissingWeek(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
