//! Error types for `ghosthunt-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("challenge {claimed:?} does not match this week's challenge")]
  ChallengeMismatch { claimed: String, active: String },

  #[error("user {0} is not a hunter in the active contest")]
  NotAHunter(Uuid),

  #[error("user {0} is not an active ghost in the active contest")]
  NotAnActiveGhost(Uuid),

  #[error("invalid contest configuration: {0}")]
  InvalidConfig(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error. Used with `map_err` on every store call.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// Whether this error is a rejected capture submission rather than an
  /// unexpected failure.
  pub fn is_rejection(&self) -> bool {
    matches!(
      self,
      Self::ChallengeMismatch { .. } | Self::NotAHunter(_) | Self::NotAnActiveGhost(_)
    )
  }

  /// Stable machine-readable name for rejections.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::ChallengeMismatch { .. } => "challenge_mismatch",
      Self::NotAHunter(_) => "not_a_hunter",
      Self::NotAnActiveGhost(_) => "not_an_active_ghost",
      Self::InvalidConfig(_) => "invalid_config",
      Self::Store(_) => "store",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
