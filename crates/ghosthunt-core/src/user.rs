//! The slice of the external user directory the contest reads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Coordinates;

/// A user as seen by the contest engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub user_id:         Uuid,
  pub username:        String,
  /// Last location reported to the directory, if any.
  pub location:        Option<Coordinates>,
  /// Opt-out mode: the user takes no part in the contest at all.
  pub contest_opt_out: bool,
}

impl User {
  pub fn new(user_id: Uuid, username: impl Into<String>) -> Self {
    Self { user_id, username: username.into(), location: None, contest_opt_out: false }
  }

  pub fn is_eligible(&self) -> bool { !self.contest_opt_out }
}
