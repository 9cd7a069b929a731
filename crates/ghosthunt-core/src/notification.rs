//! Inbox notifications emitted by the contest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The contest's notification types. Other inbox types belong to the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
  /// Sent to a ghost flagged for camping.
  ContestWarning,
  /// Sent to a hunter when an active ghost is nearby.
  ContestAlert,
  /// Sent to a hunter whose capture was accepted.
  ContestCapture,
  /// Sent to a ghost that was captured.
  ContestCaptured,
}

impl NotificationKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::ContestWarning => "contest_warning",
      Self::ContestAlert => "contest_alert",
      Self::ContestCapture => "contest_capture",
      Self::ContestCaptured => "contest_captured",
    }
  }
}

/// One inbox entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: Uuid,
  pub recipient_id:    Uuid,
  pub sender_id:       Uuid,
  pub post_id:         Option<Uuid>,
  pub kind:            NotificationKind,
  pub message:         Option<String>,
  pub created_at:      DateTime<Utc>,
}

impl Notification {
  pub fn new(
    recipient_id: Uuid,
    sender_id: Uuid,
    kind: NotificationKind,
    message: impl Into<String>,
    created_at: DateTime<Utc>,
  ) -> Self {
    Self {
      notification_id: Uuid::new_v4(),
      recipient_id,
      sender_id,
      post_id: None,
      kind,
      message: Some(message.into()),
      created_at,
    }
  }

  pub fn with_post(mut self, post_id: Uuid) -> Self {
    self.post_id = Some(post_id);
    self
  }
}
