//! Weekly contest windows.
//!
//! The active week is a pure function of the current instant. Nothing is
//! scheduled: the first call after a boundary simply lands in a new window.

use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Length of every contest window.
pub const WEEK: TimeDelta = TimeDelta::days(7);

/// A half-open interval `[starts_at, ends_at)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestWindow {
  pub starts_at: DateTime<Utc>,
  pub ends_at:   DateTime<Utc>,
}

impl ContestWindow {
  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.starts_at <= at && at < self.ends_at
  }
}

/// The window containing `now`: it starts at the most recent
/// `anchor_weekday` `anchor_hour`:00:00 UTC at or before `now`.
///
/// `anchor_hour` is expected to be below 24; larger values roll over into the
/// following day.
pub fn contest_window(
  now: DateTime<Utc>,
  anchor_weekday: Weekday,
  anchor_hour: u32,
) -> ContestWindow {
  let days_back = (7 + now.weekday().num_days_from_sunday()
    - anchor_weekday.num_days_from_sunday())
    % 7;
  let anchor_date = now.date_naive() - TimeDelta::days(i64::from(days_back));
  let mut starts_at = (anchor_date.and_time(NaiveTime::MIN)
    + TimeDelta::hours(i64::from(anchor_hour)))
  .and_utc();

  // Same weekday but before the anchor hour belongs to last week.
  while starts_at > now {
    starts_at -= WEEK;
  }

  ContestWindow { starts_at, ends_at: starts_at + WEEK }
}
