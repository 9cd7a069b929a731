//! Contest tuning knobs.
//!
//! Deserialised from the `[contest]` table of the server configuration; every
//! field falls back to the default used in production.

use chrono::{TimeDelta, Weekday};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Challenges a new week draws from.
pub const DEFAULT_CHALLENGES: &[&str] = &[
  "Capture your ghost next to something red",
  "Capture your ghost mid-jump",
  "Capture your ghost with a dog in frame",
  "Capture your ghost under a street sign",
  "Capture your ghost holding a coffee cup",
  "Capture your ghost in front of a mural",
  "Capture your ghost wearing a hat",
  "Capture your ghost at golden hour",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Weekday on which every contest week starts (UTC).
  pub anchor_weekday:      Weekday,
  /// Hour of `anchor_weekday` at which the week starts (UTC).
  pub anchor_hour:         u32,
  /// A ghost must move further than this to reset its camping clock.
  pub camping_distance_km: f64,
  /// Time without a qualifying move before a ghost is flagged.
  pub camping_after_secs:  i64,
  /// Hunters are alerted to active ghosts within this radius.
  pub proximity_km:        f64,
  /// Minimum gap between alerts for the same hunter and ghost.
  pub alert_cooldown_secs: i64,
  pub challenges:          Vec<String>,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      anchor_weekday:      Weekday::Sun,
      anchor_hour:         20,
      camping_distance_km: 0.1,
      camping_after_secs:  6 * 60 * 60,
      proximity_km:        0.3,
      alert_cooldown_secs: 60 * 60,
      challenges:          DEFAULT_CHALLENGES.iter().map(|c| (*c).to_owned()).collect(),
    }
  }
}

impl EngineConfig {
  pub fn camping_after(&self) -> TimeDelta { TimeDelta::seconds(self.camping_after_secs) }

  pub fn alert_cooldown(&self) -> TimeDelta { TimeDelta::seconds(self.alert_cooldown_secs) }

  /// Reject settings the engine cannot run with.
  pub fn validate(&self) -> Result<()> {
    if self.anchor_hour >= 24 {
      return Err(Error::InvalidConfig(format!(
        "anchor_hour must be below 24, got {}",
        self.anchor_hour
      )));
    }
    if self.challenges.is_empty() {
      return Err(Error::InvalidConfig("challenge catalog is empty".into()));
    }
    if self.challenges.iter().any(|c| c.trim().is_empty()) {
      return Err(Error::InvalidConfig("challenge catalog contains a blank entry".into()));
    }
    if !(self.camping_distance_km > 0.0 && self.proximity_km > 0.0) {
      return Err(Error::InvalidConfig("distance thresholds must be positive".into()));
    }
    if self.camping_after_secs <= 0 || self.alert_cooldown_secs <= 0 {
      return Err(Error::InvalidConfig("time thresholds must be positive".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    let cfg = EngineConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.camping_after(), TimeDelta::hours(6));
    assert_eq!(cfg.alert_cooldown(), TimeDelta::hours(1));
  }

  #[test]
  fn rejects_bad_hour_and_empty_catalog() {
    let cfg = EngineConfig { anchor_hour: 24, ..EngineConfig::default() };
    assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

    let cfg = EngineConfig { challenges: vec![], ..EngineConfig::default() };
    assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
  }

  #[test]
  fn partial_tables_fill_in_defaults() {
    let cfg: EngineConfig =
      serde_json::from_str(r#"{ "anchor_weekday": "Mon", "anchor_hour": 9 }"#).unwrap();
    assert_eq!(cfg.anchor_weekday, Weekday::Mon);
    assert_eq!(cfg.anchor_hour, 9);
    assert_eq!(cfg.proximity_km, 0.3);
  }
}
