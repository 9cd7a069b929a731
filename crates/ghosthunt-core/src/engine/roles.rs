//! Role assignment: keeping exactly one assignment per eligible user.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::Engine;
use crate::{
  Error, Result,
  contest::{Assignment, ContestWeek, Role},
  store::ContestBackend,
};

/// What a sync pass wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  pub retracted:     usize,
  pub hunters_added: usize,
  pub ghosts_added:  usize,
}

impl SyncReport {
  pub fn is_noop(&self) -> bool {
    self.retracted == 0 && self.hunters_added == 0 && self.ghosts_added == 0
  }

  fn added(&mut self, role: Role) {
    match role {
      Role::Hunter => self.hunters_added += 1,
      Role::Ghost => self.ghosts_added += 1,
    }
  }
}

impl<S: ContestBackend, R: Rng + Send> Engine<S, R> {
  /// Bring `week`'s assignments in line with the directory.
  ///
  /// 1. Users no longer eligible lose their assignment.
  /// 2. If the week has no assignments left, the eligible population is
  ///    shuffled and split, hunters taking the odd one out. The split is
  ///    stored in one write; if another sync got there first, this one falls
  ///    through to step 3.
  /// 3. Otherwise each unassigned eligible user joins the smaller side,
  ///    hunters winning ties.
  ///
  /// Running it twice without a directory change writes nothing the second
  /// time.
  pub async fn sync_roles_at(&self, week: &ContestWeek, now: DateTime<Utc>) -> Result<SyncReport> {
    let eligible: Vec<Uuid> = self
      .store
      .list_users()
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter(|u| u.is_eligible())
      .map(|u| u.user_id)
      .collect();
    let eligible_set: HashSet<Uuid> = eligible.iter().copied().collect();

    let existing = self.store.list_assignments(week.contest_id).await.map_err(Error::store)?;
    let mut report = SyncReport::default();

    // Retraction.
    let mut kept = Vec::with_capacity(existing.len());
    for assignment in existing {
      if eligible_set.contains(&assignment.user_id) {
        kept.push(assignment);
        continue;
      }
      if self
        .store
        .delete_assignment(week.contest_id, assignment.user_id)
        .await
        .map_err(Error::store)?
      {
        debug!(
          contest_id = %week.contest_id,
          user_id = %assignment.user_id,
          role = assignment.role.as_str(),
          "retracted assignment"
        );
        report.retracted += 1;
      }
    }

    if kept.is_empty() {
      // Initial partition, written as one unit.
      let mut population = eligible.clone();
      self.draw(|rng| population.shuffle(rng));
      let hunters = population.len().div_ceil(2);
      let rows: Vec<Assignment> = population
        .into_iter()
        .enumerate()
        .map(|(i, user_id)| {
          let role = if i < hunters { Role::Hunter } else { Role::Ghost };
          Assignment::new(week.contest_id, user_id, role, now)
        })
        .collect();
      let roles: Vec<Role> = rows.iter().map(|a| a.role).collect();

      if self
        .store
        .insert_initial_partition(week.contest_id, rows)
        .await
        .map_err(Error::store)?
      {
        roles.into_iter().for_each(|role| report.added(role));
      } else {
        warn!(
          contest_id = %week.contest_id,
          "contest was partitioned concurrently; joining instead"
        );
        kept = self.store.list_assignments(week.contest_id).await.map_err(Error::store)?;
      }
    }

    if !kept.is_empty() {
      // Incremental join.
      let assigned: HashSet<Uuid> = kept.iter().map(|a| a.user_id).collect();
      let mut hunters = kept.iter().filter(|a| a.role == Role::Hunter).count();
      let mut ghosts = kept.len() - hunters;

      for user_id in eligible.into_iter().filter(|id| !assigned.contains(id)) {
        let role = if ghosts < hunters { Role::Ghost } else { Role::Hunter };
        if self.assign(week, user_id, role, now).await? {
          match role {
            Role::Hunter => hunters += 1,
            Role::Ghost => ghosts += 1,
          }
          report.added(role);
        }
      }
    }

    if !report.is_noop() {
      info!(
        contest_id = %week.contest_id,
        retracted = report.retracted,
        hunters_added = report.hunters_added,
        ghosts_added = report.ghosts_added,
        "synced contest roles"
      );
    }
    Ok(report)
  }

  /// Insert one fresh assignment. Returns `false` if a concurrent sync
  /// already assigned the user.
  async fn assign(
    &self,
    week: &ContestWeek,
    user_id: Uuid,
    role: Role,
    now: DateTime<Utc>,
  ) -> Result<bool> {
    let inserted = self
      .store
      .insert_assignment(Assignment::new(week.contest_id, user_id, role, now))
      .await
      .map_err(Error::store)?;
    if !inserted {
      warn!(contest_id = %week.contest_id, %user_id, "assignment already exists; skipping");
    }
    Ok(inserted)
  }
}
