//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use ghosthunt_core::{
  Engine, EngineConfig,
  contest::{Assignment, Capture, CaptureRequest, ContestWeek, MovementUpdate, Role},
  engine::LocationOutcome,
  geo::Coordinates,
  notification::{Notification, NotificationKind},
  store::{ContestStore, NotificationSink, UserDirectory},
};
use rand::{SeedableRng, rngs::StdRng};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(hours: i64) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 10, 18, 20, 0, 0).single().expect("valid instant")
    + TimeDelta::hours(hours)
}

fn week(starts_at: DateTime<Utc>, challenge: &str) -> ContestWeek {
  ContestWeek {
    contest_id: Uuid::new_v4(),
    starts_at,
    ends_at: starts_at + TimeDelta::days(7),
    challenge: challenge.into(),
    created_at: starts_at,
  }
}

// ─── Weeks ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_week() {
  let s = store().await;
  let w = week(at(0), "mid-jump");

  let stored = s.create_week(w.clone()).await.unwrap();
  assert_eq!(stored, w);

  let fetched = s.get_week(at(0)).await.unwrap();
  assert_eq!(fetched, Some(w));
}

#[tokio::test]
async fn get_week_missing_returns_none() {
  let s = store().await;
  assert!(s.get_week(at(0)).await.unwrap().is_none());
}

#[tokio::test]
async fn second_week_for_same_start_loses() {
  let s = store().await;
  let first = s.create_week(week(at(0), "first")).await.unwrap();
  let second = s.create_week(week(at(0), "second")).await.unwrap();

  assert_eq!(second, first);
  assert_eq!(second.challenge, "first");
}

// ─── Assignments ─────────────────────────────────────────────────────────────

async fn with_week(s: &SqliteStore) -> ContestWeek {
  s.create_week(week(at(0), "red door")).await.unwrap()
}

#[tokio::test]
async fn insert_and_list_assignments() {
  let s = store().await;
  let w = with_week(&s).await;
  let hunter = Assignment::new(w.contest_id, Uuid::new_v4(), Role::Hunter, at(1));
  let ghost = Assignment::new(w.contest_id, Uuid::new_v4(), Role::Ghost, at(2));

  assert!(s.insert_assignment(hunter.clone()).await.unwrap());
  assert!(s.insert_assignment(ghost.clone()).await.unwrap());

  let rows = s.list_assignments(w.contest_id).await.unwrap();
  assert_eq!(rows, vec![hunter.clone(), ghost]);
  assert_eq!(s.get_assignment(w.contest_id, hunter.user_id).await.unwrap(), Some(hunter));
  assert!(s.list_assignments(Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_assignment_is_rejected() {
  let s = store().await;
  let w = with_week(&s).await;
  let user = Uuid::new_v4();

  assert!(s.insert_assignment(Assignment::new(w.contest_id, user, Role::Hunter, at(1))).await.unwrap());
  assert!(!s.insert_assignment(Assignment::new(w.contest_id, user, Role::Ghost, at(2))).await.unwrap());

  let row = s.get_assignment(w.contest_id, user).await.unwrap().unwrap();
  assert_eq!(row.role, Role::Hunter);
}

#[tokio::test]
async fn delete_assignment_reports_whether_it_existed() {
  let s = store().await;
  let w = with_week(&s).await;
  let user = Uuid::new_v4();
  s.insert_assignment(Assignment::new(w.contest_id, user, Role::Ghost, at(1))).await.unwrap();

  assert!(s.delete_assignment(w.contest_id, user).await.unwrap());
  assert!(!s.delete_assignment(w.contest_id, user).await.unwrap());
  assert!(s.get_assignment(w.contest_id, user).await.unwrap().is_none());
}

#[tokio::test]
async fn movement_update_resets_clock_only_on_a_move() {
  let s = store().await;
  let w = with_week(&s).await;
  let user = Uuid::new_v4();
  s.insert_assignment(Assignment::new(w.contest_id, user, Role::Ghost, at(1))).await.unwrap();
  let spot = Some(Coordinates::new(48.8566, 2.3522));

  assert!(s.flag_camping(w.contest_id, user, at(8)).await.unwrap());
  s.update_movement(w.contest_id, user, MovementUpdate { last_location: spot, moved_at: None })
    .await
    .unwrap();
  let row = s.get_assignment(w.contest_id, user).await.unwrap().unwrap();
  assert_eq!(row.last_location, spot);
  assert_eq!(row.last_move_at, Some(at(1)));
  assert!(row.camping_violation);

  let moved = MovementUpdate { last_location: spot, moved_at: Some(at(9)) };
  s.update_movement(w.contest_id, user, moved).await.unwrap();
  let row = s.get_assignment(w.contest_id, user).await.unwrap().unwrap();
  assert_eq!(row.last_move_at, Some(at(9)));
  assert!(!row.camping_violation);
}

#[tokio::test]
async fn camping_flag_needs_an_idle_ghost_with_the_flag_down() {
  let s = store().await;
  let w = with_week(&s).await;
  let ghost = Uuid::new_v4();
  let hunter = Uuid::new_v4();
  s.insert_assignment(Assignment::new(w.contest_id, ghost, Role::Ghost, at(1))).await.unwrap();
  s.insert_assignment(Assignment::new(w.contest_id, hunter, Role::Hunter, at(1))).await.unwrap();

  assert!(!s.flag_camping(w.contest_id, ghost, at(1)).await.unwrap());
  assert!(!s.flag_camping(w.contest_id, hunter, at(8)).await.unwrap());
  assert!(s.flag_camping(w.contest_id, ghost, at(8)).await.unwrap());
  assert!(!s.flag_camping(w.contest_id, ghost, at(8)).await.unwrap());
}

#[tokio::test]
async fn initial_partition_is_all_or_nothing() {
  let s = store().await;
  let w = with_week(&s).await;
  let rows: Vec<Assignment> = (0..3)
    .map(|i| {
      let role = if i == 0 { Role::Hunter } else { Role::Ghost };
      Assignment::new(w.contest_id, Uuid::new_v4(), role, at(1))
    })
    .collect();

  assert!(s.insert_initial_partition(w.contest_id, rows.clone()).await.unwrap());
  let late = Assignment::new(w.contest_id, Uuid::new_v4(), Role::Hunter, at(2));
  assert!(!s.insert_initial_partition(w.contest_id, vec![late.clone()]).await.unwrap());

  let stored = s.list_assignments(w.contest_id).await.unwrap();
  assert_eq!(stored.len(), 3);
  assert!(s.get_assignment(w.contest_id, late.user_id).await.unwrap().is_none());
}

#[tokio::test]
async fn ghost_can_be_captured_once() {
  let s = store().await;
  let w = with_week(&s).await;
  let ghost = Uuid::new_v4();
  let hunter = Uuid::new_v4();
  s.insert_assignment(Assignment::new(w.contest_id, ghost, Role::Ghost, at(1))).await.unwrap();
  s.insert_assignment(Assignment::new(w.contest_id, hunter, Role::Hunter, at(1))).await.unwrap();

  assert!(!s.mark_captured(w.contest_id, hunter).await.unwrap());
  assert!(s.mark_captured(w.contest_id, ghost).await.unwrap());
  assert!(!s.mark_captured(w.contest_id, ghost).await.unwrap());

  s.increment_captures(w.contest_id, hunter).await.unwrap();
  s.increment_captures(w.contest_id, hunter).await.unwrap();
  let row = s.get_assignment(w.contest_id, hunter).await.unwrap().unwrap();
  assert_eq!(row.captures, 2);
  assert!(!s.get_assignment(w.contest_id, ghost).await.unwrap().unwrap().survived);
}

// ─── Captures ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn captures_are_listed_in_order() {
  let s = store().await;
  let w = with_week(&s).await;
  let capture = |hours| Capture {
    capture_id:       Uuid::new_v4(),
    contest_id:       w.contest_id,
    hunter_id:        Uuid::new_v4(),
    ghost_id:         Uuid::new_v4(),
    evidence_post_id: Uuid::new_v4(),
    challenge:        "red door".into(),
    created_at:       at(hours),
  };
  let late = capture(5);
  let early = capture(2);

  s.record_capture(late.clone()).await.unwrap();
  s.record_capture(early.clone()).await.unwrap();

  assert_eq!(s.list_captures(w.contest_id).await.unwrap(), vec![early, late]);
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_keeps_location_and_opt_out() {
  let s = store().await;
  let id = Uuid::new_v4();

  let user = s.upsert_user(id, "casper".into()).await.unwrap();
  assert!(user.is_eligible());
  assert!(user.location.is_none());

  let here = Coordinates::new(40.7128, -74.0060);
  s.set_location(id, Some(here)).await.unwrap().unwrap();
  s.set_contest_opt_out(id, true).await.unwrap().unwrap();

  let renamed = s.upsert_user(id, "casper2".into()).await.unwrap();
  assert_eq!(renamed.username, "casper2");
  assert_eq!(renamed.location, Some(here));
  assert!(renamed.contest_opt_out);
  assert_eq!(s.list_users().await.unwrap(), vec![renamed]);
}

#[tokio::test]
async fn updates_to_unknown_users_return_none() {
  let s = store().await;
  let id = Uuid::new_v4();
  assert!(s.set_location(id, None).await.unwrap().is_none());
  assert!(s.set_contest_opt_out(id, true).await.unwrap().is_none());
  assert!(s.get_user(id).await.unwrap().is_none());
}

#[tokio::test]
async fn list_users_in_insertion_order() {
  let s = store().await;
  let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
  for (i, id) in ids.iter().enumerate() {
    s.upsert_user(*id, format!("user{i}")).await.unwrap();
  }
  let listed: Vec<Uuid> = s.list_users().await.unwrap().into_iter().map(|u| u.user_id).collect();
  assert_eq!(listed, ids);
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn recent_notification_blocks_the_same_pair_and_kind() {
  let s = store().await;
  let hunter = Uuid::new_v4();
  let ghost_a = Uuid::new_v4();
  let ghost_b = Uuid::new_v4();

  let alert = |sender, hours| {
    Notification::new(hunter, sender, NotificationKind::ContestAlert, "nearby", at(hours))
  };
  assert!(s.notify_unless_recent(alert(ghost_a, 1), at(0)).await.unwrap());
  // A notification created exactly at `since` still counts as recent.
  assert!(!s.notify_unless_recent(alert(ghost_a, 2), at(1)).await.unwrap());
  assert!(s.notify_unless_recent(alert(ghost_b, 2), at(1)).await.unwrap());
  assert!(s.notify_unless_recent(alert(ghost_a, 3), at(2)).await.unwrap());

  let capture = Notification::new(hunter, ghost_a, NotificationKind::ContestCapture, "got", at(3));
  assert!(s.notify_unless_recent(capture, at(2)).await.unwrap());

  let inbox = s.inbox(hunter, 10).await.unwrap();
  assert_eq!(inbox.len(), 4);
  assert_eq!(inbox[0].kind, NotificationKind::ContestCapture);
}

#[tokio::test]
async fn inbox_is_newest_first_and_limited() {
  let s = store().await;
  let me = Uuid::new_v4();
  let other = Uuid::new_v4();
  let post = Uuid::new_v4();

  for hours in [1, 3, 2] {
    s.notify(
      Notification::new(me, other, NotificationKind::ContestCaptured, "caught", at(hours))
        .with_post(post),
    )
    .await
    .unwrap();
  }
  s.notify(Notification::new(other, me, NotificationKind::ContestCapture, "nice", at(4)))
    .await
    .unwrap();

  let inbox = s.inbox(me, 2).await.unwrap();
  assert_eq!(inbox.iter().map(|n| n.created_at).collect::<Vec<_>>(), vec![at(3), at(2)]);
  assert!(inbox.iter().all(|n| n.post_id == Some(post) && n.recipient_id == me));
}

// ─── Engine over SQLite ──────────────────────────────────────────────────────

#[tokio::test]
async fn engine_runs_a_week_against_sqlite() {
  let s = store().await;
  for i in 0..4 {
    s.upsert_user(Uuid::new_v4(), format!("user{i}")).await.unwrap();
  }
  let engine = Engine::new(s, EngineConfig::default()).unwrap();
  let now = at(24);

  let snapshot = engine.snapshot_at(now).await.unwrap();
  assert_eq!(snapshot.week.starts_at, at(0));
  assert_eq!(snapshot.assignments.len(), 4);
  let hunter = snapshot.assignments.iter().find(|a| a.role == Role::Hunter).unwrap().user_id;
  let ghost = snapshot.assignments.iter().find(|a| a.role == Role::Ghost).unwrap().user_id;

  // Resolving again reuses the stored week and assigns nobody new.
  let again = engine.snapshot_at(now + TimeDelta::minutes(1)).await.unwrap();
  assert_eq!(again.week.contest_id, snapshot.week.contest_id);
  assert_eq!(again.assignments, snapshot.assignments);

  let spot = Coordinates::new(51.5074, -0.1278);
  engine.process_location_at(now, ghost, spot).await.unwrap();
  let outcome = engine.process_location_at(now, hunter, spot).await.unwrap();
  assert!(matches!(outcome, LocationOutcome::Hunter { ref alerts } if alerts.len() == 1));

  let capture = engine
    .submit_capture_at(now + TimeDelta::minutes(5), CaptureRequest {
      hunter_id:        hunter,
      ghost_id:         ghost,
      evidence_post_id: Uuid::new_v4(),
      challenge:        snapshot.week.challenge.clone(),
    })
    .await
    .unwrap();

  let board = engine.leaderboard_at(now + TimeDelta::minutes(6)).await.unwrap();
  assert_eq!(board.hunters[0].user_id, hunter);
  assert_eq!(board.hunters[0].captures, 1);
  assert_eq!(engine.captures_at(now).await.unwrap(), vec![capture]);

  let ghost_inbox = engine.store().inbox(ghost, 10).await.unwrap();
  assert_eq!(ghost_inbox[0].kind, NotificationKind::ContestCaptured);
}

// ─── Concurrent writers ──────────────────────────────────────────────────────

fn seeded(store: &SqliteStore, seed: u64) -> Engine<SqliteStore> {
  Engine::with_rng(store.clone(), EngineConfig::default(), StdRng::seed_from_u64(seed)).unwrap()
}

/// `n` users in the directory, plus the week containing `at(24)`.
async fn populated(n: usize) -> (SqliteStore, ContestWeek) {
  let s = store().await;
  for i in 0..n {
    s.upsert_user(Uuid::new_v4(), format!("user{i}")).await.unwrap();
  }
  let w = s.create_week(week(at(0), "red door")).await.unwrap();
  (s, w)
}

/// Sync once and return the `(hunter, ghost)` of a two-user week.
async fn one_on_one(engine: &Engine<SqliteStore>) -> (Uuid, Uuid) {
  let rows = engine.snapshot_at(at(24)).await.unwrap().assignments;
  let find = |role: Role| rows.iter().find(|a| a.role == role).unwrap().user_id;
  (find(Role::Hunter), find(Role::Ghost))
}

#[tokio::test]
async fn concurrent_first_syncs_keep_the_split_balanced() {
  for trial in 0..20 {
    let (s, w) = populated(8).await;
    let a = seeded(&s, 2 * trial);
    let b = seeded(&s, 2 * trial + 1);

    let (ra, rb) = tokio::join!(a.sync_roles_at(&w, at(24)), b.sync_roles_at(&w, at(24)));
    let (ra, rb) = (ra.unwrap(), rb.unwrap());
    assert_eq!(ra.hunters_added + ra.ghosts_added + rb.hunters_added + rb.ghosts_added, 8);

    let rows = s.list_assignments(w.contest_id).await.unwrap();
    let hunters = rows.iter().filter(|r| r.role == Role::Hunter).count();
    assert_eq!(rows.len(), 8);
    assert_eq!(hunters, 4, "trial {trial}: {hunters} hunters out of 8");
  }
}

#[tokio::test]
async fn concurrent_hunter_updates_send_one_alert() {
  for _ in 0..10 {
    let (s, _) = populated(2).await;
    let a = seeded(&s, 1);
    let b = seeded(&s, 2);
    let (hunter, ghost) = one_on_one(&a).await;
    let spot = Coordinates::new(51.5074, -0.1278);
    a.process_location_at(at(24), ghost, spot).await.unwrap();

    let (ra, rb) = tokio::join!(
      a.process_location_at(at(25), hunter, spot),
      b.process_location_at(at(25), hunter, spot),
    );
    let alerted = [ra.unwrap(), rb.unwrap()]
      .into_iter()
      .filter(|o| matches!(o, LocationOutcome::Hunter { alerts } if !alerts.is_empty()))
      .count();
    assert_eq!(alerted, 1);

    let inbox = s.inbox(hunter, 10).await.unwrap();
    let alerts: Vec<_> =
      inbox.iter().filter(|n| n.kind == NotificationKind::ContestAlert).collect();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].sender_id, ghost);
  }
}

#[tokio::test]
async fn concurrent_idle_ghost_updates_warn_once() {
  for _ in 0..10 {
    let (s, _) = populated(2).await;
    let a = seeded(&s, 1);
    let b = seeded(&s, 2);
    let (_, ghost) = one_on_one(&a).await;
    let spot = Coordinates::new(51.5074, -0.1278);
    a.process_location_at(at(24), ghost, spot).await.unwrap();

    let later = at(24) + TimeDelta::hours(7);
    let (ra, rb) = tokio::join!(
      a.process_location_at(later, ghost, spot),
      b.process_location_at(later, ghost, spot),
    );
    let flagged = [ra.unwrap(), rb.unwrap()]
      .into_iter()
      .filter(|o| matches!(o, LocationOutcome::Ghost { camping_flagged: true, .. }))
      .count();
    assert_eq!(flagged, 1);

    let warnings = s
      .inbox(ghost, 10)
      .await
      .unwrap()
      .into_iter()
      .filter(|n| n.kind == NotificationKind::ContestWarning)
      .count();
    assert_eq!(warnings, 1);
  }
}

#[tokio::test]
async fn concurrent_captures_of_one_ghost_have_one_winner() {
  for _ in 0..10 {
    let (s, _) = populated(4).await;
    let a = seeded(&s, 1);
    let b = seeded(&s, 2);
    let snapshot = a.snapshot_at(at(24)).await.unwrap();
    let ids = |role: Role| -> Vec<Uuid> {
      snapshot.assignments.iter().filter(|r| r.role == role).map(|r| r.user_id).collect()
    };
    let (hunters, ghosts) = (ids(Role::Hunter), ids(Role::Ghost));
    let request = |hunter: Uuid| CaptureRequest {
      hunter_id:        hunter,
      ghost_id:         ghosts[0],
      evidence_post_id: Uuid::new_v4(),
      challenge:        snapshot.week.challenge.clone(),
    };

    let (ra, rb) = tokio::join!(
      a.submit_capture_at(at(25), request(hunters[0])),
      b.submit_capture_at(at(25), request(hunters[1])),
    );
    let results = [ra, rb];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let lost = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(lost, ghosthunt_core::Error::NotAnActiveGhost(g) if *g == ghosts[0]));

    assert_eq!(a.captures_at(at(25)).await.unwrap().len(), 1);
    let board = a.leaderboard_at(at(25)).await.unwrap();
    assert_eq!(board.hunters.iter().map(|h| h.captures).sum::<u32>(), 1);
  }
}
