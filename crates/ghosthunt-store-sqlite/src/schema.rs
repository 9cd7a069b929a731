//! SQL schema for the Ghosthunt SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Mirror of the external user directory.
CREATE TABLE IF NOT EXISTS users (
    user_id         TEXT PRIMARY KEY,
    username        TEXT NOT NULL,
    lat             REAL,
    lng             REAL,
    contest_opt_out INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

-- One row per weekly window; never updated or deleted.
CREATE TABLE IF NOT EXISTS contest_weeks (
    contest_id TEXT PRIMARY KEY,
    starts_at  TEXT NOT NULL UNIQUE,   -- fixed-width RFC 3339 UTC
    ends_at    TEXT NOT NULL,
    challenge  TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contest_assignments (
    contest_id        TEXT NOT NULL REFERENCES contest_weeks(contest_id),
    user_id           TEXT NOT NULL,
    role              TEXT NOT NULL,   -- 'hunter' | 'ghost'
    captures          INTEGER NOT NULL DEFAULT 0,
    survived          INTEGER NOT NULL DEFAULT 1,
    camping_violation INTEGER NOT NULL DEFAULT 0,
    last_lat          REAL,
    last_lng          REAL,
    last_move_at      TEXT,
    assigned_at       TEXT NOT NULL,
    PRIMARY KEY (contest_id, user_id),
    CHECK (role IN ('hunter', 'ghost'))
);

-- Captures are strictly append-only.
CREATE TABLE IF NOT EXISTS contest_captures (
    capture_id       TEXT PRIMARY KEY,
    contest_id       TEXT NOT NULL REFERENCES contest_weeks(contest_id),
    hunter_id        TEXT NOT NULL,
    ghost_id         TEXT NOT NULL,
    evidence_post_id TEXT NOT NULL,
    challenge        TEXT NOT NULL,
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    recipient_id    TEXT NOT NULL,
    sender_id       TEXT NOT NULL,
    post_id         TEXT,
    kind            TEXT NOT NULL,
    message         TEXT,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS captures_contest_idx     ON contest_captures(contest_id);
CREATE INDEX IF NOT EXISTS notifications_inbox_idx  ON notifications(recipient_id, created_at);
CREATE INDEX IF NOT EXISTS notifications_pair_idx   ON notifications(recipient_id, sender_id, kind, created_at);

PRAGMA user_version = 1;
";
