//! SQL schema for the Aula SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS sessions (
    session_id      TEXT PRIMARY KEY,
    group_id        TEXT NOT NULL,
    teacher_id      TEXT NOT NULL,
    classroom_id    TEXT NOT NULL,
    device_id       TEXT,
    scheduled_start TEXT NOT NULL,   -- ISO 8601 UTC
    scheduled_end   TEXT NOT NULL,
    actual_start    TEXT,
    actual_end      TEXT,
    status          TEXT NOT NULL,   -- 'pending'|'in_progress'|'finished'|'closed'|'cancelled'
    created_by      TEXT NOT NULL,
    updated_by      TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- At most one in-progress session per teacher, enforced by the database
-- rather than a check-then-insert at the application layer.
CREATE UNIQUE INDEX IF NOT EXISTS sessions_active_teacher_idx
    ON sessions(teacher_id) WHERE status = 'in_progress';

-- Snapshots are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS snapshots (
    snapshot_id      TEXT PRIMARY KEY,
    session_id       TEXT NOT NULL REFERENCES sessions(session_id),
    device_id        TEXT NOT NULL,
    captured_at      TEXT NOT NULL,
    detected_persons INTEGER NOT NULL,
    occupancy_rate   REAL NOT NULL,
    confidence       REAL NOT NULL,
    detections       TEXT NOT NULL DEFAULT '[]',  -- JSON array of detections
    recorded_at      TEXT NOT NULL                -- server-assigned
);

CREATE TABLE IF NOT EXISTS attendance_records (
    record_id         TEXT PRIMARY KEY,
    session_id        TEXT NOT NULL REFERENCES sessions(session_id),
    student_id        TEXT NOT NULL,
    status            TEXT NOT NULL,   -- 'present'|'late'|'absent'|'excused'
    arrival_time      TEXT,
    permanence        REAL NOT NULL DEFAULT 0,
    origin            TEXT NOT NULL,   -- 'ai'|'manual'|'mixed'
    manual_correction INTEGER NOT NULL DEFAULT 0,
    source            TEXT NOT NULL,   -- 'nfc'|'camera_detection'|'manual'
    confidence        REAL,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    UNIQUE (session_id, student_id)
);

-- Read-only roster mirror; enrollment administration lives in the external
-- catalog system.
CREATE TABLE IF NOT EXISTS enrollments (
    group_id   TEXT NOT NULL,
    student_id TEXT NOT NULL,
    PRIMARY KEY (group_id, student_id)
);

CREATE INDEX IF NOT EXISTS sessions_teacher_idx  ON sessions(teacher_id);
CREATE INDEX IF NOT EXISTS sessions_group_idx    ON sessions(group_id);
CREATE INDEX IF NOT EXISTS snapshots_session_idx ON snapshots(session_id, captured_at);
CREATE INDEX IF NOT EXISTS records_session_idx   ON attendance_records(session_id);

PRAGMA user_version = 1;
";
