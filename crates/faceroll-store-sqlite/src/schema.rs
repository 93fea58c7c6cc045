//! SQL schema for the faceroll SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id   TEXT PRIMARY KEY,
    created_at    TEXT NOT NULL,
    display_name  TEXT NOT NULL,
    email         TEXT,
    phone         TEXT
);

-- One row per enrollment. Vectors are never rewritten; the only UPDATE ever
-- issued clears `active` on the row being replaced.
CREATE TABLE IF NOT EXISTS face_descriptors (
    descriptor_id    TEXT PRIMARY KEY,
    identity_id      TEXT NOT NULL REFERENCES identities(identity_id),
    descriptor_json  TEXT NOT NULL,   -- JSON array of 128 numbers
    reference_image  BLOB NOT NULL,
    image_sha256     TEXT NOT NULL,
    active           INTEGER NOT NULL DEFAULT 1,
    created_at       TEXT NOT NULL
);

-- At most one active descriptor per identity.
CREATE UNIQUE INDEX IF NOT EXISTS face_descriptors_one_active
    ON face_descriptors(identity_id) WHERE active = 1;

CREATE INDEX IF NOT EXISTS face_descriptors_identity_idx
    ON face_descriptors(identity_id);

CREATE TABLE IF NOT EXISTS attendance_events (
    event_id         TEXT PRIMARY KEY,
    identity_id      TEXT REFERENCES identities(identity_id),
    kind             TEXT NOT NULL,   -- 'entry' | 'exit' | 'failed_attempt'
    occurred_at      TEXT NOT NULL,
    reason           TEXT,
    device_code      TEXT NOT NULL,
    snapshot         BLOB NOT NULL,
    snapshot_sha256  TEXT NOT NULL,
    CHECK ((kind = 'failed_attempt') = (identity_id IS NULL))
);

CREATE INDEX IF NOT EXISTS attendance_identity_idx ON attendance_events(identity_id);
CREATE INDEX IF NOT EXISTS attendance_occurred_idx ON attendance_events(occurred_at);

PRAGMA user_version = 1;
";
