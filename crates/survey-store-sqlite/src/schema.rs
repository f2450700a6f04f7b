//! SQL schema for the survey SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA busy_timeout = 5000;
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS cases (
    case_id      TEXT PRIMARY KEY,
    case_number  TEXT NOT NULL,
    case_name    TEXT,
    case_date    TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

-- Categorical survey fields are free text; *_other holds the typed detail.
-- last_sequence is the highest photo sequence ever handed out here, so a
-- number freed by a delete is never reissued.
CREATE TABLE IF NOT EXISTS addresses (
    address_id       TEXT PRIMARY KEY,
    case_id          TEXT NOT NULL REFERENCES cases(case_id) ON DELETE CASCADE,
    address          TEXT NOT NULL,
    structure        TEXT,
    structure_other  TEXT,
    usage            TEXT,
    usage_other      TEXT,
    wall             TEXT,
    wall_other       TEXT,
    ceiling          TEXT,
    ceiling_other    TEXT,
    floor            TEXT,
    floor_other      TEXT,
    survey_status    TEXT,
    last_sequence    INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS photos (
    photo_id          TEXT PRIMARY KEY,
    address_id        TEXT NOT NULL REFERENCES addresses(address_id) ON DELETE CASCADE,
    sequence          INTEGER NOT NULL CHECK (sequence >= 1),
    original_path     TEXT NOT NULL,
    watermarked_path  TEXT NOT NULL,
    thumbnail_path    TEXT,
    position          TEXT NOT NULL DEFAULT '牆',
    material          TEXT NOT NULL DEFAULT 'P',
    crack_width       TEXT NOT NULL DEFAULT '',
    crack_shape       TEXT NOT NULL DEFAULT '',
    crack_count       TEXT NOT NULL DEFAULT '',
    peeling           INTEGER NOT NULL DEFAULT 0,
    seepage           INTEGER NOT NULL DEFAULT 0,
    remark            TEXT NOT NULL DEFAULT '',
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    UNIQUE (address_id, sequence)
);

CREATE INDEX IF NOT EXISTS addresses_case_idx  ON addresses(case_id);
CREATE INDEX IF NOT EXISTS photos_address_idx  ON photos(address_id);

PRAGMA user_version = 1;
";
