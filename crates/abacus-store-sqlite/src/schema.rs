//! SQL schema for the Abacus SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! layout so later migrations can be gated on it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

-- a, b, kind and result are only ever written together.
CREATE TABLE IF NOT EXISTS calculations (
    calculation_id TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    a              REAL NOT NULL,
    b              REAL NOT NULL,
    kind           TEXT NOT NULL,   -- 'add' | 'subtract' | 'multiply' | 'divide'
    result         REAL NOT NULL,
    created_at     TEXT NOT NULL,   -- RFC 3339 UTC, fixed nanosecond width
    CHECK (kind IN ('add', 'subtract', 'multiply', 'divide')),
    CHECK (kind != 'divide' OR b != 0)
);

CREATE INDEX IF NOT EXISTS calculations_owner_idx ON calculations(user_id, created_at);

PRAGMA user_version = 1;
";
