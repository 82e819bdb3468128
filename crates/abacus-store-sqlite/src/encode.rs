//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed nine-digit fraction
//! so they sort lexicographically. Operation kinds use their canonical
//! identifiers. UUIDs are stored as hyphenated lowercase strings.

use abacus_core::{
  calculation::CalculationRecord,
  operation::OperationKind,
  user::{User, UserCredentials},
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── OperationKind ────────────────────────────────────────────────────────────

pub fn encode_kind(kind: OperationKind) -> &'static str { kind.as_str() }

pub fn decode_kind(s: &str) -> Result<OperationKind> { Ok(s.parse()?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawCalculation`].
pub const CALCULATION_COLUMNS: &str =
  "calculation_id, user_id, a, b, kind, result, created_at";

/// Raw values read directly from a `calculations` row.
pub struct RawCalculation {
  pub calculation_id: String,
  pub user_id:        String,
  pub a:              f64,
  pub b:              f64,
  pub kind:           String,
  pub result:         f64,
  pub created_at:     String,
}

impl RawCalculation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      calculation_id: row.get(0)?,
      user_id:        row.get(1)?,
      a:              row.get(2)?,
      b:              row.get(3)?,
      kind:           row.get(4)?,
      result:         row.get(5)?,
      created_at:     row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<CalculationRecord> {
    Ok(CalculationRecord {
      calculation_id: decode_uuid(&self.calculation_id)?,
      a:              self.a,
      b:              self.b,
      kind:           decode_kind(&self.kind)?,
      result:         self.result,
      user_id:        decode_uuid(&self.user_id)?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching the field order of [`RawUser`].
pub const USER_COLUMNS: &str =
  "user_id, username, email, created_at, password_hash";

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub username:      String,
  pub email:         String,
  pub created_at:    String,
  pub password_hash: String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      username:      row.get(1)?,
      email:         row.get(2)?,
      created_at:    row.get(3)?,
      password_hash: row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      username:   self.username,
      email:      self.email,
      created_at: decode_dt(&self.created_at)?,
    })
  }

  pub fn into_credentials(mut self) -> Result<UserCredentials> {
    let password_hash = std::mem::take(&mut self.password_hash);
    Ok(UserCredentials { user: self.into_user()?, password_hash })
  }
}
