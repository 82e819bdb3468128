//! [`SqliteStore`], the SQLite implementation of [`CalculatorStore`].

use std::path::Path;

use abacus_core::{
  calculation::CalculationRecord,
  store::{CalculationQuery, CalculatorStore},
  user::{Conflict, NewUser, User, UserCredentials},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    CALCULATION_COLUMNS, RawCalculation, RawUser, USER_COLUMNS, encode_dt,
    encode_kind, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Abacus store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// run one at a time on the connection's thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, e.g. for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch a single user row by an arbitrary unique column.
  async fn user_row(
    &self,
    column: &'static str,
    value: String,
  ) -> Result<Option<RawUser>> {
    let raw = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![value], RawUser::from_row)
            .optional()?,
        )
      })
      .await?;
    Ok(raw)
  }
}

/// Saturate a count into SQLite's signed integer range.
fn to_sql_count(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

// ─── CalculatorStore impl ────────────────────────────────────────────────────

impl CalculatorStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<Result<User, Conflict>> {
    let user = User {
      user_id:    Uuid::new_v4(),
      username:   input.username,
      email:      input.email,
      created_at: Utc::now(),
    };

    let id_str   = encode_uuid(user.user_id);
    let username = user.username.clone();
    let email    = user.email.clone();
    let at_str   = encode_dt(user.created_at);
    let hash     = input.password_hash;

    let taken = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let email_taken = tx
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if email_taken {
          return Ok(Some(Conflict::Email));
        }

        let username_taken = tx
          .query_row(
            "SELECT 1 FROM users WHERE username = ?1",
            rusqlite::params![username],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if username_taken {
          return Ok(Some(Conflict::Username));
        }

        tx.execute(
          "INSERT INTO users (user_id, username, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, username, email, hash, at_str],
        )?;
        tx.commit()?;
        Ok(None)
      })
      .await?;

    Ok(match taken {
      Some(conflict) => Err(conflict),
      None => Ok(user),
    })
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self
      .user_row("user_id", encode_uuid(id))
      .await?
      .map(RawUser::into_user)
      .transpose()
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
    self
      .user_row("email", email.to_owned())
      .await?
      .map(RawUser::into_credentials)
      .transpose()
  }

  async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
    self
      .user_row("username", username.to_owned())
      .await?
      .map(RawUser::into_user)
      .transpose()
  }

  async fn delete_user(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM users WHERE user_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Calculations ──────────────────────────────────────────────────────────

  async fn record_calculation(&self, record: CalculationRecord) -> Result<CalculationRecord> {
    let id_str    = encode_uuid(record.calculation_id);
    let owner_str = encode_uuid(record.user_id);
    let kind_str  = encode_kind(record.kind);
    let at_str    = encode_dt(record.created_at);
    let (a, b, result) = (record.a, record.b, record.result);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO calculations (
             calculation_id, user_id, a, b, kind, result, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, owner_str, a, b, kind_str, result, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn get_calculation(&self, owner: Uuid, id: Uuid) -> Result<Option<CalculationRecord>> {
    let id_str    = encode_uuid(id);
    let owner_str = encode_uuid(owner);

    let raw: Option<RawCalculation> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {CALCULATION_COLUMNS} FROM calculations
           WHERE calculation_id = ?1 AND user_id = ?2"
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str, owner_str], RawCalculation::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCalculation::into_record).transpose()
  }

  async fn list_calculations(
    &self,
    owner: Uuid,
    query: &CalculationQuery,
  ) -> Result<Vec<CalculationRecord>> {
    let owner_str  = encode_uuid(owner);
    // SQLite reads a negative LIMIT as "no limit" and a negative OFFSET as 0.
    let limit_val  = to_sql_count(query.limit.unwrap_or(CalculationQuery::DEFAULT_LIMIT));
    let offset_val = to_sql_count(query.offset.unwrap_or(0));

    let raws: Vec<RawCalculation> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {CALCULATION_COLUMNS} FROM calculations
           WHERE user_id = ?1
           ORDER BY created_at, rowid
           LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![owner_str, limit_val, offset_val],
            RawCalculation::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCalculation::into_record).collect()
  }

  async fn update_calculation(&self, record: &CalculationRecord) -> Result<bool> {
    let id_str    = encode_uuid(record.calculation_id);
    let owner_str = encode_uuid(record.user_id);
    let kind_str  = encode_kind(record.kind);
    let (a, b, result) = (record.a, record.b, record.result);

    // One statement, so readers never observe a partial replacement.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE calculations
           SET a = ?1, b = ?2, kind = ?3, result = ?4
           WHERE calculation_id = ?5 AND user_id = ?6",
          rusqlite::params![a, b, kind_str, result, id_str, owner_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn delete_calculation(&self, owner: Uuid, id: Uuid) -> Result<bool> {
    let id_str    = encode_uuid(id);
    let owner_str = encode_uuid(owner);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM calculations WHERE calculation_id = ?1 AND user_id = ?2",
          rusqlite::params![id_str, owner_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }
}
