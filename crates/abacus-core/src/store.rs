//! The `CalculatorStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `abacus-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  calculation::CalculationRecord,
  user::{Conflict, NewUser, User, UserCredentials},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Paging parameters for [`CalculatorStore::list_calculations`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculationQuery {
  /// Number of records to skip. Defaults to 0.
  pub offset: Option<usize>,
  /// Maximum number of records to return. Defaults to
  /// [`CalculationQuery::DEFAULT_LIMIT`].
  pub limit:  Option<usize>,
}

impl CalculationQuery {
  pub const DEFAULT_LIMIT: usize = 100;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an Abacus storage backend.
///
/// Calculation reads and writes are always scoped to an owner: a record that
/// belongs to someone else is indistinguishable from one that does not exist.
/// Records are only ever written whole; the store never recomputes `result`.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CalculatorStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create and persist a new user.
  ///
  /// A taken email or username is not a backend failure: it comes back as
  /// `Ok(Err(conflict))` and nothing is written. Email is checked first.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<Result<User, Conflict>, Self::Error>> + Send + '_;

  /// Retrieve a user by UUID. Returns `None` if not found.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up a user and their password hash by email, for login.
  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<UserCredentials>, Self::Error>> + Send + 'a;

  fn find_user_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Delete a user and, by cascade, all of their calculations.
  /// Returns `false` if the user did not exist.
  fn delete_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Calculations ──────────────────────────────────────────────────────

  /// Persist a record built by
  /// [`CalculationRecord::create`](crate::calculation::CalculationRecord::create).
  fn record_calculation(
    &self,
    record: CalculationRecord,
  ) -> impl Future<Output = Result<CalculationRecord, Self::Error>> + Send + '_;

  fn get_calculation(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CalculationRecord>, Self::Error>> + Send + '_;

  /// List an owner's calculations, oldest first.
  fn list_calculations<'a>(
    &'a self,
    owner: Uuid,
    query: &'a CalculationQuery,
  ) -> impl Future<Output = Result<Vec<CalculationRecord>, Self::Error>> + Send + 'a;

  /// Replace `a`, `b`, `kind` and `result` of the stored record matching
  /// `record.calculation_id` and `record.user_id`, in a single write.
  ///
  /// Returns `false` if no such record exists (e.g. it was deleted after
  /// being read).
  fn update_calculation<'a>(
    &'a self,
    record: &'a CalculationRecord,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Returns `false` if the record did not exist for this owner.
  fn delete_calculation(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
