//! User accounts, the owners of calculation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A registered account. Never carries credential material, so it is safe to
/// return from the API as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  #[serde(rename = "id")]
  pub user_id:    Uuid,
  pub username:   String,
  pub email:      String,
  pub created_at: DateTime<Utc>,
}

/// A user together with the stored password hash, used only during login.
#[derive(Debug, Clone)]
pub struct UserCredentials {
  pub user:          User,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Input to [`crate::store::CalculatorStore::add_user`].
/// `user_id` and `created_at` are set by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
}

/// A unique account field that already belongs to someone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
  Email,
  Username,
}

/// Check the account fields a client supplies at registration.
///
/// The email check is structural only: one `@` with a non-empty local part
/// and a dotted domain.
pub fn validate_registration(username: &str, email: &str, password: &str) -> Result<()> {
  if username.trim().is_empty() {
    return Err(Error::EmptyField("username"));
  }
  if password.is_empty() {
    return Err(Error::EmptyField("password"));
  }
  validate_email(email)
}

fn validate_email(email: &str) -> Result<()> {
  let invalid = || Error::InvalidEmail(email.to_owned());
  let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
  let well_formed = !local.is_empty()
    && !domain.contains('@')
    && !email.chars().any(char::is_whitespace)
    && domain
      .split_once('.')
      .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'));
  if well_formed { Ok(()) } else { Err(invalid()) }
}
