//! Error types for `abacus-core`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// The identifier does not name any [`OperationKind`](crate::operation::OperationKind).
  #[error("invalid operation type: {0:?}")]
  InvalidOperation(String),

  #[error("Cannot divide by zero")]
  DivideByZero,

  #[error("invalid email address: {0:?}")]
  InvalidEmail(String),

  #[error("{0} must not be empty")]
  EmptyField(&'static str),

  #[error("Email already registered")]
  EmailTaken,

  #[error("Username already taken")]
  UsernameTaken,
}

impl Error {
  /// True for rejections of a calculation request, as opposed to malformed
  /// account fields.
  pub fn is_calculation_rejection(&self) -> bool {
    matches!(self, Self::InvalidOperation(_) | Self::DivideByZero)
  }
}

impl From<crate::user::Conflict> for Error {
  fn from(conflict: crate::user::Conflict) -> Self {
    match conflict {
      crate::user::Conflict::Email => Self::EmailTaken,
      crate::user::Conflict::Username => Self::UsernameTaken,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
