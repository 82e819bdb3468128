//! The operation registry: a closed set of binary arithmetic operations.
//!
//! Each [`OperationKind`] resolves to exactly one pure function. Dispatch is an
//! exhaustive `match`, so a well-typed caller can never hit an unknown
//! operation; only the string coercion boundary ([`FromStr`]) can fail.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A pure binary operation over IEEE-754 doubles.
pub type Operation = fn(f64, f64) -> Result<f64>;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The arithmetic operation a calculation applies to its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
  Add,
  Subtract,
  Multiply,
  Divide,
}

impl OperationKind {
  /// Every kind, in declaration order.
  pub const ALL: [Self; 4] =
    [Self::Add, Self::Subtract, Self::Multiply, Self::Divide];

  /// The canonical wire and storage identifier.
  /// Must match the `rename_all = "lowercase"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Add => "add",
      Self::Subtract => "subtract",
      Self::Multiply => "multiply",
      Self::Divide => "divide",
    }
  }

  /// The function that implements this kind.
  pub fn resolve(self) -> Operation {
    match self {
      Self::Add => add,
      Self::Subtract => subtract,
      Self::Multiply => multiply,
      Self::Divide => divide,
    }
  }
}

impl fmt::Display for OperationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OperationKind {
  type Err = Error;

  /// Case-sensitive; anything but the four canonical identifiers is rejected.
  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|kind| kind.as_str() == s)
      .ok_or_else(|| Error::InvalidOperation(s.to_owned()))
  }
}

/// Resolve an untyped identifier, e.g. one read from a request body.
pub fn resolve_identifier(identifier: &str) -> Result<Operation> {
  Ok(identifier.parse::<OperationKind>()?.resolve())
}

// ─── Operations ──────────────────────────────────────────────────────────────

pub fn add(a: f64, b: f64) -> Result<f64> { Ok(a + b) }

pub fn subtract(a: f64, b: f64) -> Result<f64> { Ok(a - b) }

pub fn multiply(a: f64, b: f64) -> Result<f64> { Ok(a * b) }

/// Requests are validated before they get here; the zero check is a backstop.
pub fn divide(a: f64, b: f64) -> Result<f64> {
  if b == 0.0 {
    return Err(Error::DivideByZero);
  }
  Ok(a / b)
}
