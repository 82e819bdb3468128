//! Calculation requests and records.
//!
//! A [`CalculationRequest`] is the ephemeral `(a, b, kind)` triple a caller
//! proposes. It is validated as a whole and then evaluated through the
//! operation registry. A [`CalculationRecord`] is the persisted result; its
//! `result` is always the value of its own `(a, b, kind)` because the only
//! ways to build or change one go through [`CalculationRecord::create`] and
//! [`CalculationRecord::apply_update`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result, operation::OperationKind};

// ─── Request ─────────────────────────────────────────────────────────────────

/// A proposed calculation. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculationRequest {
  pub a:    f64,
  pub b:    f64,
  pub kind: OperationKind,
}

impl CalculationRequest {
  pub fn new(a: f64, b: f64, kind: OperationKind) -> Self { Self { a, b, kind } }

  /// Coerce a wire identifier and validate the resulting request in one step.
  ///
  /// An unknown identifier yields [`Error::InvalidOperation`], the same
  /// rejection a typed request can never produce, so callers can handle both
  /// uniformly.
  pub fn parse(a: f64, b: f64, identifier: &str) -> Result<Self> {
    let request = Self::new(a, b, identifier.parse()?);
    request.validate()?;
    Ok(request)
  }

  /// Admit or reject the request before any evaluation or persistence.
  ///
  /// `b == 0` is only rejected for [`OperationKind::Divide`]; it is a valid
  /// operand for every other kind. Operands are otherwise unconstrained.
  pub fn validate(&self) -> Result<()> {
    match self.kind {
      OperationKind::Divide if self.b == 0.0 => Err(Error::DivideByZero),
      OperationKind::Add
      | OperationKind::Subtract
      | OperationKind::Multiply
      | OperationKind::Divide => Ok(()),
    }
  }

  /// Apply the registered operation. Assumes [`validate`](Self::validate)
  /// has already passed.
  pub fn evaluate(&self) -> Result<f64> {
    let result = self.kind.resolve()(self.a, self.b)?;
    debug!(a = self.a, b = self.b, kind = %self.kind, result, "evaluated calculation");
    Ok(result)
  }

  fn validate_and_evaluate(&self) -> Result<f64> {
    self.validate()?;
    self.evaluate()
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A stored calculation belonging to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRecord {
  #[serde(rename = "id")]
  pub calculation_id: Uuid,
  pub a:              f64,
  pub b:              f64,
  #[serde(rename = "type")]
  pub kind:           OperationKind,
  pub result:         f64,
  pub user_id:        Uuid,
  pub created_at:     DateTime<Utc>,
}

impl CalculationRecord {
  /// Validate and evaluate `request`, then build a fresh record owned by
  /// `owner`. Nothing is built if the request is rejected.
  pub fn create(request: &CalculationRequest, owner: Uuid) -> Result<Self> {
    let result = request.validate_and_evaluate()?;
    Ok(Self {
      calculation_id: Uuid::new_v4(),
      a: request.a,
      b: request.b,
      kind: request.kind,
      result,
      user_id: owner,
      created_at: Utc::now(),
    })
  }

  /// Return a copy of this record with `a`, `b`, `kind` and `result` replaced
  /// together. Identity, owner and creation time are kept.
  ///
  /// On rejection `self` is left exactly as it was.
  pub fn apply_update(&self, request: &CalculationRequest) -> Result<Self> {
    let result = request.validate_and_evaluate()?;
    Ok(Self {
      a: request.a,
      b: request.b,
      kind: request.kind,
      result,
      ..self.clone()
    })
  }

  /// The operands and kind this record was computed from.
  pub fn request(&self) -> CalculationRequest {
    CalculationRequest::new(self.a, self.b, self.kind)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use OperationKind::*;

  fn req(a: f64, b: f64, kind: OperationKind) -> CalculationRequest {
    CalculationRequest::new(a, b, kind)
  }

  // ── Validation ─────────────────────────────────────────────────────────

  #[test]
  fn divide_rejects_zero_divisor() {
    assert_eq!(req(10.0, 0.0, Divide).validate(), Err(Error::DivideByZero));
    assert_eq!(req(0.0, 0.0, Divide).validate(), Err(Error::DivideByZero));
    assert_eq!(req(1.0, -0.0, Divide).validate(), Err(Error::DivideByZero));
  }

  #[test]
  fn zero_divisor_is_fine_for_other_kinds() {
    for kind in [Add, Subtract, Multiply] {
      assert_eq!(req(10.0, 0.0, kind).validate(), Ok(()), "{kind}");
    }
  }

  #[test]
  fn divide_accepts_nonzero_divisor() {
    assert_eq!(req(10.0, -2.5, Divide).validate(), Ok(()));
  }

  #[test]
  fn validation_is_idempotent() {
    let bad = req(1.0, 0.0, Divide);
    assert_eq!(bad.validate(), bad.validate());
    let good = req(1.0, 0.0, Add);
    assert_eq!(good.validate(), good.validate());
  }

  #[test]
  fn parse_rejects_unknown_identifier() {
    assert_eq!(
      CalculationRequest::parse(1.0, 1.0, "power"),
      Err(Error::InvalidOperation("power".into())),
    );
  }

  #[test]
  fn parse_runs_cross_field_validation() {
    assert_eq!(
      CalculationRequest::parse(10.0, 0.0, "divide"),
      Err(Error::DivideByZero),
    );
    assert_eq!(
      CalculationRequest::parse(10.0, 0.0, "add"),
      Ok(req(10.0, 0.0, Add)),
    );
  }

  // ── Evaluation ─────────────────────────────────────────────────────────

  #[test]
  fn evaluate_add() {
    assert_eq!(req(10.0, 5.0, Add).evaluate(), Ok(15.0));
  }

  #[test]
  fn evaluate_is_deterministic() {
    for kind in OperationKind::ALL {
      let r = req(7.25, -3.5, kind);
      assert_eq!(r.evaluate(), r.evaluate());
    }
  }

  #[test]
  fn evaluate_matches_registry() {
    for kind in OperationKind::ALL {
      let r = req(-4.0, 8.0, kind);
      assert_eq!(r.evaluate(), kind.resolve()(-4.0, 8.0));
    }
  }

  // ── Records ────────────────────────────────────────────────────────────

  #[test]
  fn create_with_zero_addend() {
    let owner = Uuid::new_v4();
    let record = CalculationRecord::create(&req(10.0, 0.0, Add), owner).unwrap();
    assert_eq!(record.result, 10.0);
    assert_eq!(record.user_id, owner);
    assert_eq!(record.kind, Add);
  }

  #[test]
  fn create_propagates_rejection() {
    let err = CalculationRecord::create(&req(10.0, 0.0, Divide), Uuid::new_v4())
      .unwrap_err();
    assert_eq!(err, Error::DivideByZero);
  }

  #[test]
  fn create_assigns_fresh_ids() {
    let owner = Uuid::new_v4();
    let first = CalculationRecord::create(&req(1.0, 2.0, Add), owner).unwrap();
    let second = CalculationRecord::create(&req(1.0, 2.0, Add), owner).unwrap();
    assert_ne!(first.calculation_id, second.calculation_id);
  }

  #[test]
  fn apply_update_recomputes_everything() {
    let existing =
      CalculationRecord::create(&req(10.0, 5.0, Add), Uuid::new_v4()).unwrap();
    assert_eq!(existing.result, 15.0);

    let updated = existing.apply_update(&req(10.0, 2.0, Divide)).unwrap();
    assert_eq!((updated.a, updated.b, updated.kind, updated.result), (10.0, 2.0, Divide, 5.0));
    assert_eq!(updated.calculation_id, existing.calculation_id);
    assert_eq!(updated.user_id, existing.user_id);
    assert_eq!(updated.created_at, existing.created_at);
  }

  #[test]
  fn rejected_update_leaves_record_untouched() {
    let existing =
      CalculationRecord::create(&req(10.0, 2.0, Divide), Uuid::new_v4()).unwrap();
    let before = existing.clone();

    let err = existing.apply_update(&req(10.0, 0.0, Divide)).unwrap_err();
    assert_eq!(err, Error::DivideByZero);
    assert_eq!(existing, before);
    assert_eq!(existing.result, 5.0);
  }

  #[test]
  fn result_never_stale_across_updates() {
    let mut record =
      CalculationRecord::create(&req(3.0, 4.0, Multiply), Uuid::new_v4()).unwrap();
    for next in [req(1.0, 1.0, Subtract), req(9.0, 3.0, Divide), req(-1.0, 0.0, Add)] {
      record = record.apply_update(&next).unwrap();
      assert_eq!(Ok(record.result), record.kind.resolve()(record.a, record.b));
      assert_eq!(record.request(), next);
    }
  }

  #[test]
  fn record_wire_shape() {
    let record =
      CalculationRecord::create(&req(10.0, 5.0, Add), Uuid::new_v4()).unwrap();
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["type"], "add");
    assert_eq!(json["result"], 15.0);
    assert_eq!(json["id"], record.calculation_id.to_string());
    assert_eq!(json["user_id"], record.user_id.to_string());
  }
}
