//! Handlers for `/calculations` endpoints. Every route requires a bearer
//! token and only ever sees the caller's own records.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/calculations` | Optional `?skip=&limit=` |
//! | `POST`   | `/calculations` | Body: [`CalculationBody`]; returns 201 + record |
//! | `GET`    | `/calculations/{id}` | 404 if not found |
//! | `PUT`    | `/calculations/{id}` | Body: [`CalculationBody`]; result is recomputed |
//! | `DELETE` | `/calculations/{id}` | 204 on success |

use abacus_core::{
  calculation::{CalculationRecord, CalculationRequest},
  store::{CalculationQuery, CalculatorStore},
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, auth::CurrentUser, error::ApiError};

fn not_found() -> ApiError { ApiError::NotFound("Calculation not found".to_owned()) }

// ─── Body ─────────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /calculations` and `PUT /calculations/{id}`.
///
/// `type` is taken as a plain string so that an unknown operation is reported
/// by the calculator core rather than as a generic deserialisation failure.
#[derive(Debug, Deserialize)]
pub struct CalculationBody {
  pub a:    f64,
  pub b:    f64,
  #[serde(rename = "type")]
  pub kind: String,
}

impl CalculationBody {
  fn into_request(self) -> Result<CalculationRequest, ApiError> {
    Ok(CalculationRequest::parse(self.a, self.b, &self.kind)?)
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub skip:  Option<usize>,
  pub limit: Option<usize>,
}

/// `GET /calculations[?skip=<n>][&limit=<n>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<CalculationRecord>>, ApiError>
where
  S: CalculatorStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let query = CalculationQuery { offset: params.skip, limit: params.limit };
  let records = state
    .store
    .list_calculations(user.user_id, &query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /calculations`. Returns 201 + the stored [`CalculationRecord`].
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  Json(body): Json<CalculationBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CalculatorStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let request = body.into_request()?;
  let record = CalculationRecord::create(&request, user.user_id)?;
  let record = state
    .store
    .record_calculation(record)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /calculations/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<CalculationRecord>, ApiError>
where
  S: CalculatorStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let record = state
    .store
    .get_calculation(user.user_id, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Json(record))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /calculations/{id}`. Replaces `a`, `b` and `type`, recomputing
/// `result`. A rejected body leaves the stored record unchanged.
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<CalculationBody>,
) -> Result<Json<CalculationRecord>, ApiError>
where
  S: CalculatorStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let request = body.into_request()?;

  let existing = state
    .store
    .get_calculation(user.user_id, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;

  let updated = existing.apply_update(&request)?;

  let stored = state
    .store
    .update_calculation(&updated)
    .await
    .map_err(ApiError::store)?;
  if !stored {
    return Err(not_found());
  }
  Ok(Json(updated))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /calculations/{id}`
pub async fn delete_one<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CalculatorStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let deleted = state
    .store
    .delete_calculation(user.user_id, id)
    .await
    .map_err(ApiError::store)?;
  if deleted { Ok(StatusCode::NO_CONTENT) } else { Err(not_found()) }
}
