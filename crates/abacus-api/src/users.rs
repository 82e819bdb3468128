//! Handlers for `/users` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/users/register` | Body: `{"username","email","password"}`; returns 201 + user |
//! | `POST`   | `/users/login` | Form: `username` (the email) + `password`; returns a bearer token |
//! | `GET`    | `/users/me` | The authenticated user |
//! | `DELETE` | `/users/me` | Deletes the account and all of its calculations |

use abacus_core::{
  store::CalculatorStore,
  user::{Conflict, NewUser, User, validate_registration},
};
use axum::{
  Form, Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
  ApiState,
  auth::{CurrentUser, hash_password, verify_password},
  error::ApiError,
};

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub username: String,
  pub email:    String,
  pub password: String,
}

/// `POST /users/register`
pub async fn register<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CalculatorStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  validate_registration(&body.username, &body.email, &body.password)?;

  if state
    .store
    .find_user_by_email(&body.email)
    .await
    .map_err(ApiError::store)?
    .is_some()
  {
    return Err(abacus_core::Error::from(Conflict::Email).into());
  }
  if state
    .store
    .find_user_by_username(&body.username)
    .await
    .map_err(ApiError::store)?
    .is_some()
  {
    return Err(abacus_core::Error::from(Conflict::Username).into());
  }

  let user = state
    .store
    .add_user(NewUser {
      password_hash: hash_password(&body.password)?,
      username:      body.username,
      email:         body.email,
    })
    .await
    .map_err(ApiError::store)?
    // A concurrent registration can claim the email or username between the
    // checks above and the insert.
    .map_err(abacus_core::Error::from)?;

  info!(user_id = %user.user_id, "registered user");
  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Login ────────────────────────────────────────────────────────────────────

/// OAuth2 password-grant style form. `username` carries the email address.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
  pub access_token: String,
  pub token_type:   String,
}

/// `POST /users/login`
pub async fn login<S>(
  State(state): State<ApiState<S>>,
  Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError>
where
  S: CalculatorStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let creds = state
    .store
    .find_user_by_email(&form.username)
    .await
    .map_err(ApiError::store)?
    .filter(|c| verify_password(&form.password, &c.password_hash));

  let Some(creds) = creds else {
    warn!(email = %form.username, "rejected login");
    return Err(ApiError::Unauthorized(
      "Incorrect username or password".to_owned(),
    ));
  };

  Ok(Json(TokenResponse {
    access_token: state.tokens.issue(&creds.user)?,
    token_type:   "bearer".to_owned(),
  }))
}

// ─── Me ───────────────────────────────────────────────────────────────────────

/// `GET /users/me`
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> { Json(user) }

/// `DELETE /users/me`
pub async fn delete_me<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError>
where
  S: CalculatorStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let deleted = state
    .store
    .delete_user(user.user_id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("user {} not found", user.user_id)));
  }
  info!(user_id = %user.user_id, "deleted user");
  Ok(StatusCode::NO_CONTENT)
}
