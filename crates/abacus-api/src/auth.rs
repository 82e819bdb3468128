//! Password hashing, bearer-token issuance, and the [`CurrentUser`] extractor.

use abacus_core::{store::CalculatorStore, user::User};
use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` with argon2id and a fresh random salt, returning the PHC
/// string to store.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

/// Check `password` against a stored PHC string. A malformed hash never
/// verifies.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
  PasswordHash::new(password_hash).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// JWT claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  /// The user's UUID.
  pub sub:   String,
  pub email: String,
  pub iat:   i64,
  pub exp:   i64,
}

/// HS256 signing and verification keys plus the token lifetime.
pub struct TokenKeys {
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl:      Duration,
}

impl TokenKeys {
  pub fn new(secret: &[u8], ttl: Duration) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      ttl,
    }
  }

  /// Sign an access token for `user`.
  pub fn issue(&self, user: &User) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
      sub:   user.user_id.to_string(),
      email: user.email.clone(),
      iat:   now.timestamp(),
      exp:   (now + self.ttl).timestamp(),
    };
    self.sign(&claims)
  }

  fn sign(&self, claims: &Claims) -> Result<String, ApiError> {
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
      .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
  }

  /// Verify signature and expiry and return the user id the token names.
  pub fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
    let data = jsonwebtoken::decode::<Claims>(
      token,
      &self.decoding,
      &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| invalid_credentials())?;
    Uuid::parse_str(&data.claims.sub).map_err(|_| invalid_credentials())
  }
}

fn invalid_credentials() -> ApiError {
  ApiError::Unauthorized("Could not validate credentials".to_owned())
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_owned()))
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated caller. Present in a handler means the bearer token was
/// valid and its user still exists.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<ApiState<S>> for CurrentUser
where
  S: CalculatorStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    let user_id = state.tokens.verify(bearer_token(&parts.headers)?)?;
    let user = state
      .store
      .get_user(user_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(invalid_credentials)?;
    Ok(CurrentUser(user))
  }
}
