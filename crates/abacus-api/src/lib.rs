//! JSON REST API for Abacus.
//!
//! Exposes an axum [`Router`] backed by any
//! [`abacus_core::store::CalculatorStore`]. TLS and request tracing are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = abacus_api::api_router(state).layer(TraceLayer::new_for_http());
//! ```

pub mod auth;
pub mod calculations;
pub mod error;
pub mod users;

use std::sync::Arc;

use abacus_core::store::CalculatorStore;
use axum::{Json, Router, routing::get, routing::post};
use serde_json::{Value, json};

pub use auth::TokenKeys;
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct ApiState<S: CalculatorStore> {
  pub store:  Arc<S>,
  pub tokens: Arc<TokenKeys>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: CalculatorStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route("/", get(root))
    // Users
    .route("/users/register", post(users::register::<S>))
    .route("/users/login", post(users::login::<S>))
    .route("/users/me", get(users::me).delete(users::delete_me::<S>))
    // Calculations
    .route(
      "/calculations",
      get(calculations::list::<S>).post(calculations::create::<S>),
    )
    .route(
      "/calculations/{id}",
      get(calculations::get_one::<S>)
        .put(calculations::update::<S>)
        .delete(calculations::delete_one::<S>),
    )
    .with_state(state)
}

/// `GET /`: liveness check.
async fn root() -> Json<Value> {
  Json(json!({ "message": "Abacus calculator API is running" }))
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use abacus_store_sqlite::SqliteStore;
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use chrono::Duration;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  async fn make_state() -> ApiState<SqliteStore> {
    ApiState {
      store:  Arc::new(SqliteStore::open_in_memory().await.unwrap()),
      tokens: Arc::new(TokenKeys::new(b"test-secret", Duration::minutes(30))),
    }
  }

  async fn send(
    state:  &ApiState<SqliteStore>,
    method: &str,
    uri:    &str,
    token:  Option<&str>,
    body:   Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
      Some(json) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    api_router(state.clone()).oneshot(req).await.unwrap()
  }

  async fn login_raw(state: &ApiState<SqliteStore>, email: &str, password: &str) -> Response {
    let req = Request::builder()
      .method("POST")
      .uri("/users/login")
      .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
      .body(Body::from(format!("username={email}&password={password}")))
      .unwrap();
    api_router(state.clone()).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn register(state: &ApiState<SqliteStore>, name: &str) -> Response {
    send(
      state,
      "POST",
      "/users/register",
      None,
      Some(json!({
        "username": name,
        "email": format!("{name}@example.com"),
        "password": "securepassword",
      })),
    )
    .await
  }

  /// Register `name` and return a bearer token for them.
  async fn signed_in(state: &ApiState<SqliteStore>, name: &str) -> String {
    assert_eq!(register(state, name).await.status(), StatusCode::CREATED);
    let resp = login_raw(state, &format!("{name}@example.com"), "securepassword").await;
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await["access_token"].as_str().unwrap().to_owned()
  }

  // ── Root ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn root_is_public() {
    let state = make_state().await;
    let resp = send(&state, "GET", "/", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(json_body(resp).await["message"].is_string());
  }

  // ── Users ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn register_returns_user_without_password() {
    let state = make_state().await;
    let resp = register(&state, "integration_user").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["email"], "integration_user@example.com");
    assert_eq!(body["username"], "integration_user");
    assert!(body["id"].is_string());
    assert!(body.get("password_hash").is_none());
  }

  #[tokio::test]
  async fn register_duplicate_email_is_400() {
    let state = make_state().await;
    register(&state, "testuser").await;

    let resp = send(
      &state,
      "POST",
      "/users/register",
      None,
      Some(json!({
        "username": "newuser",
        "email": "testuser@example.com",
        "password": "password123",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "Email already registered");
  }

  #[tokio::test]
  async fn register_duplicate_username_is_400() {
    let state = make_state().await;
    register(&state, "testuser").await;

    let resp = send(
      &state,
      "POST",
      "/users/register",
      None,
      Some(json!({
        "username": "testuser",
        "email": "someone-else@example.com",
        "password": "password123",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "Username already taken");
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_duplicate_registration_is_400() {
    let state = make_state().await;

    for round in 0..5 {
      let email = format!("dup{round}@example.com");
      let first = json!({ "username": format!("first{round}"), "email": email, "password": "pw" });
      let second = json!({ "username": format!("second{round}"), "email": email, "password": "pw" });

      let (a, b) = tokio::join!(
        send(&state, "POST", "/users/register", None, Some(first)),
        send(&state, "POST", "/users/register", None, Some(second)),
      );

      let mut statuses = [a.status(), b.status()];
      statuses.sort();
      assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST], "round {round}");

      let loser = if a.status() == StatusCode::BAD_REQUEST { a } else { b };
      assert_eq!(json_body(loser).await["error"], "Email already registered");
    }
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_duplicate_username_is_400() {
    let state = make_state().await;
    let first = json!({ "username": "taken", "email": "one@example.com", "password": "pw" });
    let second = json!({ "username": "taken", "email": "two@example.com", "password": "pw" });

    let (a, b) = tokio::join!(
      send(&state, "POST", "/users/register", None, Some(first)),
      send(&state, "POST", "/users/register", None, Some(second)),
    );

    let mut statuses = [a.status(), b.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);
    let loser = if a.status() == StatusCode::BAD_REQUEST { a } else { b };
    assert_eq!(json_body(loser).await["error"], "Username already taken");
  }

  #[tokio::test]
  async fn register_malformed_email_is_400() {
    let state = make_state().await;
    let resp = send(
      &state,
      "POST",
      "/users/register",
      None,
      Some(json!({ "username": "x", "email": "not-an-email", "password": "pw" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn login_issues_bearer_token() {
    let state = make_state().await;
    register(&state, "alice").await;

    let resp = login_raw(&state, "alice@example.com", "securepassword").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].is_string());
  }

  #[tokio::test]
  async fn login_wrong_password_is_401() {
    let state = make_state().await;
    register(&state, "alice").await;

    let resp = login_raw(&state, "alice@example.com", "wrong").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
    assert_eq!(json_body(resp).await["error"], "Incorrect username or password");
  }

  #[tokio::test]
  async fn login_unknown_user_is_401() {
    let state = make_state().await;
    let resp = login_raw(&state, "ghost@example.com", "whatever").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn me_requires_token() {
    let state = make_state().await;
    let token = signed_in(&state, "alice").await;

    let resp = send(&state, "GET", "/users/me", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(&state, "GET", "/users/me", Some("garbage"), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(&state, "GET", "/users/me", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["username"], "alice");
  }

  #[tokio::test]
  async fn deleting_account_invalidates_token_and_data() {
    let state = make_state().await;
    let token = signed_in(&state, "alice").await;
    send(
      &state,
      "POST",
      "/calculations",
      Some(&token),
      Some(json!({ "a": 1, "b": 2, "type": "add" })),
    )
    .await;

    let resp = send(&state, "DELETE", "/users/me", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&state, "GET", "/calculations", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Calculations ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn calculation_crud_flow() {
    let state = make_state().await;
    let token = signed_in(&state, "alice").await;

    // Create
    let resp = send(
      &state,
      "POST",
      "/calculations",
      Some(&token),
      Some(json!({ "a": 10, "b": 5, "type": "add" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = json_body(resp).await;
    assert_eq!(created["result"], 15.0);
    assert_eq!(created["type"], "add");
    let id = created["id"].as_str().unwrap().to_owned();

    // Read
    let resp = send(&state, "GET", &format!("/calculations/{id}"), Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["id"], id.as_str());

    // Browse
    let resp = send(&state, "GET", "/calculations", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);

    // Edit: add → divide
    let resp = send(
      &state,
      "PUT",
      &format!("/calculations/{id}"),
      Some(&token),
      Some(json!({ "a": 10, "b": 2, "type": "divide" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = json_body(resp).await;
    assert_eq!(updated["result"], 5.0);
    assert_eq!(updated["type"], "divide");
    assert_eq!(updated["created_at"], created["created_at"]);

    // Delete
    let resp = send(&state, "DELETE", &format!("/calculations/{id}"), Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&state, "GET", &format!("/calculations/{id}"), Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["error"], "Calculation not found");
  }

  #[tokio::test]
  async fn create_divide_by_zero_is_422() {
    let state = make_state().await;
    let token = signed_in(&state, "alice").await;

    let resp = send(
      &state,
      "POST",
      "/calculations",
      Some(&token),
      Some(json!({ "a": 10, "b": 0, "type": "divide" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(resp).await["error"], "Cannot divide by zero");

    let resp = send(&state, "GET", "/calculations", Some(&token), None).await;
    assert!(json_body(resp).await.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn create_add_zero_is_allowed() {
    let state = make_state().await;
    let token = signed_in(&state, "alice").await;

    let resp = send(
      &state,
      "POST",
      "/calculations",
      Some(&token),
      Some(json!({ "a": 10, "b": 0, "type": "add" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(json_body(resp).await["result"], 10.0);
  }

  #[tokio::test]
  async fn unknown_operation_is_422() {
    let state = make_state().await;
    let token = signed_in(&state, "alice").await;

    let resp = send(
      &state,
      "POST",
      "/calculations",
      Some(&token),
      Some(json!({ "a": 1, "b": 1, "type": "power" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error = json_body(resp).await["error"].as_str().unwrap().to_owned();
    assert!(error.contains("power"), "{error}");
  }

  #[tokio::test]
  async fn rejected_update_leaves_record_unchanged() {
    let state = make_state().await;
    let token = signed_in(&state, "alice").await;

    let resp = send(
      &state,
      "POST",
      "/calculations",
      Some(&token),
      Some(json!({ "a": 10, "b": 2, "type": "divide" })),
    )
    .await;
    let created = json_body(resp).await;
    let id = created["id"].as_str().unwrap().to_owned();

    let resp = send(
      &state,
      "PUT",
      &format!("/calculations/{id}"),
      Some(&token),
      Some(json!({ "a": 10, "b": 0, "type": "divide" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = send(&state, "GET", &format!("/calculations/{id}"), Some(&token), None).await;
    assert_eq!(json_body(resp).await, created);
  }

  #[tokio::test]
  async fn update_missing_is_404() {
    let state = make_state().await;
    let token = signed_in(&state, "alice").await;
    let resp = send(
      &state,
      "PUT",
      &format!("/calculations/{}", Uuid::new_v4()),
      Some(&token),
      Some(json!({ "a": 1, "b": 1, "type": "add" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn users_cannot_see_each_others_calculations() {
    let state = make_state().await;
    let alice = signed_in(&state, "alice").await;
    let bob = signed_in(&state, "bob").await;

    let resp = send(
      &state,
      "POST",
      "/calculations",
      Some(&alice),
      Some(json!({ "a": 3, "b": 4, "type": "multiply" })),
    )
    .await;
    let id = json_body(resp).await["id"].as_str().unwrap().to_owned();
    let uri = format!("/calculations/{id}");

    let resp = send(&state, "GET", &uri, Some(&bob), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(
      &state,
      "PUT",
      &uri,
      Some(&bob),
      Some(json!({ "a": 0, "b": 0, "type": "add" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&state, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&state, "GET", "/calculations", Some(&bob), None).await;
    assert!(json_body(resp).await.as_array().unwrap().is_empty());

    let resp = send(&state, "GET", &uri, Some(&alice), None).await;
    assert_eq!(json_body(resp).await["result"], 12.0);
  }

  #[tokio::test]
  async fn list_honours_skip_and_limit() {
    let state = make_state().await;
    let token = signed_in(&state, "alice").await;

    for a in 0..4 {
      send(
        &state,
        "POST",
        "/calculations",
        Some(&token),
        Some(json!({ "a": a, "b": 1, "type": "subtract" })),
      )
      .await;
    }

    let resp = send(&state, "GET", "/calculations?skip=1&limit=2", Some(&token), None).await;
    let page = json_body(resp).await;
    let results: Vec<f64> = page
      .as_array()
      .unwrap()
      .iter()
      .map(|r| r["result"].as_f64().unwrap())
      .collect();
    assert_eq!(results, vec![0.0, 1.0]);
  }

  #[tokio::test]
  async fn list_with_oversized_paging_does_not_wrap() {
    let state = make_state().await;
    let token = signed_in(&state, "alice").await;

    for a in 0..3 {
      send(
        &state,
        "POST",
        "/calculations",
        Some(&token),
        Some(json!({ "a": a, "b": 1, "type": "add" })),
      )
      .await;
    }

    let huge = u64::MAX;
    let resp = send(&state, "GET", &format!("/calculations?skip={huge}"), Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(json_body(resp).await.as_array().unwrap().is_empty());

    let resp = send(&state, "GET", &format!("/calculations?limit={huge}"), Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 3);
  }

  #[tokio::test]
  async fn calculations_require_token() {
    let state = make_state().await;
    let resp = send(&state, "GET", "/calculations", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }
}
