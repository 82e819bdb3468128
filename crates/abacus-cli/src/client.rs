//! Async HTTP client wrapping the Abacus JSON API.

use std::time::Duration;

use abacus_core::{
  calculation::{CalculationRecord, CalculationRequest},
  user::User,
};
use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use uuid::Uuid;

/// Connection settings for the Abacus API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  /// Bearer token from `abacus login`; required for everything but
  /// `register` and `login`.
  pub token:    Option<String>,
}

/// Async HTTP client for the Abacus JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

#[derive(Deserialize)]
struct TokenResponse {
  access_token: String,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> Result<RequestBuilder> {
    let token = self
      .config
      .token
      .as_deref()
      .ok_or_else(|| anyhow!("no token; run `abacus login` and pass --token"))?;
    Ok(req.bearer_auth(token))
  }

  /// Send `req`, turning non-2xx responses into errors carrying the server's
  /// `{"error": ...}` message.
  async fn send(&self, what: &str, req: RequestBuilder) -> Result<Response> {
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
      .unwrap_or_default();
    Err(anyhow!("{what} → {status}: {message}"))
  }

  async fn json<T: DeserializeOwned>(&self, what: &str, req: RequestBuilder) -> Result<T> {
    self
      .send(what, req)
      .await?
      .json()
      .await
      .with_context(|| format!("deserialising response to {what}"))
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  /// `POST /users/register`
  pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
    let req = self
      .client
      .post(self.url("/users/register"))
      .json(&json!({ "username": username, "email": email, "password": password }));
    self.json("POST /users/register", req).await
  }

  /// `POST /users/login`. Returns the bearer token.
  pub async fn login(&self, email: &str, password: &str) -> Result<String> {
    let req = self
      .client
      .post(self.url("/users/login"))
      .form(&[("username", email), ("password", password)]);
    let token: TokenResponse = self.json("POST /users/login", req).await?;
    Ok(token.access_token)
  }

  /// `GET /users/me`
  pub async fn me(&self) -> Result<User> {
    let req = self.auth(self.client.get(self.url("/users/me")))?;
    self.json("GET /users/me", req).await
  }

  // ── Calculations ──────────────────────────────────────────────────────────

  /// `GET /calculations[?skip=..&limit=..]`
  pub async fn list(&self, skip: Option<usize>, limit: Option<usize>) -> Result<Vec<CalculationRecord>> {
    let mut query = Vec::new();
    if let Some(s) = skip {
      query.push(("skip", s));
    }
    if let Some(l) = limit {
      query.push(("limit", l));
    }
    let req = self.auth(self.client.get(self.url("/calculations")))?.query(&query);
    self.json("GET /calculations", req).await
  }

  /// `POST /calculations`
  pub async fn create(&self, request: &CalculationRequest) -> Result<CalculationRecord> {
    let req = self
      .auth(self.client.post(self.url("/calculations")))?
      .json(&body(request));
    self.json("POST /calculations", req).await
  }

  /// `GET /calculations/{id}`
  pub async fn get(&self, id: Uuid) -> Result<CalculationRecord> {
    let req = self.auth(self.client.get(self.url(&format!("/calculations/{id}"))))?;
    self.json("GET /calculations/{id}", req).await
  }

  /// `PUT /calculations/{id}`
  pub async fn update(&self, id: Uuid, request: &CalculationRequest) -> Result<CalculationRecord> {
    let req = self
      .auth(self.client.put(self.url(&format!("/calculations/{id}"))))?
      .json(&body(request));
    self.json("PUT /calculations/{id}", req).await
  }

  /// `DELETE /calculations/{id}`
  pub async fn delete(&self, id: Uuid) -> Result<()> {
    let req = self.auth(self.client.delete(self.url(&format!("/calculations/{id}"))))?;
    self.send("DELETE /calculations/{id}", req).await?;
    Ok(())
  }
}

fn body(request: &CalculationRequest) -> serde_json::Value {
  json!({ "a": request.a, "b": request.b, "type": request.kind })
}
