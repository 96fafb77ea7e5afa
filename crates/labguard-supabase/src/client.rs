//! The two HTTP tiers and the shared request plumbing.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{Error, Result};

/// Connection settings for a hosted project.
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
  /// Project base URL, e.g. `https://abc.supabase.co`.
  pub url:              String,
  pub anon_key:         String,
  pub service_role_key: String,
}

impl SupabaseConfig {
  fn validate(&self) -> Result<()> {
    for (name, value) in [
      ("url", &self.url),
      ("anon_key", &self.anon_key),
      ("service_role_key", &self.service_role_key),
    ] {
      if value.trim().is_empty() {
        return Err(Error::Config(format!("supabase {name} is required")));
      }
    }
    Ok(())
  }
}

// ─── Tier ────────────────────────────────────────────────────────────────────

/// One authenticated HTTP client: a base URL plus the key it presents.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub(crate) struct Tier {
  client: Client,
  base:   String,
  key:    String,
}

impl Tier {
  fn new(base: &str, key: &str) -> Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self {
      client,
      base: base.trim_end_matches('/').to_owned(),
      key: key.to_owned(),
    })
  }

  /// A request carrying this tier's key as both `apikey` and bearer.
  pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
    self
      .client
      .request(method, format!("{}{path}", self.base))
      .header("apikey", &self.key)
      .bearer_auth(&self.key)
  }

  /// A request presenting the end user's own token; the tier key is sent
  /// only as `apikey`.
  pub(crate) fn request_as(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
    self
      .client
      .request(method, format!("{}{path}", self.base))
      .header("apikey", &self.key)
      .bearer_auth(token)
  }
}

// ─── Backend ─────────────────────────────────────────────────────────────────

/// A hosted registry and identity service.
#[derive(Clone)]
pub struct SupabaseBackend {
  pub(crate) service: Tier,
  pub(crate) anon:    Tier,
  issuer:             String,
}

impl SupabaseBackend {
  pub fn new(config: &SupabaseConfig) -> Result<Self> {
    config.validate()?;
    let url = config.url.trim_end_matches('/');
    Ok(Self {
      service: Tier::new(url, &config.service_role_key)?,
      anon:    Tier::new(url, &config.anon_key)?,
      issuer:  format!("{url}/auth/v1"),
    })
  }

  /// The `iss` claim carried by tokens this project mints.
  pub fn expected_issuer(&self) -> &str { &self.issuer }
}

// ─── Responses ───────────────────────────────────────────────────────────────

/// Error bodies differ between PostgREST (`message`) and GoTrue (`msg`,
/// `error_description`); take whichever is present.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
  message:           Option<String>,
  msg:               Option<String>,
  error_description: Option<String>,
  error:             Option<String>,
}

pub(crate) fn error_message(body: &str) -> Option<String> {
  let parsed: ErrorBody = serde_json::from_str(body).ok()?;
  parsed
    .message
    .or(parsed.msg)
    .or(parsed.error_description)
    .or(parsed.error)
    .filter(|m| !m.is_empty())
}

/// Turn a non-success response into [`Error::Api`].
pub(crate) async fn check(resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  let message = error_message(&body).unwrap_or_else(|| format!("request failed with {status}"));
  Err(Error::Api { status, message })
}

pub(crate) async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
  let resp = check(req.send().await?).await?;
  Ok(resp.json().await?)
}

pub(crate) async fn send_empty(req: RequestBuilder) -> Result<()> {
  check(req.send().await?).await?;
  Ok(())
}
