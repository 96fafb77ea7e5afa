//! HTTP surface for LabGuard.
//!
//! Exposes an axum [`Router`] backed by any [`Registry`] and
//! [`IdentityProvider`] pair. Authorization guards are extractors (see
//! [`auth`]); every handler is generic over the two backends.

pub mod auth;
pub mod certificate;
pub mod error;
pub mod extract;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  http::{HeaderValue, Method, header},
  routing::{get, patch, post},
};
use labguard_core::store::{IdentityProvider, Registry};
use labguard_supabase::SupabaseConfig;
use serde::{Deserialize, Deserializer};
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  trace::TraceLayer,
};

use handlers::{admin, samples, session};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `LABGUARD_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  /// Browser origins allowed by CORS. Accepts a list or a comma-separated
  /// string; empty means the local development defaults.
  #[serde(default = "default_origins", deserialize_with = "origin_list")]
  pub allowed_origins: Vec<String>,
  pub backend:         BackendConfig,
}

/// Which backend serves both the registry and identity.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
  Supabase(SupabaseConfig),
  Sqlite(SqliteConfig),
}

#[derive(Debug, Deserialize, Clone)]
pub struct SqliteConfig {
  pub path:             PathBuf,
  #[serde(default = "default_issuer")]
  pub issuer:           String,
  #[serde(default = "default_session_ttl")]
  pub session_ttl_secs: u64,
}

fn default_host() -> String { "0.0.0.0".into() }

fn default_port() -> u16 { 4000 }

fn default_issuer() -> String { "labguard".into() }

fn default_session_ttl() -> u64 { 3600 }

pub fn default_origins() -> Vec<String> {
  (5173..=5177).map(|port| format!("http://localhost:{port}")).collect()
}

fn origin_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Origins {
    List(Vec<String>),
    Csv(String),
  }

  let raw = match Origins::deserialize(deserializer)? {
    Origins::List(list) => list,
    Origins::Csv(csv) => csv.split(',').map(str::to_owned).collect(),
  };
  let origins: Vec<String> = raw
    .into_iter()
    .map(|o| o.trim().to_owned())
    .filter(|o| !o.is_empty())
    .collect();

  Ok(if origins.is_empty() { default_origins() } else { origins })
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<R, I> {
  pub registry: Arc<R>,
  pub identity: Arc<I>,
  /// The `iss` claim a bearer token must carry before it is looked up.
  pub issuer:   Arc<str>,
}

impl<R, I> AppState<R, I> {
  pub fn new(registry: R, identity: I, issuer: impl Into<Arc<str>>) -> Self {
    Self { registry: Arc::new(registry), identity: Arc::new(identity), issuer: issuer.into() }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the `/api` router.
pub fn router<R, I>(state: AppState<R, I>) -> Router
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  Router::new()
    // Session
    .route("/api/auth/token",          post(session::token::<R, I>))
    .route("/api/me",                  get(session::me::<R, I>))
    // Admin
    .route("/api/admin/users",         get(admin::list_users::<R, I>).post(admin::create_user::<R, I>))
    .route("/api/admin/users/{id}/role", patch(admin::set_user_role::<R, I>))
    .route("/api/admin/roles",         get(admin::list_roles::<R, I>).post(admin::create_role::<R, I>))
    .route("/api/admin/roles/{id}",    patch(admin::update_role::<R, I>).delete(admin::delete_role::<R, I>))
    .route("/api/admin/profiles",      get(admin::profiles::<R, I>))
    // Samples
    .route("/api/samples",             get(samples::list::<R, I>).post(samples::create::<R, I>))
    .route("/api/analysts",            get(samples::analysts::<R, I>))
    .route("/api/samples/{id}/assign",   post(samples::assign::<R, I>))
    .route("/api/samples/{id}/analysis", post(samples::analysis::<R, I>))
    .route("/api/samples/{id}/validate", post(samples::validate::<R, I>))
    .route("/api/samples/{id}/pdf",      get(samples::certificate::<R, I>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// CORS for the configured browser origins. Requests without an `Origin`
/// header are unaffected.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
  let allowed: Vec<HeaderValue> = origins
    .iter()
    .filter_map(|o| match HeaderValue::from_str(o) {
      Ok(v) => Some(v),
      Err(_) => {
        tracing::warn!(origin = %o, "ignoring unparseable CORS origin");
        None
      }
    })
    .collect();

  CorsLayer::new()
    .allow_origin(AllowOrigin::list(allowed))
    .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
