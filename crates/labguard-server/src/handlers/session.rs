//! Sign-in and current-user endpoints.

use axum::extract::State;
use labguard_core::store::{IdentityProvider, Registry};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::Authenticated,
  error::ApiError,
  extract::Json,
};

#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
  pub email:    Option<String>,
  pub password: Option<String>,
}

/// `POST /api/auth/token`: exchange email and password for a bearer token.
pub async fn token<R, I>(
  State(state): State<AppState<R, I>>,
  Json(body): Json<TokenRequest>,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let email = body.email.as_deref().map(str::trim).unwrap_or_default();
  let password = body.password.as_deref().unwrap_or_default();
  if email.is_empty() || password.is_empty() {
    return Err(ApiError::InvalidInput("Missing email or password.".into()));
  }

  let session = state
    .identity
    .sign_in(email, password)
    .await
    .map_err(|e| {
      tracing::warn!(error = %e, "sign-in failed");
      ApiError::upstream(e)
    })?
    .ok_or(ApiError::Unauthenticated { message: "Invalid credentials.", detail: None })?;

  tracing::info!(user = %session.user_id, "signed in");
  Ok(Json(json!({ "data": session })))
}

/// `GET /api/me`
pub async fn me<R, I>(
  State(state): State<AppState<R, I>>,
  caller: Authenticated,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let profile = match state.registry.get_profile(caller.id()).await {
    Ok(profile) => profile,
    Err(e) => {
      tracing::warn!(account = %caller.id(), error = %e, "profile lookup failed");
      None
    }
  };
  let role = profile.as_ref().and_then(|p| p.role_kind());

  let account = &caller.account;
  Ok(Json(json!({
    "data": {
      "id":        account.id,
      "email":     account.email.clone().or_else(|| profile.as_ref().and_then(|p| p.email.clone())),
      "full_name": account.full_name.clone().or_else(|| profile.as_ref().and_then(|p| p.full_name.clone())),
      "role_slug": profile.as_ref().and_then(|p| p.role_slug.clone()),
      "role":      role.as_ref().map(|r| r.as_str()),
    }
  })))
}
