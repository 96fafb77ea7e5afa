//! Admin-only handlers: accounts, role assignment and role CRUD.

use axum::extract::{Query, State};
use labguard_core::{
  account::NewAccount,
  role::{NewProfile, NewRole, Role, RolePatch},
  store::{IdentityProvider, Registry},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  AppState,
  auth::AdminOnly,
  error::ApiError,
  extract::{Json, Path},
};

fn invalid_role() -> ApiError { ApiError::InvalidInput("Invalid role_id.".into()) }

fn non_blank(value: Option<&str>) -> Option<&str> {
  value.map(str::trim).filter(|s| !s.is_empty())
}

/// Resolve a role by id, or by slug when no id was sent.
async fn lookup_role<R>(
  registry: &R,
  role_id: Option<&str>,
  slug: Option<&str>,
) -> Result<Role, ApiError>
where
  R: Registry,
{
  let found = match (non_blank(role_id), non_blank(slug)) {
    (Some(raw), _) => {
      let id = Uuid::parse_str(raw).map_err(|_| invalid_role())?;
      registry.get_role(id).await
    }
    (None, Some(slug)) => registry.get_role_by_slug(slug).await,
    (None, None) => return Err(ApiError::InvalidInput("Missing role_id.".into())),
  };
  found.map_err(ApiError::upstream)?.ok_or_else(invalid_role)
}

// ─── Users ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserBody {
  pub email:     Option<String>,
  pub password:  Option<String>,
  pub full_name: Option<String>,
  pub role_id:   Option<String>,
  pub role:      Option<String>,
}

/// `POST /api/admin/users`
pub async fn create_user<R, I>(
  State(state): State<AppState<R, I>>,
  admin: AdminOnly,
  Json(body): Json<CreateUserBody>,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let (Some(email), Some(password), Some(full_name)) = (
    non_blank(body.email.as_deref()),
    body.password.as_deref().filter(|p| !p.is_empty()),
    non_blank(body.full_name.as_deref()),
  ) else {
    return Err(ApiError::InvalidInput("Missing fields.".into()));
  };

  let role = lookup_role(state.registry.as_ref(), body.role_id.as_deref(), body.role.as_deref()).await?;

  let account = state
    .identity
    .create_account(NewAccount {
      email:     email.to_owned(),
      password:  password.to_owned(),
      full_name: full_name.to_owned(),
    })
    .await
    .map_err(|e| {
      tracing::warn!(email, error = %e, "create account failed");
      ApiError::upstream(e)
    })?;

  state
    .registry
    .upsert_profile(NewProfile {
      id:        account.id,
      full_name: full_name.to_owned(),
      email:     Some(email.to_owned()),
      role,
      active:    true,
    })
    .await
    .map_err(|e| {
      tracing::error!(user = %account.id, error = %e, "profile upsert failed after account creation");
      ApiError::upstream(e)
    })?;

  tracing::info!(admin = %admin.id(), user = %account.id, "user created");
  Ok(Json(json!({ "ok": true, "user_id": account.id })))
}

/// `GET /api/admin/users`
pub async fn list_users<R, I>(
  State(state): State<AppState<R, I>>,
  _admin: AdminOnly,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let profiles = state.registry.list_profiles().await.map_err(ApiError::upstream)?;
  Ok(Json(json!({ "data": profiles })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleAssignment {
  pub role_id: Option<String>,
}

/// `PATCH /api/admin/users/:id/role`
pub async fn set_user_role<R, I>(
  State(state): State<AppState<R, I>>,
  admin: AdminOnly,
  Path(id): Path<Uuid>,
  Json(body): Json<RoleAssignment>,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  if non_blank(body.role_id.as_deref()).is_none() {
    return Err(ApiError::InvalidInput("Missing role_id.".into()));
  }
  let role = lookup_role(state.registry.as_ref(), body.role_id.as_deref(), None).await?;

  let updated = state
    .registry
    .set_profile_role(id, &role)
    .await
    .map_err(ApiError::upstream)?;
  if !updated {
    return Err(ApiError::NotFound("Profile not found.".into()));
  }

  tracing::info!(admin = %admin.id(), user = %id, role = %role.slug, "role reassigned");
  Ok(Json(json!({ "ok": true })))
}

// ─── Roles ────────────────────────────────────────────────────────────────────

/// `GET /api/admin/roles`
pub async fn list_roles<R, I>(
  State(state): State<AppState<R, I>>,
  _admin: AdminOnly,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let roles = state.registry.list_roles().await.map_err(ApiError::upstream)?;
  Ok(Json(json!({ "data": roles })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleBody {
  pub name:        Option<String>,
  pub description: Option<String>,
  pub slug:        Option<String>,
}

/// `POST /api/admin/roles`
pub async fn create_role<R, I>(
  State(state): State<AppState<R, I>>,
  _admin: AdminOnly,
  Json(body): Json<RoleBody>,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let input = NewRole::from_input(
    body.name.as_deref(),
    body.description.as_deref(),
    body.slug.as_deref(),
  )?;

  let existing = state
    .registry
    .get_role_by_slug(&input.slug)
    .await
    .map_err(ApiError::upstream)?;
  if existing.is_some() {
    return Err(ApiError::InvalidInput("Role slug already exists.".into()));
  }

  let role = state.registry.create_role(input).await.map_err(ApiError::upstream)?;
  Ok(Json(json!({ "data": role })))
}

/// `PATCH /api/admin/roles/:id`. Name and description only.
pub async fn update_role<R, I>(
  State(state): State<AppState<R, I>>,
  _admin: AdminOnly,
  Path(id): Path<Uuid>,
  Json(body): Json<RoleBody>,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let patch = RolePatch::from_input(body.name.as_deref(), body.description.as_deref())?;
  let role = state
    .registry
    .update_role(id, patch)
    .await
    .map_err(ApiError::upstream)?
    .ok_or_else(|| ApiError::NotFound("Role not found.".into()))?;
  Ok(Json(json!({ "data": role })))
}

/// `DELETE /api/admin/roles/:id`, refused while any profile holds the role.
pub async fn delete_role<R, I>(
  State(state): State<AppState<R, I>>,
  _admin: AdminOnly,
  Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let in_use = state.registry.role_in_use(id).await.map_err(ApiError::upstream)?;
  if in_use {
    return Err(ApiError::InvalidInput("Role is assigned to users.".into()));
  }
  state.registry.delete_role(id).await.map_err(ApiError::upstream)?;
  Ok(Json(json!({ "ok": true })))
}

// ─── Profile lookup ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ProfileIds {
  pub ids: Option<String>,
}

/// `GET /api/admin/profiles?ids=a,b`
pub async fn profiles<R, I>(
  State(state): State<AppState<R, I>>,
  _admin: AdminOnly,
  Query(params): Query<ProfileIds>,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let raw: Vec<&str> = params
    .ids
    .as_deref()
    .unwrap_or_default()
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .collect();
  if raw.is_empty() {
    return Err(ApiError::InvalidInput("Missing ids param".into()));
  }

  let ids = raw
    .iter()
    .map(|s| Uuid::parse_str(s).map_err(|_| ApiError::InvalidInput(format!("Invalid id: {s}"))))
    .collect::<Result<Vec<_>, _>>()?;

  match state.registry.profile_names(&ids).await {
    Ok(names) => Ok(Json(json!({ "data": names }))),
    Err(e) => {
      tracing::warn!(ids = ids.len(), error = %e, "profile batch lookup failed");
      Ok(Json(json!({ "data": [] })))
    }
  }
}
